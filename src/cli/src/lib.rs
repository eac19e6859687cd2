//! ca-initializer CLI - obtain an attested TLS certificate from the CA.

pub mod args;
pub mod issue;

pub use args::{build_config, Cli};
pub use issue::{issue, issue_with, IssueOutcome};
