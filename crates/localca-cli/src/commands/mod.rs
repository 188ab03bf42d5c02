//! CLI command implementations.
//!
//! - [`issue`] - Issue one certificate
//! - [`renew`] - Renew every stored certificate

pub mod issue;
pub mod renew;

pub use issue::IssueCommand;
pub use renew::RenewCommand;
