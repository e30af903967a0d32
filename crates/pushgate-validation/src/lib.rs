//! pushgate validation - commit validation pipeline
//!
//! Provides the pipeline that decides whether a pushed commit is accepted:
//! - Assembles an ordered validator chain per push scenario
//! - Runs validators in order, stopping at the first rejection while keeping
//!   every diagnostic collected so far
//! - Notifies post-validation observers of successful runs

pub mod factory;
pub mod listener;
pub mod pipeline;
pub mod skip;
pub mod validators;

#[cfg(test)]
mod test_support;

// Re-export key types
pub use factory::{
    AssemblyError, CommitValidatorsFactory, GerritCommitsRequest, MergedCommitsRequest,
    ReceiveCommitsRequest,
};
pub use listener::{CommitValidationInfoListener, CommitValidationListener};
pub use pipeline::{CommitValidators, RunOptions};
pub use skip::SkippablePluginValidator;
pub use validators::{commit_msg_hook_installation_hint, invalid_email, HintError};
