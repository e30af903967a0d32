//! Domain models for pushgate.
//!
//! Canonical definitions for the core entities:
//! - `Commit` / `PersonIdent`: the pushed commit and its identities
//! - `FooterLine`: commit message trailers
//! - `IdentifiedUser`: the pushing user
//! - `Change` / `PatchSetId`: the review a push may update
//! - `CommitValidationInfo` / `CommitValidationError`: validator outcomes

pub mod change;
pub mod commit;
pub mod footer;
pub mod identity;
pub mod refs;
pub mod validation;

// Re-export main types
pub use change::{Change, PatchSetId};
pub use commit::{Commit, PersonIdent};
pub use footer::FooterLine;
pub use identity::{AccountId, IdentifiedUser};
pub use validation::{
    no_metadata, CommitValidationError, CommitValidationInfo, CommitValidationMessage, Metadata,
    RejectionKind, ValidationInfos, ValidationMessageType, ValidationResult, ValidationStatus,
};
