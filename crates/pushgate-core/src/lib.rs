//! pushgate core library
//!
//! Domain model, validation context, configuration and observability shared
//! by the validation pipeline and its binaries.

pub mod config;
pub mod domain;
pub mod event;
pub mod host;
pub mod metrics;
pub mod obs;
pub mod telemetry;

pub use config::{ConfigError, ValidationConfig, DEFAULT_MAX_FILES};

pub use domain::{
    no_metadata, AccountId, Change, Commit, CommitValidationError, CommitValidationInfo,
    CommitValidationMessage, FooterLine, IdentifiedUser, Metadata, PatchSetId, PersonIdent,
    RejectionKind, ValidationInfos, ValidationMessageType, ValidationResult, ValidationStatus,
};

pub use event::{CommitReceivedEvent, ReceiveCommand};

pub use host::server_host;

pub use pushgate_state::{
    BranchNameKey, HostKey, ObjectId, ProjectConfig, ProjectLifecycle, ProjectName, ProjectState,
    RefPermission, SshInfo,
};

pub use metrics::METRICS;
pub use obs::{
    emit_listener_failed, emit_validation_passed, emit_validation_rejected,
    emit_validation_started, emit_validator_finished, run_span, validator_span,
};
pub use telemetry::init_tracing;

/// pushgate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
