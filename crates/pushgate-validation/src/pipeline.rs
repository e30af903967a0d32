//! Validation pipeline execution.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;

use pushgate_core::obs::{
    emit_listener_failed, emit_validation_passed, emit_validation_rejected,
    emit_validation_started, emit_validator_finished, run_span, validator_span,
};
use pushgate_core::{
    CommitReceivedEvent, CommitValidationError, CommitValidationMessage, PatchSetId,
    ValidationInfos, METRICS,
};
use sha2::{Digest, Sha256};
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::listener::{CommitValidationInfoListener, CommitValidationListener};

/// Per-run options for [`CommitValidators::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Patch set the commit belongs to, when already known.
    pub patch_set: Option<PatchSetId>,

    /// Notify the info listeners after a successful run. When disabled the
    /// caller is responsible for calling [`CommitValidators::notify_listeners`]
    /// later, e.g. once the patch set id is known.
    pub invoke_listeners: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            patch_set: None,
            invoke_listeners: true,
        }
    }
}

impl RunOptions {
    pub fn with_patch_set(mut self, patch_set: PatchSetId) -> Self {
        self.patch_set = Some(patch_set);
        self
    }

    pub fn without_listeners(mut self) -> Self {
        self.invoke_listeners = false;
        self
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}

/// An assembled, ordered validator chain.
///
/// Holds no mutable state; one instance may validate any number of commits,
/// concurrently.
pub struct CommitValidators {
    validators: Vec<Arc<dyn CommitValidationListener>>,
    listeners: Vec<Arc<dyn CommitValidationInfoListener>>,
}

impl CommitValidators {
    pub fn new(
        validators: Vec<Arc<dyn CommitValidationListener>>,
        listeners: Vec<Arc<dyn CommitValidationInfoListener>>,
    ) -> Self {
        Self {
            validators,
            listeners,
        }
    }

    /// Validator names in execution order.
    pub fn validator_names(&self) -> Vec<&str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// SHA-256 hex digest of the ordered validator names.
    ///
    /// Two chains with the same fingerprint run the same checks in the same
    /// order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for name in self.validator_names() {
            hasher.update(name.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }

    /// Run every validator in order against `event`.
    ///
    /// Stops at the first rejection. The returned error carries the messages
    /// of every validator that passed before it, in execution order,
    /// followed by the rejecting validator's own messages.
    pub async fn validate(
        &self,
        event: &CommitReceivedEvent,
        options: &RunOptions,
    ) -> Result<ValidationInfos, CommitValidationError> {
        let run_id = Uuid::new_v4().to_string();
        let span = run_span(
            &run_id,
            event.project.as_str(),
            &event.branch.branch,
            event.commit.id.name(),
        );
        self.run(&run_id, event, options).instrument(span).await
    }

    async fn run(
        &self,
        run_id: &str,
        event: &CommitReceivedEvent,
        options: &RunOptions,
    ) -> Result<ValidationInfos, CommitValidationError> {
        let start = Instant::now();
        let commit = event.commit.id.name();
        METRICS.inc_runs_started();
        emit_validation_started(run_id, commit, self.validators.len());

        let mut infos = ValidationInfos::new();
        for validator in &self.validators {
            let name = validator.name();
            let span = validator_span(
                name,
                event.project.as_str(),
                &event.branch.branch,
                commit,
            );
            let started = Instant::now();
            let outcome = validator.validate_commit(event).instrument(span).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            METRICS.inc_validators_executed();

            match outcome {
                Ok(info) => {
                    emit_validator_finished(name, elapsed_ms, true);
                    debug!(commit = %commit, validator = %name, info = ?info, "commit has passed validator");
                    infos.push(name, info);
                }
                Err(rejection) => {
                    emit_validator_finished(name, elapsed_ms, false);
                    let messages: Vec<CommitValidationMessage> = infos
                        .messages()
                        .chain(rejection.messages.iter())
                        .cloned()
                        .collect();
                    debug!(
                        commit = %commit,
                        validator = %name,
                        reason = %rejection.reason,
                        messages = ?messages,
                        "commit was rejected by validator"
                    );
                    METRICS.inc_runs_rejected();
                    emit_validation_rejected(run_id, commit, name, &rejection.reason);
                    return Err(CommitValidationError {
                        reason: rejection.reason,
                        messages,
                        kind: rejection.kind,
                    });
                }
            }
        }

        emit_validation_passed(run_id, commit, start.elapsed().as_millis() as u64);

        if options.invoke_listeners {
            self.notify_listeners(&infos, event, options.patch_set.as_ref())
                .await;
        }
        Ok(infos)
    }

    /// Call every info listener once, in registration order.
    ///
    /// Listener failures, panics included, are logged and otherwise ignored.
    pub async fn notify_listeners(
        &self,
        infos: &ValidationInfos,
        event: &CommitReceivedEvent,
        patch_set: Option<&PatchSetId>,
    ) {
        for listener in &self.listeners {
            let outcome = AssertUnwindSafe(listener.commit_validated(infos, event, patch_set))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    METRICS.inc_listeners_failed();
                    emit_listener_failed(listener.name(), &err);
                }
                Err(panic) => {
                    METRICS.inc_listeners_failed();
                    emit_listener_failed(listener.name(), &panic_message(panic.as_ref()));
                }
            }
        }
    }
}

impl std::fmt::Debug for CommitValidators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitValidators")
            .field("validators", &self.validator_names())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
