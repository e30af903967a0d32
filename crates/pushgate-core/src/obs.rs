//! Structured observability hooks for validation runs.
//!
//! This module provides:
//! - Run- and validator-scoped tracing spans, attached to futures with
//!   `tracing::Instrument`
//! - Emission functions for key lifecycle events: start, pass, reject,
//!   listener failure
//!
//! Filter with `RUST_LOG`; see [`crate::telemetry::init_tracing`].

use tracing::{debug, info, warn, Span};

/// Span covering one pipeline run.
pub fn run_span(run_id: &str, project: &str, branch: &str, commit: &str) -> Span {
    tracing::info_span!(
        "pushgate.validation",
        run_id = %run_id,
        project = %project,
        branch = %branch,
        commit = %commit,
    )
}

/// Span covering one validator invocation.
pub fn validator_span(validator: &str, project: &str, branch: &str, commit: &str) -> Span {
    tracing::debug_span!(
        "pushgate.validator",
        validator = %validator,
        project = %project,
        branch = %branch,
        commit = %commit,
    )
}

/// Emit event: validation run started.
pub fn emit_validation_started(run_id: &str, commit: &str, validators: usize) {
    info!(
        event = "validation.started",
        run_id = %run_id,
        commit = %commit,
        validators = validators,
    );
}

/// Emit event: a validator finished (either way).
pub fn emit_validator_finished(validator: &str, elapsed_ms: u64, passed: bool) {
    debug!(
        event = "validator.finished",
        validator = %validator,
        elapsed_ms = elapsed_ms,
        passed = passed,
    );
}

/// Emit event: every validator passed.
pub fn emit_validation_passed(run_id: &str, commit: &str, duration_ms: u64) {
    info!(
        event = "validation.passed",
        run_id = %run_id,
        commit = %commit,
        duration_ms = duration_ms,
    );
}

/// Emit event: a validator rejected the commit.
pub fn emit_validation_rejected(run_id: &str, commit: &str, validator: &str, reason: &str) {
    info!(
        event = "validation.rejected",
        run_id = %run_id,
        commit = %commit,
        validator = %validator,
        reason = %reason,
    );
}

/// Emit event: a post-validation listener failed (warning level).
pub fn emit_listener_failed(listener: &str, error: &dyn std::fmt::Display) {
    warn!(event = "validation.listener_failed", listener = %listener, error = %error);
}
