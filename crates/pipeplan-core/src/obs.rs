//! Structured observability hooks for plan requests.
//!
//! This module provides:
//! - A fingerprint-scoped request span for instrumenting async work
//! - Emission functions for key events: request, cache hit, attempt failure,
//!   stage rejection, final outcome
//!
//! Filter with `RUST_LOG`; JSON output is chosen at [`init_tracing`](crate::init_tracing).

use tracing::{debug, info, warn};

/// Span tagging every event of one plan request with its fingerprint.
///
/// Attach with `tracing::Instrument` so the future stays `Send`:
///
/// ```ignore
/// service_call.instrument(request_span("9f2c...")).await
/// ```
pub fn request_span(fingerprint: &str) -> tracing::Span {
    tracing::info_span!("pipeplan.request", fingerprint = %fingerprint)
}

/// Emit event: a plan was requested for a context.
pub fn emit_plan_requested(fingerprint: &str) {
    info!(event = "plan.requested", fingerprint = %fingerprint);
}

/// Emit event: the plan was served from cache.
pub fn emit_cache_hit(fingerprint: &str, stages: usize) {
    info!(event = "plan.cache_hit", fingerprint = %fingerprint, stages = stages);
}

/// Emit event: one generator attempt failed (warning level).
pub fn emit_attempt_failed(attempt: u32, transient: bool, error: &dyn std::fmt::Display) {
    warn!(
        event = "generator.attempt_failed",
        attempt = attempt,
        transient = transient,
        error = %error,
    );
}

/// Emit event: a stage was dropped during sanitization.
pub fn emit_stage_rejected(index: usize, name: &str, reason: &str) {
    debug!(event = "plan.stage_rejected", index = index, name = %name, reason = %reason);
}

/// Emit event: the request finished with `outcome` after `attempts` generator calls.
pub fn emit_plan_outcome(outcome: &str, attempts: u32, duration_ms: u64) {
    info!(
        event = "plan.outcome",
        outcome = %outcome,
        attempts = attempts,
        duration_ms = duration_ms,
    );
}
