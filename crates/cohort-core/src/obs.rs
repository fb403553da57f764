//! Structured observability hooks for evaluation events.
//!
//! Lifecycle events are emitted at `info!`/`debug!`, recovered cache failures
//! at `warn!`. Filter with `RUST_LOG` (e.g. `RUST_LOG=cohort_core=debug`).

use tracing::{debug, info, warn};

/// RAII guard that enters an evaluation-scoped span.
///
/// Nested evaluations open nested spans, so log lines carry the full chain
/// of definitions being evaluated.
pub struct EvaluationSpan {
    _span: tracing::span::EnteredSpan,
}

impl EvaluationSpan {
    pub fn enter(definition: &str, depth: usize) -> Self {
        let span = tracing::info_span!("cohort.evaluate", definition = %definition, depth = depth);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_evaluation_started(definition: &str, definition_type: &str, depth: usize) {
    debug!(
        event = "evaluation.started",
        definition = %definition,
        definition_type = %definition_type,
        depth = depth,
    );
}

pub fn emit_evaluation_finished(definition: &str, members: usize, duration_ms: u64) {
    info!(
        event = "evaluation.finished",
        definition = %definition,
        members = members,
        duration_ms = duration_ms,
    );
}

pub fn emit_cache_hit(definition: &str, key: &str) {
    debug!(event = "cache.hit", definition = %definition, key = %key);
}

pub fn emit_cache_miss(definition: &str, key: &str) {
    debug!(event = "cache.miss", definition = %definition, key = %key);
}

/// Emit event: a cache failure was recovered by computing directly (warning level).
pub fn emit_cache_error(definition: &str, stage: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "cache.error",
        definition = %definition,
        stage = %stage,
        error = %error,
        "An error occurred while attempting to access the cache"
    );
}

pub fn emit_definition_saved(definition: &str, version: u32) {
    info!(event = "definition.saved", definition = %definition, version = version);
}
