//! Structured observability hooks for split computations.
//!
//! This module provides:
//! - A job-scoped tracing span for instrumenting a split request
//! - Emission functions for the lifecycle of one split request
//!
//! Events are emitted at `info!` level unless noted. Filter with `RUST_LOG`.

use tracing::info;

use crate::model::BuildReference;

/// Span tagged with the job name. Attach with `tracing::Instrument`.
pub fn split_span(job: &str) -> tracing::Span {
    tracing::info_span!("parasplit.split", job = %job)
}

/// Emit event: a reference build was chosen (or none was found).
pub fn emit_resolved(reference: Option<&BuildReference>, classes: usize, fallback_used: bool) {
    match reference {
        Some(reference) => info!(
            event = "split.resolved",
            job = %reference.job,
            build = reference.number,
            classes = classes,
            fallback_used = fallback_used,
        ),
        None => info!(event = "split.resolved", found = false),
    }
}

/// Emit event: partitioning finished.
pub fn emit_partitioned(groups: usize, splits: usize, classes: usize) {
    info!(
        event = "split.partitioned",
        groups = groups,
        splits = splits,
        classes = classes,
    );
}

/// Emit event: an archived report could not be read (warn level).
pub fn emit_report_unreadable(reference: &BuildReference, error: &dyn std::fmt::Display) {
    tracing::warn!(
        event = "split.report_unreadable",
        job = %reference.job,
        build = reference.number,
        error = %error,
    );
}
