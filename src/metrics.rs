//! Backend-agnostic evaluation metrics via a pluggable sink.
//!
//! The sink is handed to each [`crate::Access`] evaluator with
//! [`crate::Access::with_metrics_sink`]; evaluators built without one use a
//! no-op sink.
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use webdav_acl::metrics::{EvaluationStats, MetricsSink};
//!
//! #[derive(Default)]
//! struct Denials(AtomicU64);
//!
//! impl MetricsSink for Denials {
//!     fn on_evaluation(&self, stats: &EvaluationStats) {
//!         if !stats.allowed {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//! }
//!
//! let access = Access::new(PrivilegeCatalog::standard())
//!     .with_metrics_sink(Arc::new(Denials::default()));
//! ```

use std::time::Duration;

use serde::Serialize;

/// Snapshot of one evaluation, passed to [`MetricsSink::on_evaluation`].
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationStats {
    /// Wall-clock time for the whole call, cache lookup included.
    pub duration: Duration,
    pub allowed: bool,
    /// Whether the result was served from the evaluation cache.
    pub cache_hit: bool,
    /// Href of the requesting principal.
    pub accessor: String,
    /// Href of the owner of the entity.
    pub owner: String,
}

/// Per-phase timings of an evaluation that missed the cache, in milliseconds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationPhases {
    /// Decoding the ACL text.
    pub decode_ms: f64,
    /// Walking the tiers and resolving the final set.
    pub resolve_ms: f64,
    pub total_ms: f64,
}

impl EvaluationPhases {
    /// Time not accounted for by the measured phases.
    pub fn overhead_ms(&self) -> f64 {
        self.total_ms - (self.decode_ms + self.resolve_ms)
    }
}

/// Consumer of evaluation metrics.
///
/// Called synchronously on the evaluation path, possibly from many threads;
/// implementations should return quickly.
pub trait MetricsSink: Send + Sync {
    fn on_evaluation(&self, stats: &EvaluationStats);

    /// Phase breakdown, reported for evaluations that missed the cache.
    fn on_evaluation_phases(&self, _stats: &EvaluationStats, _phases: &EvaluationPhases) {}
}

/// Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSink;

impl MetricsSink for NoOpSink {
    fn on_evaluation(&self, _stats: &EvaluationStats) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> EvaluationStats {
        EvaluationStats {
            duration: Duration::from_millis(42),
            allowed: true,
            cache_hit: false,
            accessor: "/principals/users/alice".to_string(),
            owner: "/principals/users/bob".to_string(),
        }
    }

    #[test]
    fn test_evaluation_stats_serialization() {
        let json = serde_json::to_value(stats()).unwrap();
        assert_eq!(json["allowed"], true);
        assert_eq!(json["cache_hit"], false);
        assert_eq!(json["accessor"], "/principals/users/alice");
    }

    #[test]
    fn test_overhead() {
        let phases = EvaluationPhases {
            decode_ms: 1.5,
            resolve_ms: 2.0,
            total_ms: 4.0,
        };
        assert!((phases.overhead_ms() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_noop_sink() {
        let sink = NoOpSink;
        sink.on_evaluation(&stats());
        sink.on_evaluation_phases(&stats(), &EvaluationPhases::default());
    }
}
