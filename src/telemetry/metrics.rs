//! Metric instrument factories for caseflow.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"caseflow"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for caseflow instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("caseflow")
}

/// Counter: case status transitions.
/// Labels: `from`, `to`.
pub fn case_transitions() -> Counter<u64> {
    meter()
        .u64_counter("caseflow.case.transitions")
        .with_description("Number of committed case status transitions")
        .build()
}

/// Counter: auto-assignment attempts.
/// Labels: `result` ("assigned" | "no_candidates" | "skipped").
pub fn assignments() -> Counter<u64> {
    meter()
        .u64_counter("caseflow.assignment.attempts")
        .with_description("Number of auto-assignment attempts")
        .build()
}

/// Counter: lock acquisitions on the TTL lock.
/// Labels: `result` ("acquired" | "skipped").
pub fn lock_acquisitions() -> Counter<u64> {
    meter()
        .u64_counter("caseflow.lock.acquisitions")
        .with_description("Number of TTL lock acquisition attempts")
        .build()
}

/// Counter: side-effect dispatches that failed at the sink.
/// Labels: `event`.
pub fn side_effect_failures() -> Counter<u64> {
    meter()
        .u64_counter("caseflow.side_effect.failures")
        .with_description("Side-effect publishes that failed and were dropped")
        .build()
}

/// Counter: completed transfers.
pub fn transfers() -> Counter<u64> {
    meter()
        .u64_counter("caseflow.transfer.completed")
        .with_description("Number of completed case transfers")
        .build()
}

/// Counter: bulk operations.
/// Labels: `operation`, `result` ("ok" | "rejected").
pub fn bulk_operations() -> Counter<u64> {
    meter()
        .u64_counter("caseflow.bulk.operations")
        .with_description("Number of bulk operations")
        .build()
}

/// Histogram: assignment scoring duration in milliseconds.
pub fn scoring_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("caseflow.assignment.scoring_ms")
        .with_description("Candidate scoring duration in milliseconds")
        .with_unit("ms")
        .build()
}
