//! Case engine. The public API for transitions, assignment, transfers,
//! and bulk changes.
//!
//! All status mutations go through here; the engine enforces the
//! transition table, tenant scope, and capacity invariants, and
//! dispatches side effects after its transactions commit.

pub mod assign;
pub mod bulk;
pub mod transfer;
pub mod transition;

use std::sync::Arc;

use crate::db::Db;
use crate::event::EventSink;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;

/// Tunables. Defaults match production behavior.
pub struct EngineConfig {
    /// Lease TTL for the assignment lock, in seconds.
    pub assign_lock_ttl_seconds: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            assign_lock_ttl_seconds: 30.0,
        }
    }
}

/// The case engine. Owns the storage handle and the event sink.
pub struct CaseEngine {
    db: Db,
    sink: Arc<dyn EventSink>,
    config: EngineConfig,
}

impl CaseEngine {
    pub fn new(db: Db, sink: Arc<dyn EventSink>) -> Self {
        Self::with_config(db, sink, EngineConfig::default())
    }

    pub fn with_config(db: Db, sink: Arc<dyn EventSink>, config: EngineConfig) -> Self {
        Self { db, sink, config }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Publish a side effect, best-effort. The primary mutation has
    /// already committed by the time this runs; a failed publish is
    /// logged and counted, never surfaced, and never blocks dispatch of
    /// the effects that follow it.
    pub(crate) fn dispatch(&self, event: &'static str, payload: serde_json::Value) {
        if let Err(e) = self.sink.publish(event, payload) {
            tracing::warn!(event, error = %e, "side-effect dispatch failed; continuing");
            metrics::side_effect_failures().add(1, &[KeyValue::new("event", event)]);
        }
    }
}
