//! # caseflow
//!
//! Tenant-scoped case workflow engine for a multi-tenant
//! case-management platform.
//!
//! Enforces legal status transitions via a static table, executes them
//! atomically under row locks, auto-assigns unassigned cases through a
//! weighted scoring heuristic behind a TTL lock, and audits ownership
//! transfers — with every data access confined to the caller's tenant.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;
pub mod telemetry;
pub mod tenancy;
pub mod transitions;
