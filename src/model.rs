//! Core data model.
//!
//! A case is a tenant-owned work item moving through a fixed lifecycle.
//! Worker profiles are owned by an external worker-management component;
//! this engine reads them for scoring and capacity checks. Transfer log
//! entries are append-only audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                // Short display: first 8 chars of UUID
                write!(f, "{}", &self.0.to_string()[..8])
            }
        }
    };
}

id_newtype!(
    /// Identifies a case.
    CaseId
);
id_newtype!(
    /// Identifies a tenant (an isolated customer organization).
    TenantId
);
id_newtype!(
    /// Identifies a worker profile.
    WorkerId
);
id_newtype!(
    /// Identifies a user (actor) within a tenant.
    UserId
);
id_newtype!(
    /// Identifies a client organization within a tenant.
    OrgId
);

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a case. Closed set; changes only via the
/// transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Being drafted by the originating client. Not yet visible to staff.
    Draft,
    /// Submitted for handling, awaiting triage.
    Submitted,
    /// Staff reviewing scope and documents.
    UnderReview,
    /// Actively being worked.
    Processing,
    /// Paused, waiting on the client or an external party.
    OnHold,
    /// Done. Terminal.
    Completed,
    /// Declined with a recorded reason. Terminal.
    Rejected,
}

impl CaseStatus {
    /// Terminal statuses have no outgoing transitions in the table and
    /// are frozen from this engine's perspective.
    pub fn is_terminal(self) -> bool {
        matches!(self, CaseStatus::Completed | CaseStatus::Rejected)
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CaseStatus::Draft => "draft",
            CaseStatus::Submitted => "submitted",
            CaseStatus::UnderReview => "under_review",
            CaseStatus::Processing => "processing",
            CaseStatus::OnHold => "on_hold",
            CaseStatus::Completed => "completed",
            CaseStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CaseStatus::Draft),
            "submitted" => Ok(CaseStatus::Submitted),
            "under_review" => Ok(CaseStatus::UnderReview),
            "processing" => Ok(CaseStatus::Processing),
            "on_hold" => Ok(CaseStatus::OnHold),
            "completed" => Ok(CaseStatus::Completed),
            "rejected" => Ok(CaseStatus::Rejected),
            _ => Err(crate::error::Error::Other(format!("unknown status: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Actor role used by the transition table. `Client` is the pseudo-role
/// of the case's originating client actor; the staff roles are flat —
/// the table enumerates permitted roles explicitly per transition, there
/// is no implicit inheritance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Agent,
    Supervisor,
    Admin,
}

impl Role {
    /// Roles allowed to push a batch into a restricted terminal status.
    pub fn is_elevated(self) -> bool {
        matches!(self, Role::Supervisor | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Client => "client",
            Role::Agent => "agent",
            Role::Supervisor => "supervisor",
            Role::Admin => "admin",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Role {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "agent" => Ok(Role::Agent),
            "supervisor" => Ok(Role::Supervisor),
            "admin" => Ok(Role::Admin),
            _ => Err(crate::error::Error::Other(format!("unknown role: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Case
// ---------------------------------------------------------------------------

/// A case tracked by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    /// Unique identifier.
    pub id: CaseId,

    /// Owning tenant. Immutable after creation.
    pub tenant_id: TenantId,

    /// Human-facing case number (e.g. "CF-2026-00042").
    pub case_number: String,

    /// Current lifecycle status.
    pub status: CaseStatus,

    /// Priority. Higher = more urgent.
    pub priority: i32,

    /// Currently assigned worker, if any.
    pub assigned_worker_id: Option<WorkerId>,

    /// The client organization this case is for (tenant-scoped).
    pub organization_id: OrgId,

    /// Service category the case requires. Matched against worker
    /// specializations during assignment.
    pub service_category: String,

    /// Free-form internal labels. Set semantics, idempotent add/remove.
    pub flags: Vec<String>,

    /// SLA deadline, set by the SLA listener after submission.
    pub sla_deadline: Option<DateTime<Utc>>,

    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Worker profile
// ---------------------------------------------------------------------------

/// A worker's assignment profile. Owned and mutated by the external
/// worker-management component; the engine reads it for candidate
/// selection and capacity checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub id: WorkerId,
    pub user_id: UserId,
    pub tenant_id: TenantId,

    /// Service categories this worker handles.
    pub specializations: Vec<String>,

    /// Maximum concurrent cases.
    pub max_capacity: i32,

    /// Currently active cases (maintained externally).
    pub active_count: i32,

    /// Whether the worker accepts new assignments.
    pub available: bool,

    /// When this worker last received an assignment. None = never.
    pub last_assigned_at: Option<DateTime<Utc>>,
}

impl WorkerProfile {
    /// Active cases as a fraction of capacity, clamped to [0, 1].
    pub fn workload_ratio(&self) -> f64 {
        if self.max_capacity <= 0 {
            return 1.0;
        }
        (self.active_count as f64 / self.max_capacity as f64).clamp(0.0, 1.0)
    }

    pub fn at_capacity(&self) -> bool {
        self.active_count >= self.max_capacity
    }
}

// ---------------------------------------------------------------------------
// Transfer log
// ---------------------------------------------------------------------------

/// Append-only audit record of an ownership transfer. Written exactly
/// once per successful transfer, in the same transaction as the
/// reassignment. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferLogEntry {
    pub id: Uuid,
    pub case_id: CaseId,
    pub tenant_id: TenantId,
    pub from_worker_id: Option<WorkerId>,
    pub to_worker_id: WorkerId,
    pub reason: String,
    pub initiated_by: UserId,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for creating new cases. Cases start in `Draft`; the tenant id
/// is stamped by the scope at insert time unless supplied here.
pub struct NewCase {
    pub(crate) case_number: String,
    pub(crate) organization_id: OrgId,
    pub(crate) service_category: String,
    pub(crate) tenant_id: Option<TenantId>,
    pub(crate) priority: i32,
    pub(crate) flags: Vec<String>,
}

impl NewCase {
    pub fn new(
        case_number: impl Into<String>,
        organization_id: OrgId,
        service_category: impl Into<String>,
    ) -> Self {
        Self {
            case_number: case_number.into(),
            organization_id,
            service_category: service_category.into(),
            tenant_id: None,
            priority: 0,
            flags: Vec::new(),
        }
    }

    /// Explicit tenant, for system paths that create rows on a tenant's
    /// behalf outside a tenant scope.
    pub fn tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(CaseStatus::Completed.is_terminal());
        assert!(CaseStatus::Rejected.is_terminal());
        assert!(!CaseStatus::Draft.is_terminal());
        assert!(!CaseStatus::Processing.is_terminal());
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            CaseStatus::Draft,
            CaseStatus::Submitted,
            CaseStatus::UnderReview,
            CaseStatus::Processing,
            CaseStatus::OnHold,
            CaseStatus::Completed,
            CaseStatus::Rejected,
        ] {
            assert_eq!(s.to_string().parse::<CaseStatus>().unwrap(), s);
        }
    }

    #[test]
    fn workload_ratio_clamps() {
        let mut w = WorkerProfile {
            id: WorkerId::new(),
            user_id: UserId::new(),
            tenant_id: TenantId::new(),
            specializations: vec![],
            max_capacity: 10,
            active_count: 25,
            available: true,
            last_assigned_at: None,
        };
        assert_eq!(w.workload_ratio(), 1.0);
        w.active_count = 5;
        assert_eq!(w.workload_ratio(), 0.5);
        w.max_capacity = 0;
        assert_eq!(w.workload_ratio(), 1.0);
    }
}
