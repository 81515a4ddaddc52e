//! Tenant scoping.
//!
//! Every tenant-scoped repository method takes a [`Scope`] parameter —
//! there is no ambient tenant context to forget, and no way to call into
//! storage without deciding the scope at the call site. Background jobs
//! must carry the tenant id in their payload and reconstruct a scope
//! from it; nothing propagates implicitly across task boundaries.
//!
//! Queries bind `Scope::tenant_uuid()` as a nullable uuid and filter
//! with `($n::uuid IS NULL OR tenant_id = $n)`: the system scope passes
//! through, a tenant scope intersects every caller-supplied condition
//! with the tenant-equality predicate. This holds for updates and
//! deletes too, so knowing another tenant's row id is not enough to
//! touch it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::TenantId;

/// The effective tenant scope of one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// No tenant filtering. Bootstrap and system maintenance paths only;
    /// never derived from request input.
    System,
    /// All reads and writes confined to one tenant.
    Tenant(TenantId),
}

impl Scope {
    pub fn tenant(id: TenantId) -> Self {
        Scope::Tenant(id)
    }

    /// The uuid bound into every scoped query. `None` disables the
    /// predicate (system scope).
    pub fn tenant_uuid(&self) -> Option<Uuid> {
        match self {
            Scope::System => None,
            Scope::Tenant(id) => Some(id.0),
        }
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        match self {
            Scope::System => None,
            Scope::Tenant(id) => Some(*id),
        }
    }

    /// Tenant stamped onto a new row. A tenant scope supplies its own
    /// tenant and rejects a payload naming any other; the system scope
    /// stamps whatever the payload names and treats a tenant-less
    /// payload as a caller bug.
    pub fn stamp(&self, explicit: Option<TenantId>) -> crate::error::Result<TenantId> {
        match (explicit, self) {
            (Some(t), Scope::Tenant(s)) if t != *s => {
                Err(crate::error::Error::Validation(format!(
                    "payload tenant {t} does not match scope {s}"
                )))
            }
            (Some(t), _) => Ok(t),
            (None, Scope::Tenant(t)) => Ok(*t),
            (None, Scope::System) => Err(crate::error::Error::Validation(
                "tenant id required: system scope does not stamp one".into(),
            )),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::System => write!(f, "system"),
            Scope::Tenant(id) => write!(f, "tenant:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_scope_binds_null() {
        assert_eq!(Scope::System.tenant_uuid(), None);
    }

    #[test]
    fn tenant_scope_binds_its_uuid() {
        let t = TenantId::new();
        assert_eq!(Scope::tenant(t).tenant_uuid(), Some(t.0));
    }

    #[test]
    fn stamp_accepts_matching_explicit_tenant() {
        let t = TenantId::new();
        assert_eq!(Scope::tenant(t).stamp(Some(t)).unwrap(), t);
    }

    #[test]
    fn stamp_rejects_foreign_explicit_tenant() {
        let ambient = TenantId::new();
        let foreign = TenantId::new();
        assert!(Scope::tenant(ambient).stamp(Some(foreign)).is_err());
    }

    #[test]
    fn system_scope_stamps_the_payload_tenant() {
        let t = TenantId::new();
        assert_eq!(Scope::System.stamp(Some(t)).unwrap(), t);
    }

    #[test]
    fn stamp_falls_back_to_scope() {
        let ambient = TenantId::new();
        let stamped = Scope::tenant(ambient).stamp(None).unwrap();
        assert_eq!(stamped, ambient);
    }

    #[test]
    fn stamp_rejects_tenantless_system_create() {
        assert!(Scope::System.stamp(None).is_err());
    }
}
