//! Worker profile reads and candidate queries.
//!
//! Profiles are owned by the external worker-management component; the
//! engine reads them for scoring and capacity checks, and stamps
//! `last_assigned_at` as its own bookkeeping when it assigns. The upsert
//! exists for tests and operator seeding.

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::*;
use crate::tenancy::Scope;

const WORKER_COLUMNS: &str = "id, user_id, tenant_id, specializations, max_capacity, \
     active_count, available, last_assigned_at";

impl super::Db {
    /// Get a worker profile by id within the scope.
    pub async fn get_worker(&self, scope: &Scope, id: WorkerId) -> Result<WorkerProfile> {
        let row: Option<WorkerRow> = sqlx::query_as(&format!(
            "SELECT {WORKER_COLUMNS} FROM worker_profiles
             WHERE id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)"
        ))
        .bind(id.0)
        .bind(scope.tenant_uuid())
        .fetch_optional(self.pool())
        .await?;

        row.map(WorkerRow::into_profile)
            .ok_or_else(|| Error::NotFound(format!("worker {id}")))
    }

    /// Available workers in the scope whose specializations contain the
    /// service category. Ordered by id so result order is stable.
    pub async fn list_candidates(
        &self,
        scope: &Scope,
        service_category: &str,
    ) -> Result<Vec<WorkerProfile>> {
        let rows: Vec<WorkerRow> = sqlx::query_as(&format!(
            "SELECT {WORKER_COLUMNS} FROM worker_profiles
             WHERE ($1::uuid IS NULL OR tenant_id = $1)
             AND available
             AND specializations @> ARRAY[$2]::text[]
             ORDER BY id"
        ))
        .bind(scope.tenant_uuid())
        .bind(service_category)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(WorkerRow::into_profile).collect())
    }

    /// Completed cases this worker handled for the given organization.
    /// Feeds the client-history score.
    pub async fn completed_for_org(
        &self,
        scope: &Scope,
        worker_id: WorkerId,
        organization_id: OrgId,
    ) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT count(*) FROM cases
             WHERE ($1::uuid IS NULL OR tenant_id = $1)
             AND assigned_worker_id = $2
             AND organization_id = $3
             AND status = 'completed'",
        )
        .bind(scope.tenant_uuid())
        .bind(worker_id.0)
        .bind(organization_id.0)
        .fetch_one(self.pool())
        .await?;

        Ok(row.0)
    }

    /// Stamp the worker's last assignment time. Called after a
    /// successful auto-assignment.
    pub(crate) async fn touch_last_assigned(&self, scope: &Scope, id: WorkerId) -> Result<()> {
        sqlx::query(
            "UPDATE worker_profiles SET last_assigned_at = now()
             WHERE id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)",
        )
        .bind(id.0)
        .bind(scope.tenant_uuid())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Insert or replace a worker profile. Seeding path for tests and
    /// the operator CLI; production profiles arrive via the external
    /// worker-management component.
    ///
    /// A tenant scope only accepts payloads for its own tenant, and the
    /// update arm is fenced on the existing row's tenant — an id owned
    /// by another tenant conflicts on insert, matches nothing on
    /// update, and comes back as `Conflict` with zero rows touched.
    pub async fn upsert_worker(&self, scope: &Scope, profile: &WorkerProfile) -> Result<()> {
        let tenant = scope.stamp(Some(profile.tenant_id))?;
        let rows = sqlx::query(
            "INSERT INTO worker_profiles (id, user_id, tenant_id, specializations, max_capacity, active_count, available, last_assigned_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (id) DO UPDATE SET
                specializations = EXCLUDED.specializations,
                max_capacity = EXCLUDED.max_capacity,
                active_count = EXCLUDED.active_count,
                available = EXCLUDED.available,
                last_assigned_at = EXCLUDED.last_assigned_at
             WHERE worker_profiles.tenant_id = EXCLUDED.tenant_id",
        )
        .bind(profile.id.0)
        .bind(profile.user_id.0)
        .bind(tenant.0)
        .bind(&profile.specializations)
        .bind(profile.max_capacity)
        .bind(profile.active_count)
        .bind(profile.available)
        .bind(profile.last_assigned_at)
        .execute(self.pool())
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(Error::Conflict(format!(
                "worker {} belongs to another tenant",
                profile.id
            )));
        }
        Ok(())
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct WorkerRow {
    id: Uuid,
    user_id: Uuid,
    tenant_id: Uuid,
    specializations: Vec<String>,
    max_capacity: i32,
    active_count: i32,
    available: bool,
    last_assigned_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl WorkerRow {
    fn into_profile(self) -> WorkerProfile {
        WorkerProfile {
            id: WorkerId(self.id),
            user_id: UserId(self.user_id),
            tenant_id: TenantId(self.tenant_id),
            specializations: self.specializations,
            max_capacity: self.max_capacity,
            active_count: self.active_count,
            available: self.available,
            last_assigned_at: self.last_assigned_at,
        }
    }
}
