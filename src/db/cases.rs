//! Case storage: scoped reads, creation, and the locked read used by
//! the transition executor.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::*;
use crate::tenancy::Scope;

const CASE_COLUMNS: &str = "id, tenant_id, case_number, status, priority, assigned_worker_id, \
     organization_id, service_category, flags, sla_deadline, submitted_at, \
     completed_at, created_at, updated_at";

/// Filters for case listing.
#[derive(Debug, Default)]
pub struct CaseFilter {
    pub status: Option<CaseStatus>,
    pub assigned_worker_id: Option<WorkerId>,
    pub limit: Option<i64>,
}

impl super::Db {
    /// Create a case in `Draft`. The tenant id comes from the scope, or
    /// from the payload under the system scope; a payload tenant that
    /// contradicts a tenant scope is rejected.
    pub async fn create_case(&self, scope: &Scope, new: NewCase) -> Result<Case> {
        let id = Uuid::new_v4();
        let tenant = scope.stamp(new.tenant_id)?;
        let now = chrono::Utc::now();

        sqlx::query(
            "INSERT INTO cases (id, tenant_id, case_number, status, priority, organization_id, service_category, flags, created_at, updated_at)
             VALUES ($1, $2, $3, 'draft', $4, $5, $6, $7, $8, $8)",
        )
        .bind(id)
        .bind(tenant.0)
        .bind(&new.case_number)
        .bind(new.priority)
        .bind(new.organization_id.0)
        .bind(&new.service_category)
        .bind(&new.flags)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_case(scope, CaseId(id)).await
    }

    /// Get a case by id within the scope.
    pub async fn get_case(&self, scope: &Scope, id: CaseId) -> Result<Case> {
        let row: Option<CaseRow> = sqlx::query_as(&format!(
            "SELECT {CASE_COLUMNS} FROM cases
             WHERE id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)"
        ))
        .bind(id.0)
        .bind(scope.tenant_uuid())
        .fetch_optional(self.pool())
        .await?;

        row.ok_or_else(|| Error::NotFound(format!("case {id}")))?
            .try_into_case()
    }

    /// List cases within the scope, most urgent first.
    pub async fn list_cases(&self, scope: &Scope, filter: CaseFilter) -> Result<Vec<Case>> {
        let rows: Vec<CaseRow> = sqlx::query_as(&format!(
            "SELECT {CASE_COLUMNS} FROM cases
             WHERE ($1::uuid IS NULL OR tenant_id = $1)
             AND ($2::text IS NULL OR status = $2)
             AND ($3::uuid IS NULL OR assigned_worker_id = $3)
             ORDER BY priority DESC, created_at ASC
             LIMIT $4"
        ))
        .bind(scope.tenant_uuid())
        .bind(filter.status.map(|s| s.to_string()))
        .bind(filter.assigned_worker_id.map(|w| w.0))
        .bind(filter.limit.unwrap_or(50))
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(CaseRow::try_into_case).collect()
    }
}

/// Read a case with an exclusive row lock, inside the caller's
/// transaction. Blocks concurrent transition attempts on the same case;
/// other cases are unaffected. The returned status is the locked row's
/// status — the only value a transition decision may use.
pub(crate) async fn fetch_case_for_update(
    conn: &mut PgConnection,
    scope: &Scope,
    id: CaseId,
) -> Result<Case> {
    let row: Option<CaseRow> = sqlx::query_as(&format!(
        "SELECT {CASE_COLUMNS} FROM cases
         WHERE id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)
         FOR UPDATE"
    ))
    .bind(id.0)
    .bind(scope.tenant_uuid())
    .fetch_optional(conn)
    .await?;

    row.ok_or_else(|| Error::NotFound(format!("case {id}")))?
        .try_into_case()
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
pub(crate) struct CaseRow {
    id: Uuid,
    tenant_id: Uuid,
    case_number: String,
    status: String,
    priority: i32,
    assigned_worker_id: Option<Uuid>,
    organization_id: Uuid,
    service_category: String,
    flags: Vec<String>,
    sla_deadline: Option<chrono::DateTime<chrono::Utc>>,
    submitted_at: Option<chrono::DateTime<chrono::Utc>>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl CaseRow {
    pub(crate) fn try_into_case(self) -> Result<Case> {
        Ok(Case {
            id: CaseId(self.id),
            tenant_id: TenantId(self.tenant_id),
            case_number: self.case_number,
            status: self.status.parse()?,
            priority: self.priority,
            assigned_worker_id: self.assigned_worker_id.map(WorkerId),
            organization_id: OrgId(self.organization_id),
            service_category: self.service_category,
            flags: self.flags,
            sla_deadline: self.sla_deadline,
            submitted_at: self.submitted_at,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
