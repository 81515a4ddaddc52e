//! Transfer audit log. Append-only: rows are inserted in the same
//! transaction as the reassignment and never touched again.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::Result;
use crate::model::*;
use crate::tenancy::Scope;

/// Insert one audit row inside the caller's transaction.
pub(crate) async fn insert_transfer_log(
    conn: &mut PgConnection,
    entry: &TransferLogEntry,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO transfer_log (id, case_id, tenant_id, from_worker_id, to_worker_id, reason, initiated_by, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(entry.id)
    .bind(entry.case_id.0)
    .bind(entry.tenant_id.0)
    .bind(entry.from_worker_id.map(|w| w.0))
    .bind(entry.to_worker_id.0)
    .bind(&entry.reason)
    .bind(entry.initiated_by.0)
    .bind(entry.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

impl super::Db {
    /// Transfer history for a case, newest first, within the scope.
    pub async fn transfer_history(
        &self,
        scope: &Scope,
        case_id: CaseId,
    ) -> Result<Vec<TransferLogEntry>> {
        let rows: Vec<TransferRow> = sqlx::query_as(
            "SELECT id, case_id, tenant_id, from_worker_id, to_worker_id, reason, initiated_by, created_at
             FROM transfer_log
             WHERE case_id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)
             ORDER BY created_at DESC",
        )
        .bind(case_id.0)
        .bind(scope.tenant_uuid())
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(TransferRow::into_entry).collect())
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct TransferRow {
    id: Uuid,
    case_id: Uuid,
    tenant_id: Uuid,
    from_worker_id: Option<Uuid>,
    to_worker_id: Uuid,
    reason: String,
    initiated_by: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TransferRow {
    fn into_entry(self) -> TransferLogEntry {
        TransferLogEntry {
            id: self.id,
            case_id: CaseId(self.case_id),
            tenant_id: TenantId(self.tenant_id),
            from_worker_id: self.from_worker_id.map(WorkerId),
            to_worker_id: WorkerId(self.to_worker_id),
            reason: self.reason,
            initiated_by: UserId(self.initiated_by),
            created_at: self.created_at,
        }
    }
}
