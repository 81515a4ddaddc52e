//! Transfer service: reassign an owned case with an audit trail.
//!
//! Checks run before any mutation; the reassignment and its audit row
//! commit in one transaction; the notification side effect is dispatched
//! best-effort after commit.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::db::{cases, transfers};
use crate::error::{Error, Result};
use crate::model::*;
use crate::telemetry::metrics;
use crate::tenancy::Scope;

impl super::CaseEngine {
    /// Reassign a case from one worker to another.
    ///
    /// `from_worker_id` is the caller's claim about the current
    /// assignee; if the locked row disagrees the transfer is a
    /// `Conflict` and nothing is written.
    #[tracing::instrument(skip(self, scope, reason), fields(scope = %scope, case = %case_id, to = %to_worker_id))]
    pub async fn transfer(
        &self,
        scope: &Scope,
        case_id: CaseId,
        from_worker_id: WorkerId,
        to_worker_id: WorkerId,
        reason: &str,
        initiated_by: UserId,
    ) -> Result<TransferLogEntry> {
        if from_worker_id == to_worker_id {
            return Err(Error::Conflict(
                "cannot transfer a case to its current worker".into(),
            ));
        }

        let target = self.db().get_worker(scope, to_worker_id).await?;
        if target.at_capacity() {
            return Err(Error::CapacityExceeded {
                active: target.active_count,
                max: target.max_capacity,
            });
        }

        let mut tx = self.db().pool().begin().await?;

        let case = cases::fetch_case_for_update(&mut tx, scope, case_id).await?;

        // The caller's view of the assignment may be stale; judge it
        // against the locked row so the audit trail stays truthful.
        if case.assigned_worker_id != Some(from_worker_id) {
            return Err(Error::Conflict(match case.assigned_worker_id {
                Some(actual) => format!(
                    "case {case_id} is assigned to {actual}, not {from_worker_id}"
                ),
                None => format!("case {case_id} is not assigned"),
            }));
        }

        let entry = TransferLogEntry {
            id: Uuid::new_v4(),
            case_id,
            tenant_id: case.tenant_id,
            from_worker_id: case.assigned_worker_id,
            to_worker_id,
            reason: reason.to_string(),
            initiated_by,
            created_at: Utc::now(),
        };

        sqlx::query(
            "UPDATE cases SET assigned_worker_id = $1, updated_at = now()
             WHERE id = $2 AND ($3::uuid IS NULL OR tenant_id = $3)",
        )
        .bind(to_worker_id.0)
        .bind(case_id.0)
        .bind(scope.tenant_uuid())
        .execute(&mut *tx)
        .await?;

        transfers::insert_transfer_log(&mut tx, &entry).await?;

        tx.commit().await?;

        metrics::transfers().add(1, &[]);
        tracing::info!(from = %from_worker_id, "case transferred");

        self.dispatch(
            "case.transferred",
            json!({
                "case_id": case.id.0,
                "tenant_id": case.tenant_id.0,
                "case_number": case.case_number,
                "from_worker_id": from_worker_id.0,
                "to_worker_id": to_worker_id.0,
                "reason": reason,
                "initiated_by": initiated_by.0,
            }),
        );

        Ok(entry)
    }

    /// Transfer history for a case, newest first.
    pub async fn transfer_history(
        &self,
        scope: &Scope,
        case_id: CaseId,
    ) -> Result<Vec<TransferLogEntry>> {
        self.db().transfer_history(scope, case_id).await
    }
}
