//! Bulk operations: assignment, status, and flag changes across many
//! cases, all-or-nothing.
//!
//! Capacity and role checks run against the whole batch before any row
//! is touched; a rejected batch changes nothing. Events are emitted per
//! row the statement actually changed, after commit, stamped with that
//! row's tenant; requested ids the scope could not reach emit nothing.

use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::*;
use crate::telemetry::metrics;
use crate::tenancy::Scope;
use opentelemetry::KeyValue;

fn as_uuids(ids: &[CaseId]) -> Vec<Uuid> {
    ids.iter().map(|c| c.0).collect()
}

impl super::CaseEngine {
    /// Assign every case in the batch to one worker.
    ///
    /// The whole batch must fit: `active + batch <= max_capacity` or
    /// nothing is written. Returns the number of rows updated.
    #[tracing::instrument(skip(self, scope, case_ids), fields(scope = %scope, worker = %worker_id, batch = case_ids.len()))]
    pub async fn bulk_assign(
        &self,
        scope: &Scope,
        case_ids: &[CaseId],
        worker_id: WorkerId,
    ) -> Result<u64> {
        let worker = self.db().get_worker(scope, worker_id).await?;
        let batch = case_ids.len() as i32;
        if worker.active_count + batch > worker.max_capacity {
            metrics::bulk_operations().add(
                1,
                &[
                    KeyValue::new("operation", "assign"),
                    KeyValue::new("result", "rejected"),
                ],
            );
            return Err(Error::CapacityExceeded {
                active: worker.active_count,
                max: worker.max_capacity,
            });
        }

        let mut tx = self.db().pool().begin().await?;
        let touched: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "UPDATE cases SET assigned_worker_id = $1, updated_at = now()
             WHERE id = ANY($2) AND ($3::uuid IS NULL OR tenant_id = $3)
             RETURNING id, tenant_id",
        )
        .bind(worker_id.0)
        .bind(as_uuids(case_ids))
        .bind(scope.tenant_uuid())
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        metrics::bulk_operations().add(
            1,
            &[
                KeyValue::new("operation", "assign"),
                KeyValue::new("result", "ok"),
            ],
        );

        for (case_id, tenant_id) in &touched {
            self.dispatch(
                "case.assigned",
                json!({
                    "case_id": case_id,
                    "tenant_id": tenant_id,
                    "worker_id": worker_id.0,
                    "assignment": "bulk",
                }),
            );
        }

        Ok(touched.len() as u64)
    }

    /// Set every case in the batch to one status.
    ///
    /// Terminal targets are restricted to elevated roles; the check
    /// happens before any row is read or written. This path does not
    /// consult the transition table — it is the operator batch tool, and
    /// the role gate is its only policy.
    #[tracing::instrument(skip(self, scope, case_ids), fields(scope = %scope, to = %target, batch = case_ids.len()))]
    pub async fn bulk_update_status(
        &self,
        scope: &Scope,
        case_ids: &[CaseId],
        target: CaseStatus,
        actor_role: Role,
    ) -> Result<u64> {
        if target.is_terminal() && !actor_role.is_elevated() {
            metrics::bulk_operations().add(
                1,
                &[
                    KeyValue::new("operation", "status"),
                    KeyValue::new("result", "rejected"),
                ],
            );
            return Err(Error::Forbidden {
                role: actor_role,
                action: format!("bulk-set status {target}"),
            });
        }

        let completed_at = target.is_terminal().then(chrono::Utc::now);

        let mut tx = self.db().pool().begin().await?;
        let touched: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "UPDATE cases SET status = $1, updated_at = now(),
                completed_at = COALESCE($2, completed_at)
             WHERE id = ANY($3) AND ($4::uuid IS NULL OR tenant_id = $4)
             RETURNING id, tenant_id",
        )
        .bind(target.to_string())
        .bind(completed_at)
        .bind(as_uuids(case_ids))
        .bind(scope.tenant_uuid())
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        metrics::bulk_operations().add(
            1,
            &[
                KeyValue::new("operation", "status"),
                KeyValue::new("result", "ok"),
            ],
        );

        for (case_id, tenant_id) in &touched {
            self.dispatch(
                "case.status_changed",
                json!({
                    "case_id": case_id,
                    "tenant_id": tenant_id,
                    "to": target,
                    "bulk": true,
                }),
            );
        }

        Ok(touched.len() as u64)
    }

    /// Add a flag to every case in the batch. Set semantics: a case that
    /// already carries the flag is untouched, not an error.
    pub async fn bulk_add_flag(
        &self,
        scope: &Scope,
        case_ids: &[CaseId],
        flag: &str,
    ) -> Result<u64> {
        let updated = sqlx::query(
            "UPDATE cases SET flags = array_append(flags, $1), updated_at = now()
             WHERE id = ANY($2) AND ($3::uuid IS NULL OR tenant_id = $3)
             AND NOT (flags @> ARRAY[$1]::text[])",
        )
        .bind(flag)
        .bind(as_uuids(case_ids))
        .bind(scope.tenant_uuid())
        .execute(self.db().pool())
        .await?
        .rows_affected();

        metrics::bulk_operations().add(
            1,
            &[
                KeyValue::new("operation", "flag_add"),
                KeyValue::new("result", "ok"),
            ],
        );
        Ok(updated)
    }

    /// Remove a flag from every case in the batch. Removing an absent
    /// flag is a no-op.
    pub async fn bulk_remove_flag(
        &self,
        scope: &Scope,
        case_ids: &[CaseId],
        flag: &str,
    ) -> Result<u64> {
        let updated = sqlx::query(
            "UPDATE cases SET flags = array_remove(flags, $1), updated_at = now()
             WHERE id = ANY($2) AND ($3::uuid IS NULL OR tenant_id = $3)
             AND flags @> ARRAY[$1]::text[]",
        )
        .bind(flag)
        .bind(as_uuids(case_ids))
        .bind(scope.tenant_uuid())
        .execute(self.db().pool())
        .await?
        .rows_affected();

        metrics::bulk_operations().add(
            1,
            &[
                KeyValue::new("operation", "flag_remove"),
                KeyValue::new("result", "ok"),
            ],
        );
        Ok(updated)
    }
}
