//! Transition executor: one status change, atomically.
//!
//! The decision is always made against the row as locked inside the
//! transaction, never against anything the caller read earlier. Two
//! concurrent executes on the same case serialize on the row lock; the
//! loser re-decides from the post-transition status and fails
//! `InvalidTransition` if its move is no longer legal. Unrelated cases
//! are never blocked.

use chrono::Utc;
use serde_json::json;

use crate::db::cases;
use crate::error::{Error, Result};
use crate::model::*;
use crate::telemetry::metrics;
use crate::tenancy::Scope;
use crate::transitions::{self, Transition};
use opentelemetry::KeyValue;

impl super::CaseEngine {
    /// Apply one status transition.
    ///
    /// Lookup failures, role checks, and the reason requirement all
    /// abort before any mutation. Side effects fire after commit, in
    /// table order, best-effort.
    #[tracing::instrument(skip(self, scope, reason), fields(scope = %scope, case = %case_id, to = %target))]
    pub async fn execute(
        &self,
        scope: &Scope,
        case_id: CaseId,
        target: CaseStatus,
        actor_role: Role,
        actor_id: UserId,
        reason: Option<&str>,
    ) -> Result<Case> {
        let mut tx = self.db().pool().begin().await?;

        // Exclusive row lock; the status below is the locked row's.
        let case = cases::fetch_case_for_update(&mut tx, scope, case_id).await?;
        let entry = transitions::find_transition(case.status, target, actor_role)?;

        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        if entry.requires_reason && reason.is_none() {
            return Err(Error::Validation(format!(
                "transition {} -> {} requires a reason",
                case.status, target
            )));
        }

        let now = Utc::now();
        let completed_at = target.is_terminal().then_some(now);
        let submitted_at =
            (case.status == CaseStatus::Draft && target == CaseStatus::Submitted).then_some(now);

        sqlx::query(
            "UPDATE cases SET status = $1, updated_at = $2,
                completed_at = COALESCE($3, completed_at),
                submitted_at = COALESCE($4, submitted_at)
             WHERE id = $5 AND ($6::uuid IS NULL OR tenant_id = $6)",
        )
        .bind(target.to_string())
        .bind(now)
        .bind(completed_at)
        .bind(submitted_at)
        .bind(case_id.0)
        .bind(scope.tenant_uuid())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        metrics::case_transitions().add(
            1,
            &[
                KeyValue::new("from", case.status.to_string()),
                KeyValue::new("to", target.to_string()),
            ],
        );
        tracing::info!(from = %case.status, to = %target, role = %actor_role, "case transitioned");

        // Post-commit, outside any transaction. Payloads carry the
        // tenant explicitly; listeners must not assume ambient scope.
        let payload = json!({
            "case_id": case.id.0,
            "tenant_id": case.tenant_id.0,
            "case_number": case.case_number,
            "from": case.status,
            "to": target,
            "actor_id": actor_id.0,
            "actor_role": actor_role,
            "reason": reason,
        });
        for effect in entry.side_effects {
            self.dispatch(effect.event_name(), payload.clone());
        }

        self.db().get_case(scope, case_id).await
    }

    /// Transitions the actor could take from the case's current status.
    /// Read-only; drives UI affordances.
    pub async fn available_actions(
        &self,
        scope: &Scope,
        case_id: CaseId,
        actor_role: Role,
    ) -> Result<Vec<&'static Transition>> {
        let case = self.db().get_case(scope, case_id).await?;
        Ok(transitions::available_transitions(case.status, actor_role))
    }
}
