//! Assignment engine: best-fit worker selection under a TTL lock.
//!
//! No database row lock spans the candidate read, scoring, and write —
//! the critical section is multi-row and compute-heavy, so the TTL
//! lease bounds it instead. A second caller finding the lease held is
//! skipped immediately (at-most-one-in-flight), not queued.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::time::Instant;

use crate::error::Result;
use crate::model::*;
use crate::telemetry::metrics;
use crate::tenancy::Scope;
use opentelemetry::KeyValue;

pub const WEIGHT_SPECIALIZATION: f64 = 0.40;
pub const WEIGHT_WORKLOAD: f64 = 0.30;
pub const WEIGHT_RECENCY: f64 = 0.15;
pub const WEIGHT_CLIENT_HISTORY: f64 = 0.15;

/// Full recency credit accrues over this many hours without an
/// assignment.
const RECENCY_WINDOW_HOURS: f64 = 48.0;

/// Full client-history credit at this many prior completed cases for
/// the same organization.
const HISTORY_SATURATION: f64 = 3.0;

/// A candidate with its computed score.
#[derive(Debug)]
pub struct ScoredCandidate {
    pub profile: WorkerProfile,
    pub score: f64,
}

/// Weighted score for one candidate. Deterministic for fixed inputs.
pub fn score_candidate(
    service_category: &str,
    profile: &WorkerProfile,
    completed_for_org: i64,
    now: DateTime<Utc>,
) -> f64 {
    let specialization = if profile.specializations.iter().any(|s| s == service_category) {
        1.0
    } else {
        0.0
    };

    // max(0, 1 - active/max); workload_ratio clamps both ends.
    let workload = 1.0 - profile.workload_ratio();

    let recency = match profile.last_assigned_at {
        // Never assigned: full credit.
        None => 1.0,
        Some(t) => {
            let hours = (now - t).num_seconds().max(0) as f64 / 3600.0;
            (hours / RECENCY_WINDOW_HOURS).min(1.0)
        }
    };

    let history = (completed_for_org as f64 / HISTORY_SATURATION).min(1.0);

    WEIGHT_SPECIALIZATION * specialization
        + WEIGHT_WORKLOAD * workload
        + WEIGHT_RECENCY * recency
        + WEIGHT_CLIENT_HISTORY * history
}

/// Pick the winner: highest score, ties broken by lower workload ratio,
/// then lower worker id. Fully deterministic regardless of candidate
/// order.
pub fn select_best(mut scored: Vec<ScoredCandidate>) -> Option<ScoredCandidate> {
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.profile.workload_ratio().total_cmp(&b.profile.workload_ratio()))
            .then_with(|| a.profile.id.cmp(&b.profile.id))
    });
    scored.into_iter().next()
}

impl super::CaseEngine {
    /// Assign the best-fit worker to a case, or `None` when no candidate
    /// exists or another assignment for the case is already in flight.
    #[tracing::instrument(skip(self, scope), fields(scope = %scope, case = %case_id))]
    pub async fn auto_assign(&self, scope: &Scope, case_id: CaseId) -> Result<Option<WorkerId>> {
        let key = format!("case-assign:{}", case_id.0);
        let ttl = self.config.assign_lock_ttl_seconds;

        let Some(lease) = self.db().try_acquire_lock(&key, ttl).await? else {
            tracing::info!("assignment already in flight, skipping");
            metrics::assignments().add(1, &[KeyValue::new("result", "skipped")]);
            return Ok(None);
        };

        let result = self.assign_under_lease(scope, case_id, &lease).await;

        // Release on every path, error paths included. Failing to
        // release just leaves the lease to expire.
        if let Err(e) = self.db().release_lock(&lease).await {
            tracing::warn!(key = %lease.key, error = %e, "lock release failed; lease will expire");
        }

        result
    }

    async fn assign_under_lease(
        &self,
        scope: &Scope,
        case_id: CaseId,
        lease: &crate::db::lock::Lease,
    ) -> Result<Option<WorkerId>> {
        let case = self.db().get_case(scope, case_id).await?;
        let candidates = self
            .db()
            .list_candidates(scope, &case.service_category)
            .await?;

        if candidates.is_empty() {
            tracing::info!(category = %case.service_category, "no assignment candidates");
            metrics::assignments().add(1, &[KeyValue::new("result", "no_candidates")]);
            return Ok(None);
        }

        let started = Instant::now();
        let now = Utc::now();
        let mut scored = Vec::with_capacity(candidates.len());
        for profile in candidates {
            let history = self
                .db()
                .completed_for_org(scope, profile.id, case.organization_id)
                .await?;
            let score = score_candidate(&case.service_category, &profile, history, now);
            scored.push(ScoredCandidate { profile, score });
        }
        metrics::scoring_duration_ms().record(started.elapsed().as_secs_f64() * 1000.0, &[]);

        let winner = match select_best(scored) {
            Some(w) => w,
            None => return Ok(None),
        };

        // Per-candidate history lookups can run long; extend the lease
        // before the write instead of trusting the original TTL. A lost
        // lease means another caller may be past the guard, so stand
        // down without writing.
        if !self.db().renew_lock(lease, self.config.assign_lock_ttl_seconds).await? {
            tracing::warn!(key = %lease.key, "lease expired during scoring; aborting assignment");
            metrics::assignments().add(1, &[KeyValue::new("result", "skipped")]);
            return Ok(None);
        }

        sqlx::query(
            "UPDATE cases SET assigned_worker_id = $1, updated_at = now()
             WHERE id = $2 AND ($3::uuid IS NULL OR tenant_id = $3)",
        )
        .bind(winner.profile.id.0)
        .bind(case_id.0)
        .bind(scope.tenant_uuid())
        .execute(self.db().pool())
        .await?;

        self.db().touch_last_assigned(scope, winner.profile.id).await?;

        metrics::assignments().add(1, &[KeyValue::new("result", "assigned")]);
        tracing::info!(worker = %winner.profile.id, score = winner.score, "case auto-assigned");

        self.dispatch(
            "case.assigned",
            json!({
                "case_id": case.id.0,
                "tenant_id": case.tenant_id.0,
                "case_number": case.case_number,
                "worker_id": winner.profile.id.0,
                "score": winner.score,
                "assignment": "auto",
            }),
        );

        Ok(Some(winner.profile.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn worker(active: i32, max: i32, last_assigned_hours_ago: Option<i64>) -> WorkerProfile {
        let now = Utc::now();
        WorkerProfile {
            id: WorkerId::new(),
            user_id: UserId::new(),
            tenant_id: TenantId::new(),
            specializations: vec!["tax".to_string()],
            max_capacity: max,
            active_count: active,
            available: true,
            last_assigned_at: last_assigned_hours_ago.map(|h| now - Duration::hours(h)),
        }
    }

    #[test]
    fn idle_specialist_scores_full_marks() {
        let w = worker(0, 10, None);
        let score = score_candidate("tax", &w, 10, Utc::now());
        assert!((score - 1.0).abs() < 1e-9, "score = {score}");
    }

    #[test]
    fn scoring_is_deterministic() {
        let w = worker(5, 10, Some(24));
        let now = Utc::now();
        let a = score_candidate("tax", &w, 1, now);
        let b = score_candidate("tax", &w, 1, now);
        assert_eq!(a, b);
    }

    #[test]
    fn workload_term_floors_at_zero() {
        let over = worker(15, 10, None);
        let idle = worker(0, 10, None);
        let now = Utc::now();
        let over_score = score_candidate("tax", &over, 0, now);
        let idle_score = score_candidate("tax", &idle, 0, now);
        assert!((idle_score - over_score - WEIGHT_WORKLOAD).abs() < 1e-9);
    }

    #[test]
    fn never_assigned_gets_full_recency_credit() {
        let fresh = worker(0, 10, None);
        let recent = worker(0, 10, Some(0));
        let now = Utc::now();
        let fresh_score = score_candidate("tax", &fresh, 0, now);
        let recent_score = score_candidate("tax", &recent, 0, now);
        assert!(fresh_score > recent_score);
        assert!((fresh_score - recent_score - WEIGHT_RECENCY).abs() < 1e-6);
    }

    #[test]
    fn recency_saturates_at_window() {
        let old = worker(0, 10, Some(200));
        let fresh = worker(0, 10, None);
        let now = Utc::now();
        assert_eq!(
            score_candidate("tax", &old, 0, now),
            score_candidate("tax", &fresh, 0, now)
        );
    }

    #[test]
    fn client_history_saturates_at_three() {
        let w = worker(0, 10, None);
        let now = Utc::now();
        assert_eq!(
            score_candidate("tax", &w, 3, now),
            score_candidate("tax", &w, 30, now)
        );
        let none = score_candidate("tax", &w, 0, now);
        let one = score_candidate("tax", &w, 1, now);
        assert!((one - none - WEIGHT_CLIENT_HISTORY / 3.0).abs() < 1e-9);
    }

    #[test]
    fn highest_score_wins() {
        let busy = worker(9, 10, Some(1));
        let idle = worker(0, 10, None);
        let idle_id = idle.id;
        let now = Utc::now();
        let scored = vec![
            ScoredCandidate {
                score: score_candidate("tax", &busy, 0, now),
                profile: busy,
            },
            ScoredCandidate {
                score: score_candidate("tax", &idle, 0, now),
                profile: idle,
            },
        ];
        assert_eq!(select_best(scored).unwrap().profile.id, idle_id);
    }

    #[test]
    fn ties_break_on_workload_then_id() {
        let mut a = worker(2, 10, None);
        let mut b = worker(4, 10, None);
        // Same score, different workloads.
        a.id = WorkerId::new();
        b.id = WorkerId::new();
        let a_id = a.id;
        let scored = vec![
            ScoredCandidate {
                profile: b,
                score: 0.5,
            },
            ScoredCandidate {
                profile: a,
                score: 0.5,
            },
        ];
        assert_eq!(select_best(scored).unwrap().profile.id, a_id);

        // Same score and workload: lowest id wins, regardless of order.
        let mut c = worker(2, 10, None);
        let mut d = worker(2, 10, None);
        c.id = WorkerId(uuid::Uuid::from_u128(1));
        d.id = WorkerId(uuid::Uuid::from_u128(2));
        let scored = vec![
            ScoredCandidate {
                profile: d,
                score: 0.5,
            },
            ScoredCandidate {
                profile: c,
                score: 0.5,
            },
        ];
        assert_eq!(
            select_best(scored).unwrap().profile.id,
            WorkerId(uuid::Uuid::from_u128(1))
        );
    }

    #[test]
    fn empty_candidate_set_selects_nothing() {
        assert!(select_best(Vec::new()).is_none());
    }
}
