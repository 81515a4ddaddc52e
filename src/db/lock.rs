//! Key-based mutual exclusion with TTL, backed by the `case_locks`
//! table.
//!
//! `try_acquire` is a single atomic statement: insert the key, or take
//! over a row whose lease has expired. A live lease belonging to someone
//! else yields `None` — competitors are skipped, not queued. The TTL is
//! the safety net against a crashed holder; holders with a long critical
//! section should `renew` before their final write.

use uuid::Uuid;

use crate::error::Result;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;

/// A held lease. The holder token ties renew/release to this
/// acquisition, so a later holder of the same key is unaffected by a
/// stale release.
#[derive(Debug, Clone)]
pub struct Lease {
    pub key: String,
    pub holder: Uuid,
}

impl super::Db {
    /// Try to acquire the lock for `key` with the given TTL. Returns
    /// `None` without waiting if another holder's lease is still live.
    pub async fn try_acquire_lock(&self, key: &str, ttl_seconds: f64) -> Result<Option<Lease>> {
        let holder = Uuid::new_v4();

        let row: Option<(Uuid,)> = sqlx::query_as(
            "INSERT INTO case_locks (key, holder, acquired_at, expires_at)
             VALUES ($1, $2, now(), now() + make_interval(secs => $3))
             ON CONFLICT (key) DO UPDATE SET
                holder = EXCLUDED.holder,
                acquired_at = EXCLUDED.acquired_at,
                expires_at = EXCLUDED.expires_at
             WHERE case_locks.expires_at < now()
             RETURNING holder",
        )
        .bind(key)
        .bind(holder)
        .bind(ttl_seconds)
        .fetch_optional(self.pool())
        .await?;

        let acquired = row.is_some();
        metrics::lock_acquisitions().add(
            1,
            &[KeyValue::new(
                "result",
                if acquired { "acquired" } else { "skipped" },
            )],
        );

        Ok(row.map(|_| Lease {
            key: key.to_string(),
            holder,
        }))
    }

    /// Extend the lease. A no-op if the lease was lost to expiry — the
    /// caller finds out via the returned flag.
    pub async fn renew_lock(&self, lease: &Lease, ttl_seconds: f64) -> Result<bool> {
        let rows = sqlx::query(
            "UPDATE case_locks SET expires_at = now() + make_interval(secs => $1)
             WHERE key = $2 AND holder = $3",
        )
        .bind(ttl_seconds)
        .bind(&lease.key)
        .bind(lease.holder)
        .execute(self.pool())
        .await?
        .rows_affected();

        Ok(rows > 0)
    }

    /// Release the lease. Deleting nothing is fine: the lease may have
    /// expired and been reclaimed, in which case it is not ours to drop.
    pub async fn release_lock(&self, lease: &Lease) -> Result<()> {
        sqlx::query("DELETE FROM case_locks WHERE key = $1 AND holder = $2")
            .bind(&lease.key)
            .bind(lease.holder)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
