//! Snapshot Store: a single durable document per logical store, `read()`
//! returning a deep clone and `mutate(fn)` installing a new version under
//! serialized access.
//!
//! Uses a singleton-row upsert (`on conflict (sentinel_id) do update`)
//! inside a `BEGIN`/`SELECT ... FOR UPDATE`/`COMMIT` transaction, one row
//! per store instead of a single shared row.

use std::marker::PhantomData;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;

/// A boxed mutator: takes ownership of a fresh parsed working copy of the
/// state and returns the new state plus an opaque result value. Mutators
/// must be deterministic on the input and idempotent on retry, since they
/// always receive a freshly parsed copy.
pub type MutateFn<S> =
    Box<dyn FnOnce(S) -> BoxFuture<'static, Result<(S, serde_json::Value)>> + Send>;

#[async_trait]
pub trait SnapshotStore<S>: Send + Sync
where
    S: Clone + Send + Sync + Serialize + DeserializeOwned + Default + 'static,
{
    async fn read(&self) -> Result<S>;

    /// Runs `f` against a working copy under a serializable transaction (or
    /// the in-memory mutex) and atomically installs the result, bumping the
    /// version counter. The opaque `serde_json::Value` result should be
    /// deserialized by the caller into whatever typed outcome the specific
    /// mutation produces.
    async fn mutate(&self, f: MutateFn<S>) -> Result<serde_json::Value>;
}

struct VersionedState<S> {
    state: S,
    version: u64,
}

/// Mutex-protected in-memory backend.
pub struct InMemorySnapshotStore<S> {
    inner: tokio::sync::Mutex<VersionedState<S>>,
}

impl<S: Clone + Default> InMemorySnapshotStore<S> {
    pub fn new() -> Self {
        Self {
            inner: tokio::sync::Mutex::new(VersionedState {
                state: S::default(),
                version: 0,
            }),
        }
    }

    pub async fn version(&self) -> u64 {
        self.inner.lock().await.version
    }
}

impl<S: Clone + Default> Default for InMemorySnapshotStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> SnapshotStore<S> for InMemorySnapshotStore<S>
where
    S: Clone + Send + Sync + Serialize + DeserializeOwned + Default + 'static,
{
    async fn read(&self) -> Result<S> {
        Ok(self.inner.lock().await.state.clone())
    }

    async fn mutate(&self, f: MutateFn<S>) -> Result<serde_json::Value> {
        let mut guard = self.inner.lock().await;
        let working = guard.state.clone();
        let (new_state, result) = f(working).await?;
        guard.state = new_state;
        guard.version += 1;
        Ok(result)
    }
}

/// Single-row Postgres backend. `table` must be a fixed, compile-time
/// identifier (`rrs_job_state_snapshots` or `rrs_plan_state_snapshots`) —
/// never caller/request-supplied — since it is interpolated directly into
/// the SQL text (Postgres has no bind-parameter form for identifiers).
pub struct PgSnapshotStore<S> {
    pool: PgPool,
    table: &'static str,
    _marker: PhantomData<S>,
}

impl<S> PgSnapshotStore<S>
where
    S: Serialize + DeserializeOwned + Default,
{
    pub fn new(pool: PgPool, table: &'static str) -> Self {
        Self {
            pool,
            table,
            _marker: PhantomData,
        }
    }

    async fn ensure_row(&self) -> Result<()> {
        let default_json = serde_json::to_string(&S::default()).context("default state serialize failed")?;
        let query = format!(
            "insert into {} (snapshot_id, version, state_json, updated_at) \
             values (1, 0, $1, now()::text) on conflict (snapshot_id) do nothing",
            self.table
        );
        sqlx::query(&query)
            .bind(default_json)
            .execute(&self.pool)
            .await
            .context("ensure_row failed")?;
        Ok(())
    }
}

#[async_trait]
impl<S> SnapshotStore<S> for PgSnapshotStore<S>
where
    S: Clone + Send + Sync + Serialize + DeserializeOwned + Default + 'static,
{
    async fn read(&self) -> Result<S> {
        self.ensure_row().await?;
        let query = format!("select state_json from {} where snapshot_id = 1", self.table);
        let (state_json,): (String,) = sqlx::query_as(&query)
            .fetch_one(&self.pool)
            .await
            .context("read snapshot failed")?;
        serde_json::from_str(&state_json).context("state deserialize failed")
    }

    async fn mutate(&self, f: MutateFn<S>) -> Result<serde_json::Value> {
        self.ensure_row().await?;
        let mut tx = self.pool.begin().await.context("begin tx failed")?;

        let select_query = format!(
            "select version, state_json from {} where snapshot_id = 1 for update",
            self.table
        );
        let (version, state_json): (i64, String) = sqlx::query_as(&select_query)
            .fetch_one(&mut *tx)
            .await
            .context("select for update failed")?;

        let state: S = serde_json::from_str(&state_json).context("state deserialize failed")?;
        let (new_state, result) = f(state).await?;
        let new_json = serde_json::to_string(&new_state).context("state serialize failed")?;

        let update_query = format!(
            "update {} set version = $1, state_json = $2, updated_at = now()::text where snapshot_id = 1",
            self.table
        );
        sqlx::query(&update_query)
            .bind(version + 1)
            .bind(new_json)
            .execute(&mut *tx)
            .await
            .context("update snapshot failed")?;

        tx.commit().await.context("commit tx failed")?;
        Ok(result)
    }
}

pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
    struct Counter {
        value: i64,
    }

    #[tokio::test]
    async fn read_returns_default_before_any_mutate() {
        let store = InMemorySnapshotStore::<Counter>::new();
        assert_eq!(store.read().await.unwrap(), Counter { value: 0 });
    }

    #[tokio::test]
    async fn mutate_bumps_version_and_installs_new_state() {
        let store = InMemorySnapshotStore::<Counter>::new();
        let result = store
            .mutate(Box::new(|mut state: Counter| {
                Box::pin(async move {
                    state.value += 5;
                    Ok((state, serde_json::json!({ "added": 5 })))
                })
            }))
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({ "added": 5 }));
        assert_eq!(store.read().await.unwrap(), Counter { value: 5 });
        assert_eq!(store.version().await, 1);
    }

    #[tokio::test]
    async fn failed_mutate_does_not_advance_version() {
        let store = InMemorySnapshotStore::<Counter>::new();
        let err = store
            .mutate(Box::new(|_state: Counter| {
                Box::pin(async move { Err(anyhow::anyhow!("boom")) })
            }))
            .await;
        assert!(err.is_err());
        assert_eq!(store.version().await, 0);
        assert_eq!(store.read().await.unwrap(), Counter { value: 0 });
    }
}
