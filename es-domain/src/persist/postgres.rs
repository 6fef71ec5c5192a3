//! `PostgreSQL` 存储实现（feature = "infra-sqlx"）
//!
//! - `es_events`：`UNIQUE (aggregate_id, aggregate_version)`，追加在事务内完成，
//!   并以按聚合 ID 计算的事务级 advisory lock 串行化同一聚合的并发追加；
//! - `es_snapshots`：每个聚合一行，`ON CONFLICT` 原子覆盖。
//!
//! 表结构见 `migrations/`，可通过 [`migrate`] 应用。
//!
use crate::{
    error::{DomainError, DomainResult as Result},
    persist::{EventStore, EventStream, SerializedEvent, SerializedSnapshot, SnapshotStore},
    value_object::Version,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{StreamExt, stream};
use sqlx::PgPool;
use uuid::Uuid;

/// 应用内置迁移
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|err| DomainError::Database {
            reason: err.to_string(),
        })
}

fn to_db_version(version: Version) -> Result<i64> {
    i64::try_from(version.value()).map_err(|err| DomainError::EventStore {
        reason: format!("version {version} out of range: {err}"),
    })
}

fn from_db_version(value: i64) -> Result<Version> {
    usize::try_from(value)
        .map(Version::from_value)
        .map_err(|err| DomainError::EventStore {
            reason: format!("stored version {value} out of range: {err}"),
        })
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    event_id: Uuid,
    event_type: String,
    event_version: i32,
    aggregate_id: String,
    aggregate_type: String,
    aggregate_version: i64,
    occurred_at: DateTime<Utc>,
    payload: Vec<u8>,
}

impl EventRow {
    fn into_event(self) -> Result<SerializedEvent> {
        let event_version =
            usize::try_from(self.event_version).map_err(|err| DomainError::EventStore {
                reason: format!("stored event_version {} invalid: {err}", self.event_version),
            })?;

        Ok(SerializedEvent::builder()
            .event_id(self.event_id)
            .event_type(self.event_type)
            .event_version(event_version)
            .aggregate_id(self.aggregate_id)
            .aggregate_type(self.aggregate_type)
            .aggregate_version(from_db_version(self.aggregate_version)?)
            .occurred_at(self.occurred_at)
            .payload(self.payload)
            .build())
    }
}

/// PostgreSQL-backed event store.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(
        &self,
        aggregate_id: &str,
        expected_version: Version,
        events: Vec<SerializedEvent>,
    ) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        crate::persist::event_store::ensure_contiguous(aggregate_id, expected_version, &events)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(aggregate_id)
            .execute(&mut *tx)
            .await?;

        let actual: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(aggregate_version) FROM es_events WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_one(&mut *tx)
        .await?;
        let actual = from_db_version(actual.unwrap_or(0))?;

        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: aggregate_id.to_string(),
                expected: expected_version,
                actual,
            });
        }

        for event in &events {
            let event_version =
                i32::try_from(event.event_version()).map_err(|err| DomainError::EventStore {
                    reason: format!("event_version out of range: {err}"),
                })?;

            sqlx::query(
                r"INSERT INTO es_events
                  (event_id, event_type, event_version, aggregate_id, aggregate_type,
                   aggregate_version, occurred_at, payload)
                  VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(event.event_id())
            .bind(event.event_type())
            .bind(event_version)
            .bind(event.aggregate_id())
            .bind(event.aggregate_type())
            .bind(to_db_version(event.aggregate_version())?)
            .bind(event.occurred_at())
            .bind(event.payload())
            .execute(&mut *tx)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    DomainError::ConcurrencyConflict {
                        aggregate_id: aggregate_id.to_string(),
                        expected: expected_version,
                        actual: event.aggregate_version(),
                    }
                }
                other => DomainError::from(other),
            })?;
        }

        tx.commit().await?;

        tracing::debug!(aggregate_id, count = events.len(), "appended events");
        Ok(())
    }

    fn read_from<'a>(&'a self, aggregate_id: &str, from_version: Version) -> EventStream<'a> {
        let from = match to_db_version(from_version) {
            Ok(from) => from,
            Err(err) => return stream::once(async move { Err(err) }).boxed(),
        };

        sqlx::query_as::<_, EventRow>(
            r"SELECT event_id, event_type, event_version, aggregate_id, aggregate_type,
                     aggregate_version, occurred_at, payload
              FROM es_events
              WHERE aggregate_id = $1 AND aggregate_version >= $2
              ORDER BY aggregate_version ASC",
        )
        .bind(aggregate_id.to_string())
        .bind(from)
        .fetch(&self.pool)
        .map(|row| row.map_err(DomainError::from).and_then(EventRow::into_event))
        .boxed()
    }

    async fn last_version(&self, aggregate_id: &str) -> Result<Version> {
        let actual: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(aggregate_version) FROM es_events WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_one(&self.pool)
        .await?;
        from_db_version(actual.unwrap_or(0))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    aggregate_id: String,
    aggregate_type: String,
    version: i64,
    state: Vec<u8>,
    taken_at: DateTime<Utc>,
}

/// PostgreSQL-backed snapshot store.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn get_latest(&self, aggregate_id: &str) -> Result<Option<SerializedSnapshot>> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            r"SELECT aggregate_id, aggregate_type, version, state, taken_at
              FROM es_snapshots
              WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(SerializedSnapshot::builder()
                .aggregate_id(row.aggregate_id)
                .aggregate_type(row.aggregate_type)
                .version(from_db_version(row.version)?)
                .state(row.state)
                .taken_at(row.taken_at)
                .build())
        })
        .transpose()
    }

    async fn save(&self, snapshot: SerializedSnapshot) -> Result<()> {
        sqlx::query(
            r"INSERT INTO es_snapshots (aggregate_id, aggregate_type, version, state, taken_at)
              VALUES ($1, $2, $3, $4, $5)
              ON CONFLICT (aggregate_id) DO UPDATE SET
                aggregate_type = EXCLUDED.aggregate_type,
                version = EXCLUDED.version,
                state = EXCLUDED.state,
                taken_at = EXCLUDED.taken_at",
        )
        .bind(snapshot.aggregate_id())
        .bind(snapshot.aggregate_type())
        .bind(to_db_version(snapshot.version())?)
        .bind(snapshot.state())
        .bind(snapshot.taken_at())
        .execute(&self.pool)
        .await
        .map_err(|err| DomainError::SnapshotStore {
            reason: err.to_string(),
        })?;

        tracing::debug!(
            aggregate_id = snapshot.aggregate_id(),
            version = %snapshot.version(),
            "saved snapshot"
        );
        Ok(())
    }

    async fn latest_version(&self, aggregate_id: &str) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM es_snapshots WHERE aggregate_id = $1")
                .bind(aggregate_id)
                .fetch_optional(&self.pool)
                .await?;
        version.map(from_db_version).transpose()
    }
}
