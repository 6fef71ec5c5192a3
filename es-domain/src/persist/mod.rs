//! 持久化与事件溯源（persist）
//!
//! 定义事件存储、快照存储及其通用组合实现，支持：
//! - 事件按聚合只追加、以期望版本做乐观并发控制（`EventStore`）；
//! - 快照读写与频率策略（`SnapshotStore`/`SnapshotPolicy`/`SnapshotStoreWithPolicy`）；
//! - 事件与快照的持久化形态（`SerializedEvent`/`SerializedSnapshot`）；
//! - 事件 + 快照的聚合仓储实现（`EventSourcedRepository`）。
//!
//! 存储后端以 feature 形式提供：`memory`（内存）与 `infra-sqlx`（Postgres）。
//!
pub mod event_store;
mod repository;
mod serialized_event;
mod serialized_snapshot;
mod snapshot_store;

#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "infra-sqlx")]
pub mod postgres;

pub use event_store::{EventStore, EventStream};
pub use repository::{AggregateRepository, EventSourcedRepository};
pub use serialized_event::{SerializedEvent, serialize_events};
pub use serialized_snapshot::SerializedSnapshot;
pub use snapshot_store::{SnapshotPolicy, SnapshotStore, SnapshotStoreWithPolicy};

#[cfg(feature = "memory")]
pub use memory::{InMemoryEventStore, InMemorySnapshotStore};
#[cfg(feature = "infra-sqlx")]
pub use postgres::{PgEventStore, PgSnapshotStore};
