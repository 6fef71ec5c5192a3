//! 内存存储实现（feature = "memory"）
//!
//! 以 `DashMap` 按聚合 ID 分片保存事件日志与快照：比较并追加在单个条目的写锁内完成，
//! 不同聚合之间不共享全局锁。适用于测试、演示与单进程场景。
//!
use crate::{
    error::{DomainError, DomainResult as Result},
    persist::{
        EventStore, EventStream, SerializedEvent, SerializedSnapshot, SnapshotStore,
        event_store::ensure_contiguous,
    },
    value_object::Version,
};
use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use futures_util::{StreamExt, stream};
use std::sync::Arc;

/// 内存事件存储；克隆后共享同一份数据
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventStore {
    streams: Arc<DashMap<String, Vec<SerializedEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 该聚合已持久化的事件数
    pub fn len(&self, aggregate_id: &str) -> usize {
        self.streams
            .get(aggregate_id)
            .map(|log| log.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self, aggregate_id: &str) -> bool {
        self.len(aggregate_id) == 0
    }

    /// 当前保存事件日志的聚合数
    pub fn aggregate_count(&self) -> usize {
        self.streams.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        aggregate_id: &str,
        expected_version: Version,
        events: Vec<SerializedEvent>,
    ) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        ensure_contiguous(aggregate_id, expected_version, &events)?;

        // 条目写锁覆盖“读取最后版本 → 比较 → 追加”整个过程；
        // 冲突时不为未知聚合留下空条目
        let conflict = |actual: Version| DomainError::ConcurrencyConflict {
            aggregate_id: aggregate_id.to_string(),
            expected: expected_version,
            actual,
        };

        match self.streams.entry(aggregate_id.to_string()) {
            Entry::Occupied(mut log) => {
                let actual = log
                    .get()
                    .last()
                    .map(SerializedEvent::aggregate_version)
                    .unwrap_or_default();
                if actual != expected_version {
                    return Err(conflict(actual));
                }
                log.get_mut().extend(events);
            }
            Entry::Vacant(slot) => {
                if !expected_version.is_new() {
                    return Err(conflict(Version::new()));
                }
                slot.insert(events);
            }
        }
        Ok(())
    }

    fn read_from<'a>(&'a self, aggregate_id: &str, from_version: Version) -> EventStream<'a> {
        let streams = Arc::clone(&self.streams);
        let aggregate_id = aggregate_id.to_string();

        // 首次轮询时才读取存储
        stream::once(async move {
            streams
                .get(&aggregate_id)
                .map(|log| {
                    log.iter()
                        .filter(|event| event.aggregate_version() >= from_version)
                        .cloned()
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        })
        .flat_map(|events| stream::iter(events.into_iter().map(Ok)))
        .boxed()
    }

    async fn last_version(&self, aggregate_id: &str) -> Result<Version> {
        Ok(self
            .streams
            .get(aggregate_id)
            .and_then(|log| log.last().map(SerializedEvent::aggregate_version))
            .unwrap_or_default())
    }
}

/// 内存快照存储；每个聚合只保留最新一份
#[derive(Debug, Default, Clone)]
pub struct InMemorySnapshotStore {
    snapshots: Arc<DashMap<String, SerializedSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn get_latest(&self, aggregate_id: &str) -> Result<Option<SerializedSnapshot>> {
        Ok(self
            .snapshots
            .get(aggregate_id)
            .map(|snapshot| snapshot.clone()))
    }

    async fn save(&self, snapshot: SerializedSnapshot) -> Result<()> {
        self.snapshots
            .insert(snapshot.aggregate_id().to_string(), snapshot);
        Ok(())
    }

    async fn latest_version(&self, aggregate_id: &str) -> Result<Option<Version>> {
        Ok(self
            .snapshots
            .get(aggregate_id)
            .map(|snapshot| snapshot.version()))
    }
}
