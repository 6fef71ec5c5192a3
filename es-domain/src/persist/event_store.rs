//! 事件存储协议
//!
//! 每个聚合一条只追加的事件日志：
//! - `append` 以期望版本做比较并追加（同一聚合内互斥、原子，全有或全无）；
//! - `read_from` 返回自某版本起的升序事件流，惰性、有限、可重新发起。
//!
use crate::{
    error::{DomainError, DomainResult as Result},
    persist::SerializedEvent,
    value_object::Version,
};
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::TryStreamExt;
use std::sync::Arc;

/// 有序事件流；每次调用 `read_from` 都重新读取存储，不共享游标
pub type EventStream<'a> = BoxStream<'a, Result<SerializedEvent>>;

#[async_trait]
pub trait EventStore: Send + Sync {
    /// 仅当存储中的最后版本等于 `expected_version` 时追加，
    /// 事件版本必须依次为 `expected_version + 1 ..= expected_version + len`。
    async fn append(
        &self,
        aggregate_id: &str,
        expected_version: Version,
        events: Vec<SerializedEvent>,
    ) -> Result<()>;

    /// 读取版本号不小于 `from_version` 的事件；聚合不存在时为空流
    fn read_from<'a>(&'a self, aggregate_id: &str, from_version: Version) -> EventStream<'a>;

    /// 存储中该聚合的最后版本（无事件时为 0）
    async fn last_version(&self, aggregate_id: &str) -> Result<Version> {
        let events: Vec<SerializedEvent> = self
            .read_from(aggregate_id, Version::new())
            .try_collect()
            .await?;
        Ok(events
            .last()
            .map(SerializedEvent::aggregate_version)
            .unwrap_or_default())
    }
}

#[async_trait]
impl<T> EventStore for Arc<T>
where
    T: EventStore + ?Sized,
{
    async fn append(
        &self,
        aggregate_id: &str,
        expected_version: Version,
        events: Vec<SerializedEvent>,
    ) -> Result<()> {
        (**self).append(aggregate_id, expected_version, events).await
    }

    fn read_from<'a>(&'a self, aggregate_id: &str, from_version: Version) -> EventStream<'a> {
        (**self).read_from(aggregate_id, from_version)
    }

    async fn last_version(&self, aggregate_id: &str) -> Result<Version> {
        (**self).last_version(aggregate_id).await
    }
}

/// 校验待追加批次：归属同一聚合，且版本自 `expected_version + 1` 起连续
pub fn ensure_contiguous(
    aggregate_id: &str,
    expected_version: Version,
    events: &[SerializedEvent],
) -> Result<()> {
    let mut next = expected_version.next();
    for event in events {
        if event.aggregate_id() != aggregate_id {
            return Err(DomainError::EventStore {
                reason: format!(
                    "event {} belongs to aggregate {}, not {aggregate_id}",
                    event.event_id(),
                    event.aggregate_id()
                ),
            });
        }
        if event.aggregate_version() != next {
            return Err(DomainError::EventStore {
                reason: format!(
                    "non-contiguous batch for {aggregate_id}: expected {next}, got {}",
                    event.aggregate_version()
                ),
            });
        }
        next = next.next();
    }
    Ok(())
}
