//! 快照存储协议与策略
//!
//! 定义快照读写接口与快照频率策略（按版本间隔）。
//! 策略在构造时通过 `SnapshotStoreWithPolicy` 附加到存储上，由仓储在每次保存时读取。
//!
use crate::{error::DomainResult as Result, persist::SerializedSnapshot, value_object::Version};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// 最近一次快照；从未快照过时返回 `None`
    async fn get_latest(&self, aggregate_id: &str) -> Result<Option<SerializedSnapshot>>;

    /// 保存为该聚合的最新快照，原子地取代旧快照
    async fn save(&self, snapshot: SerializedSnapshot) -> Result<()>;

    /// 最近一次快照的版本；后端可覆写以避免读取完整状态
    async fn latest_version(&self, aggregate_id: &str) -> Result<Option<Version>> {
        Ok(self
            .get_latest(aggregate_id)
            .await?
            .map(|snapshot| snapshot.version()))
    }

    /// 快照频率策略
    fn policy(&self) -> SnapshotPolicy {
        SnapshotPolicy::Never
    }
}

#[async_trait]
impl<T> SnapshotStore for Arc<T>
where
    T: SnapshotStore + ?Sized,
{
    async fn get_latest(&self, aggregate_id: &str) -> Result<Option<SerializedSnapshot>> {
        (**self).get_latest(aggregate_id).await
    }

    async fn save(&self, snapshot: SerializedSnapshot) -> Result<()> {
        (**self).save(snapshot).await
    }

    async fn latest_version(&self, aggregate_id: &str) -> Result<Option<Version>> {
        (**self).latest_version(aggregate_id).await
    }

    fn policy(&self) -> SnapshotPolicy {
        (**self).policy()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotPolicy {
    #[default]
    Never,
    Every(usize),
}

impl SnapshotPolicy {
    /// 由快照频率构建策略：`frequency <= 0` 关闭快照
    pub fn from_frequency(frequency: i64) -> Self {
        match usize::try_from(frequency) {
            Ok(0) | Err(_) => SnapshotPolicy::Never,
            Ok(interval) => SnapshotPolicy::Every(interval),
        }
    }

    /// 自上次快照以来累计的事件数达到间隔时落盘快照
    pub fn should_snapshot(&self, last_snapshot: Version, current: Version) -> bool {
        match self {
            SnapshotPolicy::Never => false,
            SnapshotPolicy::Every(interval) => {
                let interval = (*interval).max(1);
                current.since(last_snapshot) >= interval
            }
        }
    }
}

/// SnapshotStore 的装饰器，为任意后端附加快照频率策略
pub struct SnapshotStoreWithPolicy<S> {
    inner: S,
    policy: SnapshotPolicy,
}

impl<S> SnapshotStoreWithPolicy<S> {
    pub fn new(inner: S, policy: SnapshotPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<S> SnapshotStore for SnapshotStoreWithPolicy<S>
where
    S: SnapshotStore,
{
    async fn get_latest(&self, aggregate_id: &str) -> Result<Option<SerializedSnapshot>> {
        self.inner.get_latest(aggregate_id).await
    }

    async fn save(&self, snapshot: SerializedSnapshot) -> Result<()> {
        self.inner.save(snapshot).await
    }

    async fn latest_version(&self, aggregate_id: &str) -> Result<Option<Version>> {
        self.inner.latest_version(aggregate_id).await
    }

    fn policy(&self) -> SnapshotPolicy {
        self.policy
    }
}
