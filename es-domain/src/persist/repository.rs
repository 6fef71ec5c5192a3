//! 聚合仓储
//!
//! 基于事件存储（EventStore）与快照存储（SnapshotStore）的通用聚合仓储实现：
//! - `save`：以最后提交版本为期望版本追加未提交事件，成功后标记已提交，
//!   再按快照策略决定是否落盘一份快照（每次保存至多一份）；
//! - `get_by_id`：优先从最近快照恢复，再按序重放快照之后的事件。
//!
//! 仓储不重试、不缓存聚合，也不跨调用持有聚合根引用。
//!
use crate::{
    aggregate::Aggregate,
    aggregate_root::AggregateRoot,
    codec::{Codec, JsonCodec},
    config::EngineConfig,
    error::{DomainError, DomainResult},
    persist::{
        EventStore, SerializedSnapshot, SnapshotPolicy, SnapshotStore, SnapshotStoreWithPolicy,
        serialize_events,
    },
    registry::EventRegistry,
};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use std::{future::Future, sync::Arc, time::Duration};
use tracing::{debug, instrument, warn};

#[async_trait]
pub trait AggregateRepository<A>: Send + Sync
where
    A: Aggregate,
{
    /// 重建聚合；既无快照也无事件时返回 `AggregateNotFound`
    async fn get_by_id(&self, id: &A::Id) -> DomainResult<AggregateRoot<A>>;

    /// 持久化未提交事件；无未提交事件时不访问任何存储
    async fn save(&self, aggregate: &mut AggregateRoot<A>) -> DomainResult<()>;
}

#[async_trait]
impl<A, T> AggregateRepository<A> for Arc<T>
where
    A: Aggregate,
    T: AggregateRepository<A> + ?Sized,
{
    async fn get_by_id(&self, id: &A::Id) -> DomainResult<AggregateRoot<A>> {
        (**self).get_by_id(id).await
    }

    async fn save(&self, aggregate: &mut AggregateRoot<A>) -> DomainResult<()> {
        (**self).save(aggregate).await
    }
}

/// 事件 + 快照 的聚合仓储。
/// - 快照频率由 `SnapshotStore::policy` 决定（见 `SnapshotStoreWithPolicy`）
/// - 可选的截止时间约束每一次存储交互
pub struct EventSourcedRepository<A, E, S, C = JsonCodec>
where
    A: Aggregate,
{
    event_store: Arc<E>,
    snapshot_store: Arc<S>,
    registry: Arc<EventRegistry<A>>,
    codec: C,
    deadline: Option<Duration>,
}

impl<A, E, S> EventSourcedRepository<A, E, S, JsonCodec>
where
    A: Aggregate,
    E: EventStore,
    S: SnapshotStore,
{
    pub fn new(event_store: Arc<E>, snapshot_store: Arc<S>) -> Self {
        Self {
            event_store,
            snapshot_store,
            registry: Arc::new(EventRegistry::build()),
            codec: JsonCodec,
            deadline: None,
        }
    }
}

impl<A, E, S> EventSourcedRepository<A, E, SnapshotStoreWithPolicy<S>, JsonCodec>
where
    A: Aggregate,
    E: EventStore,
    S: SnapshotStore,
{
    /// 按配置装配：快照频率附加到快照存储上，截止时间附加到仓储上
    pub fn from_config(event_store: Arc<E>, snapshot_store: S, config: &EngineConfig) -> Self {
        let snapshot_store = SnapshotStoreWithPolicy::new(snapshot_store, config.snapshot_policy());
        let repository = Self::new(event_store, Arc::new(snapshot_store));

        match config.store_timeout {
            Some(deadline) => repository.with_deadline(deadline),
            None => repository,
        }
    }
}

impl<A, E, S, C> EventSourcedRepository<A, E, S, C>
where
    A: Aggregate,
    E: EventStore,
    S: SnapshotStore,
    C: Codec,
{
    pub fn with_codec<C2>(self, codec: C2) -> EventSourcedRepository<A, E, S, C2>
    where
        C2: Codec,
    {
        EventSourcedRepository {
            event_store: self.event_store,
            snapshot_store: self.snapshot_store,
            registry: self.registry,
            codec,
            deadline: self.deadline,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// 创建新的聚合根（版本 0），与仓储共享事件分发表
    pub fn create(&self, id: A::Id) -> AggregateRoot<A> {
        AggregateRoot::with_registry(id, Arc::clone(&self.registry))
    }

    pub fn event_store(&self) -> &Arc<E> {
        &self.event_store
    }

    pub fn snapshot_store(&self) -> &Arc<S> {
        &self.snapshot_store
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> DomainResult<T>
    where
        F: Future<Output = DomainResult<T>>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, fut)
                .await
                .map_err(|_| DomainError::StoreTimeout { operation })?,
            None => fut.await,
        }
    }

    /// 自 `root` 的当前版本之后按序重放事件
    async fn replay(
        &self,
        mut root: AggregateRoot<A>,
        aggregate_id: &str,
    ) -> DomainResult<AggregateRoot<A>> {
        let mut events = self
            .event_store
            .read_from(aggregate_id, root.current_version().next());

        while let Some(serialized) = events.try_next().await? {
            let expected = root.current_version().next();
            if serialized.aggregate_version() != expected {
                return Err(DomainError::EventStore {
                    reason: format!(
                        "event log for {aggregate_id} is not contiguous: expected {expected}, got {}",
                        serialized.aggregate_version()
                    ),
                });
            }

            let event = serialized.decode(&self.registry, &self.codec)?;
            root.apply(&event)?;
        }

        Ok(root)
    }

    /// 自上次快照累计的事件数达到策略间隔时，以当前版本落盘一份快照
    async fn snapshot_if_due(
        &self,
        aggregate: &AggregateRoot<A>,
        aggregate_id: &str,
        policy: SnapshotPolicy,
    ) -> DomainResult<()> {
        let last_snapshot = self
            .bounded(
                "snapshot.latest_version",
                self.snapshot_store.latest_version(aggregate_id),
            )
            .await?
            .unwrap_or_default();

        let current = aggregate.current_version();
        if !policy.should_snapshot(last_snapshot, current) {
            debug!(%last_snapshot, %current, "snapshot not due");
            return Ok(());
        }

        let snapshot = SerializedSnapshot::from_aggregate(aggregate, &self.codec)?;
        self.bounded("snapshot.save", self.snapshot_store.save(snapshot))
            .await?;

        debug!(%last_snapshot, %current, "snapshot taken");
        Ok(())
    }
}

#[async_trait]
impl<A, E, S, C> AggregateRepository<A> for EventSourcedRepository<A, E, S, C>
where
    A: Aggregate,
    E: EventStore,
    S: SnapshotStore,
    C: Codec,
{
    #[instrument(skip_all, fields(aggregate_type = A::TYPE, aggregate_id = %id))]
    async fn get_by_id(&self, id: &A::Id) -> DomainResult<AggregateRoot<A>> {
        let aggregate_id = id.to_string();

        let snapshot = self
            .bounded("snapshot.get_latest", self.snapshot_store.get_latest(&aggregate_id))
            .await?;
        let from_snapshot = snapshot.is_some();

        let seed = match snapshot {
            Some(snapshot) => {
                snapshot.to_aggregate(id.clone(), Arc::clone(&self.registry), &self.codec)?
            }
            None => AggregateRoot::with_registry(id.clone(), Arc::clone(&self.registry)),
        };
        let seed_version = seed.current_version();

        let mut root = self
            .bounded("event_store.read_from", self.replay(seed, &aggregate_id))
            .await
            .inspect_err(|err| warn!(phase = "replay", error = %err, "replay failed"))?;

        if !from_snapshot && root.current_version().is_new() {
            return Err(DomainError::AggregateNotFound {
                aggregate_type: A::TYPE,
                aggregate_id,
            });
        }

        root.mark_committed();

        debug!(
            from_snapshot,
            %seed_version,
            version = %root.current_version(),
            "aggregate rebuilt"
        );
        Ok(root)
    }

    #[instrument(skip_all, fields(aggregate_type = A::TYPE, aggregate_id = %aggregate.id()))]
    async fn save(&self, aggregate: &mut AggregateRoot<A>) -> DomainResult<()> {
        if !aggregate.has_uncommitted_changes() {
            return Ok(());
        }

        let aggregate_id = aggregate.id().to_string();
        let expected = aggregate.last_committed_version();
        let events = serialize_events::<A, C>(aggregate.uncommitted_changes(), &self.codec)?;
        let count = events.len();

        self.bounded(
            "event_store.append",
            self.event_store.append(&aggregate_id, expected, events),
        )
        .await
        .inspect_err(|err| warn!(phase = "append", %expected, error = %err, "append failed"))?;

        aggregate.mark_committed();
        debug!(count, version = %aggregate.current_version(), "events committed");

        let policy = self.snapshot_store.policy();
        if policy == SnapshotPolicy::Never {
            return Ok(());
        }

        // 事件已提交；快照失败只向上报告，不回滚
        self.snapshot_if_due(aggregate, &aggregate_id, policy)
            .await
            .inspect_err(|err| warn!(phase = "snapshot", error = %err, "snapshot failed"))
    }
}
