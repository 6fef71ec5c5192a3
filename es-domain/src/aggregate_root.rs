//! 聚合根（AggregateRoot）
//!
//! 包装聚合状态，维护标识、当前版本、最后提交版本与未提交事件缓冲：
//! - 命令经 `execute` 产生事件，立即应用到自身并追加到缓冲区；
//! - 重放经 `apply` 逐个应用已持久化事件；
//! - 仓储在追加成功后调用 `mark_committed` 清空缓冲区。
//!
//! 聚合根由调用方独占持有，仓储不会跨调用保留其引用。
//!
use crate::{
    aggregate::Aggregate,
    error::DomainResult,
    event::{DomainEvent, Event},
    registry::{EventHandler, EventRegistry},
    value_object::Version,
};
use std::fmt;
use std::sync::Arc;

pub struct AggregateRoot<A>
where
    A: Aggregate,
{
    id: A::Id,
    current_version: Version,
    last_committed_version: Version,
    state: A,
    uncommitted: Vec<Event<A::Event>>,
    registry: Arc<EventRegistry<A>>,
}

impl<A> AggregateRoot<A>
where
    A: Aggregate,
{
    /// 以默认状态创建新的聚合根（版本 0）
    pub fn new(id: A::Id) -> Self {
        Self::with_registry(id, Arc::new(EventRegistry::build()))
    }

    /// 使用已构建的分发表创建新的聚合根
    pub fn with_registry(id: A::Id, registry: Arc<EventRegistry<A>>) -> Self {
        Self::restore(id, A::default(), Version::new(), registry)
    }

    /// 从快照状态恢复（种子版本为快照版本）
    pub(crate) fn restore(
        id: A::Id,
        state: A,
        version: Version,
        registry: Arc<EventRegistry<A>>,
    ) -> Self {
        Self {
            id,
            current_version: version,
            last_committed_version: version,
            state,
            uncommitted: Vec::new(),
            registry,
        }
    }

    pub fn id(&self) -> &A::Id {
        &self.id
    }

    pub fn state(&self) -> &A {
        &self.state
    }

    pub fn current_version(&self) -> Version {
        self.current_version
    }

    pub fn last_committed_version(&self) -> Version {
        self.last_committed_version
    }

    pub fn uncommitted_changes(&self) -> &[Event<A::Event>] {
        &self.uncommitted
    }

    pub fn has_uncommitted_changes(&self) -> bool {
        !self.uncommitted.is_empty()
    }

    /// 执行命令：
    /// 1. 由聚合状态决定产生的事件；
    /// 2. 先解析全部事件的处理函数，任一缺失则整体失败且不改变状态；
    /// 3. 依次应用事件（版本逐个加 1）并追加到未提交缓冲区。
    pub fn execute(&mut self, command: A::Command) -> Result<(), A::Error> {
        let payloads = self.state.execute(command)?;

        let handlers = payloads
            .iter()
            .map(|payload| self.registry.resolve(payload.event_type()))
            .collect::<DomainResult<Vec<_>>>()?;

        for (payload, handler) in payloads.into_iter().zip(handlers) {
            let event = Event::new(self.id.to_string(), self.current_version.next(), payload);
            self.mutate(handler, &event);
            self.uncommitted.push(event);
        }

        Ok(())
    }

    /// 应用一个已发生的事件（重放路径）
    pub fn apply(&mut self, event: &Event<A::Event>) -> DomainResult<()> {
        let handler = self.registry.resolve(event.event_type())?;
        self.mutate(handler, event);
        Ok(())
    }

    /// 事件已持久化：清空缓冲区并同步最后提交版本
    pub fn mark_committed(&mut self) {
        self.uncommitted.clear();
        self.last_committed_version = self.current_version;
    }

    fn mutate(&mut self, handler: EventHandler<A>, event: &Event<A::Event>) {
        handler(&mut self.state, event.payload());
        self.current_version = self.current_version.next();
    }
}

impl<A> fmt::Debug for AggregateRoot<A>
where
    A: Aggregate + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateRoot")
            .field("aggregate_type", &A::TYPE)
            .field("id", &self.id)
            .field("current_version", &self.current_version)
            .field("last_committed_version", &self.last_committed_version)
            .field("uncommitted", &self.uncommitted.len())
            .field("state", &self.state)
            .finish()
    }
}
