//! 事件分发表（EventRegistry）
//!
//! 聚合类型在注册时给出“变体标签 → 状态变更函数”的显式映射，
//! 重放与命令执行都经由该表分发；找不到处理函数即视为 `UnknownEventType`，
//! 中止本次重建而不是跳过。
//!
use crate::aggregate::Aggregate;
use crate::error::{DomainError, DomainResult};
use crate::event::DomainEvent;
use std::collections::HashMap;
use std::fmt;

/// 状态变更函数：只修改聚合自身字段，必须是确定性的
pub type EventHandler<A> = fn(&mut A, &<A as Aggregate>::Event);

pub struct EventRegistry<A>
where
    A: Aggregate,
{
    handlers: HashMap<&'static str, EventHandler<A>>,
}

impl<A> EventRegistry<A>
where
    A: Aggregate,
{
    /// 创建空的分发表
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// 调用 `A::register` 构建该聚合类型的分发表
    pub fn build() -> Self {
        let mut registry = Self::new();
        A::register(&mut registry);

        for event_type in <A::Event as DomainEvent>::EVENT_TYPES {
            if !registry.handles(event_type) {
                tracing::warn!(
                    aggregate_type = A::TYPE,
                    event_type,
                    "event variant has no registered handler"
                );
            }
        }

        registry
    }

    /// 注册变体标签对应的处理函数，同名标签后注册者覆盖先注册者
    pub fn on(&mut self, event_type: &'static str, handler: EventHandler<A>) -> &mut Self {
        self.handlers.insert(event_type, handler);
        self
    }

    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// 解析变体标签
    pub fn resolve(&self, event_type: &str) -> DomainResult<EventHandler<A>> {
        self.handlers
            .get(event_type)
            .copied()
            .ok_or_else(|| DomainError::UnknownEventType {
                aggregate_type: A::TYPE,
                event_type: event_type.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<A> Default for EventRegistry<A>
where
    A: Aggregate,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for EventRegistry<A>
where
    A: Aggregate,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut event_types: Vec<_> = self.handlers.keys().collect();
        event_types.sort();
        f.debug_struct("EventRegistry")
            .field("aggregate_type", &A::TYPE)
            .field("event_types", &event_types)
            .finish()
    }
}
