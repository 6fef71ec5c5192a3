//! 领域事件（Domain Event）
//!
//! `DomainEvent` 约束事件载荷：一个封闭的、带标签的变体集合（通常为枚举，
//! 由 `#[event]` 宏生成实现）。`Event` 为载荷附加聚合标识、版本号与发生时间，
//! 一经创建即不可变。
//!
use crate::value_object::Version;
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use uuid::Uuid;

/// 领域事件载荷需要满足的通用能力边界
pub trait DomainEvent:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// 该载荷类型的全部变体标签（封闭集合）
    const EVENT_TYPES: &'static [&'static str];

    /// 变体标签（形如 `NoteEvent.TitleChanged` 或自定义类型名）
    fn event_type(&self) -> &'static str;

    /// 事件载荷版本（记录在持久化形态中）
    fn event_version(&self) -> usize {
        1
    }
}

/// 已发生的事实：聚合标识 + 版本号 + 发生时间 + 载荷
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct Event<P> {
    #[builder(default = Uuid::now_v7())]
    event_id: Uuid,
    #[builder(into)]
    aggregate_id: String,
    version: Version,
    #[builder(default = Utc::now())]
    occurred_at: DateTime<Utc>,
    payload: P,
}

impl<P> Event<P>
where
    P: DomainEvent,
{
    /// 以当前时间创建新事件
    pub fn new(aggregate_id: impl Into<String>, version: Version, payload: P) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            aggregate_id: aggregate_id.into(),
            version,
            occurred_at: Utc::now(),
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}
