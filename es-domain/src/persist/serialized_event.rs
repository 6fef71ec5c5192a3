//! 事件持久化模型（SerializedEvent）
//!
//! 定义事件在持久化层的标准形态与在 `Event` 间的转换。
//! 载荷为不透明字节，由 `Codec` 负责编解码；反序列化前先以聚合的分发表
//! 校验变体标签，未登记的标签以 `UnknownEventType` 失败。
//!
use crate::{
    aggregate::Aggregate,
    codec::Codec,
    error::DomainResult,
    event::{DomainEvent, Event},
    registry::EventRegistry,
    value_object::Version,
};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// 事件唯一标识符
    event_id: Uuid,
    /// 事件类型（变体标签），用于分发
    event_type: String,
    /// 事件载荷版本
    event_version: usize,
    /// 聚合 ID，标识事件所属的聚合根实例
    aggregate_id: String,
    /// 聚合类型，用于区分不同的聚合根
    aggregate_type: String,
    /// 聚合版本，用于乐观锁和并发控制
    aggregate_version: Version,
    /// 事件发生时间
    occurred_at: DateTime<Utc>,
    /// 事件负载（不透明字节）
    payload: Vec<u8>,
}

impl SerializedEvent {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> usize {
        self.event_version
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn aggregate_version(&self) -> Version {
        self.aggregate_version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// 由领域事件编码为持久化形态
    pub fn encode<A, C>(event: &Event<A::Event>, codec: &C) -> DomainResult<Self>
    where
        A: Aggregate,
        C: Codec,
    {
        Ok(Self {
            event_id: event.event_id(),
            event_type: event.event_type().to_string(),
            event_version: event.payload().event_version(),
            aggregate_id: event.aggregate_id().to_string(),
            aggregate_type: A::TYPE.to_string(),
            aggregate_version: event.version(),
            occurred_at: event.occurred_at(),
            payload: codec.encode(event.payload())?,
        })
    }

    /// 解码为领域事件；标签必须已在分发表中登记
    pub fn decode<A, C>(
        &self,
        registry: &EventRegistry<A>,
        codec: &C,
    ) -> DomainResult<Event<A::Event>>
    where
        A: Aggregate,
        C: Codec,
    {
        registry.resolve(&self.event_type)?;

        let payload: A::Event = codec.decode(&self.payload)?;

        Ok(Event::builder()
            .event_id(self.event_id)
            .aggregate_id(self.aggregate_id.clone())
            .version(self.aggregate_version)
            .occurred_at(self.occurred_at)
            .payload(payload)
            .build())
    }
}

pub fn serialize_events<A, C>(
    events: &[Event<A::Event>],
    codec: &C,
) -> DomainResult<Vec<SerializedEvent>>
where
    A: Aggregate,
    C: Codec,
{
    events
        .iter()
        .map(|event| SerializedEvent::encode::<A, C>(event, codec))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::error::DomainError;
    use es_macros::event;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Lamp {
        on: bool,
    }

    #[event(version = 2)]
    enum LampEvent {
        SwitchedOn,
        SwitchedOff,
    }

    impl Aggregate for Lamp {
        const TYPE: &'static str = "lamp";
        type Id = String;
        type Command = ();
        type Event = LampEvent;
        type Error = DomainError;

        fn execute(&self, _command: Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
            Ok(vec![])
        }

        fn register(registry: &mut EventRegistry<Self>) {
            registry.on("LampEvent.SwitchedOn", |lamp, _| lamp.on = true);
        }
    }

    #[test]
    fn encode_carries_metadata() {
        let event = Event::new("l-1", Version::from_value(1), LampEvent::SwitchedOn);
        let ser = SerializedEvent::encode::<Lamp, _>(&event, &JsonCodec).unwrap();

        assert_eq!(ser.event_id(), event.event_id());
        assert_eq!(ser.event_type(), "LampEvent.SwitchedOn");
        assert_eq!(ser.event_version(), 2);
        assert_eq!(ser.aggregate_id(), "l-1");
        assert_eq!(ser.aggregate_type(), Lamp::TYPE);
        assert_eq!(ser.aggregate_version(), Version::from_value(1));

        let registry = EventRegistry::<Lamp>::build();
        let back = ser.decode(&registry, &JsonCodec).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn decode_rejects_unregistered_tag() {
        let event = Event::new("l-2", Version::from_value(1), LampEvent::SwitchedOff);
        let ser = SerializedEvent::encode::<Lamp, _>(&event, &JsonCodec).unwrap();

        let registry = EventRegistry::<Lamp>::build();
        let err = ser.decode(&registry, &JsonCodec).unwrap_err();
        match err {
            DomainError::UnknownEventType { event_type, .. } => {
                assert_eq!(event_type, "LampEvent.SwitchedOff")
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
