use es_domain::event::DomainEvent;
use es_macros::event;

// 单元变体
#[event]
enum UnitVariantEvent {
    Activated,
    Deactivated,
}

// 元组变体
#[event(version = 3)]
enum TupleEvent {
    Updated(String),
    Changed(i32, String, bool),
}

// 混合变体
#[event]
enum MixedEvent {
    Started,
    Updated(String),
    Completed { result: i32 },
}

// 单元变体带属性覆盖
#[event]
enum UnitWithAttrEvent {
    #[event(event_type = "custom.started", event_version = 2)]
    Started,
}

fn main() {
    let event = UnitVariantEvent::Activated;
    assert_eq!(event.event_type(), "UnitVariantEvent.Activated");
    assert_eq!(event.event_version(), 1);
    assert_ne!(event, UnitVariantEvent::Deactivated);

    let event = TupleEvent::Changed(42, "changed".to_string(), true);
    assert_eq!(event.event_type(), "TupleEvent.Changed");
    assert_eq!(event.event_version(), 3);
    assert_eq!(
        TupleEvent::Updated("v".to_string()).event_type(),
        "TupleEvent.Updated"
    );

    let events = [
        MixedEvent::Started,
        MixedEvent::Updated("updated".to_string()),
        MixedEvent::Completed { result: 100 },
    ];
    let tags: Vec<&str> = events.iter().map(DomainEvent::event_type).collect();
    assert_eq!(tags, MixedEvent::EVENT_TYPES);

    let event = UnitWithAttrEvent::Started;
    assert_eq!(event.event_type(), "custom.started");
    assert_eq!(event.event_version(), 2);
}
