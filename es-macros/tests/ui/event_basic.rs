use es_domain::event::DomainEvent;
use es_macros::event;
use serde::{Deserialize, Serialize};

#[event(version = 1)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum BankEvent {
    #[event(event_type = "bank.opened")]
    Opened { name: String },
    #[event(event_type = "bank.renamed", event_version = 2)]
    Renamed { to: String },
    Closed { reason: String },
}

fn main() {
    let opened = BankEvent::Opened {
        name: "main".to_string(),
    };
    assert_eq!(opened.event_type(), "bank.opened");
    assert_eq!(opened.event_version(), 1);

    let renamed = BankEvent::Renamed {
        to: "savings".to_string(),
    };
    assert_eq!(renamed.event_type(), "bank.renamed");
    assert_eq!(renamed.event_version(), 2);

    let closed = BankEvent::Closed {
        reason: "moved".to_string(),
    };
    assert_eq!(closed.event_type(), "BankEvent.Closed");

    assert_eq!(
        BankEvent::EVENT_TYPES,
        &["bank.opened", "bank.renamed", "BankEvent.Closed"]
    );
}
