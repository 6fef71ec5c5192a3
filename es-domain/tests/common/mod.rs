#![allow(dead_code)]

use async_trait::async_trait;
use es_domain::aggregate::Aggregate;
use es_domain::config::EngineConfig;
use es_domain::error::{DomainError, DomainResult};
use es_domain::persist::{
    EventSourcedRepository, EventStore, EventStream, InMemoryEventStore, InMemorySnapshotStore,
    SerializedEvent, SerializedSnapshot, SnapshotStore, SnapshotStoreWithPolicy,
};
use es_domain::registry::EventRegistry;
use es_domain::value_object::Version;
use es_macros::event;
use futures_util::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub created: bool,
    pub title: String,
    pub category: String,
    pub revisions: usize,
}

#[derive(Debug)]
pub enum NoteCommand {
    Create { title: String, category: String },
    ChangeTitle(String),
    ChangeCategory(String),
}

#[event(version = 1)]
pub enum NoteEvent {
    Created { title: String, category: String },
    TitleChanged { title: String },
    CategoryChanged { category: String },
}

impl Aggregate for Note {
    const TYPE: &'static str = "note";
    type Id = String;
    type Command = NoteCommand;
    type Event = NoteEvent;
    type Error = DomainError;

    fn execute(&self, command: Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            NoteCommand::Create { title, category } => {
                if self.created {
                    return Err(DomainError::InvalidCommand {
                        reason: "note already created".into(),
                    });
                }
                Ok(vec![NoteEvent::Created { title, category }])
            }
            _ if !self.created => Err(DomainError::InvalidState {
                reason: "note not created".into(),
            }),
            NoteCommand::ChangeTitle(title) => Ok(vec![NoteEvent::TitleChanged { title }]),
            NoteCommand::ChangeCategory(category) => {
                Ok(vec![NoteEvent::CategoryChanged { category }])
            }
        }
    }

    fn register(registry: &mut EventRegistry<Self>) {
        registry
            .on("NoteEvent.Created", |note, event| {
                if let NoteEvent::Created { title, category } = event {
                    note.created = true;
                    note.title = title.clone();
                    note.category = category.clone();
                    note.revisions += 1;
                }
            })
            .on("NoteEvent.TitleChanged", |note, event| {
                if let NoteEvent::TitleChanged { title } = event {
                    note.title = title.clone();
                    note.revisions += 1;
                }
            })
            .on("NoteEvent.CategoryChanged", |note, event| {
                if let NoteEvent::CategoryChanged { category } = event {
                    note.category = category.clone();
                    note.revisions += 1;
                }
            });
    }
}

pub fn create(title: &str, category: &str) -> NoteCommand {
    NoteCommand::Create {
        title: title.to_string(),
        category: category.to_string(),
    }
}

/// 记录调用的事件存储
#[derive(Debug, Default, Clone)]
pub struct RecordingEventStore {
    pub inner: InMemoryEventStore,
    pub appends: Arc<Mutex<Vec<(Version, usize)>>>,
    pub reads: Arc<Mutex<Vec<Version>>>,
}

impl RecordingEventStore {
    pub fn append_count(&self) -> usize {
        self.appends.lock().unwrap().len()
    }

    pub fn reads(&self) -> Vec<Version> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventStore for RecordingEventStore {
    async fn append(
        &self,
        aggregate_id: &str,
        expected_version: Version,
        events: Vec<SerializedEvent>,
    ) -> DomainResult<()> {
        self.appends
            .lock()
            .unwrap()
            .push((expected_version, events.len()));
        self.inner.append(aggregate_id, expected_version, events).await
    }

    fn read_from<'a>(&'a self, aggregate_id: &str, from_version: Version) -> EventStream<'a> {
        self.reads.lock().unwrap().push(from_version);
        self.inner.read_from(aggregate_id, from_version)
    }
}

/// 记录每次保存版本的快照存储
#[derive(Debug, Default, Clone)]
pub struct RecordingSnapshotStore {
    pub inner: InMemorySnapshotStore,
    pub saved: Arc<Mutex<Vec<Version>>>,
    pub reads: Arc<Mutex<usize>>,
}

impl RecordingSnapshotStore {
    pub fn saved_versions(&self) -> Vec<usize> {
        self.saved.lock().unwrap().iter().map(|v| v.value()).collect()
    }
}

#[async_trait]
impl SnapshotStore for RecordingSnapshotStore {
    async fn get_latest(&self, aggregate_id: &str) -> DomainResult<Option<SerializedSnapshot>> {
        *self.reads.lock().unwrap() += 1;
        self.inner.get_latest(aggregate_id).await
    }

    async fn save(&self, snapshot: SerializedSnapshot) -> DomainResult<()> {
        self.saved.lock().unwrap().push(snapshot.version());
        self.inner.save(snapshot).await
    }

    async fn latest_version(&self, aggregate_id: &str) -> DomainResult<Option<Version>> {
        *self.reads.lock().unwrap() += 1;
        self.inner.latest_version(aggregate_id).await
    }
}

/// 保存总是失败的快照存储
#[derive(Debug, Default, Clone)]
pub struct BrokenSnapshotStore {
    pub inner: InMemorySnapshotStore,
}

#[async_trait]
impl SnapshotStore for BrokenSnapshotStore {
    async fn get_latest(&self, aggregate_id: &str) -> DomainResult<Option<SerializedSnapshot>> {
        self.inner.get_latest(aggregate_id).await
    }

    async fn save(&self, _snapshot: SerializedSnapshot) -> DomainResult<()> {
        Err(DomainError::SnapshotStore {
            reason: "disk full".into(),
        })
    }
}

/// 追加（与读取）前先等待一段时间的事件存储
#[derive(Debug, Default, Clone)]
pub struct SlowEventStore {
    pub inner: InMemoryEventStore,
    pub delay: Duration,
    pub read_delay: Duration,
}

#[async_trait]
impl EventStore for SlowEventStore {
    async fn append(
        &self,
        aggregate_id: &str,
        expected_version: Version,
        events: Vec<SerializedEvent>,
    ) -> DomainResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.append(aggregate_id, expected_version, events).await
    }

    fn read_from<'a>(&'a self, aggregate_id: &str, from_version: Version) -> EventStream<'a> {
        let delay = self.read_delay;
        stream::once(tokio::time::sleep(delay))
            .filter_map(|()| async { None })
            .chain(self.inner.read_from(aggregate_id, from_version))
            .boxed()
    }
}

/// 读取或保存前先等待一段时间的快照存储
#[derive(Debug, Default, Clone)]
pub struct SlowSnapshotStore {
    pub inner: InMemorySnapshotStore,
    pub read_delay: Duration,
    pub save_delay: Duration,
}

#[async_trait]
impl SnapshotStore for SlowSnapshotStore {
    async fn get_latest(&self, aggregate_id: &str) -> DomainResult<Option<SerializedSnapshot>> {
        tokio::time::sleep(self.read_delay).await;
        self.inner.get_latest(aggregate_id).await
    }

    async fn save(&self, snapshot: SerializedSnapshot) -> DomainResult<()> {
        tokio::time::sleep(self.save_delay).await;
        self.inner.save(snapshot).await
    }

    async fn latest_version(&self, aggregate_id: &str) -> DomainResult<Option<Version>> {
        tokio::time::sleep(self.read_delay).await;
        self.inner.latest_version(aggregate_id).await
    }
}

pub type NoteRepository =
    EventSourcedRepository<Note, RecordingEventStore, SnapshotStoreWithPolicy<RecordingSnapshotStore>>;

/// 以给定快照频率装配仓储，并返回可观察的底层存储
pub fn note_repository(
    frequency: i64,
) -> (NoteRepository, RecordingEventStore, RecordingSnapshotStore) {
    let events = RecordingEventStore::default();
    let snapshots = RecordingSnapshotStore::default();
    let repository = EventSourcedRepository::from_config(
        Arc::new(events.clone()),
        snapshots.clone(),
        &EngineConfig::new(frequency),
    );
    (repository, events, snapshots)
}
