use anyhow::Context;
use es_domain::aggregate::Aggregate;
use es_domain::aggregate_root::AggregateRoot;
use es_domain::config::{EngineConfig, SNAPSHOT_FREQUENCY_ENV};
use es_domain::error::DomainError;
use es_domain::persist::{
    AggregateRepository, EventSourcedRepository, EventStore, InMemoryEventStore,
    InMemorySnapshotStore, SnapshotStore,
};
#[cfg(feature = "infra-sqlx")]
use es_domain::persist::{PgEventStore, PgSnapshotStore, postgres};
use es_domain::registry::EventRegistry;
use es_macros::event;
use serde::{Deserialize, Serialize};
#[cfg(feature = "infra-sqlx")]
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_NOTE_ID_ENV: &str = "ES_DEMO_NOTE_ID";
const DATABASE_URL_ENV: &str = "DATABASE_URL";
const DEFAULT_SNAPSHOT_FREQUENCY: i64 = 5;
const CYCLES: usize = 3;
const CHANGES_PER_CYCLE: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Note {
    created: bool,
    title: String,
    description: String,
    category: String,
}

#[derive(Debug, thiserror::Error)]
enum NoteError {
    #[error("note already created")]
    AlreadyCreated,
    #[error("note not created")]
    NotCreated,
    #[error("title must not be empty")]
    EmptyTitle,
    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Debug)]
enum NoteCommand {
    Create {
        title: String,
        description: String,
        category: String,
    },
    ChangeTitle {
        title: String,
    },
    ChangeCategory {
        category: String,
    },
}

#[event(version = 1)]
enum NoteEvent {
    Created {
        title: String,
        description: String,
        category: String,
    },
    TitleChanged {
        title: String,
    },
    CategoryChanged {
        category: String,
    },
}

impl Aggregate for Note {
    const TYPE: &'static str = "note";

    type Id = String;
    type Command = NoteCommand;
    type Event = NoteEvent;
    type Error = NoteError;

    fn execute(&self, command: Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            NoteCommand::Create {
                title,
                description,
                category,
            } => {
                if self.created {
                    return Err(NoteError::AlreadyCreated);
                }
                if title.trim().is_empty() {
                    return Err(NoteError::EmptyTitle);
                }
                Ok(vec![NoteEvent::Created {
                    title,
                    description,
                    category,
                }])
            }
            NoteCommand::ChangeTitle { title } => {
                if !self.created {
                    return Err(NoteError::NotCreated);
                }
                if title.trim().is_empty() {
                    return Err(NoteError::EmptyTitle);
                }
                Ok(vec![NoteEvent::TitleChanged { title }])
            }
            NoteCommand::ChangeCategory { category } => {
                if !self.created {
                    return Err(NoteError::NotCreated);
                }
                Ok(vec![NoteEvent::CategoryChanged { category }])
            }
        }
    }

    fn register(registry: &mut EventRegistry<Self>) {
        registry
            .on("NoteEvent.Created", |note, event| {
                if let NoteEvent::Created {
                    title,
                    description,
                    category,
                } = event
                {
                    note.created = true;
                    note.title = title.clone();
                    note.description = description.clone();
                    note.category = category.clone();
                }
            })
            .on("NoteEvent.TitleChanged", |note, event| {
                if let NoteEvent::TitleChanged { title } = event {
                    note.title = title.clone();
                }
            })
            .on("NoteEvent.CategoryChanged", |note, event| {
                if let NoteEvent::CategoryChanged { category } = event {
                    note.category = category.clone();
                }
            });
    }
}

fn change_pair(note: &mut AggregateRoot<Note>, label: &str) -> Result<(), NoteError> {
    note.execute(NoteCommand::ChangeTitle {
        title: format!("title {label}"),
    })?;
    note.execute(NoteCommand::ChangeCategory {
        category: format!("category {label}"),
    })
}

/// 创建或加载一条笔记，分三轮修改并保存，最后重新加载比对状态；
/// 返回笔记 ID，笔记不存在时返回 `None`
async fn run<E, S>(
    repository: &EventSourcedRepository<Note, E, S>,
    load_id: Option<String>,
) -> anyhow::Result<Option<String>>
where
    E: EventStore,
    S: SnapshotStore,
{
    let mut note = match load_id {
        Some(id) => match repository.get_by_id(&id).await {
            Ok(note) => note,
            Err(DomainError::AggregateNotFound { aggregate_id, .. }) => {
                println!("note {aggregate_id} not found");
                return Ok(None);
            }
            Err(err) => return Err(err).context("loading note"),
        },
        None => {
            let mut note = repository.create(uuid::Uuid::new_v4().to_string());
            note.execute(NoteCommand::Create {
                title: "untitled".to_string(),
                description: "event sourcing demo".to_string(),
                category: "inbox".to_string(),
            })?;
            repository.save(&mut note).await?;
            note
        }
    };
    info!(id = %note.id(), version = %note.current_version(), "note ready");

    for cycle in 1..=CYCLES {
        for change in 1..=CHANGES_PER_CYCLE {
            change_pair(&mut note, &format!("{cycle}.{change}"))?;
        }
        repository.save(&mut note).await?;
        info!(cycle, version = %note.current_version(), "cycle saved");
    }

    // 最后一组修改不会被快照覆盖，重建时需要重放
    change_pair(&mut note, "final")?;
    repository.save(&mut note).await?;

    let reloaded = repository.get_by_id(note.id()).await?;

    println!(
        "in memory (version {}):\n{}",
        note.current_version(),
        serde_json::to_string_pretty(note.state())?
    );
    println!(
        "reloaded (version {}):\n{}",
        reloaded.current_version(),
        serde_json::to_string_pretty(reloaded.state())?
    );
    anyhow::ensure!(
        reloaded.state() == note.state(),
        "reloaded state differs from in-memory state"
    );

    Ok(Some(note.id().clone()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = EngineConfig::from_env()?;
    if std::env::var(SNAPSHOT_FREQUENCY_ENV).is_err() {
        config.snapshot_frequency = DEFAULT_SNAPSHOT_FREQUENCY;
    }
    info!(
        snapshot_frequency = config.snapshot_frequency,
        store_timeout = ?config.store_timeout,
        "engine configured"
    );

    let load_id = std::env::var(DEMO_NOTE_ID_ENV).ok();

    // 设置了 DATABASE_URL 时使用 Postgres，笔记可跨进程加载
    #[cfg(feature = "infra-sqlx")]
    {
        if let Ok(database_url) = std::env::var(DATABASE_URL_ENV) {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await
                .context("connecting to postgres")?;
            postgres::migrate(&pool).await?;
            info!("using postgres store");

            let repository: EventSourcedRepository<Note, _, _> =
                EventSourcedRepository::from_config(
                    Arc::new(PgEventStore::new(pool.clone())),
                    PgSnapshotStore::new(pool),
                    &config,
                );
            run(&repository, load_id).await?;
            return Ok(());
        }
    }

    // 内存存储随进程结束而丢失，无从加载之前的笔记
    anyhow::ensure!(
        load_id.is_none(),
        "{DEMO_NOTE_ID_ENV} needs a durable store: build with `--features infra-sqlx` and set {DATABASE_URL_ENV}"
    );
    info!("using in-memory store");

    let repository: EventSourcedRepository<Note, _, _> = EventSourcedRepository::from_config(
        Arc::new(InMemoryEventStore::new()),
        InMemorySnapshotStore::new(),
        &config,
    );
    run(&repository, None).await?;
    Ok(())
}
