//! 领域层统一错误定义
//!
//! 覆盖并发冲突、聚合不存在、未知事件类型与存储失败四类核心错误，
//! 以及聚合命令校验与配置加载所需的最小集合。存储实现统一转换为 `DomainError`，
//! 仓储层原样向上传递，不做包装。
//!
use crate::value_object::Version;
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 并发/重建 ---
    #[error(
        "concurrency conflict on aggregate {aggregate_id}: expected={expected}, actual={actual}"
    )]
    ConcurrencyConflict {
        aggregate_id: String,
        expected: Version,
        actual: Version,
    },
    #[error("aggregate not found: type={aggregate_type}, id={aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },
    #[error("unknown event type: aggregate={aggregate_type}, event_type={event_type}")]
    UnknownEventType {
        aggregate_type: &'static str,
        event_type: String,
    },

    // --- 存储/序列化 ---
    #[error("event store error: {reason}")]
    EventStore { reason: String },
    #[error("snapshot store error: {reason}")]
    SnapshotStore { reason: String },
    #[error("database error: {reason}")]
    Database { reason: String },
    #[error("store timeout: operation={operation}")]
    StoreTimeout { operation: &'static str },
    #[error("codec error: {reason}")]
    Codec { reason: String },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },

    // --- 领域规则/命令与状态 ---
    #[error("invalid command: {reason}")]
    InvalidCommand { reason: String },
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    // --- 配置 ---
    #[error("config error: {reason}")]
    Config { reason: String },
}

impl DomainError {
    /// 是否属于存储层失败（I/O、超时、序列化）
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            DomainError::EventStore { .. }
                | DomainError::SnapshotStore { .. }
                | DomainError::Database { .. }
                | DomainError::StoreTimeout { .. }
                | DomainError::Codec { .. }
                | DomainError::TypeMismatch { .. }
        )
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

// ---- Cross-crate conversions for infrastructure convenience ----
// 允许在基础设施层直接使用 `?` 将 sqlx 错误转换为 DomainError

#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Database {
            reason: err.to_string(),
        }
    }
}
