use crate::{
    aggregate::Aggregate,
    aggregate_root::AggregateRoot,
    codec::Codec,
    error::{DomainError, DomainResult as Result},
    registry::EventRegistry,
    value_object::Version,
};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 某一版本的聚合状态（不透明字节），每个聚合只保留最新一份
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct SerializedSnapshot {
    aggregate_id: String,
    aggregate_type: String,
    version: Version,
    state: Vec<u8>,
    #[builder(default = Utc::now())]
    taken_at: DateTime<Utc>,
}

impl SerializedSnapshot {
    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn state(&self) -> &[u8] {
        &self.state
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// 将快照反序列化为聚合根（版本为快照版本，无未提交事件）
    ///
    /// 快照的聚合类型与聚合 ID 都必须与目标一致。
    pub fn to_aggregate<A, C>(
        &self,
        id: A::Id,
        registry: Arc<EventRegistry<A>>,
        codec: &C,
    ) -> Result<AggregateRoot<A>>
    where
        A: Aggregate,
        C: Codec,
    {
        if A::TYPE != self.aggregate_type {
            return Err(DomainError::TypeMismatch {
                expected: A::TYPE.to_string(),
                found: self.aggregate_type.clone(),
            });
        }

        let expected_id = id.to_string();
        if expected_id != self.aggregate_id {
            return Err(DomainError::SnapshotStore {
                reason: format!(
                    "snapshot of aggregate {} cannot seed aggregate {expected_id}",
                    self.aggregate_id
                ),
            });
        }

        let state: A = codec.decode(&self.state)?;
        Ok(AggregateRoot::restore(id, state, self.version, registry))
    }

    /// 从聚合根创建快照，版本取当前版本
    pub fn from_aggregate<A, C>(aggregate: &AggregateRoot<A>, codec: &C) -> Result<Self>
    where
        A: Aggregate,
        C: Codec,
    {
        Ok(Self {
            aggregate_id: aggregate.id().to_string(),
            aggregate_type: A::TYPE.to_string(),
            version: aggregate.current_version(),
            state: codec.encode(aggregate.state())?,
            taken_at: Utc::now(),
        })
    }
}
