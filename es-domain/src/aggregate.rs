//! 聚合（Aggregate）抽象
//!
//! 约束一个聚合状态类型的核心行为：
//! - `execute` 将命令转换为事件（不改变状态）；
//! - `register` 登记事件变体到状态变更函数的分发表（改变状态）；
//! - `Default` 提供重建起点，`Serialize/DeserializeOwned` 用于快照。
//!
//! 标识、版本与未提交事件由 `AggregateRoot` 统一管理，聚合状态只关心业务字段。
//!
use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::registry::EventRegistry;
use serde::{Serialize, de::DeserializeOwned};
use std::error::Error;
use std::fmt;

/// 聚合状态接口
pub trait Aggregate: Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: &'static str;

    /// 聚合标识类型
    type Id: Clone + fmt::Display + fmt::Debug + Send + Sync + 'static;
    /// 该聚合支持的命令类型
    type Command;
    /// 该聚合产生的领域事件类型
    type Event: DomainEvent;
    /// 命令执行环节的错误类型
    type Error: Error + From<DomainError> + Send + Sync + 'static;

    /// 执行命令，返回产生的事件列表
    fn execute(&self, command: Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// 登记事件处理函数
    fn register(registry: &mut EventRegistry<Self>);
}
