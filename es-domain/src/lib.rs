//! 事件溯源聚合持久化基础库（es-domain）
//!
//! 通过重放有序、不可变的事件日志重建聚合状态，并以周期性快照加速重建：
//! - 聚合（`aggregate`）与聚合根（`aggregate_root`）建模，事件分发表（`registry`）
//! - 领域事件（`event`）与版本号值对象（`value_object`）
//! - 事件存储、快照存储与聚合仓储（`persist`）
//! - 运行期配置（`config`）与统一错误（`error`）
//!
//! 本 crate 只定义存储协议与编排逻辑，具体存储后端以 feature 的形式按需启用：
//! `memory`（默认）提供内存实现，`infra-sqlx` 提供 Postgres 实现。
//!
//! 典型用法：
//! 1. 定义聚合状态、命令与事件，实现 `Aggregate::execute/register`；
//! 2. 选择事件存储与快照存储，并用 `SnapshotStoreWithPolicy` 设定快照频率；
//! 3. 构建 `EventSourcedRepository`，通过 `save/get_by_id` 持久化与重建聚合根。
//!
pub mod aggregate;
pub mod aggregate_root;
pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod persist;
pub mod registry;
pub mod value_object;

// 允许在本 crate 内部通过 ::es_domain 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::es_domain 路径。
extern crate self as es_domain;
