//! 运行期配置（EngineConfig）
//!
//! 启动时加载一次，显式传入快照存储装饰器与仓储，不存在全局可变状态。
//!
//! 环境变量：
//! - `ES_SNAPSHOT_FREQUENCY`：快照频率 N，`N <= 0` 关闭快照（默认 0）
//! - `ES_STORE_TIMEOUT_MS`：单次存储交互的截止时间（毫秒，缺省不限时）
//!
use crate::{
    error::{DomainError, DomainResult},
    persist::SnapshotPolicy,
};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

pub const SNAPSHOT_FREQUENCY_ENV: &str = "ES_SNAPSHOT_FREQUENCY";
pub const STORE_TIMEOUT_ENV: &str = "ES_STORE_TIMEOUT_MS";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// 快照频率；`<= 0` 表示从不快照
    #[serde(default)]
    pub snapshot_frequency: i64,
    /// 存储交互截止时间
    #[serde(
        default,
        rename = "store_timeout_ms",
        deserialize_with = "deserialize_millis"
    )]
    pub store_timeout: Option<Duration>,
}

impl EngineConfig {
    pub fn new(snapshot_frequency: i64) -> Self {
        Self {
            snapshot_frequency,
            store_timeout: None,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    /// 从进程环境变量加载；未设置的项取默认值
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 以任意键值来源加载（环境变量、测试夹具等）
    pub fn from_lookup<F>(lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let snapshot_frequency = match lookup(SNAPSHOT_FREQUENCY_ENV) {
            Some(raw) => raw.trim().parse::<i64>().map_err(|e| DomainError::Config {
                reason: format!("invalid {SNAPSHOT_FREQUENCY_ENV}: {e}"),
            })?,
            None => 0,
        };

        let store_timeout = match lookup(STORE_TIMEOUT_ENV) {
            Some(raw) => {
                let millis = raw.trim().parse::<u64>().map_err(|e| DomainError::Config {
                    reason: format!("invalid {STORE_TIMEOUT_ENV}: {e}"),
                })?;
                (millis > 0).then(|| Duration::from_millis(millis))
            }
            None => None,
        };

        Ok(Self {
            snapshot_frequency,
            store_timeout,
        })
    }

    pub fn snapshot_policy(&self) -> SnapshotPolicy {
        SnapshotPolicy::from_frequency(self.snapshot_frequency)
    }
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis))
}
