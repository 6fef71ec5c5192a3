//! 值对象（Value Object）
//!
//! 无标识、以值相等为准的对象。目前仅包含聚合版本号 `Version`。
//!

use serde::{Deserialize, Serialize};
use std::fmt;

/// 版本号（用于乐观锁和并发控制）
///
/// 提供类型安全的版本号操作，避免直接使用 usize 导致的语义不明确问题。
/// 聚合的版本从 0 开始，每应用一个事件加 1；事件版本从 1 开始连续递增。
///
/// # 示例
///
/// ```
/// use es_domain::value_object::Version;
///
/// let v1 = Version::new();
/// assert_eq!(v1.value(), 0);
/// assert!(v1.is_new());
///
/// let v2 = v1.next();
/// assert_eq!(v2.value(), 1);
/// assert!(!v2.is_new());
///
/// assert!(v2 > v1);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Version(usize);

impl Version {
    /// 创建初始版本（版本号为 0）
    pub const fn new() -> Self {
        Self(0)
    }

    /// 从值创建版本号
    ///
    /// # 示例
    ///
    /// ```
    /// use es_domain::value_object::Version;
    ///
    /// let v = Version::from_value(5);
    /// assert_eq!(v.value(), 5);
    /// ```
    pub const fn from_value(value: usize) -> Self {
        Self(value)
    }

    /// 获取下一个版本号
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// 获取版本号的值
    pub const fn value(&self) -> usize {
        self.0
    }

    /// 检查是否为初始版本
    pub const fn is_new(&self) -> bool {
        self.0 == 0
    }

    /// 自 `earlier` 以来经过的版本数；`earlier` 更大时为 0
    ///
    /// # 示例
    ///
    /// ```
    /// use es_domain::value_object::Version;
    ///
    /// let snap = Version::from_value(5);
    /// let current = Version::from_value(12);
    /// assert_eq!(current.since(snap), 7);
    /// assert_eq!(snap.since(current), 0);
    /// ```
    pub const fn since(&self, earlier: Version) -> usize {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<usize> for Version {
    fn from(value: usize) -> Self {
        Self::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 测试初始版本创建
    #[test]
    fn test_version_new() {
        let v = Version::new();
        assert_eq!(v.value(), 0);
        assert!(v.is_new());
        assert!(!v.next().is_new());
    }

    // 测试获取下一个版本
    #[test]
    fn test_version_next() {
        let v1 = Version::from_value(10);
        let v2 = v1.next();

        assert_eq!(v1.value(), 10);
        assert_eq!(v2.value(), 11);
    }

    // 测试版本比较
    #[test]
    fn test_version_ordering() {
        let v0 = Version::from_value(0);
        let v1 = Version::from_value(1);
        let v2 = Version::from_value(2);

        assert!(v1 > v0);
        assert!(v2 >= v1);
        assert!(v0 < v2);
        assert_eq!(v1, Version::from_value(1));
    }

    // 测试版本间距（快照节奏计算使用）
    #[test]
    fn test_version_since() {
        let v = Version::new().next().next().next();
        assert_eq!(v.since(Version::new()), 3);
        assert_eq!(v.since(v), 0);
        assert_eq!(Version::new().since(v), 0);
    }

    // 测试 Display 实现
    #[test]
    fn test_version_display() {
        assert_eq!(format!("{}", Version::new()), "v0");
        assert_eq!(format!("{}", Version::from_value(5)), "v5");
    }

    // 测试序列化和反序列化
    #[test]
    fn test_version_serde() {
        let v = Version::from_value(42);

        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "42");

        let deserialized: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, v);
    }
}
