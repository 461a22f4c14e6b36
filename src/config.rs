//! Cursor runtime configuration
//!
//! Provides tuning knobs for forced materialization and command logging.

use serde::{Deserialize, Serialize};

/// 游标运行时配置（Cursor Runtime Configuration）
///
/// 在内存占用和强制物化性能之间做权衡：
/// - backlog_capacity: 强制物化时 backlog 队列的预分配容量
/// - log_commands: 是否在首次拉取时记录执行的命令
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorConfig {
    /// 强制物化（BufferAll）时 backlog 的预分配容量
    ///
    /// 预分配避免 drain 过程中的多次扩容。
    /// 默认 1024 行；实际行数少于该值时只浪费指针空间。
    pub backlog_capacity: usize,

    /// Log the executing command (text + parameters) at debug level
    /// on the first advance of each cursor.
    pub log_commands: bool,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            backlog_capacity: 1024,
            log_commands: true,
        }
    }
}

impl CursorConfig {
    /// 创建测试用配置（小容量，关闭日志）
    pub fn for_testing() -> Self {
        Self {
            backlog_capacity: 16,
            log_commands: false,
        }
    }

    /// 创建低内存场景配置（嵌入式设备）
    ///
    /// 性能：drain 大结果集时可能触发多次扩容
    /// 内存：初始占用最小
    pub fn low_memory() -> Self {
        Self {
            backlog_capacity: 64,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CursorConfig::default();
        assert_eq!(config.backlog_capacity, 1024);
        assert!(config.log_commands);
    }

    #[test]
    fn test_presets() {
        assert!(CursorConfig::for_testing().backlog_capacity < CursorConfig::default().backlog_capacity);
        assert!(!CursorConfig::for_testing().log_commands);
        assert!(CursorConfig::low_memory().log_commands);
    }
}
