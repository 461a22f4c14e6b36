//! Rowstream Cursor Runtime
//!
//! 面向嵌入式查询引擎的延迟游标运行时
//!
//! ## 核心特性
//! - 延迟执行：构造序列/游标零副作用，首次拉取才打开连接
//! - 单连接单读取器：新游标启动时其他游标自动物化到内存 backlog
//! - 前向流式：逐行拉取，无需整体加载结果集
//! - 协作式 drain：同一控制流内完成读取器槽位交接，无需加锁等待
//!
//! ## 架构
//! - 类型层: Value / RowBuffer / ParameterSet
//! - 协作者层: Connection / RowReader / RowFactory / RowSource trait 接口
//! - 查询层: QueryContext + CursorRegistry + Cursor 状态机 + ResultSequence
//! - 会话层: Session 简化 API 包装

pub mod config;
pub mod query;
pub mod source;
pub mod types;

mod api;
mod error;

pub use api::Session;
pub use config::CursorConfig;
pub use error::{CursorError, Result};
pub use query::{Cursor, CursorState, QueryContext, ResultSequence, Rows};
pub use source::memory::{MemoryConnection, MemoryReader, MemorySource};
pub use source::{Command, Connection, PositionalRowFactory, RowFactory, RowReader, RowSource};
pub use types::{ParameterSet, RowBuffer, Value};
