//! Rowstream Public API
//!
//! 面向嵌入式查询引擎的共享连接游标会话 API
//!
//! # 核心特性
//! - **延迟执行**: 构造序列不触碰连接，首次拉取才执行命令
//! - **单连接多游标**: 新游标启动时自动物化其他游标（forced drain）
//! - **流式读取**: 逐行拉取，不整体加载结果集

use crate::config::CursorConfig;
use crate::query::{QueryContext, ResultSequence};
use crate::source::{Connection, RowSource};
use crate::types::ParameterSet;
use std::sync::Arc;

/// 查询会话（Session）
///
/// 将物理连接、参数快照和配置打包为一个共享的 [`QueryContext`]，
/// 并为行源创建结果序列。
///
/// # 快速开始
///
/// ```
/// use rowstream::{MemoryConnection, MemorySource, Session, Value};
/// use std::sync::Arc;
///
/// let conn = Arc::new(MemoryConnection::new());
/// let session = Session::new(conn);
///
/// let source = Arc::new(MemorySource::new(
///     "robots",
///     vec![vec![Value::Integer(1)], vec![Value::Integer(2)]],
/// ));
/// let sequence = session.sequence(source);
///
/// for row in &sequence {
///     let row = row.unwrap();
///     println!("{:?}", row.get(0));
/// }
/// ```
pub struct Session {
    context: Arc<QueryContext>,
}

impl Session {
    /// 基于物理连接创建会话（默认配置，空参数）
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self::with_context(QueryContext::new(connection))
    }

    /// 基于完整构造的上下文创建会话
    pub fn with_context(context: QueryContext) -> Self {
        Self {
            context: Arc::new(context),
        }
    }

    /// 基于连接、参数和配置创建会话
    pub fn with_options(
        connection: Arc<dyn Connection>,
        parameters: ParameterSet,
        config: CursorConfig,
    ) -> Self {
        Self::with_context(
            QueryContext::new(connection)
                .with_parameters(parameters)
                .with_config(config),
        )
    }

    /// 为一个行源创建结果序列
    ///
    /// 返回的序列每次迭代都会创建新游标并重新执行查询。
    pub fn sequence(&self, source: Arc<dyn RowSource>) -> ResultSequence {
        ResultSequence::new(Arc::clone(&self.context), source)
    }

    /// 会话共享的查询上下文
    pub fn context(&self) -> &Arc<QueryContext> {
        &self.context
    }

    /// 当前活跃（已注册）的游标数
    pub fn active_cursors(&self) -> usize {
        self.context.registry().active_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::memory::{MemoryConnection, MemorySource};
    use crate::types::Value;

    #[test]
    fn test_session_sequence_roundtrip() {
        let conn = Arc::new(MemoryConnection::new());
        let session = Session::with_options(
            Arc::clone(&conn) as Arc<dyn Connection>,
            ParameterSet::new().with("limit", 10i64),
            CursorConfig::for_testing(),
        );

        let source = Arc::new(MemorySource::new(
            "t",
            vec![vec![Value::Integer(1)], vec![Value::Integer(2)]],
        ));
        let sequence = session.sequence(source);

        let values: Vec<_> = sequence
            .rows()
            .map(|row| row.unwrap()[0].clone())
            .collect();
        assert_eq!(values, vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(session.active_cursors(), 0);
    }

    #[test]
    fn test_session_exposes_context() {
        let conn = Arc::new(MemoryConnection::new());
        let session = Session::new(conn);
        assert!(session.context().parameters().is_empty());
        assert_eq!(session.active_cursors(), 0);
    }
}
