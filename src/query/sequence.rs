//! Queryable result sequence - the public entry point
//!
//! A `ResultSequence` binds a query context to a row source. Asking it to
//! iterate hands back a brand-new [`Cursor`] every time; nothing is shared
//! between successive iterations, so re-iterating re-executes the query.
//! Construction performs no connection or command activity.

use crate::error::Result;
use crate::query::context::QueryContext;
use crate::query::cursor::Cursor;
use crate::source::RowSource;
use crate::types::RowBuffer;
use std::sync::Arc;

/// Lazily evaluated sequence of result rows
pub struct ResultSequence {
    context: Arc<QueryContext>,
    source: Arc<dyn RowSource>,
}

impl ResultSequence {
    /// Bind a row source to a query context
    ///
    /// No side effects until a cursor produced from this sequence is
    /// first advanced.
    pub fn new(context: Arc<QueryContext>, source: Arc<dyn RowSource>) -> Self {
        Self { context, source }
    }

    /// Create a fresh cursor over this sequence
    ///
    /// Each call returns a new cursor bound to the same context, source
    /// and row factory; advancing it re-executes the query.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(Arc::clone(&self.context), Arc::clone(&self.source))
    }

    /// Iterate the rows of a fresh cursor
    pub fn rows(&self) -> Rows {
        Rows {
            cursor: self.cursor(),
            done: false,
        }
    }

    pub fn context(&self) -> &Arc<QueryContext> {
        &self.context
    }
}

impl<'a> IntoIterator for &'a ResultSequence {
    type Item = Result<RowBuffer>;
    type IntoIter = Rows;

    fn into_iter(self) -> Self::IntoIter {
        self.rows()
    }
}

/// Iterator adapter over one cursor
///
/// Fuses on end-of-rows and on the first error; the cursor is disposed
/// when the iterator is dropped.
pub struct Rows {
    cursor: Cursor,
    done: bool,
}

impl Iterator for Rows {
    type Item = Result<RowBuffer>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.try_advance() {
            Ok(true) => self.cursor.current().map(Ok),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CursorConfig;
    use crate::source::memory::{MemoryConnection, MemorySource};
    use crate::source::Connection;
    use crate::types::Value;

    fn sequence_over(conn: &Arc<MemoryConnection>, n: i64) -> (ResultSequence, Arc<MemorySource>) {
        let context = Arc::new(
            QueryContext::new(Arc::clone(conn) as Arc<dyn Connection>)
                .with_config(CursorConfig::for_testing()),
        );
        let rows = (1..=n).map(|i| vec![Value::Integer(i)]).collect();
        let source = Arc::new(MemorySource::new("t", rows));
        (
            ResultSequence::new(context, Arc::clone(&source) as Arc<dyn RowSource>),
            source,
        )
    }

    fn ints(sequence: &ResultSequence) -> Vec<i64> {
        sequence
            .rows()
            .map(|row| match row.unwrap()[0] {
                Value::Integer(i) => i,
                ref other => panic!("expected integer, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_sequence_construction_is_inert() {
        let conn = Arc::new(MemoryConnection::new());
        let (sequence, source) = sequence_over(&conn, 3);

        let _cursor = sequence.cursor();
        assert_eq!(conn.opens(), 0);
        assert_eq!(source.executions(), 0);
    }

    #[test]
    fn test_each_iteration_re_executes() {
        let conn = Arc::new(MemoryConnection::new());
        let (sequence, source) = sequence_over(&conn, 3);

        assert_eq!(ints(&sequence), vec![1, 2, 3]);
        assert_eq!(ints(&sequence), vec![1, 2, 3]);
        assert_eq!(source.executions(), 2);

        // Each iteration opened and released the connection
        assert_eq!(conn.opens(), 2);
        assert_eq!(conn.closes(), 2);
    }

    #[test]
    fn test_into_iterator_for_loop() {
        let conn = Arc::new(MemoryConnection::new());
        let (sequence, _source) = sequence_over(&conn, 2);

        let mut count = 0;
        for row in &sequence {
            assert_eq!(row.unwrap().len(), 1);
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_nested_iteration_shares_connection() {
        // The canonical forced-drain scenario: an inner iteration starts
        // while the outer one is mid-stream on the same context.
        let conn = Arc::new(MemoryConnection::new());
        let context = Arc::new(
            QueryContext::new(Arc::clone(&conn) as Arc<dyn Connection>)
                .with_config(CursorConfig::for_testing()),
        );

        let outer_rows: Vec<Vec<Value>> = (1..=3).map(|i| vec![Value::Integer(i)]).collect();
        let inner_rows: Vec<Vec<Value>> = (10..=11).map(|i| vec![Value::Integer(i)]).collect();
        let outer = ResultSequence::new(
            Arc::clone(&context),
            Arc::new(MemorySource::new("outer", outer_rows)),
        );
        let inner = ResultSequence::new(
            Arc::clone(&context),
            Arc::new(MemorySource::new("inner", inner_rows)),
        );

        let mut pairs = Vec::new();
        for outer_row in &outer {
            let outer_id = match outer_row.unwrap()[0] {
                Value::Integer(i) => i,
                _ => unreachable!(),
            };
            for inner_row in &inner {
                let inner_id = match inner_row.unwrap()[0] {
                    Value::Integer(i) => i,
                    _ => unreachable!(),
                };
                pairs.push((outer_id, inner_id));
            }
        }

        assert_eq!(
            pairs,
            vec![(1, 10), (1, 11), (2, 10), (2, 11), (3, 10), (3, 11)]
        );

        // All cursors were dropped; the connection is fully released
        assert_eq!(context.registry().active_count(), 0);
        assert!(!conn.is_open());
        assert_eq!(conn.opens(), conn.closes());
    }

    #[test]
    fn test_rows_iterator_fuses_after_error() {
        struct FailingSecondRead {
            fired: bool,
        }

        impl crate::source::RowReader for FailingSecondRead {
            fn read(&mut self) -> Result<bool> {
                if self.fired {
                    Err(crate::error::CursorError::Execution(
                        "wire dropped".to_string(),
                    ))
                } else {
                    self.fired = true;
                    Ok(true)
                }
            }

            fn column_count(&self) -> usize {
                1
            }

            fn value(&self, _index: usize) -> Result<Value> {
                Ok(Value::Integer(1))
            }
        }

        struct FlakySource;

        impl RowSource for FlakySource {
            fn command(&self, parameters: &crate::types::ParameterSet) -> crate::source::Command {
                crate::source::Command::new("SCAN flaky", parameters.clone())
            }

            fn execute(
                &self,
                _connection: &dyn Connection,
                _parameters: &crate::types::ParameterSet,
            ) -> Result<Box<dyn crate::source::RowReader>> {
                Ok(Box::new(FailingSecondRead { fired: false }))
            }

            fn row_factory(&self) -> Arc<dyn crate::source::RowFactory> {
                Arc::new(crate::source::PositionalRowFactory)
            }
        }

        let conn = Arc::new(MemoryConnection::new());
        let context = Arc::new(
            QueryContext::new(Arc::clone(&conn) as Arc<dyn Connection>)
                .with_config(CursorConfig::for_testing()),
        );
        let sequence = ResultSequence::new(context, Arc::new(FlakySource));

        let mut iter = sequence.rows();
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none()); // fused
    }
}
