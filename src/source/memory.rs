//! In-memory row source backend
//!
//! A complete in-process implementation of the collaborator traits, used as
//! the built-in backend for embedding and as the controllable fixture for
//! the runtime's own tests. The connection counts physical opens and closes
//! so shared-ownership bugs show up as assertion failures instead of silent
//! double-closes.

use crate::error::{CursorError, Result};
use crate::source::{Command, Connection, PositionalRowFactory, RowFactory, RowReader, RowSource};
use crate::types::{ParameterSet, Value};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct ConnState {
    open: bool,
    opens: u64,
    closes: u64,
}

/// In-memory physical connection with open/close accounting
#[derive(Debug, Default)]
pub struct MemoryConnection {
    state: Mutex<ConnState>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cumulative number of physical opens
    pub fn opens(&self) -> u64 {
        self.state.lock().opens
    }

    /// Cumulative number of physical closes
    pub fn closes(&self) -> u64 {
        self.state.lock().closes
    }
}

impl Connection for MemoryConnection {
    fn open(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.open {
            return Err(CursorError::Connection(
                "connection already open".to_string(),
            ));
        }
        state.open = true;
        state.opens += 1;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(CursorError::Connection(
                "connection already closed".to_string(),
            ));
        }
        state.open = false;
        state.closes += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }
}

/// In-memory forward-only reader over a row snapshot
pub struct MemoryReader {
    rows: Vec<Vec<Value>>,
    column_count: usize,
    /// Position of the current row; None before the first read()
    pos: Option<usize>,
}

impl MemoryReader {
    fn new(rows: Vec<Vec<Value>>) -> Self {
        let column_count = rows.first().map_or(0, Vec::len);
        Self {
            rows,
            column_count,
            pos: None,
        }
    }
}

impl RowReader for MemoryReader {
    fn read(&mut self) -> Result<bool> {
        let next = self.pos.map_or(0, |p| p + 1);
        if next < self.rows.len() {
            self.pos = Some(next);
            Ok(true)
        } else {
            // Stay past the end; further reads keep returning false
            self.pos = Some(self.rows.len());
            Ok(false)
        }
    }

    fn column_count(&self) -> usize {
        self.column_count
    }

    fn value(&self, index: usize) -> Result<Value> {
        let row = self
            .pos
            .and_then(|p| self.rows.get(p))
            .ok_or_else(|| CursorError::Execution("no current row".to_string()))?;
        row.get(index)
            .cloned()
            .ok_or(CursorError::ColumnOutOfRange {
                index,
                count: row.len(),
            })
    }
}

/// In-memory row source over a named rowset
///
/// `execute` snapshots the rows at execution time and counts executions, so
/// deferred-execution behavior is observable from tests.
pub struct MemorySource {
    name: String,
    rows: Vec<Vec<Value>>,
    factory: Arc<dyn RowFactory>,
    executions: AtomicUsize,
}

impl MemorySource {
    /// Create a source over the given rows
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            name: name.into(),
            rows,
            factory: Arc::new(PositionalRowFactory),
            executions: AtomicUsize::new(0),
        }
    }

    /// Replace the row factory
    pub fn with_factory(mut self, factory: Arc<dyn RowFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Number of times `execute` has run (one per started cursor)
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

impl RowSource for MemorySource {
    fn command(&self, parameters: &ParameterSet) -> Command {
        Command::new(format!("SCAN {}", self.name), parameters.clone())
    }

    fn execute(
        &self,
        connection: &dyn Connection,
        _parameters: &ParameterSet,
    ) -> Result<Box<dyn RowReader>> {
        if !connection.is_open() {
            return Err(CursorError::ConnectionClosed);
        }
        self.executions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryReader::new(self.rows.clone())))
    }

    fn row_factory(&self) -> Arc<dyn RowFactory> {
        Arc::clone(&self.factory)
    }
}
