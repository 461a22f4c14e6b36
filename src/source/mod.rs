//! Row source collaborator contracts
//!
//! The cursor runtime does not build SQL, open sockets, or decode wire
//! formats itself. Everything it needs from the outside world enters
//! through the traits in this module:
//!
//! - [`Connection`]: physical connection start/stop signaling
//! - [`RowReader`]: the forward-only, single-pass raw reading handle
//! - [`RowFactory`]: converts the reader's current raw row into a [`RowBuffer`]
//! - [`RowSource`]: builds + executes the command and hands out the reader
//!
//! The traits are deliberately narrow so the runtime can be exercised
//! against the in-memory backend in [`memory`] as well as a real driver.

pub mod memory;

use crate::error::Result;
use crate::types::{ParameterSet, RowBuffer, Value};
use std::fmt;
use std::sync::Arc;

/// Physical connection start/stop signaling
///
/// Opening and closing beyond this signal (sockets, pools, handshakes) is
/// the implementor's business. The runtime guarantees balanced calls:
/// one `close` for each successful `open`.
pub trait Connection: Send + Sync {
    /// Open the physical connection
    fn open(&self) -> Result<()>;

    /// Close the physical connection
    fn close(&self) -> Result<()>;

    /// Check whether the connection is currently open
    fn is_open(&self) -> bool;
}

/// Forward-only, single-pass raw row reading handle
///
/// Obtained from [`RowSource::execute`]. The shared connection permits only
/// one open reader at a time, so at most one streaming cursor owns one.
pub trait RowReader: Send {
    /// Advance to the next raw row
    ///
    /// Returns Ok(true) if a row is available, Ok(false) at end of rows.
    fn read(&mut self) -> Result<bool>;

    /// Number of columns in the current result shape
    fn column_count(&self) -> usize;

    /// Read a column of the current raw row by position
    fn value(&self, index: usize) -> Result<Value>;
}

/// Converts the reader's current raw row into a [`RowBuffer`]
pub trait RowFactory: Send + Sync {
    /// Materialize the reader's current row
    fn create_row(&self, reader: &dyn RowReader) -> Result<RowBuffer>;
}

/// Default row factory: copies all columns in position order
#[derive(Debug, Default, Clone, Copy)]
pub struct PositionalRowFactory;

impl RowFactory for PositionalRowFactory {
    fn create_row(&self, reader: &dyn RowReader) -> Result<RowBuffer> {
        let count = reader.column_count();
        let mut values = Vec::with_capacity(count);
        for index in 0..count {
            values.push(reader.value(index)?);
        }
        Ok(RowBuffer::new(values))
    }
}

/// Descriptor of the command a row source is about to execute
///
/// Used for the executing-command log announcement on first pull.
#[derive(Debug, Clone)]
pub struct Command {
    /// Command text (SQL or equivalent)
    pub text: String,
    /// Parameter snapshot the command runs with
    pub parameters: ParameterSet,
}

impl Command {
    pub fn new(text: impl Into<String>, parameters: ParameterSet) -> Self {
        Self {
            text: text.into(),
            parameters,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parameters.is_empty() {
            write!(f, "{}", self.text)
        } else {
            write!(f, "{} -- params: {}", self.text, self.parameters.to_json())
        }
    }
}

/// Builds and executes the query command against the physical connection
///
/// One `RowSource` can back many cursors over time, but `execute` is called
/// exactly once per cursor, on that cursor's first advance.
pub trait RowSource: Send + Sync {
    /// Describe the command that `execute` would run with these parameters
    fn command(&self, parameters: &ParameterSet) -> Command;

    /// Build and execute the command, returning the raw row reader
    fn execute(
        &self,
        connection: &dyn Connection,
        parameters: &ParameterSet,
    ) -> Result<Box<dyn RowReader>>;

    /// The factory that converts raw rows into row buffers
    fn row_factory(&self) -> Arc<dyn RowFactory>;

    /// Hook fired after the reader is obtained, before the first row is pulled
    ///
    /// Lets a source bind its factory to reader metadata (column shape).
    fn notify_reader_created(&self, _reader: &dyn RowReader) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::memory::{MemoryConnection, MemorySource};

    #[test]
    fn test_command_display() {
        let cmd = Command::new("SELECT * FROM robots", ParameterSet::new());
        assert_eq!(cmd.to_string(), "SELECT * FROM robots");

        let cmd = Command::new(
            "SELECT * FROM robots WHERE age > :min",
            ParameterSet::new().with("min", 3i64),
        );
        let rendered = cmd.to_string();
        assert!(rendered.starts_with("SELECT * FROM robots WHERE age > :min"));
        assert!(rendered.contains("\"min\":3"));
    }

    #[test]
    fn test_positional_factory_copies_all_columns() {
        let conn = MemoryConnection::new();
        conn.open().unwrap();

        let source = MemorySource::new(
            "robots",
            vec![vec![Value::Integer(1), Value::Text("r2d2".into())]],
        );
        let mut reader = source.execute(&conn, &ParameterSet::new()).unwrap();
        assert!(reader.read().unwrap());

        let row = PositionalRowFactory.create_row(reader.as_ref()).unwrap();
        assert_eq!(row.len(), 2);
        assert_eq!(row[1], Value::Text("r2d2".into()));
    }
}
