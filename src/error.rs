//! Error types for the rowstream cursor runtime

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CursorError>;

#[derive(Error, Debug)]
pub enum CursorError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection is not open")]
    ConnectionClosed,

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Row conversion error: {0}")]
    RowConversion(String),

    #[error("Column index {index} out of range ({count} columns)")]
    ColumnOutOfRange { index: usize, count: usize },

    #[error("Cursor has failed and cannot advance further")]
    CursorFaulted,

    #[error("Cursor has been disposed")]
    CursorDisposed,

    #[error("Asynchronous buffering is not supported")]
    AsyncDrainUnsupported,

    #[error("Cursors cannot be reset once started")]
    ResetUnsupported,

    #[error("Registry error: {0}")]
    Registry(String),
}
