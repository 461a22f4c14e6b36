//! Query context - shared connection, parameter snapshot, cursor registry
//!
//! One `QueryContext` backs every sequence and cursor of a logical query
//! session. Constructing a context performs no connection activity; the
//! first cursor to advance opens the connection, and the last owner to
//! dispose closes it.

use crate::config::CursorConfig;
use crate::error::{CursorError, Result};
use crate::query::registry::CursorRegistry;
use crate::source::Connection;
use crate::types::ParameterSet;
use parking_lot::Mutex;
use std::sync::Arc;

/// Ref-counted handle over one physical connection
///
/// Several cursors may hold the connection open at once; the physical
/// open happens on the 0 -> 1 transition and the physical close on
/// 1 -> 0, so the connection is released exactly once no matter how many
/// cursors shared it.
pub struct SharedConnection {
    inner: Arc<dyn Connection>,
    open_count: Mutex<usize>,
}

impl SharedConnection {
    pub fn new(inner: Arc<dyn Connection>) -> Self {
        Self {
            inner,
            open_count: Mutex::new(0),
        }
    }

    /// Acquire the connection, physically opening it for the first owner
    pub fn open(&self) -> Result<()> {
        let mut count = self.open_count.lock();
        if *count == 0 {
            self.inner.open()?;
        }
        *count += 1;
        Ok(())
    }

    /// Release the connection, physically closing it with the last owner
    pub fn close(&self) -> Result<()> {
        let mut count = self.open_count.lock();
        match *count {
            0 => Err(CursorError::Connection(
                "unbalanced close on shared connection".to_string(),
            )),
            1 => {
                self.inner.close()?;
                *count = 0;
                Ok(())
            }
            _ => {
                *count -= 1;
                Ok(())
            }
        }
    }

    /// Current number of owners holding the connection open
    pub fn open_count(&self) -> usize {
        *self.open_count.lock()
    }

    /// The underlying physical connection
    pub fn raw(&self) -> &dyn Connection {
        self.inner.as_ref()
    }
}

/// Context shared by all cursors of one logical query session
pub struct QueryContext {
    connection: SharedConnection,
    parameters: ParameterSet,
    registry: CursorRegistry,
    config: CursorConfig,
}

impl QueryContext {
    /// Create a context over a physical connection
    ///
    /// No connection activity happens here.
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self {
            connection: SharedConnection::new(connection),
            parameters: ParameterSet::new(),
            registry: CursorRegistry::new(),
            config: CursorConfig::default(),
        }
    }

    /// Set the parameter snapshot (builder style, before sharing)
    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the cursor configuration (builder style, before sharing)
    pub fn with_config(mut self, config: CursorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn connection(&self) -> &SharedConnection {
        &self.connection
    }

    /// Read-only parameter snapshot
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn registry(&self) -> &CursorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CursorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::memory::MemoryConnection;

    #[test]
    fn test_shared_connection_refcount() {
        let physical = Arc::new(MemoryConnection::new());
        let shared = SharedConnection::new(physical.clone());

        shared.open().unwrap();
        shared.open().unwrap();
        assert_eq!(shared.open_count(), 2);
        assert_eq!(physical.opens(), 1); // only the first owner opens

        shared.close().unwrap();
        assert_eq!(physical.closes(), 0); // still one owner left
        shared.close().unwrap();
        assert_eq!(physical.closes(), 1);
        assert!(!physical.is_open());
    }

    #[test]
    fn test_unbalanced_close_fails() {
        let shared = SharedConnection::new(Arc::new(MemoryConnection::new()));
        assert!(shared.close().is_err());
    }

    #[test]
    fn test_failed_physical_open_keeps_count_zero() {
        let physical = Arc::new(MemoryConnection::new());
        physical.open().unwrap(); // simulate an externally held connection

        let shared = SharedConnection::new(physical.clone());
        assert!(shared.open().is_err()); // double physical open
        assert_eq!(shared.open_count(), 0);
    }

    #[test]
    fn test_context_construction_is_inert() {
        let physical = Arc::new(MemoryConnection::new());
        let context = QueryContext::new(physical.clone())
            .with_parameters(ParameterSet::new().with("id", 1i64))
            .with_config(CursorConfig::for_testing());

        assert_eq!(physical.opens(), 0);
        assert!(!physical.is_open());
        assert_eq!(context.parameters().len(), 1);
        assert_eq!(context.registry().active_count(), 0);
    }
}
