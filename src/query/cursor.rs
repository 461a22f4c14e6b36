//! Cursor state machine - lazy pull, forced materialization, disposal
//!
//! A cursor drives one logical iteration over a query's results. Nothing
//! touches the connection until the first advance; from then on rows
//! stream one at a time from the raw reader. When another cursor needs
//! the shared connection, the registry forces this one to drain its
//! remaining rows into an in-memory backlog, after which it keeps serving
//! rows from the backlog as if nothing happened.
//!
//! State transitions:
//!
//! ```text
//! Unstarted ──▶ Streaming ──▶ Exhausted
//!                  │   ▲
//!                  ▼   └── (buffer_all)
//!              Buffering ──▶ Exhausted
//!
//! Failed   : reachable from Unstarted/Streaming on any error (permanent)
//! Disposed : reachable from every state (idempotent)
//! ```

use crate::error::{CursorError, Result};
use crate::query::context::QueryContext;
use crate::query::registry::{next_cursor_id, BufferCursor, CursorId};
use crate::source::{RowFactory, RowReader, RowSource};
use crate::types::RowBuffer;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Externally observable cursor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Created, nothing executed yet
    Unstarted,
    /// Raw reader open, rows stream directly from the connection
    Streaming,
    /// Remaining rows were drained; serving from the in-memory backlog
    Buffering,
    /// End of rows reached
    Exhausted,
    /// A connection, execution or conversion error made the cursor unusable
    Failed,
    /// Resources released
    Disposed,
}

struct CursorCore {
    state: CursorState,
    /// Raw reader; opened at most once, closed exactly once (on disposal)
    reader: Option<Box<dyn RowReader>>,
    factory: Option<Arc<dyn RowFactory>>,
    /// Drained rows in original order, present only after forced drain
    backlog: Option<VecDeque<RowBuffer>>,
    current: Option<RowBuffer>,
    /// Whether this cursor holds a share of the connection
    holds_connection: bool,
    backlog_capacity: usize,
}

/// Read one row from the raw reader and materialize it
fn pull_streaming(core: &mut CursorCore) -> Result<Option<RowBuffer>> {
    let CursorCore {
        reader, factory, ..
    } = core;
    let reader = reader
        .as_mut()
        .ok_or_else(|| CursorError::Execution("streaming cursor has no reader".to_string()))?;
    let factory = factory
        .as_ref()
        .ok_or_else(|| CursorError::Execution("streaming cursor has no row factory".to_string()))?;

    if reader.read()? {
        Ok(Some(factory.create_row(&**reader)?))
    } else {
        Ok(None)
    }
}

/// Identity plus the lockable core, shared with the registry
struct CursorShared {
    id: CursorId,
    core: Mutex<CursorCore>,
}

impl CursorShared {
    /// Synchronously drain all remaining rows into a backlog
    ///
    /// Idempotent: only a streaming cursor without a backlog drains.
    fn drain_into_backlog(&self) -> Result<()> {
        let mut core = self.core.lock();
        if core.state != CursorState::Streaming || core.backlog.is_some() {
            return Ok(());
        }

        let mut backlog = VecDeque::with_capacity(core.backlog_capacity);
        loop {
            match pull_streaming(&mut core) {
                Ok(Some(row)) => backlog.push_back(row),
                Ok(None) => break,
                Err(err) => {
                    core.current = None;
                    core.state = CursorState::Failed;
                    return Err(err);
                }
            }
        }

        debug!(
            cursor_id = self.id,
            rows = backlog.len(),
            "drained streaming cursor into backlog"
        );
        core.backlog = Some(backlog);
        core.state = CursorState::Buffering;
        Ok(())
    }
}

impl BufferCursor for CursorShared {
    fn cursor_id(&self) -> CursorId {
        self.id
    }

    fn buffer_all(&self) -> Result<()> {
        self.drain_into_backlog()
    }
}

/// Lazy forward-only cursor over one query execution
///
/// Obtained from [`ResultSequence::cursor`](crate::query::ResultSequence::cursor).
/// Pull-based: `try_advance` moves to the next row, `current` reads it.
/// Dropping the cursor disposes it; `dispose` does so explicitly.
pub struct Cursor {
    shared: Arc<CursorShared>,
    context: Arc<QueryContext>,
    source: Arc<dyn RowSource>,
}

impl Cursor {
    pub(crate) fn new(context: Arc<QueryContext>, source: Arc<dyn RowSource>) -> Self {
        let backlog_capacity = context.config().backlog_capacity;
        Self {
            shared: Arc::new(CursorShared {
                id: next_cursor_id(),
                core: Mutex::new(CursorCore {
                    state: CursorState::Unstarted,
                    reader: None,
                    factory: None,
                    backlog: None,
                    current: None,
                    holds_connection: false,
                    backlog_capacity,
                }),
            }),
            context,
            source,
        }
    }

    /// Identity of this cursor within its registry
    pub fn id(&self) -> CursorId {
        self.shared.id
    }

    /// Current state of the state machine
    pub fn state(&self) -> CursorState {
        self.shared.core.lock().state
    }

    /// The row the last successful advance stopped on
    ///
    /// Cleared on exhaustion and disposal, so callers never observe a
    /// stale row.
    pub fn current(&self) -> Option<RowBuffer> {
        self.shared.core.lock().current.clone()
    }

    /// Advance to the next row
    ///
    /// Returns Ok(true) with `current` set when a row is available and
    /// Ok(false) at end of rows. The first call opens the connection,
    /// executes the command and registers the cursor; errors surface
    /// verbatim and make the cursor permanently unusable.
    pub fn try_advance(&mut self) -> Result<bool> {
        let mut core = self.shared.core.lock();
        loop {
            match core.state {
                CursorState::Unstarted => self.start(&mut core)?,
                CursorState::Streaming => {
                    return match pull_streaming(&mut core) {
                        Ok(Some(row)) => {
                            core.current = Some(row);
                            Ok(true)
                        }
                        Ok(None) => {
                            core.current = None;
                            core.state = CursorState::Exhausted;
                            Ok(false)
                        }
                        Err(err) => {
                            core.current = None;
                            core.state = CursorState::Failed;
                            Err(err)
                        }
                    };
                }
                CursorState::Buffering => {
                    return match core.backlog.as_mut().and_then(VecDeque::pop_front) {
                        Some(row) => {
                            core.current = Some(row);
                            Ok(true)
                        }
                        None => {
                            core.current = None;
                            core.state = CursorState::Exhausted;
                            Ok(false)
                        }
                    };
                }
                CursorState::Exhausted => return Ok(false),
                CursorState::Failed => return Err(CursorError::CursorFaulted),
                CursorState::Disposed => return Err(CursorError::CursorDisposed),
            }
        }
    }

    /// First-advance initialization: open, drain others, execute, register
    fn start(&self, core: &mut CursorCore) -> Result<()> {
        let context = &self.context;

        if let Err(err) = context.connection().open() {
            core.state = CursorState::Failed;
            return Err(err);
        }

        // Past this point a failure must give the connection share back.
        let acquired: Result<Box<dyn RowReader>> = (|| {
            context.registry().drain_others(self.shared.id)?;

            if context.config().log_commands {
                let command = self.source.command(context.parameters());
                debug!(
                    cursor_id = self.shared.id,
                    command = %command,
                    "executing query command"
                );
            }

            let reader = self
                .source
                .execute(context.connection().raw(), context.parameters())?;
            self.source.notify_reader_created(reader.as_ref());
            Ok(reader)
        })();

        match acquired {
            Ok(reader) => {
                core.reader = Some(reader);
                core.factory = Some(self.source.row_factory());
                core.holds_connection = true;
                core.state = CursorState::Streaming;

                let as_cursor: Arc<dyn BufferCursor> = Arc::clone(&self.shared) as _;
                context.registry().register(&as_cursor);
                Ok(())
            }
            Err(err) => {
                if let Err(close_err) = context.connection().close() {
                    warn!(
                        cursor_id = self.shared.id,
                        error = %close_err,
                        "failed to release connection after failed start"
                    );
                }
                core.state = CursorState::Failed;
                Err(err)
            }
        }
    }

    /// Force materialization of all remaining rows into a backlog
    ///
    /// Idempotent; a no-op in every state except `Streaming`. Afterwards
    /// the cursor behaves identically from the outside, serving rows from
    /// the backlog instead of the raw reader.
    pub fn buffer_all(&self) -> Result<()> {
        self.shared.drain_into_backlog()
    }

    /// Asynchronous drain is not supported
    ///
    /// Fails immediately without performing any work.
    pub fn buffer_all_async(&self) -> Result<()> {
        Err(CursorError::AsyncDrainUnsupported)
    }

    /// Cursors cannot rewind once started
    pub fn reset(&mut self) -> Result<()> {
        Err(CursorError::ResetUnsupported)
    }

    /// Release the raw reader, deregister, and give the connection back
    ///
    /// Safe to call in any state and safe to call repeatedly. Disposing a
    /// cursor that never advanced releases nothing and never fails.
    pub fn dispose(&mut self) -> Result<()> {
        self.dispose_inner()
    }

    fn dispose_inner(&self) -> Result<()> {
        let mut core = self.shared.core.lock();
        if core.state == CursorState::Disposed {
            return Ok(());
        }

        let held = core.holds_connection;
        core.holds_connection = false;
        core.reader = None; // closes the raw reader
        core.backlog = None;
        core.current = None;
        core.state = CursorState::Disposed;
        drop(core);

        if held {
            self.context.registry().deregister(self.shared.id);
            self.context.connection().close()?;
        }
        Ok(())
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if let Err(err) = self.dispose_inner() {
            warn!(
                cursor_id = self.shared.id,
                error = %err,
                "cursor disposal during drop failed"
            );
        }
    }
}
