//! Cursor registry - bookkeeping of cursors sharing one connection
//!
//! The physical connection has a single raw-reader slot. Before a new
//! cursor may open its own reader, every other live cursor must give the
//! slot up by draining into memory. The registry tracks who is live and
//! performs that hand-off; it never owns the connection's lifetime.
//!
//! The registry sees cursors only through the narrow [`BufferCursor`]
//! capability, never their full state machine.

use crate::error::Result;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

/// Cursor identity (unique across the process)
pub type CursorId = u64;

static NEXT_CURSOR_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a fresh cursor identity
pub(crate) fn next_cursor_id() -> CursorId {
    NEXT_CURSOR_ID.fetch_add(1, Ordering::Relaxed)
}

/// Capability a cursor grants the registry: identity plus forced drain
pub trait BufferCursor: Send + Sync {
    /// Identity of this cursor
    fn cursor_id(&self) -> CursorId;

    /// Synchronously drain all remaining rows into an in-memory backlog
    ///
    /// Idempotent; a no-op unless the cursor is currently streaming.
    fn buffer_all(&self) -> Result<()>;
}

/// Set of currently-active cursors sharing one physical connection
///
/// Membership changes only via register/deregister calls issued by the
/// cursor itself. Weak references keep a leaked registry entry from
/// pinning a dropped cursor alive.
#[derive(Default)]
pub struct CursorRegistry {
    active: DashMap<CursorId, Weak<dyn BufferCursor>, RandomState>,
}

impl CursorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cursor as live
    ///
    /// Called by the cursor itself once its raw reader exists.
    pub fn register(&self, cursor: &Arc<dyn BufferCursor>) {
        let id = cursor.cursor_id();
        trace!(cursor_id = id, "registering cursor");
        self.active.insert(id, Arc::downgrade(cursor));
    }

    /// Remove a cursor from the live set
    ///
    /// Called by the cursor itself on disposal. Unknown ids are ignored.
    pub fn deregister(&self, id: CursorId) {
        trace!(cursor_id = id, "deregistering cursor");
        self.active.remove(&id);
    }

    /// Force-drain every live cursor except the requester
    ///
    /// Invoked in direct response to a new cursor's attempt to acquire the
    /// shared reader slot, and nowhere else. After this returns, no other
    /// cursor holds an unbuffered raw reader.
    pub fn drain_others(&self, requester: CursorId) -> Result<()> {
        let mut stale = Vec::new();
        let mut targets = Vec::new();

        for entry in self.active.iter() {
            let id = *entry.key();
            if id == requester {
                continue;
            }
            match entry.value().upgrade() {
                Some(cursor) => targets.push(cursor),
                None => stale.push(id),
            }
        }

        // Sweep entries whose cursor was dropped without deregistering
        for id in stale {
            self.active.remove(&id);
        }

        for cursor in targets {
            trace!(
                requester,
                cursor_id = cursor.cursor_id(),
                "force-draining cursor to free reader slot"
            );
            cursor.buffer_all()?;
        }
        Ok(())
    }

    /// Number of currently registered cursors
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}
