//! Query execution surface: context, registry, cursor, result sequence

mod context;
mod cursor;
mod registry;
mod sequence;

pub use context::{QueryContext, SharedConnection};
pub use cursor::{Cursor, CursorState};
pub use registry::{BufferCursor, CursorId, CursorRegistry};
pub use sequence::{ResultSequence, Rows};
