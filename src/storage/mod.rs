//! Persistence for collector progress
//!
//! Cursor state lives in small JSON files that are replaced atomically at
//! every block boundary. Block history, lifetime TLD totals, and the upload
//! outbox live in a SQLite ledger.

mod cursor_file;
mod ledger;
mod schema;
mod traits;

pub use cursor_file::JsonCursorStore;
pub use ledger::{
    BlockRecord, Ledger, LifetimeTotals, NewBlock, OutboxEntry, PendingUpload, UploadStatus,
};
pub use traits::{CursorStore, StorageError, StorageResult};
