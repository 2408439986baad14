//! # Hash index
//!
//! A disk-resident hash table with separate chaining, mapping license plates
//! to the byte offsets of their lines in the record store.
//!
//! The index is built once by [`IndexBuilder`] and then only read, by
//! [`IndexReader`]. There is no update, delete or resize: to change the
//! dataset, rebuild.
//!
//! ## Files
//!
//! ```text
//! hash table (N slots)           node store (append-only)         record store
//! ┌──────────────┐               ┌──────────────────────────┐     ┌──────────────┐
//! │ slot[h(p)] ──┼──────────────▶│ key | data_off | next ───┼──┐  │ header       │
//! │ -1           │               ├──────────────────────────┤  │  │ line @ off   │
//! │ ...          │          ┌───▶│ key | data_off | -1      │  │  │ ...          │
//! └──────────────┘          │    └──────────────────────────┘  │  └──────────────┘
//!                           └──────────────────────────────────┘
//! ```
//!
//! Each bucket holds the offset of the newest node of its chain. Nodes are
//! prepended, so a chain lists records from most to least recently indexed.
//! `h(p)` is DJB2 over the plate bytes modulo the table size.
//!
//! All integers are little-endian `i64`; -1 marks an empty bucket or the end
//! of a chain. See [`format`] for the exact layout.

pub mod format;
mod reader;
mod writer;

pub use format::{IndexError, Slot, DEFAULT_TABLE_SIZE, NODE_BYTES, SLOT_BYTES};
pub use reader::{Hit, IndexReader, IndexStats, Lookup};
pub use writer::{BuildStats, IndexBuilder};
