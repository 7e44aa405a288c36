//! Skriva is a user-space log-structured filesystem over a fixed-size disk
//! image of 4 KiB blocks. Every mutation appends a block at the tail of the
//! log instead of overwriting in place; a persistent inode map translates
//! stable inode numbers to the block currently holding each inode, and a
//! compacting garbage collector reclaims the space obsoleted by superseded
//! appends.
//!
//! Layers, from bottom to top:
//! 1. Storage: positioned block reads/writes over a file or memory buffer.
//! 2. Log writer: append at the tail, per-segment summaries, checkpoints.
//! 3. Inode layer: inode map lookups, copy-on-write inode versions.
//! 4. Path/directory layer: the single-level root directory.
//! 5. Operations: attr, list, read, create, write, truncate.
//! 6. FUSE adapter: serves the operations to the kernel via `fuser`.

pub mod block;
pub mod error;
pub mod fs;
pub mod fuse;
pub mod storage;

pub use error::{FsError, Result};
