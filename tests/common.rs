//! Common utilities for tests.
#![allow(unused)]

use skriva::fs::Filesystem;
use skriva::storage::{MemStorage, Storage};

pub const TOTAL_BLOCKS: u32 = 1024;

/// A freshly formatted in-memory filesystem, seeded with `/hello.txt`.
pub fn fresh_fs() -> Filesystem<MemStorage> {
    Filesystem::format(MemStorage::new(TOTAL_BLOCKS)).unwrap()
}

/// Checks the cross-operation invariants: the tail stays inside the image,
/// every inode map entry points into the log at a block holding the right
/// inode, and every live direct pointer lands inside the log.
pub fn check_invariants<S: Storage>(fs: &Filesystem<S>) {
    let log_start = fs.superblock().log_start.get();
    let total = fs.superblock().total_blocks.get();
    let tail = fs.log_tail();
    assert!(log_start <= tail && tail <= total);

    for (ino, addr) in fs.inode_map().entries() {
        assert!(
            (log_start..tail).contains(&addr),
            "inode {ino} block {addr} outside the log"
        );
        let inode = fs.inode_read(ino).unwrap();
        assert_eq!(inode.inode_no.get(), ino, "inode map entry {ino} is stale");
        for direct in inode.direct {
            let direct = direct.get();
            if direct != 0 {
                assert!(
                    (log_start..tail).contains(&direct),
                    "inode {ino} data block {direct} outside the log"
                );
            }
        }
    }
}
