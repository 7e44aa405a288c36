use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};
use zerocopy::byteorder::little_endian::U32;

use crate::Result;
use crate::block::{Block, BlockAddr};
use crate::fs::Filesystem;
use crate::fs::inode::MAX_DIRECT_PTRS;
use crate::fs::log::{BLOCKS_PER_SEGMENT, is_segment_base};
use crate::fs::superblock::LOG_START;
use crate::storage::Storage;

/// Free-space headroom below which the collector runs. Tuned to trigger
/// well before the log fills so relocations always fit.
pub const GC_THRESHOLD: u32 = 700;

impl<S: Storage> Filesystem<S> {
    /// Whether the collector should run before the next append.
    pub fn gc_should_run(&self) -> bool {
        self.superblock.total_blocks.get() - self.log_tail < GC_THRESHOLD
    }

    /// Runs the collector when free space is low. Callers holding a cached
    /// inode must re-read it afterwards: the collector may have moved it.
    pub(crate) fn collect_if_due(&mut self) -> Result<bool> {
        if self.gc_should_run() {
            self.collect()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Compacts the log and rewinds the tail past the reclaimed region.
    ///
    /// Liveness is derived from the inode map, never from segment
    /// summaries, so stale summary data cannot mislead the collector. The
    /// walk proceeds in four steps: snapshot liveness, move live blocks
    /// from the end of the log into dead slots near its start (recording
    /// every move in a relocation map), apply the relocation map to the
    /// inode map and to every live inode's direct pointers in one pass,
    /// then rewind the tail to just past the highest referenced block,
    /// rounded up to a segment boundary and clamped so the tail never
    /// grows. Ends with a checkpoint.
    ///
    /// References are only rewritten after a block is safely copied, so an
    /// I/O error mid-collection aborts the current operation but leaves
    /// the filesystem correct, if fragmented.
    pub fn collect(&mut self) -> Result<()> {
        let old_tail = self.log_tail;
        let live = self.live_blocks()?;
        let dead = (LOG_START..old_tail)
            .filter(|&addr| !live.contains(&addr) && !is_segment_base(addr))
            .count();
        info!(log_tail = old_tail, dead, "gc: starting");
        if dead == 0 {
            return Ok(());
        }

        // Move live blocks from the end into dead slots near the start.
        // Summary blocks are neither sources nor destinations; they keep
        // their fixed position inside each segment.
        let mut moved: BTreeMap<BlockAddr, BlockAddr> = BTreeMap::new();
        let mut dst = LOG_START;
        let mut src = old_tail - 1;
        while dst < src {
            while dst < src && (live.contains(&dst) || is_segment_base(dst)) {
                dst += 1;
            }
            while src > dst && (!live.contains(&src) || is_segment_base(src)) {
                src -= 1;
            }
            if dst >= src {
                break;
            }
            let mut block = Block::default();
            self.storage.read_block_at(&mut block, src)?;
            self.storage.write_block_at(&block, dst)?;
            self.storage.write_block_at(&Block::default(), src)?;
            debug!(from = src, to = dst, "gc: relocated block");
            moved.insert(src, dst);
            dst += 1;
            src -= 1;
        }

        // Apply the relocation map in a single pass over the inode map.
        // Patched inodes are rewritten at their current block: the
        // collector owns the log while it runs, and patching in place
        // keeps the tail from growing mid-collection.
        let entries: Vec<(u32, BlockAddr)> = self.inode_map.entries().collect();
        for (ino, addr) in entries {
            let addr = moved.get(&addr).copied().unwrap_or(addr);
            self.inode_map.set(ino, addr);
            let mut inode = self.read_inode_at(addr)?;
            let mut patched = false;
            for j in 0..MAX_DIRECT_PTRS {
                let old = inode.direct[j].get();
                if old == 0 {
                    continue;
                }
                if let Some(&new) = moved.get(&old) {
                    inode.direct[j] = U32::new(new);
                    patched = true;
                }
            }
            if patched {
                self.storage.write_block_at(&Block::from(&inode), addr)?;
            }
        }

        // Rewind the tail past the highest referenced block.
        let mut high = LOG_START;
        for (_, addr) in self.inode_map.entries() {
            high = high.max(addr);
            let inode = self.read_inode_at(addr)?;
            for j in 0..MAX_DIRECT_PTRS {
                let direct = inode.direct[j].get();
                if direct != 0 {
                    high = high.max(direct);
                }
            }
        }
        let mut new_tail = high + 1;
        let offset = new_tail - LOG_START;
        if offset % BLOCKS_PER_SEGMENT != 0 {
            new_tail = LOG_START + (offset / BLOCKS_PER_SEGMENT + 1) * BLOCKS_PER_SEGMENT;
        }
        let new_tail = new_tail.min(old_tail);
        info!(
            moved = moved.len(),
            old_tail, new_tail, "gc: done, tail rewound"
        );
        self.log_tail = new_tail;
        self.superblock.log_tail = U32::new(new_tail);
        self.checkpoint()
    }

    /// A block is live iff the inode map points at it or a live inode's
    /// direct pointer does.
    fn live_blocks(&self) -> Result<BTreeSet<BlockAddr>> {
        let mut live = BTreeSet::new();
        for (_, addr) in self.inode_map.entries() {
            live.insert(addr);
            let inode = self.read_inode_at(addr)?;
            for j in 0..MAX_DIRECT_PTRS {
                let direct = inode.direct[j].get();
                if direct != 0 {
                    live.insert(direct);
                }
            }
        }
        Ok(live)
    }
}
