use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes};

use crate::block::{Block, BlockAddr};
use crate::fs::Filesystem;
use crate::fs::superblock::{INODE_MAP_ADDR, LOG_START, SUPER_ADDR};
use crate::storage::Storage;
use crate::{FsError, Result};

/// Blocks per segment, summary included.
pub const BLOCKS_PER_SEGMENT: u32 = 32;

/// Entries in a segment summary, one per block of the segment.
pub const SUMMARY_ENTRIES: usize = BLOCKS_PER_SEGMENT as usize;

/// Owner record for one block of a segment: which inode claims the block,
/// and (for data blocks) the index into that inode's `direct[]`. Inode
/// blocks carry `block_idx = 0`; the inode map disambiguates.
#[repr(C)]
#[derive(Clone, Copy)]
#[derive(FromBytes, IntoBytes, Immutable)]
pub struct SummaryEntry {
    pub inode_no: U32,
    pub block_idx: U32,
}

/// Per-segment owner metadata, stored in the segment's first block.
/// Entry 0 is reserved; that block is the summary itself.
#[repr(C)]
#[derive(Clone, Copy)]
#[derive(FromBytes, IntoBytes, Immutable)]
pub struct SegmentSummary {
    pub entries: [SummaryEntry; SUMMARY_ENTRIES],
}

/// The segment grid is anchored at `LOG_START`: segment `s` occupies
/// `[LOG_START + 32*s, LOG_START + 32*(s+1))` and its first block holds
/// the summary.
pub(crate) fn segment_base(addr: BlockAddr) -> BlockAddr {
    LOG_START + ((addr - LOG_START) / BLOCKS_PER_SEGMENT) * BLOCKS_PER_SEGMENT
}

pub(crate) fn is_segment_base(addr: BlockAddr) -> bool {
    (addr - LOG_START) % BLOCKS_PER_SEGMENT == 0
}

impl<S: Storage> Filesystem<S> {
    /// Appends `block` at the log tail on behalf of `(inode_no, block_idx)`
    /// and returns the address it landed on.
    ///
    /// The tail never points at a segment's first block when the payload is
    /// written: landing on a boundary lays down a fresh zero summary and
    /// advances past it first. The new tail is mirrored into the in-memory
    /// superblock; durability comes from the next [`checkpoint`].
    ///
    /// [`checkpoint`]: Filesystem::checkpoint
    pub(crate) fn append(
        &mut self,
        block: &Block,
        inode_no: u32,
        block_idx: u32,
    ) -> Result<BlockAddr> {
        let total = self.superblock.total_blocks.get();
        if self.log_tail >= total {
            return Err(FsError::NoSpace);
        }
        if is_segment_base(self.log_tail) {
            self.storage
                .write_block_at(&Block::default(), self.log_tail)?;
            self.log_tail += 1;
            self.superblock.log_tail = U32::new(self.log_tail);
            if self.log_tail >= total {
                return Err(FsError::NoSpace);
            }
        }

        let addr = self.log_tail;
        self.storage.write_block_at(block, addr)?;

        let base = segment_base(addr);
        let offset = (addr - base) as usize;
        let mut summary_block = Block::default();
        self.storage.read_block_at(&mut summary_block, base)?;
        let (mut summary, _) = SegmentSummary::read_from_prefix(&summary_block.data)
            .expect("'summary_block.data' must hold a valid 'SegmentSummary'");
        summary.entries[offset] = SummaryEntry {
            inode_no: U32::new(inode_no),
            block_idx: U32::new(block_idx),
        };
        summary_block.data[..size_of::<SegmentSummary>()].copy_from_slice(summary.as_bytes());
        self.storage.write_block_at(&summary_block, base)?;

        self.log_tail = addr + 1;
        self.superblock.log_tail = U32::new(self.log_tail);
        Ok(addr)
    }

    /// Persists the inode map and the superblock so the log tail and inode
    /// locations survive a remount. Every mutating operation ends with one
    /// checkpoint.
    pub(crate) fn checkpoint(&mut self) -> Result<()> {
        self.storage
            .write_block_at(&Block::from(&self.inode_map), INODE_MAP_ADDR)?;
        self.storage
            .write_block_at(&Block::from(&self.superblock), SUPER_ADDR)?;
        Ok(())
    }
}
