use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes};

use crate::block::{Block, BlockAddr};
use crate::{FsError, Result};

/// Filesystem magic, "LFS1".
pub const MAGIC: u32 = 0x4C46_5331;

/// Superblock's address.
pub const SUPER_ADDR: BlockAddr = 0;

/// Inode map's address.
pub const INODE_MAP_ADDR: BlockAddr = 1;

/// First block of the log. Blocks below it are reserved for the superblock
/// and the inode map and are never touched by the log writer or the GC.
pub const LOG_START: BlockAddr = 10;

/// Fixed metadata about the filesystem, stored in block 0.
///
/// All on-disk integers are little-endian. The superblock is rewritten in
/// place by checkpoints; it is the only block besides the inode map with
/// update-in-place semantics.
#[repr(C)]
#[derive(Clone, Copy)]
#[derive(FromBytes, IntoBytes, Immutable)]
pub struct Superblock {
    pub magic: U32,
    pub block_size: U32,
    pub total_blocks: U32,
    pub inode_map_block: U32,
    pub log_start: U32,
    /// Index of the next block the log will write.
    pub log_tail: U32,
}

impl Superblock {
    /// Constructs a superblock for an image of `total_blocks` blocks, with
    /// the log tail at the start of the log.
    pub fn new(total_blocks: u32) -> Self {
        Self {
            magic: U32::new(MAGIC),
            block_size: U32::new(crate::block::BLOCK_SIZE as u32),
            total_blocks: U32::new(total_blocks),
            inode_map_block: U32::new(INODE_MAP_ADDR),
            log_start: U32::new(LOG_START),
            log_tail: U32::new(LOG_START),
        }
    }

    /// Checks the magic. Mounting requires nothing else of the on-disk
    /// superblock.
    pub fn check(&self) -> Result<()> {
        if self.magic.get() != MAGIC {
            return Err(FsError::BadMagic(self.magic.get()));
        }
        Ok(())
    }
}

impl From<&Superblock> for Block {
    fn from(value: &Superblock) -> Self {
        Block::new(value.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_a_block() {
        let superblock = Superblock::new(1024);
        let block = Block::from(&superblock);
        let (decoded, _) = Superblock::read_from_prefix(&block.data)
            .expect("'block.data' must hold a valid 'Superblock'");
        assert_eq!(decoded.magic.get(), MAGIC);
        assert_eq!(decoded.total_blocks.get(), 1024);
        assert_eq!(decoded.inode_map_block.get(), INODE_MAP_ADDR);
        assert_eq!(decoded.log_start.get(), LOG_START);
        assert_eq!(decoded.log_tail.get(), LOG_START);
    }

    #[test]
    fn rejects_a_bad_magic() {
        let mut superblock = Superblock::new(1024);
        superblock.magic = U32::new(0xDEAD_BEEF);
        assert!(matches!(
            superblock.check(),
            Err(FsError::BadMagic(0xDEAD_BEEF))
        ));
    }
}
