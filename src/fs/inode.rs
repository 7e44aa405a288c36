use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes};

use crate::block::{BLOCK_SIZE, Block, BlockAddr};
use crate::fs::Filesystem;
use crate::storage::Storage;
use crate::{FsError, Result};

/// Number of entries in the inode map.
pub const INODE_MAP_SIZE: usize = 256;

/// How many direct block pointers an inode carries.
pub const MAX_DIRECT_PTRS: usize = 10;

/// Largest possible file: ten direct blocks, no indirection.
pub const MAX_FILE_SIZE: u32 = (MAX_DIRECT_PTRS * BLOCK_SIZE) as u32;

/// [Inode] size.
pub const INODE_SIZE: usize = size_of::<Inode>();

const KIND_FILE: u32 = 1;
const KIND_DIR: u32 = 2;

/// Represents file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeKind {
    File,
    Dir,
}

impl InodeKind {
    fn from_raw(raw: u32) -> Result<Self> {
        match raw {
            KIND_FILE => Ok(Self::File),
            KIND_DIR => Ok(Self::Dir),
            _ => Err(FsError::Corrupt("unknown inode kind")),
        }
    }

    fn as_raw(self) -> u32 {
        match self {
            Self::File => KIND_FILE,
            Self::Dir => KIND_DIR,
        }
    }
}

/// Represents a filesystem object.
///
/// Inodes are not stored at fixed locations. Every inode update appends a
/// new copy to the log; the inode map points at the newest one. An inode
/// occupies a whole block on disk, zero-padded past these fields.
#[repr(C)]
#[derive(Clone, Copy)]
#[derive(FromBytes, IntoBytes, Immutable)]
pub struct Inode {
    pub inode_no: U32,
    kind: U32,
    /// File size in bytes; for directories, `used_slots * DIRENT_SIZE`.
    pub size: U32,
    pub nlinks: U32,
    /// Data block addresses; `0` marks a hole.
    pub direct: [U32; MAX_DIRECT_PTRS],
}

impl Inode {
    /// Constructs a zero-sized [Inode] of the given kind.
    pub fn new(inode_no: u32, kind: InodeKind) -> Self {
        Self {
            inode_no: U32::new(inode_no),
            kind: U32::new(kind.as_raw()),
            size: U32::ZERO,
            nlinks: U32::ZERO,
            direct: [U32::ZERO; MAX_DIRECT_PTRS],
        }
    }

    pub fn kind(&self) -> Result<InodeKind> {
        InodeKind::from_raw(self.kind.get())
    }
}

impl From<&Inode> for Block {
    fn from(value: &Inode) -> Self {
        Block::new(value.as_bytes())
    }
}

/// The indirection table from stable inode numbers to the block currently
/// holding each inode. Entry 0 is the root directory; a zero entry means
/// the inode number is unallocated.
///
/// The whole map lives in memory while mounted and is persisted to block 1
/// by every checkpoint.
#[repr(C)]
#[derive(Clone)]
#[derive(FromBytes, IntoBytes, Immutable)]
pub struct InodeMap {
    slots: [U32; INODE_MAP_SIZE],
}

impl InodeMap {
    /// Returns the block holding inode `ino`, or `None` when out of range
    /// or unallocated.
    pub fn get(&self, ino: u32) -> Option<BlockAddr> {
        let slot = self.slots.get(ino as usize)?.get();
        if slot == 0 { None } else { Some(slot) }
    }

    pub fn set(&mut self, ino: u32, addr: BlockAddr) {
        self.slots[ino as usize] = U32::new(addr);
    }

    /// Finds the lowest unallocated inode number. Inode 0 is the root and
    /// never handed out. The slot is not reserved; the caller is expected
    /// to write the inode before allocating again.
    pub fn alloc(&self) -> Result<u32> {
        for ino in 1..INODE_MAP_SIZE {
            if self.slots[ino].get() == 0 {
                return Ok(ino as u32);
            }
        }
        Err(FsError::NoSpace)
    }

    /// Iterates over `(inode_no, block)` pairs of allocated inodes.
    pub fn entries(&self) -> impl Iterator<Item = (u32, BlockAddr)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.get() != 0)
            .map(|(ino, slot)| (ino as u32, slot.get()))
    }
}

impl Default for InodeMap {
    fn default() -> Self {
        Self {
            slots: [U32::ZERO; INODE_MAP_SIZE],
        }
    }
}

impl From<&InodeMap> for Block {
    fn from(value: &InodeMap) -> Self {
        Block::new(value.as_bytes())
    }
}

impl<S: Storage> Filesystem<S> {
    /// Reads the newest copy of inode `ino` through the inode map.
    pub fn inode_read(&self, ino: u32) -> Result<Inode> {
        if ino as usize >= INODE_MAP_SIZE {
            return Err(FsError::OutOfRange(ino));
        }
        let addr = self.inode_map.get(ino).ok_or(FsError::NotAllocated(ino))?;
        self.read_inode_at(addr)
    }

    /// Reads the inode stored in the block at `addr`, bypassing the map.
    pub(crate) fn read_inode_at(&self, addr: BlockAddr) -> Result<Inode> {
        let mut block = Block::default();
        self.storage.read_block_at(&mut block, addr)?;
        let (inode, _) = Inode::read_from_prefix(&block.data)
            .expect("'block.data' must hold a valid 'Inode'");
        Ok(inode)
    }

    /// Appends a new copy of `inode` to the log and points the inode map at
    /// it. Does not checkpoint; the caller batches a checkpoint at the end
    /// of the operation.
    pub fn inode_write(&mut self, inode: &Inode) -> Result<()> {
        let ino = inode.inode_no.get();
        if ino as usize >= INODE_MAP_SIZE {
            return Err(FsError::OutOfRange(ino));
        }
        let addr = self.append(&Block::from(inode), ino, 0)?;
        self.inode_map.set(ino, addr);
        Ok(())
    }

    /// Finds a free inode number without reserving it.
    pub fn inode_alloc(&self) -> Result<u32> {
        self.inode_map.alloc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_the_lowest_free_number() {
        let mut map = InodeMap::default();
        map.set(0, 12);
        assert_eq!(map.alloc().unwrap(), 1);
        map.set(1, 14);
        map.set(3, 15);
        assert_eq!(map.alloc().unwrap(), 2);
    }

    #[test]
    fn alloc_fails_once_the_map_is_full() {
        let mut map = InodeMap::default();
        map.set(0, 12);
        for ino in 1..INODE_MAP_SIZE as u32 - 1 {
            let got = map.alloc().unwrap();
            assert_eq!(got, ino);
            map.set(got, 100 + ino);
        }
        // 255 slots besides the root are allocatable; the next must fail.
        let last = map.alloc().unwrap();
        assert_eq!(last, INODE_MAP_SIZE as u32 - 1);
        map.set(last, 999);
        assert!(matches!(map.alloc(), Err(FsError::NoSpace)));
    }

    #[test]
    fn entries_skips_unallocated_slots() {
        let mut map = InodeMap::default();
        map.set(0, 12);
        map.set(7, 42);
        let entries: Vec<_> = map.entries().collect();
        assert_eq!(entries, vec![(0, 12), (7, 42)]);
    }

    #[test]
    fn inode_roundtrips_through_a_block() {
        let mut inode = Inode::new(3, InodeKind::File);
        inode.size = U32::new(4097);
        inode.direct[0] = U32::new(21);
        inode.direct[1] = U32::new(22);
        let block = Block::from(&inode);
        let (decoded, _) = Inode::read_from_prefix(&block.data).unwrap();
        assert_eq!(decoded.inode_no.get(), 3);
        assert_eq!(decoded.kind().unwrap(), InodeKind::File);
        assert_eq!(decoded.size.get(), 4097);
        assert_eq!(decoded.direct[1].get(), 22);
        assert_eq!(decoded.direct[2].get(), 0);
    }
}
