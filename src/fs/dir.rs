use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes};

use crate::block::{BLOCK_SIZE, Block, BlockAddr};
use crate::fs::inode::Inode;
use crate::fs::{Filesystem, ROOT_INO};
use crate::storage::Storage;
use crate::{FsError, Result};

/// How long a directory entry name can be, NUL terminator included.
pub const MAX_NAME_LEN: usize = 28;

/// [DirEntry] size.
pub const DIRENT_SIZE: usize = size_of::<DirEntry>();

/// How many entries fit in a directory's single data block.
pub const MAX_DIR_ENTRIES: usize = BLOCK_SIZE / DIRENT_SIZE;

/// Represents the name of a directory entry: a NUL-terminated string in a
/// fixed array.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
#[derive(FromBytes, IntoBytes, Immutable)]
pub struct DirEntryName {
    bytes: [u8; MAX_NAME_LEN],
}

impl DirEntryName {
    /// Returns the directory entry name as a string slice.
    ///
    /// # Errors
    /// Returns `Err` if the stored bytes are not valid UTF-8.
    pub fn as_str(&self) -> Result<&str> {
        let len = self
            .bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_NAME_LEN);
        str::from_utf8(&self.bytes[..len]).map_err(|_| FsError::Corrupt("directory entry name"))
    }
}

impl TryFrom<&str> for DirEntryName {
    type Error = FsError;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        let len = value.len();
        if len == 0 {
            return Err(FsError::InvalidPath);
        }
        // Room for the NUL terminator is required.
        if len >= MAX_NAME_LEN {
            return Err(FsError::NameTooLong);
        }
        let mut bytes = [0u8; MAX_NAME_LEN];
        bytes[..len].copy_from_slice(value.as_bytes());
        Ok(Self { bytes })
    }
}

/// Represents a directory entry. `inode_no == 0` marks a free slot, which
/// is also why the seeded `.` and `..` entries (both inode 0) are matched
/// by name only when listing, never when resolving.
#[repr(C)]
#[derive(Clone, Copy)]
#[derive(FromBytes, IntoBytes, Immutable)]
pub struct DirEntry {
    pub inode_no: U32,
    pub name: DirEntryName,
}

impl DirEntry {
    pub fn new(inode_no: u32, name: DirEntryName) -> Self {
        Self {
            inode_no: U32::new(inode_no),
            name,
        }
    }
}

/// A directory's single data block, viewed as an entry array.
#[repr(C)]
#[derive(Clone, Copy)]
#[derive(FromBytes, IntoBytes, Immutable)]
pub struct DirBlock {
    pub entries: [DirEntry; MAX_DIR_ENTRIES],
}

impl DirBlock {
    pub fn from_block(block: &Block) -> Self {
        DirBlock::read_from_bytes(&block.data).expect("'block.data' must hold a valid 'DirBlock'")
    }
}

impl Default for DirBlock {
    fn default() -> Self {
        Self::from_block(&Block::default())
    }
}

impl From<&DirBlock> for Block {
    fn from(value: &DirBlock) -> Self {
        Block::new(value.as_bytes())
    }
}

impl<S: Storage> Filesystem<S> {
    /// Reads the directory data block of `inode`.
    pub(crate) fn read_dir_block(&self, inode: &Inode) -> Result<DirBlock> {
        let addr: BlockAddr = inode.direct[0].get();
        if addr == 0 {
            return Err(FsError::Corrupt("directory without a data block"));
        }
        let mut block = Block::default();
        self.storage.read_block_at(&mut block, addr)?;
        Ok(DirBlock::from_block(&block))
    }

    /// Adds an entry for `name` pointing at inode `ino` to the root
    /// directory, appending the updated directory block and a new root
    /// inode. Does not checkpoint.
    pub(crate) fn dir_add_entry(&mut self, name: &str, ino: u32) -> Result<()> {
        let name = DirEntryName::try_from(name)?;
        let mut root = self.inode_read(ROOT_INO)?;

        let slot = root.size.get() as usize / DIRENT_SIZE;
        if (slot + 1) * DIRENT_SIZE > BLOCK_SIZE {
            return Err(FsError::NoSpace);
        }

        let mut dir = self.read_dir_block(&root)?;
        dir.entries[slot] = DirEntry::new(ino, name);

        let addr = self.append(&Block::from(&dir), ROOT_INO, 0)?;
        root.direct[0] = U32::new(addr);
        root.size = U32::new(root.size.get() + DIRENT_SIZE as u32);
        self.inode_write(&root)
    }
}
