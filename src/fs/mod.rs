use zerocopy::FromBytes;
use zerocopy::byteorder::little_endian::U32;

use crate::block::{Block, BlockAddr};
use crate::storage::Storage;
use crate::{FsError, Result};

pub mod dir;
pub mod gc;
pub mod inode;
pub mod log;
pub mod ops;
pub mod path;
pub mod superblock;

use dir::{DIRENT_SIZE, DirBlock, DirEntry, DirEntryName};
use inode::{Inode, InodeKind, InodeMap};
use superblock::{INODE_MAP_ADDR, LOG_START, Superblock};

/// The root directory's inode number, allocated by the formatter.
pub const ROOT_INO: u32 = 0;

const HELLO_NAME: &str = "hello.txt";
const HELLO_DATA: &[u8] = b"Hello from LFS!\n";

/// An in-memory view of the filesystem: the backing device plus the state
/// every operation works on. The superblock's `log_tail` mirrors
/// `log_tail` and both hit the disk only on checkpoints, so the on-disk
/// image trails the memory state by at most one operation's appends.
pub struct Filesystem<S: Storage> {
    storage: S,
    superblock: Superblock,
    inode_map: InodeMap,
    log_tail: BlockAddr,
}

impl<S: Storage> Filesystem<S> {
    /// Creates a filesystem on a storage device, laying out the root
    /// directory and the seeded `hello.txt` through the log writer so a
    /// fresh image satisfies every invariant, then checkpoints.
    pub fn format(storage: S) -> Result<Self> {
        let total_blocks = storage.block_count()?;
        // Room for the metadata region plus one segment of log.
        if total_blocks < LOG_START + log::BLOCKS_PER_SEGMENT {
            return Err(FsError::NoSpace);
        }

        let mut fs = Self {
            storage,
            superblock: Superblock::new(total_blocks),
            inode_map: InodeMap::default(),
            log_tail: LOG_START,
        };

        // Wipe the reserved region so a reused image starts clean.
        for addr in 0..LOG_START {
            fs.storage.write_block_at(&Block::default(), addr)?;
        }

        // Root directory data: ".", ".." and the seeded file.
        let mut dir = DirBlock::default();
        dir.entries[0] = DirEntry::new(ROOT_INO, DirEntryName::try_from(".")?);
        dir.entries[1] = DirEntry::new(ROOT_INO, DirEntryName::try_from("..")?);
        dir.entries[2] = DirEntry::new(1, DirEntryName::try_from(HELLO_NAME)?);
        let dir_addr = fs.append(&Block::from(&dir), ROOT_INO, 0)?;

        let mut root = Inode::new(ROOT_INO, InodeKind::Dir);
        root.size = U32::new(3 * DIRENT_SIZE as u32);
        root.nlinks = U32::new(2);
        root.direct[0] = U32::new(dir_addr);
        fs.inode_write(&root)?;

        let hello_addr = fs.append(&Block::new(HELLO_DATA), 1, 0)?;
        let mut hello = Inode::new(1, InodeKind::File);
        hello.size = U32::new(HELLO_DATA.len() as u32);
        hello.nlinks = U32::new(1);
        hello.direct[0] = U32::new(hello_addr);
        fs.inode_write(&hello)?;

        fs.checkpoint()?;
        Ok(fs)
    }

    /// Mounts the filesystem from a storage device. Only the magic is
    /// required of the on-disk superblock.
    pub fn mount(storage: S) -> Result<Self> {
        let mut block = Block::default();
        storage.read_block_at(&mut block, superblock::SUPER_ADDR)?;
        let (superblock, _) = Superblock::read_from_prefix(&block.data)
            .expect("'block.data' must hold a valid 'Superblock'");
        superblock.check()?;

        storage.read_block_at(&mut block, INODE_MAP_ADDR)?;
        let (inode_map, _) = InodeMap::read_from_prefix(&block.data)
            .expect("'block.data' must hold a valid 'InodeMap'");

        let log_tail = superblock.log_tail.get();
        Ok(Self {
            storage,
            superblock,
            inode_map,
            log_tail,
        })
    }

    /// Checkpoints and hands the storage device back.
    pub fn unmount(mut self) -> Result<S> {
        self.checkpoint()?;
        Ok(self.storage)
    }

    /// Flushes the in-memory state to disk without unmounting.
    pub fn sync(&mut self) -> Result<()> {
        self.checkpoint()
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    pub fn inode_map(&self) -> &InodeMap {
        &self.inode_map
    }

    /// Index of the next block the log will write.
    pub fn log_tail(&self) -> BlockAddr {
        self.log_tail
    }
}
