use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::Result;
use crate::block::{BLOCK_SIZE, Block, BlockAddr};
use crate::storage::Storage;

/// A block device backed by a regular file.
///
/// Reads and writes are positioned, so the device carries no cursor state.
/// There is no caching or write-back buffering; the handle is released on
/// drop.
pub struct FileStorage {
    file: File,
}

impl FileStorage {
    /// Opens the image at `path` read-write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }
}

impl Storage for FileStorage {
    fn read_block_at(&self, block: &mut Block, addr: BlockAddr) -> Result<()> {
        let offset = u64::from(addr) * BLOCK_SIZE as u64;
        self.file.read_exact_at(&mut block.data, offset)?;
        Ok(())
    }

    fn write_block_at(&mut self, block: &Block, addr: BlockAddr) -> Result<()> {
        let offset = u64::from(addr) * BLOCK_SIZE as u64;
        self.file.write_all_at(&block.data, offset)?;
        Ok(())
    }

    fn block_count(&self) -> Result<u32> {
        let len = self.file.metadata()?.len();
        Ok((len / BLOCK_SIZE as u64) as u32)
    }
}
