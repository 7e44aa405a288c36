use std::io;
use std::sync::{Arc, Mutex};

use crate::Result;
use crate::block::{BLOCK_SIZE, Block, BlockAddr};
use crate::storage::Storage;

/// A block device held entirely in memory.
///
/// Clones share the same underlying buffer, so an image survives an
/// unmount/mount cycle within one process. Mainly useful for tests and
/// tooling.
#[derive(Clone)]
pub struct MemStorage {
    blocks: Arc<Mutex<Vec<u8>>>,
    count: u32,
}

impl MemStorage {
    /// Creates a zeroed device of `count` blocks.
    pub fn new(count: u32) -> Self {
        Self {
            blocks: Arc::new(Mutex::new(vec![0u8; count as usize * BLOCK_SIZE])),
            count,
        }
    }

    fn span(&self, addr: BlockAddr) -> Result<(usize, usize)> {
        if addr >= self.count {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("block {addr} out of range"),
            )
            .into());
        }
        let start = addr as usize * BLOCK_SIZE;
        Ok((start, start + BLOCK_SIZE))
    }
}

impl Storage for MemStorage {
    fn read_block_at(&self, block: &mut Block, addr: BlockAddr) -> Result<()> {
        let (start, end) = self.span(addr)?;
        let data = self.blocks.lock().expect("storage lock poisoned");
        block.data.copy_from_slice(&data[start..end]);
        Ok(())
    }

    fn write_block_at(&mut self, block: &Block, addr: BlockAddr) -> Result<()> {
        let (start, end) = self.span(addr)?;
        let mut data = self.blocks.lock().expect("storage lock poisoned");
        data[start..end].copy_from_slice(&block.data);
        Ok(())
    }

    fn block_count(&self) -> Result<u32> {
        Ok(self.count)
    }
}
