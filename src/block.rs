use zerocopy::{FromBytes, Immutable, IntoBytes};

/// Address of a block within the image.
pub type BlockAddr = u32;

/// Block size in bytes.
pub const BLOCK_SIZE: usize = 4096;

/// Fixed-sized byte sequence.
#[repr(C)]
#[derive(Clone, Copy)]
#[derive(FromBytes, IntoBytes, Immutable)]
pub struct Block {
    pub data: [u8; BLOCK_SIZE],
}

impl Block {
    /// Constructs a `Block` holding `data`, zero-padded to `BLOCK_SIZE`.
    ///
    /// # Panics
    /// Panics if `data` is larger than `BLOCK_SIZE`.
    pub fn new(data: &[u8]) -> Self {
        let mut block = Self::default();
        block.data[..data.len()].copy_from_slice(data);
        block
    }
}

impl Default for Block {
    fn default() -> Self {
        Self {
            data: [0u8; BLOCK_SIZE],
        }
    }
}
