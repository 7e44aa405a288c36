use zerocopy::byteorder::little_endian::U32;

use crate::block::{BLOCK_SIZE, Block};
use crate::fs::dir::DIRENT_SIZE;
use crate::fs::inode::{Inode, InodeKind, MAX_DIRECT_PTRS, MAX_FILE_SIZE};
use crate::fs::{Filesystem, path};
use crate::storage::Storage;
use crate::{FsError, Result};

#[cfg(test)]
mod property;

/// Attributes of a filesystem object, as reported to the kernel bridge.
#[derive(Debug, Clone, Copy)]
pub struct Attr {
    pub ino: u32,
    pub kind: InodeKind,
    pub size: u32,
    pub nlinks: u32,
}

/// A listed directory entry.
#[derive(Debug, Clone)]
pub struct Dirent {
    pub ino: u32,
    pub kind: InodeKind,
    pub name: String,
}

impl<S: Storage> Filesystem<S> {
    pub fn getattr(&self, path: &str) -> Result<Attr> {
        let ino = self.resolve(path)?;
        self.attr(ino)
    }

    pub fn attr(&self, ino: u32) -> Result<Attr> {
        let inode = self.inode_read(ino)?;
        Ok(Attr {
            ino,
            kind: inode.kind()?,
            size: inode.size.get(),
            nlinks: inode.nlinks.get().max(1),
        })
    }

    pub fn readdir(&self, path: &str) -> Result<Vec<Dirent>> {
        let ino = self.resolve(path)?;
        self.read_dir(ino)
    }

    /// Lists a directory. `.` and `..` are always emitted first, pointing
    /// at the directory itself; seeded slots carrying those names are
    /// skipped so they never appear twice.
    pub fn read_dir(&self, ino: u32) -> Result<Vec<Dirent>> {
        let inode = self.inode_read(ino)?;
        if inode.kind()? != InodeKind::Dir {
            return Err(FsError::NotDir);
        }

        let mut out = vec![
            Dirent {
                ino,
                kind: InodeKind::Dir,
                name: ".".to_owned(),
            },
            Dirent {
                ino,
                kind: InodeKind::Dir,
                name: "..".to_owned(),
            },
        ];
        let dir = self.read_dir_block(&inode)?;
        let used = inode.size.get() as usize / DIRENT_SIZE;
        for entry in &dir.entries[..used] {
            if entry.inode_no.get() == 0 {
                continue;
            }
            let name = entry.name.as_str()?;
            if name == "." || name == ".." {
                continue;
            }
            let child = self.inode_read(entry.inode_no.get())?;
            out.push(Dirent {
                ino: entry.inode_no.get(),
                kind: child.kind()?,
                name: name.to_owned(),
            });
        }
        Ok(out)
    }

    pub fn read(&self, path: &str, offset: u64, size: usize) -> Result<Vec<u8>> {
        let ino = self.resolve(path)?;
        self.read_at(ino, offset, size)
    }

    /// Reads up to `size` bytes at `offset`, clamped to the end of the
    /// file. Holes read as zeros.
    pub fn read_at(&self, ino: u32, offset: u64, size: usize) -> Result<Vec<u8>> {
        let inode = self.inode_read(ino)?;
        if inode.kind()? != InodeKind::File {
            return Err(FsError::IsDir);
        }

        let file_size = u64::from(inode.size.get());
        if offset >= file_size {
            return Ok(Vec::new());
        }
        let offset = offset as usize;
        let size = size.min(file_size as usize - offset);

        let mut out = vec![0u8; size];
        let mut done = 0;
        while done < size {
            let pos = offset + done;
            let blk = pos / BLOCK_SIZE;
            let in_block = pos % BLOCK_SIZE;
            let chunk = (BLOCK_SIZE - in_block).min(size - done);
            let addr = inode.direct[blk].get();
            if addr != 0 {
                let mut block = Block::default();
                self.storage.read_block_at(&mut block, addr)?;
                out[done..done + chunk].copy_from_slice(&block.data[in_block..in_block + chunk]);
            }
            done += chunk;
        }
        Ok(out)
    }

    /// Creates an empty regular file. No data block is allocated up front;
    /// the first write allocates on demand.
    pub fn create(&mut self, path: &str) -> Result<u32> {
        let name = path::file_name(path)?;
        match self.resolve(path) {
            Ok(_) => return Err(FsError::AlreadyExists),
            Err(FsError::NotFound) => {}
            Err(e) => return Err(e),
        }

        let ino = self.inode_alloc()?;
        self.collect_if_due()?;

        let mut inode = Inode::new(ino, InodeKind::File);
        inode.nlinks = U32::new(1);
        self.inode_write(&inode)?;
        self.dir_add_entry(name, ino)?;
        self.checkpoint()?;
        Ok(ino)
    }

    pub fn write(&mut self, path: &str, offset: u64, buf: &[u8]) -> Result<usize> {
        let ino = self.resolve(path)?;
        self.write_at(ino, offset, buf)
    }

    /// Writes `buf` at `offset`, clamped so the write ends at or before
    /// the ten-direct-block limit. Returns the number of bytes written.
    pub fn write_at(&mut self, ino: u32, offset: u64, buf: &[u8]) -> Result<usize> {
        let mut inode = self.inode_read(ino)?;
        if inode.kind()? != InodeKind::File {
            return Err(FsError::IsDir);
        }
        if offset >= u64::from(MAX_FILE_SIZE) {
            return Err(FsError::FileTooBig);
        }
        let offset = offset as usize;
        let len = buf.len().min(MAX_FILE_SIZE as usize - offset);
        if len == 0 {
            return Ok(0);
        }

        let mut written = 0;
        while written < len {
            let pos = offset + written;
            let blk = pos / BLOCK_SIZE;
            let in_block = pos % BLOCK_SIZE;
            let chunk = (BLOCK_SIZE - in_block).min(len - written);

            if self.gc_should_run() {
                if written > 0 {
                    // Blocks appended earlier in this call are only
                    // reachable through the in-memory inode; publish it so
                    // the collector sees them as live.
                    self.inode_write(&inode)?;
                }
                self.collect()?;
                // The collector may have relocated the inode and its data.
                inode = self.inode_read(ino)?;
            }

            let mut block = Block::default();
            let addr = inode.direct[blk].get();
            if addr != 0 {
                self.storage.read_block_at(&mut block, addr)?;
            }
            block.data[in_block..in_block + chunk]
                .copy_from_slice(&buf[written..written + chunk]);

            let new_addr = self.append(&block, ino, blk as u32)?;
            inode.direct[blk] = U32::new(new_addr);
            written += chunk;
        }

        let end = (offset + written) as u32;
        if end > inode.size.get() {
            inode.size = U32::new(end);
        }
        self.inode_write(&inode)?;
        self.checkpoint()?;
        Ok(written)
    }

    pub fn truncate(&mut self, path: &str, size: u64) -> Result<()> {
        let ino = self.resolve(path)?;
        self.truncate_at(ino, size)
    }

    /// Truncates a file to zero bytes; any other size is not permitted.
    /// The dropped data blocks die in place and are reclaimed by the next
    /// collection.
    pub fn truncate_at(&mut self, ino: u32, size: u64) -> Result<()> {
        if size != 0 {
            return Err(FsError::NotPermitted);
        }
        let mut inode = self.inode_read(ino)?;
        if inode.kind()? != InodeKind::File {
            return Err(FsError::IsDir);
        }
        inode.size = U32::ZERO;
        inode.direct = [U32::ZERO; MAX_DIRECT_PTRS];
        self.inode_write(&inode)?;
        self.checkpoint()
    }
}
