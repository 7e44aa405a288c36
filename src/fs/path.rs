use crate::fs::dir::MAX_NAME_LEN;
use crate::fs::{Filesystem, ROOT_INO};
use crate::storage::Storage;
use crate::{FsError, Result};

/// Extracts the file name from a single-level absolute path.
///
/// Paths must start with `/` and contain exactly one; deeper paths are not
/// permitted. The name must be non-empty and leave room for its NUL
/// terminator.
pub fn file_name(path: &str) -> Result<&str> {
    let name = path.strip_prefix('/').ok_or(FsError::InvalidPath)?;
    if name.contains('/') {
        return Err(FsError::NotPermitted);
    }
    if name.is_empty() {
        return Err(FsError::InvalidPath);
    }
    if name.len() >= MAX_NAME_LEN {
        return Err(FsError::NameTooLong);
    }
    Ok(name)
}

impl<S: Storage> Filesystem<S> {
    /// Resolves a path to an inode number. `/` is the root directory;
    /// anything else is looked up in the root directory's entries.
    pub fn resolve(&self, path: &str) -> Result<u32> {
        if path == "/" {
            return Ok(ROOT_INO);
        }
        let name = file_name(path)?;

        let root = self.inode_read(ROOT_INO)?;
        let dir = self.read_dir_block(&root)?;
        let used = root.size.get() as usize / crate::fs::dir::DIRENT_SIZE;
        for entry in &dir.entries[..used] {
            if entry.inode_no.get() != 0 && entry.name.as_str()? == name {
                return Ok(entry.inode_no.get());
            }
        }
        Err(FsError::NotFound)
    }
}
