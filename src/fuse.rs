use std::time::{Duration, UNIX_EPOCH};

use fuser::{FUSE_ROOT_ID, FileAttr, FileType, Filesystem};
use tracing::warn;

use crate::block::BLOCK_SIZE;
use crate::fs::inode::InodeKind;
use crate::fs::ops::Attr;
use crate::fs::{self, ROOT_INO};
use crate::storage::Storage;

const TTL: Duration = Duration::from_secs(1);

/// FUSE adapter serving a [`fs::Filesystem`] to the kernel.
///
/// The adapter is a thin translation layer: requests arrive through the
/// `fuser` crate, get forwarded to the operations layer, and errors map to
/// negated POSIX errnos via [`FsError::to_errno`]. It must be mounted
/// single-threaded (fuser's session loop is), because the core serializes
/// all operations through one `&mut self`.
///
/// fuser reserves inode 1 for the root while the on-disk root inode number
/// is 0, so inode numbers are offset by one at this boundary.
///
/// [`FsError::to_errno`]: crate::FsError::to_errno
pub struct Fuse<S: Storage> {
    fs: fs::Filesystem<S>,
}

impl<S: Storage> Fuse<S> {
    pub fn new(fs: fs::Filesystem<S>) -> Self {
        Self { fs }
    }
}

fn fuse_ino(ino: u32) -> u64 {
    u64::from(ino) + 1
}

fn fs_ino(ino: u64) -> u32 {
    (ino.saturating_sub(1)) as u32
}

fn file_attr(attr: &Attr) -> FileAttr {
    let (kind, perm) = match attr.kind {
        InodeKind::Dir => (FileType::Directory, 0o755),
        InodeKind::File => (FileType::RegularFile, 0o644),
    };
    FileAttr {
        ino: fuse_ino(attr.ino),
        size: u64::from(attr.size),
        blocks: u64::from(attr.size.div_ceil(512)),
        atime: UNIX_EPOCH,
        mtime: UNIX_EPOCH,
        ctime: UNIX_EPOCH,
        crtime: UNIX_EPOCH,
        kind,
        perm,
        nlink: attr.nlinks,
        uid: 0,
        gid: 0,
        rdev: 0,
        blksize: BLOCK_SIZE as u32,
        flags: 0,
    }
}

fn kind_to_fuse(kind: InodeKind) -> FileType {
    match kind {
        InodeKind::Dir => FileType::Directory,
        InodeKind::File => FileType::RegularFile,
    }
}

impl<S: Storage> Filesystem for Fuse<S> {
    fn init(
        &mut self,
        _req: &fuser::Request<'_>,
        _config: &mut fuser::KernelConfig,
    ) -> Result<(), libc::c_int> {
        Ok(())
    }

    fn destroy(&mut self) {
        if let Err(e) = self.fs.sync() {
            warn!(error = %e, "final checkpoint failed");
        }
    }

    fn lookup(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        reply: fuser::ReplyEntry,
    ) {
        if parent != FUSE_ROOT_ID {
            return reply.error(libc::ENOENT);
        }
        let name = match name.to_str() {
            Some(name) => name,
            None => return reply.error(libc::EILSEQ),
        };
        match self.fs.getattr(&format!("/{name}")) {
            Ok(attr) => reply.entry(&TTL, &file_attr(&attr), 0),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn getattr(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _fh: Option<u64>,
        reply: fuser::ReplyAttr,
    ) {
        match self.fs.attr(fs_ino(ino)) {
            Ok(attr) => reply.attr(&TTL, &file_attr(&attr)),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn setattr(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<fuser::TimeOrNow>,
        _mtime: Option<fuser::TimeOrNow>,
        _ctime: Option<std::time::SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<std::time::SystemTime>,
        _chgtime: Option<std::time::SystemTime>,
        _bkuptime: Option<std::time::SystemTime>,
        _flags: Option<u32>,
        reply: fuser::ReplyAttr,
    ) {
        // Modes, owners and timestamps are not stored; only a size change
        // is honored, and only truncation to zero is supported.
        if let Some(size) = size {
            if let Err(e) = self.fs.truncate_at(fs_ino(ino), size) {
                warn!(ino, size, error = %e, "truncate failed");
                return reply.error(e.to_errno());
            }
        }
        match self.fs.attr(fs_ino(ino)) {
            Ok(attr) => reply.attr(&TTL, &file_attr(&attr)),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn create(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: fuser::ReplyCreate,
    ) {
        if parent != FUSE_ROOT_ID {
            return reply.error(libc::ENOENT);
        }
        let name = match name.to_str() {
            Some(name) => name,
            None => return reply.error(libc::EILSEQ),
        };
        let path = format!("/{name}");
        let res = self
            .fs
            .create(&path)
            .and_then(|ino| self.fs.attr(ino));
        match res {
            Ok(attr) => reply.created(&TTL, &file_attr(&attr), 0, 0, 0),
            Err(e) => {
                warn!(path = %path, error = %e, "create failed");
                reply.error(e.to_errno());
            }
        }
    }

    fn read(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyData,
    ) {
        if offset < 0 {
            return reply.error(libc::EINVAL);
        }
        match self.fs.read_at(fs_ino(ino), offset as u64, size as usize) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn write(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyWrite,
    ) {
        if offset < 0 {
            return reply.error(libc::EINVAL);
        }
        match self.fs.write_at(fs_ino(ino), offset as u64, data) {
            Ok(written) => reply.written(written as u32),
            Err(e) => {
                warn!(ino, offset, error = %e, "write failed");
                reply.error(e.to_errno());
            }
        }
    }

    fn readdir(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: fuser::ReplyDirectory,
    ) {
        let entries = match self.fs.read_dir(fs_ino(ino)) {
            Ok(entries) => entries,
            Err(e) => return reply.error(e.to_errno()),
        };
        for (i, entry) in entries.iter().enumerate().skip(offset as usize) {
            let is_full = reply.add(
                fuse_ino(entry.ino),
                (i + 1) as i64,
                kind_to_fuse(entry.kind),
                &entry.name,
            );
            if is_full {
                break;
            }
        }
        reply.ok();
    }
}

// The inode offset mapping relies on these two values.
const _: () = assert!(ROOT_INO == 0 && FUSE_ROOT_ID == 1);
