use thiserror::Error;

/// Unified error type for all filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad filesystem magic {0:#010x}")]
    BadMagic(u32),

    #[error("corrupt metadata: {0}")]
    Corrupt(&'static str),

    #[error("not found")]
    NotFound,

    #[error("file exists")]
    AlreadyExists,

    #[error("not a directory")]
    NotDir,

    #[error("is a directory")]
    IsDir,

    #[error("invalid path")]
    InvalidPath,

    #[error("name too long")]
    NameTooLong,

    #[error("file too big")]
    FileTooBig,

    #[error("no space left on device")]
    NoSpace,

    #[error("operation not permitted")]
    NotPermitted,

    #[error("inode {0} out of range")]
    OutOfRange(u32),

    #[error("inode {0} not allocated")]
    NotAllocated(u32),
}

impl FsError {
    /// Convert this error into a POSIX errno suitable for FUSE replies.
    #[must_use]
    pub fn to_errno(&self) -> libc::c_int {
        match self {
            Self::Io(_) | Self::BadMagic(_) | Self::Corrupt(_) => libc::EIO,
            Self::NotFound | Self::OutOfRange(_) | Self::NotAllocated(_) => libc::ENOENT,
            Self::AlreadyExists => libc::EEXIST,
            Self::NotDir => libc::ENOTDIR,
            Self::IsDir => libc::EISDIR,
            Self::InvalidPath | Self::NotPermitted => libc::EPERM,
            Self::NameTooLong => libc::ENAMETOOLONG,
            Self::FileTooBig => libc::EFBIG,
            Self::NoSpace => libc::ENOSPC,
        }
    }
}

/// Result alias using `FsError`.
pub type Result<T> = std::result::Result<T, FsError>;
