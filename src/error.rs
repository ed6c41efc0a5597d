//! errors reported by the filesystem core
use std::io;

use thiserror::Error;

/// every way an operation on the volume can fail
#[derive(Debug, Error)]
pub enum FsError {
    #[error("no volume is mounted")]
    NotMounted,
    #[error("a volume is already mounted")]
    AlreadyMounted,
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("invalid filename")]
    InvalidFilename,
    #[error("no such file")]
    FileNotFound,
    #[error("file already exists")]
    FileAlreadyExists,
    #[error("root directory is full")]
    DirectoryFull,
    #[error("no free data block left")]
    DiskFull,
    #[error("file is still open")]
    FileInUse,
    #[error("bad file descriptor")]
    InvalidDescriptor,
    #[error("offset is beyond the end of the file")]
    OffsetOutOfRange,
    #[error("too many open files")]
    TooManyOpenFiles,
    #[error("block I/O failed: {0}")]
    BlockIo(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;

impl FsError {
    /// the closest `errno` value, used as the process exit status by the CLI
    pub fn errno(&self) -> libc::c_int {
        match self {
            FsError::NotMounted => libc::ENODEV,
            FsError::AlreadyMounted => libc::EBUSY,
            FsError::InvalidImage(_) => libc::EINVAL,
            FsError::InvalidFilename => libc::ENAMETOOLONG,
            FsError::FileNotFound => libc::ENOENT,
            FsError::FileAlreadyExists => libc::EEXIST,
            FsError::DirectoryFull => libc::ENFILE,
            FsError::DiskFull => libc::ENOSPC,
            FsError::FileInUse => libc::ETXTBSY,
            FsError::InvalidDescriptor => libc::EBADF,
            FsError::OffsetOutOfRange => libc::EINVAL,
            FsError::TooManyOpenFiles => libc::EMFILE,
            FsError::BlockIo(_) => libc::EIO,
        }
    }

    pub(crate) fn invalid_image(reason: impl Into<String>) -> Self {
        FsError::InvalidImage(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(FsError::FileNotFound.errno(), libc::ENOENT);
        assert_eq!(FsError::DiskFull.errno(), libc::ENOSPC);
        let io_error: FsError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert_eq!(io_error.errno(), libc::EIO);
    }
}
