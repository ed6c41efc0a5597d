//! session state: which files are open and where each descriptor's cursor is
use log::debug;

use crate::error::{FsError, Result};

use super::{RootDirectory, FS_OPEN_MAX_COUNT};

/// a descriptor handed out by `open`
pub type Fd = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFile {
    /// root directory slot of the file
    pub slot: usize,
    /// read/write cursor, never beyond the file size
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFileTable {
    files: Vec<Option<OpenFile>>,
}

impl Default for OpenFileTable {
    fn default() -> Self {
        Self {
            files: vec![None; FS_OPEN_MAX_COUNT],
        }
    }
}

impl OpenFileTable {
    /// bind the lowest free descriptor to the file in `slot`, at offset 0
    pub fn open(&mut self, slot: usize) -> Result<Fd> {
        let fd = self
            .files
            .iter()
            .position(Option::is_none)
            .ok_or(FsError::TooManyOpenFiles)?;
        self.files[fd] = Some(OpenFile { slot, offset: 0 });
        debug!("descriptor {fd} opened on slot {slot}");
        Ok(fd)
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.files
            .get_mut(fd)
            .and_then(Option::take)
            .map(|_| debug!("descriptor {fd} closed"))
            .ok_or(FsError::InvalidDescriptor)
    }

    pub fn get(&self, fd: Fd) -> Result<OpenFile> {
        self.files
            .get(fd)
            .copied()
            .flatten()
            .ok_or(FsError::InvalidDescriptor)
    }

    pub(crate) fn set_offset(&mut self, fd: Fd, offset: u32) -> Result<()> {
        let file = self
            .files
            .get_mut(fd)
            .and_then(Option::as_mut)
            .ok_or(FsError::InvalidDescriptor)?;
        file.offset = offset;
        Ok(())
    }

    /// current size of the file behind `fd`
    pub fn stat(&self, fd: Fd, dir: &RootDirectory) -> Result<u32> {
        let file = self.get(fd)?;
        dir.entry(file.slot)
            .map(|entry| entry.size)
            .ok_or(FsError::InvalidDescriptor)
    }

    /// move the cursor of `fd`, at most to the end of the file
    pub fn seek(&mut self, fd: Fd, offset: u32, dir: &RootDirectory) -> Result<()> {
        let size = self.stat(fd, dir)?;
        if offset > size {
            return Err(FsError::OffsetOutOfRange);
        }
        self.set_offset(fd, offset)
    }

    /// whether any descriptor refers to the file in `slot`
    pub fn is_open(&self, slot: usize) -> bool {
        self.files.iter().flatten().any(|file| file.slot == slot)
    }

    pub fn open_count(&self) -> usize {
        self.files.iter().flatten().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_close() {
        let mut table = OpenFileTable::default();
        let first = table.open(4).unwrap();
        let second = table.open(4).unwrap();
        assert_ne!(first, second);
        assert!(table.is_open(4));
        assert!(!table.is_open(5));
        table.close(first).unwrap();
        assert!(table.is_open(4));
        assert!(matches!(table.close(first), Err(FsError::InvalidDescriptor)));
        assert!(matches!(table.close(999), Err(FsError::InvalidDescriptor)));
        // the freed descriptor is reused
        assert_eq!(table.open(1).unwrap(), first);
    }

    #[test]
    fn test_too_many_open_files() {
        let mut table = OpenFileTable::default();
        for _ in 0..FS_OPEN_MAX_COUNT {
            table.open(0).unwrap();
        }
        assert_eq!(table.open_count(), FS_OPEN_MAX_COUNT);
        assert!(matches!(table.open(0), Err(FsError::TooManyOpenFiles)));
    }

    #[test]
    fn test_stat_and_seek() {
        let mut dir = RootDirectory::default();
        let slot = dir.create("a").unwrap();
        dir.entry_mut(slot).unwrap().size = 100;
        let mut table = OpenFileTable::default();
        let fd = table.open(slot).unwrap();
        let other = table.open(slot).unwrap();

        assert_eq!(table.stat(fd, &dir).unwrap(), 100);
        table.seek(fd, 100, &dir).unwrap();
        assert_eq!(table.get(fd).unwrap().offset, 100);
        // offsets are independent per descriptor
        assert_eq!(table.get(other).unwrap().offset, 0);
        assert!(matches!(
            table.seek(fd, 101, &dir),
            Err(FsError::OffsetOutOfRange)
        ));
        assert!(matches!(
            table.stat(31, &dir),
            Err(FsError::InvalidDescriptor)
        ));
    }
}
