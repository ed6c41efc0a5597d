//! the flat root directory: a fixed table of file entries kept in one block
use std::{borrow::Cow, fmt};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    block_device::{Block, BlockDevice},
    error::{FsError, Result},
    utils::traits::BlockRecord,
};

use super::{Fat, OpenFileTable, BLOCK_SIZE, FAT_EOC, FS_FILENAME_LEN, FS_FILE_MAX_COUNT};

/// one slot of the root directory as stored on disk
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    /// NUL terminated, an empty first byte marks a free slot
    pub filename: [u8; FS_FILENAME_LEN],
    pub size: u32,
    /// raw first data block, [FAT_EOC] for a file without data
    pub first_block: u16,
    padding: [u8; 10],
}

impl Default for DirEntry {
    fn default() -> Self {
        Self {
            filename: [0u8; FS_FILENAME_LEN],
            size: 0,
            first_block: 0,
            padding: [0u8; 10],
        }
    }
}

impl BlockRecord for DirEntry {
    const SIZE: usize = FS_FILENAME_LEN + 4 + 2 + 10;
}

/// check that `name` fits a filename field with its terminator
pub fn validate_filename(name: &str) -> Result<()> {
    if name.is_empty() || name.len() >= FS_FILENAME_LEN || name.bytes().any(|b| b == 0) {
        return Err(FsError::InvalidFilename);
    }
    Ok(())
}

impl DirEntry {
    fn new(name: &str) -> Self {
        let mut filename = [0u8; FS_FILENAME_LEN];
        filename[..name.len()].copy_from_slice(name.as_bytes());
        Self {
            filename,
            size: 0,
            first_block: FAT_EOC,
            padding: [0u8; 10],
        }
    }

    pub fn is_free(&self) -> bool {
        self.filename[0] == 0
    }

    fn name_bytes(&self) -> &[u8] {
        let len = self
            .filename
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(FS_FILENAME_LEN);
        &self.filename[..len]
    }

    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    pub fn has_name(&self, name: &str) -> bool {
        !self.is_free() && self.name_bytes() == name.as_bytes()
    }

    /// first data block, `None` when the file owns no block
    pub fn first_block(&self) -> Option<u16> {
        match self.first_block {
            FAT_EOC => None,
            block => Some(block),
        }
    }

    pub fn set_first_block(&mut self, block: Option<u16>) {
        self.first_block = block.unwrap_or(FAT_EOC);
    }
}

/// what `ls` shows for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub name: String,
    pub size: u32,
    pub first_block: Option<u16>,
}

impl fmt::Display for FileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "file: {}, size: {}, data_blk: {}",
            self.name,
            self.size,
            self.first_block.unwrap_or(FAT_EOC)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDirectory {
    entries: Vec<DirEntry>,
}

impl Default for RootDirectory {
    fn default() -> Self {
        Self {
            entries: vec![DirEntry::default(); FS_FILE_MAX_COUNT],
        }
    }
}

/// for serialize and deserialize
impl RootDirectory {
    pub fn load<D: BlockDevice>(device: &D, block_index: u16) -> Result<Self> {
        let mut buf: Block = [0u8; BLOCK_SIZE];
        device.read_block(block_index as usize, &mut buf)?;
        let entries = buf
            .chunks_exact(DirEntry::SIZE)
            .take(FS_FILE_MAX_COUNT)
            .map(DirEntry::decode_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn store<D: BlockDevice>(&self, device: &mut D, block_index: u16) -> Result<()> {
        let mut buf: Block = [0u8; BLOCK_SIZE];
        for (raw, entry) in buf.chunks_exact_mut(DirEntry::SIZE).zip(&self.entries) {
            entry.encode_into(raw)?;
        }
        device.write_block(block_index as usize, &buf)?;
        Ok(())
    }
}

impl RootDirectory {
    /// add an empty file called `name`
    pub fn create(&mut self, name: &str) -> Result<usize> {
        validate_filename(name)?;
        if self.lookup(name).is_some() {
            return Err(FsError::FileAlreadyExists);
        }
        let slot = self
            .entries
            .iter()
            .position(DirEntry::is_free)
            .ok_or(FsError::DirectoryFull)?;
        self.entries[slot] = DirEntry::new(name);
        debug!("created {name:?} in slot {slot}");
        Ok(slot)
    }

    /// remove `name` and release its blocks,
    /// refused while any descriptor still refers to it
    pub fn delete(&mut self, name: &str, fat: &mut Fat, open_files: &OpenFileTable) -> Result<()> {
        validate_filename(name)?;
        let (slot, entry) = self.lookup(name).ok_or(FsError::FileNotFound)?;
        if open_files.is_open(slot) {
            return Err(FsError::FileInUse);
        }
        fat.free_chain(entry.first_block())?;
        self.entries[slot] = DirEntry::default();
        debug!("deleted {name:?} from slot {slot}");
        Ok(())
    }

    /// find the slot holding `name`
    pub fn lookup(&self, name: &str) -> Option<(usize, DirEntry)> {
        self.entries
            .iter()
            .position(|entry| entry.has_name(name))
            .map(|slot| (slot, self.entries[slot]))
    }

    /// every file in slot order, computed afresh on each call
    pub fn list(&self) -> impl Iterator<Item = FileSummary> + '_ {
        self.entries
            .iter()
            .filter(|entry| !entry.is_free())
            .map(|entry| FileSummary {
                name: entry.name().into_owned(),
                size: entry.size,
                first_block: entry.first_block(),
            })
    }

    pub fn entry(&self, slot: usize) -> Option<&DirEntry> {
        self.entries.get(slot).filter(|entry| !entry.is_free())
    }

    pub(crate) fn entry_mut(&mut self, slot: usize) -> Option<&mut DirEntry> {
        self.entries.get_mut(slot).filter(|entry| !entry.is_free())
    }

    pub fn free_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_free()).count()
    }
}
