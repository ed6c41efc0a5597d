//! the File Allocation Table: one 16-bit entry per data block,
//! chaining the blocks of every file together
use log::debug;

use crate::{
    block_device::{BlockDevice, Block},
    error::{FsError, Result},
};

use super::{SuperBlock, BLOCK_SIZE, FAT_ENTRIES_PER_BLOCK, FAT_EOC};

/// decoded value of one FAT entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatEntry {
    Free,
    /// last block of its chain
    EndOfChain,
    /// the next block of the same chain
    Next(u16),
}

impl From<u16> for FatEntry {
    fn from(raw: u16) -> Self {
        match raw {
            0 => FatEntry::Free,
            FAT_EOC => FatEntry::EndOfChain,
            next => FatEntry::Next(next),
        }
    }
}

impl From<FatEntry> for u16 {
    fn from(entry: FatEntry) -> Self {
        match entry {
            FatEntry::Free => 0,
            FatEntry::EndOfChain => FAT_EOC,
            FatEntry::Next(next) => next,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Fat {
    entries: Vec<u16>,
}

/// for serialize and deserialize
impl Fat {
    /// read `fat_block_count` blocks starting at block 1
    pub fn load<D: BlockDevice>(device: &D, superblock: &SuperBlock) -> Result<Self> {
        let data_blocks = superblock.data_block_count as usize;
        let mut entries =
            Vec::with_capacity(superblock.fat_block_count as usize * FAT_ENTRIES_PER_BLOCK);
        let mut buf: Block = [0u8; BLOCK_SIZE];
        for i in 0..superblock.fat_block_count as usize {
            device.read_block(1 + i, &mut buf)?;
            entries.extend(
                buf.chunks_exact(2)
                    .map(|raw| u16::from_le_bytes([raw[0], raw[1]])),
            );
        }
        entries.truncate(data_blocks);
        Ok(Self { entries })
    }

    /// write the table back to `fat_block_count` blocks starting at block 1,
    /// the tail of the last block is zero padded
    pub fn store<D: BlockDevice>(&self, device: &mut D, superblock: &SuperBlock) -> Result<()> {
        let mut chunks = self.entries.chunks(FAT_ENTRIES_PER_BLOCK);
        for i in 0..superblock.fat_block_count as usize {
            let mut buf: Block = [0u8; BLOCK_SIZE];
            if let Some(chunk) = chunks.next() {
                for (raw, entry) in buf.chunks_exact_mut(2).zip(chunk) {
                    raw.copy_from_slice(&entry.to_le_bytes());
                }
            }
            device.write_block(1 + i, &buf)?;
        }
        Ok(())
    }
}

impl Fat {
    /// a table of `data_block_count` free entries,
    /// except entry 0 which is reserved
    pub fn new(data_block_count: u16) -> Self {
        let mut entries = vec![0u16; data_block_count as usize];
        if let Some(first) = entries.first_mut() {
            *first = FAT_EOC;
        }
        Self { entries }
    }

    /// number of entries, one per data block
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: u16) -> Option<FatEntry> {
        self.entries.get(index as usize).map(|raw| FatEntry::from(*raw))
    }

    fn set(&mut self, index: u16, entry: FatEntry) {
        self.entries[index as usize] = entry.into();
    }

    /// count entries still free
    pub fn free_count(&self) -> usize {
        self.entries.iter().filter(|raw| **raw == 0).count()
    }
}

/// allocation and chain traversal
impl Fat {
    /// first free data block,
    /// block 0 is skipped since a link to it would read as a free entry
    pub fn find_free_block(&self) -> Option<u16> {
        self.entries
            .iter()
            .skip(1)
            .position(|raw| *raw == 0)
            .map(|p| p as u16 + 1)
    }

    /// claim a free block as a single-block chain,
    /// the caller links it behind an existing tail or records it as a file's first block
    pub fn allocate_block(&mut self) -> Result<u16> {
        let index = self.find_free_block().ok_or(FsError::DiskFull)?;
        self.set(index, FatEntry::EndOfChain);
        debug!("allocated data block {index}");
        Ok(index)
    }

    /// link `new_index` behind `tail_index` and terminate the chain there
    pub fn extend_chain(&mut self, tail_index: u16, new_index: u16) {
        self.set(tail_index, FatEntry::Next(new_index));
        self.set(new_index, FatEntry::EndOfChain);
    }

    /// undo the last [Fat::extend_chain], or an [Fat::allocate_block] when `tail_index` is `None`
    pub fn release_tail(&mut self, tail_index: Option<u16>, last_index: u16) {
        if let Some(tail) = tail_index {
            self.set(tail, FatEntry::EndOfChain);
        }
        self.set(last_index, FatEntry::Free);
    }

    /// return every block of the chain starting at `first_index` to the free pool,
    /// an empty chain is a no-op
    pub fn free_chain(&mut self, first_index: Option<u16>) -> Result<usize> {
        let blocks = self.chain(first_index).collect::<Result<Vec<_>>>()?;
        for block in &blocks {
            self.set(*block, FatEntry::Free);
        }
        debug!("freed {} data blocks", blocks.len());
        Ok(blocks.len())
    }

    /// physical data block holding logical block `logical_index` of a chain
    pub fn chain_block_at(&self, first_index: Option<u16>, logical_index: usize) -> Result<u16> {
        self.chain(first_index)
            .nth(logical_index)
            .unwrap_or_else(|| {
                Err(FsError::invalid_image(format!(
                    "chain is shorter than {} blocks",
                    logical_index + 1
                )))
            })
    }

    /// walk a chain in order, yielding each data block index
    pub fn chain(&self, first_index: Option<u16>) -> Chain<'_> {
        Chain {
            fat: self,
            next: first_index,
            steps: 0,
        }
    }

    /// last block of a chain, `None` for an empty one
    pub fn tail(&self, first_index: Option<u16>) -> Result<Option<u16>> {
        let mut tail = None;
        for block in self.chain(first_index) {
            tail = Some(block?);
        }
        Ok(tail)
    }
}

/// iterator over the blocks of one chain,
/// yields an error and stops on a broken or cyclic chain
#[derive(Debug)]
pub struct Chain<'a> {
    fat: &'a Fat,
    next: Option<u16>,
    steps: usize,
}

impl Iterator for Chain<'_> {
    type Item = Result<u16>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.steps += 1;
        if self.steps > self.fat.len() {
            return Some(Err(FsError::invalid_image("cycle in FAT chain")));
        }
        match self.fat.entry(current) {
            Some(FatEntry::Next(next)) => self.next = Some(next),
            Some(FatEntry::EndOfChain) => {}
            Some(FatEntry::Free) | None => {
                return Some(Err(FsError::invalid_image(format!(
                    "FAT chain runs into invalid block {current}"
                ))))
            }
        }
        Some(Ok(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ram_disk::RamDisk;

    fn collect(fat: &Fat, first: Option<u16>) -> Vec<u16> {
        fat.chain(first).collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_entry_decoding() {
        assert_eq!(FatEntry::from(0), FatEntry::Free);
        assert_eq!(FatEntry::from(FAT_EOC), FatEntry::EndOfChain);
        assert_eq!(FatEntry::from(7), FatEntry::Next(7));
        assert_eq!(u16::from(FatEntry::EndOfChain), 0xFFFF);
    }

    #[test]
    fn test_new_reserves_block_zero() {
        let fat = Fat::new(8);
        assert_eq!(fat.entry(0), Some(FatEntry::EndOfChain));
        assert_eq!(fat.free_count(), 7);
        assert_eq!(fat.find_free_block(), Some(1));
    }

    #[test]
    fn test_allocate_and_extend() {
        let mut fat = Fat::new(8);
        let first = fat.allocate_block().unwrap();
        let second = fat.allocate_block().unwrap();
        assert_eq!((first, second), (1, 2));
        fat.extend_chain(first, second);
        let third = fat.allocate_block().unwrap();
        fat.extend_chain(second, third);
        assert_eq!(collect(&fat, Some(first)), vec![1, 2, 3]);
        assert_eq!(fat.tail(Some(first)).unwrap(), Some(3));
        assert_eq!(fat.chain_block_at(Some(first), 2).unwrap(), 3);
        assert!(fat.chain_block_at(Some(first), 3).is_err());
        assert_eq!(fat.free_count(), 4);
    }

    #[test]
    fn test_disk_full() {
        let mut fat = Fat::new(3);
        fat.allocate_block().unwrap();
        fat.allocate_block().unwrap();
        assert!(matches!(fat.allocate_block(), Err(FsError::DiskFull)));
        assert_eq!(fat.find_free_block(), None);
    }

    #[test]
    fn test_free_chain() {
        let mut fat = Fat::new(8);
        let a = fat.allocate_block().unwrap();
        let b = fat.allocate_block().unwrap();
        fat.extend_chain(a, b);
        let other = fat.allocate_block().unwrap();
        assert_eq!(fat.free_chain(Some(a)).unwrap(), 2);
        assert_eq!(fat.entry(a), Some(FatEntry::Free));
        assert_eq!(fat.entry(b), Some(FatEntry::Free));
        assert_eq!(fat.entry(other), Some(FatEntry::EndOfChain));
        // empty file
        assert_eq!(fat.free_chain(None).unwrap(), 0);
        // freed blocks are reused first
        assert_eq!(fat.allocate_block().unwrap(), a);
    }

    #[test]
    fn test_release_tail() {
        let mut fat = Fat::new(8);
        let a = fat.allocate_block().unwrap();
        let b = fat.allocate_block().unwrap();
        fat.extend_chain(a, b);
        fat.release_tail(Some(a), b);
        assert_eq!(collect(&fat, Some(a)), vec![a]);
        fat.release_tail(None, a);
        assert_eq!(fat.free_count(), 7);
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut fat = Fat::new(4);
        fat.extend_chain(1, 2);
        fat.set(2, FatEntry::Next(1));
        assert!(fat.chain(Some(1)).any(|block| block.is_err()));
        assert!(fat.free_chain(Some(1)).is_err());
    }

    #[test]
    fn test_store_and_load() -> anyhow::Result<()> {
        let superblock = SuperBlock::new(3000);
        let mut disk = RamDisk::new(superblock.total_blocks as usize);
        let mut fat = Fat::new(3000);
        let a = fat.allocate_block()?;
        let far = 2999;
        fat.extend_chain(a, far);
        fat.store(&mut disk, &superblock)?;

        let loaded = Fat::load(&disk, &superblock)?;
        assert_eq!(loaded, fat);
        assert_eq!(loaded.len(), 3000);
        assert_eq!(collect(&loaded, Some(a)), vec![a, far]);

        // second FAT block holds entry 2999 at offset (2999 - 2048) * 2
        let mut block = [0u8; BLOCK_SIZE];
        disk.read_block(2, &mut block)?;
        let offset = (2999 - 2048) * 2;
        assert_eq!(&block[offset..offset + 2], &FAT_EOC.to_le_bytes());
        Ok(())
    }
}
