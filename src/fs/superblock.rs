use serde::{Deserialize, Serialize};

use crate::{
    error::{FsError, Result},
    utils::{fs_size_calculator, traits::BlockRecord},
};

use super::{FAT_ENTRIES_PER_BLOCK, FS_SIGNATURE};

/// The superblock of this filesystem, stored at the front of block 0
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SuperBlock {
    /// must be [FS_SIGNATURE]
    pub signature: [u8; 8],
    /// blocks of the whole volume
    pub total_blocks: u16,
    pub root_dir_block: u16,
    /// physical index of data block 0
    pub data_start: u16,
    /// allocatable data blocks, also the number of FAT entries
    pub data_block_count: u16,
    pub fat_block_count: u8,
}

impl SuperBlock {
    pub fn new(data_block_count: u16) -> Self {
        let fat_block_count = fs_size_calculator::fat_block_count(data_block_count);
        let root_dir_block = fat_block_count as u16 + 1;
        Self {
            signature: FS_SIGNATURE,
            total_blocks: fs_size_calculator::total_block_count(data_block_count) as u16,
            root_dir_block,
            data_start: root_dir_block + 1,
            data_block_count,
            fat_block_count,
        }
    }

    /// check that this superblock describes a consistent volume of `device_blocks` blocks
    pub fn validate(&self, device_blocks: usize) -> Result<()> {
        if self.signature != FS_SIGNATURE {
            return Err(FsError::invalid_image("signature mismatch"));
        }
        if self.total_blocks as usize != device_blocks {
            return Err(FsError::invalid_image(format!(
                "superblock claims {} blocks but the device has {}",
                self.total_blocks, device_blocks
            )));
        }
        if self.data_block_count == 0 {
            return Err(FsError::invalid_image("volume has no data block"));
        }
        if (self.fat_block_count as usize) * FAT_ENTRIES_PER_BLOCK
            < self.data_block_count as usize
        {
            return Err(FsError::invalid_image(format!(
                "{} FAT blocks can't describe {} data blocks",
                self.fat_block_count, self.data_block_count
            )));
        }
        if self.root_dir_block != self.fat_block_count as u16 + 1
            || self.data_start != self.root_dir_block + 1
        {
            return Err(FsError::invalid_image(format!(
                "unexpected layout: root directory at {}, data at {}",
                self.root_dir_block, self.data_start
            )));
        }
        if self.data_start as usize + self.data_block_count as usize > device_blocks {
            return Err(FsError::invalid_image("data region exceeds the device"));
        }
        Ok(())
    }
}

impl BlockRecord for SuperBlock {
    const SIZE: usize = 8 + 2 * 4 + 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::BLOCK_SIZE;

    #[test]
    fn test_new_layout() {
        let superblock = SuperBlock::new(8192);
        assert_eq!(superblock.fat_block_count, 4);
        assert_eq!(superblock.root_dir_block, 5);
        assert_eq!(superblock.data_start, 6);
        assert_eq!(superblock.total_blocks, 8198);
        assert!(superblock.validate(8198).is_ok());
    }

    #[test]
    fn test_byte_exact_encoding() -> anyhow::Result<()> {
        let superblock = SuperBlock::new(8192);
        let mut block = [0u8; BLOCK_SIZE];
        let written = superblock.encode_into(&mut block)?;
        assert_eq!(written, SuperBlock::SIZE);
        assert_eq!(&block[..8], b"ECS150FS");
        assert_eq!(&block[8..10], &8198u16.to_le_bytes());
        assert_eq!(&block[10..12], &5u16.to_le_bytes());
        assert_eq!(&block[12..14], &6u16.to_le_bytes());
        assert_eq!(&block[14..16], &8192u16.to_le_bytes());
        assert_eq!(block[16], 4);
        assert!(block[17..].iter().all(|b| *b == 0));

        assert_eq!(SuperBlock::decode_from(&block)?, superblock);
        Ok(())
    }

    #[test]
    fn test_validate_rejects_bad_superblocks() {
        let good = SuperBlock::new(100);
        let device_blocks = good.total_blocks as usize;

        let bad_signature = SuperBlock {
            signature: *b"ECS150XX",
            ..good.clone()
        };
        assert!(matches!(
            bad_signature.validate(device_blocks),
            Err(FsError::InvalidImage(_))
        ));
        assert!(good.validate(device_blocks + 1).is_err());

        let small_fat = SuperBlock {
            data_block_count: 4000,
            ..good.clone()
        };
        assert!(small_fat.validate(device_blocks).is_err());

        let moved_root = SuperBlock {
            root_dir_block: 3,
            data_start: 4,
            ..good.clone()
        };
        assert!(moved_root.validate(device_blocks).is_err());

        let empty = SuperBlock {
            data_block_count: 0,
            ..good
        };
        assert!(empty.validate(device_blocks).is_err());
    }
}
