//! This module contains functions to calculate the size of different fs components

use crate::fs::{BLOCK_SIZE, FAT_ENTRIES_PER_BLOCK};

/// calculate needed FAT size in blocks
/// # Arguments
/// - `data_block_count`: the number of data blocks
/// # Return
/// how many blocks hold one 16-bit entry per data block
/// # Example
/// ```
/// use ecsfs::utils::fs_size_calculator::fat_block_count;
/// assert_eq!(fat_block_count(1), 1);
/// assert_eq!(fat_block_count(2048), 1);
/// assert_eq!(fat_block_count(2049), 2);
/// assert_eq!(fat_block_count(8192), 4);
/// ```
pub const fn fat_block_count(data_block_count: u16) -> u8 {
    (data_block_count as usize).div_ceil(FAT_ENTRIES_PER_BLOCK) as u8
}

/// calculate the total number of blocks of a volume
/// # Arguments
/// - `data_block_count`: the number of data blocks
/// # Return
/// superblock + FAT + root directory + data blocks
/// # Example
/// ```
/// use ecsfs::utils::fs_size_calculator::total_block_count;
/// assert_eq!(total_block_count(8192), 1 + 4 + 1 + 8192);
/// ```
pub const fn total_block_count(data_block_count: u16) -> usize {
    1 + fat_block_count(data_block_count) as usize + 1 + data_block_count as usize
}

/// calculate image file size in bytes
/// # Example
/// ```
/// use ecsfs::utils::fs_size_calculator::image_size;
/// assert_eq!(image_size(1), 4 * 4096);
/// ```
pub const fn image_size(data_block_count: u16) -> u64 {
    total_block_count(data_block_count) as u64 * BLOCK_SIZE as u64
}

/// number of blocks needed to hold `bytes` bytes
pub const fn blocks_for(bytes: u64) -> u64 {
    bytes.div_ceil(BLOCK_SIZE as u64)
}
