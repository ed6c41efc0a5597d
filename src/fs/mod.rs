//! our FAT based filesystem
pub mod directory;
pub mod fat;
pub mod fs_layout;
pub mod open_file_table;
pub mod superblock;
mod fs_api_impl;
pub use directory::*;
pub use fat::*;
pub use fs_layout::*;
pub use open_file_table::*;
pub use superblock::*;

/// every block of the volume has this size
pub const BLOCK_SIZE: usize = 4096;
pub const FS_SIGNATURE: [u8; 8] = *b"ECS150FS";
/// FAT value marking the last block of a chain
pub const FAT_EOC: u16 = 0xFFFF;
pub const FAT_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / 2;
/// root directory capacity
pub const FS_FILE_MAX_COUNT: usize = 128;
/// open file table capacity
pub const FS_OPEN_MAX_COUNT: usize = 32;
/// filename field size, including the terminating NUL
pub const FS_FILENAME_LEN: usize = 16;
