//! a single-volume FAT filesystem kept in an image file
pub mod block_device;
pub mod cli_interface;
pub mod commands;
pub mod error;
mod fs;
pub mod mkfs;
pub mod utils;
pub use block_device::{BlockDevice, ImageDisk};
pub use error::{FsError, Result};
pub use fs::*;
