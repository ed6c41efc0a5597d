//! create our filesystem
use crate::{
    block_device::{Block, BlockDevice, ImageDisk},
    error::{FsError, Result},
    fs::{Fat, RootDirectory, SuperBlock, BLOCK_SIZE},
    utils::{fs_size_calculator, traits::BlockRecord},
};
use anyhow::{anyhow, Context};
use byte_unit::Byte;
use log::info;
use std::path::Path;

/// largest data region whose whole volume still fits a 16-bit block count
pub const MAX_DATA_BLOCKS: u16 = u16::MAX - 34;

/// create a new filesystem,given the path of the image file and its data block count
/// # Params
/// - `image_file_path`: the path of the image file, which must not exist yet
/// - `data_block_count`: the number of allocatable data blocks
///
/// # Return
/// an [anyhow::Result] type to indicate whether the operation is successful
pub fn mkfs<P>(image_file_path: P, data_block_count: u16) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    if data_block_count == 0 || data_block_count > MAX_DATA_BLOCKS {
        return Err(anyhow!(
            "data block count must be between 1 and {MAX_DATA_BLOCKS}, got {data_block_count}"
        ));
    }
    let image_file_path = image_file_path.as_ref();
    let total_blocks = fs_size_calculator::total_block_count(data_block_count);
    let mut disk = ImageDisk::create(image_file_path, total_blocks)
        .with_context(|| format!("can't create image {}", image_file_path.display()))?;
    format_device(&mut disk, data_block_count)?;
    disk.flush()?;

    info!(
        "created {} with {} data blocks ({})",
        image_file_path.display(),
        data_block_count,
        Byte::from_bytes(fs_size_calculator::image_size(data_block_count) as u128)
            .get_appropriate_unit(true)
    );
    Ok(())
}

/// write an empty volume onto `device`, which must hold exactly the blocks the layout needs
pub fn format_device<D: BlockDevice>(device: &mut D, data_block_count: u16) -> Result<()> {
    if data_block_count > MAX_DATA_BLOCKS {
        return Err(FsError::invalid_image("volume too large"));
    }
    let superblock = SuperBlock::new(data_block_count);
    superblock.validate(device.block_count())?;

    let mut buf: Block = [0u8; BLOCK_SIZE];
    superblock.encode_into(&mut buf)?;
    device.write_block(0, &buf)?;
    Fat::new(data_block_count).store(device, &superblock)?;
    RootDirectory::default().store(device, superblock.root_dir_block)?;
    Ok(())
}
