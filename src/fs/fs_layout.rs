//! what does our filesystem look like in the memory
//!
//! the volume on disk has the following layout:
//! - superblock, block 0
//! - FAT, `fat_block_count` blocks
//! - root directory, one block
//! - data blocks

use std::{fmt, io, path::Path};

use log::{debug, info};

use crate::{
    block_device::{Block, BlockDevice, ImageDisk},
    error::{FsError, Result},
    utils::traits::BlockRecord,
};

use super::{Fat, OpenFileTable, RootDirectory, SuperBlock, BLOCK_SIZE, FS_FILE_MAX_COUNT};

/// everything loaded from disk at mount time, written back at unmount
#[derive(Debug)]
pub struct MountedVolume<D> {
    pub(crate) superblock: SuperBlock,
    pub(crate) fat: Fat,
    pub(crate) root_dir: RootDirectory,
    pub(crate) device: D,
}

/// a filesystem instance, holding at most one mounted volume
#[derive(Debug)]
pub struct FileSystem<D = ImageDisk> {
    volume: Option<MountedVolume<D>>,
    open_files: OpenFileTable,
}

impl<D> Default for FileSystem<D> {
    fn default() -> Self {
        Self {
            volume: None,
            open_files: OpenFileTable::default(),
        }
    }
}

/// layout and usage of the mounted volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub total_blocks: u16,
    pub fat_block_count: u8,
    pub root_dir_block: u16,
    pub data_start: u16,
    pub data_block_count: u16,
    /// FAT entries still free
    pub fat_free: usize,
    /// root directory slots still free
    pub rdir_free: usize,
}

impl fmt::Display for VolumeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FS Info:")?;
        writeln!(f, "total_blk_count={}", self.total_blocks)?;
        writeln!(f, "fat_blk_count={}", self.fat_block_count)?;
        writeln!(f, "rdir_blk={}", self.root_dir_block)?;
        writeln!(f, "data_blk={}", self.data_start)?;
        writeln!(f, "data_blk_count={}", self.data_block_count)?;
        writeln!(f, "fat_free_ratio={}/{}", self.fat_free, self.data_block_count)?;
        write!(f, "rdir_free_ratio={}/{}", self.rdir_free, FS_FILE_MAX_COUNT)
    }
}

impl FileSystem<ImageDisk> {
    /// open the image file at `image_path` and mount the volume it contains
    pub fn mount<P>(&mut self, image_path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        if self.is_mounted() {
            return Err(FsError::AlreadyMounted);
        }
        let device = ImageDisk::open(image_path.as_ref()).map_err(|e| {
            FsError::invalid_image(format!(
                "can't open {}: {e}",
                image_path.as_ref().display()
            ))
        })?;
        self.mount_device(device)
    }
}

/// mount and unmount
impl<D: BlockDevice> FileSystem<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// mount the volume stored on `device`
    pub fn mount_device(&mut self, device: D) -> Result<()> {
        if self.is_mounted() {
            return Err(FsError::AlreadyMounted);
        }
        let unreadable = |e: FsError| match e {
            FsError::BlockIo(e) => FsError::invalid_image(format!("can't read metadata: {e}")),
            e => e,
        };

        let mut buf: Block = [0u8; BLOCK_SIZE];
        device.read_block(0, &mut buf).map_err(|e| unreadable(e.into()))?;
        let superblock = SuperBlock::decode_from(&buf)?;
        superblock.validate(device.block_count())?;
        let fat = Fat::load(&device, &superblock).map_err(unreadable)?;
        let root_dir =
            RootDirectory::load(&device, superblock.root_dir_block).map_err(unreadable)?;

        info!(
            "mounted volume of {} blocks, {} data blocks, {} free",
            superblock.total_blocks,
            superblock.data_block_count,
            fat.free_count()
        );
        self.volume = Some(MountedVolume {
            superblock,
            fat,
            root_dir,
            device,
        });
        self.open_files = OpenFileTable::default();
        Ok(())
    }

    /// write superblock, root directory and FAT back, then close the device,
    /// the volume stays mounted if any write fails
    pub fn unmount(&mut self) -> Result<()> {
        let volume = self.volume_mut()?;
        volume.store_metadata()?;
        volume.device.flush()?;
        self.volume = None;
        self.open_files = OpenFileTable::default();
        info!("volume unmounted");
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.volume.is_some()
    }

    pub fn info(&self) -> Result<VolumeInfo> {
        let MountedVolume {
            superblock,
            fat,
            root_dir,
            ..
        } = self.volume()?;
        Ok(VolumeInfo {
            total_blocks: superblock.total_blocks,
            fat_block_count: superblock.fat_block_count,
            root_dir_block: superblock.root_dir_block,
            data_start: superblock.data_start,
            data_block_count: superblock.data_block_count,
            fat_free: fat.free_count(),
            rdir_free: root_dir.free_count(),
        })
    }
}

/// get the [MountedVolume] and [OpenFileTable] of this filesystem
impl<D> FileSystem<D> {
    #[inline]
    pub(crate) fn volume(&self) -> Result<&MountedVolume<D>> {
        self.volume.as_ref().ok_or(FsError::NotMounted)
    }

    #[inline]
    pub(crate) fn volume_mut(&mut self) -> Result<&mut MountedVolume<D>> {
        self.volume.as_mut().ok_or(FsError::NotMounted)
    }

    #[inline]
    pub(crate) fn open_files(&self) -> &OpenFileTable {
        &self.open_files
    }

    /// borrow both halves at once, failing when nothing is mounted
    #[inline]
    pub(crate) fn parts_mut(&mut self) -> Result<(&mut MountedVolume<D>, &mut OpenFileTable)> {
        let volume = self.volume.as_mut().ok_or(FsError::NotMounted)?;
        Ok((volume, &mut self.open_files))
    }
}

impl<D: BlockDevice> MountedVolume<D> {
    fn store_metadata(&mut self) -> Result<()> {
        let mut buf: Block = [0u8; BLOCK_SIZE];
        self.superblock.encode_into(&mut buf)?;
        self.device.write_block(0, &buf)?;
        self.root_dir
            .store(&mut self.device, self.superblock.root_dir_block)?;
        self.fat.store(&mut self.device, &self.superblock)
    }
}

/// one block-sized piece of a byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    /// block index within the file
    pub logical: usize,
    pub offset_in_block: usize,
    pub len: usize,
    /// where this piece starts in the caller's buffer
    pub buf_start: usize,
}

impl Span {
    pub fn buf_range(&self) -> std::ops::Range<usize> {
        self.buf_start..self.buf_start + self.len
    }
}

/// split `len` bytes starting at file offset `offset` along block boundaries
pub(crate) fn spans(offset: u64, len: usize) -> impl Iterator<Item = Span> {
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        if pos >= len {
            return None;
        }
        let absolute = offset + pos as u64;
        let offset_in_block = (absolute % BLOCK_SIZE as u64) as usize;
        let span = Span {
            logical: (absolute / BLOCK_SIZE as u64) as usize,
            offset_in_block,
            len: (BLOCK_SIZE - offset_in_block).min(len - pos),
            buf_start: pos,
        };
        pos += span.len;
        Some(span)
    })
}

/// read and write data blocks through a bounce buffer
impl<D: BlockDevice> MountedVolume<D> {
    #[inline]
    fn physical_index(&self, block: u16) -> usize {
        self.superblock.data_start as usize + block as usize
    }

    /// copy `data` into data block `block` at `offset_in_block`,
    /// a partial write of a `fresh` block starts from zeros instead of reading it first
    pub(crate) fn write_data_block(
        &mut self,
        block: u16,
        offset_in_block: usize,
        data: &[u8],
        fresh: bool,
    ) -> io::Result<()> {
        let index = self.physical_index(block);
        if offset_in_block == 0 {
            if let Ok(whole) = <&Block>::try_from(data) {
                return self.device.write_block(index, whole);
            }
        }
        let mut bounce: Block = [0u8; BLOCK_SIZE];
        if !fresh {
            self.device.read_block(index, &mut bounce)?;
        }
        debug!(
            "bounce write of {} bytes at {offset_in_block} in data block {block}",
            data.len()
        );
        bounce[offset_in_block..offset_in_block + data.len()].copy_from_slice(data);
        self.device.write_block(index, &bounce)
    }

    /// fill `buf` from data block `block` starting at `offset_in_block`
    pub(crate) fn read_data_block(
        &self,
        block: u16,
        offset_in_block: usize,
        buf: &mut [u8],
    ) -> io::Result<()> {
        let index = self.physical_index(block);
        if offset_in_block == 0 {
            if let Ok(whole) = <&mut Block>::try_from(&mut *buf) {
                return self.device.read_block(index, whole);
            }
        }
        let mut bounce: Block = [0u8; BLOCK_SIZE];
        self.device.read_block(index, &mut bounce)?;
        buf.copy_from_slice(&bounce[offset_in_block..offset_in_block + buf.len()]);
        Ok(())
    }
}
