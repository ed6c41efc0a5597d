//! fixed-size block access to the backing image,
//! the only place where the filesystem touches storage
use std::{
    fs::OpenOptions,
    io::{self, ErrorKind},
    path::Path,
};

use memmap2::MmapMut;

use crate::fs::BLOCK_SIZE;

/// one block worth of bytes
pub type Block = [u8; BLOCK_SIZE];

/// a device that can only be read and written one whole block at a time
pub trait BlockDevice {
    /// total number of blocks, fixed for the lifetime of the device
    fn block_count(&self) -> usize;

    /// read block `index` into `buf`
    fn read_block(&self, index: usize, buf: &mut Block) -> io::Result<()>;

    /// write `buf` into block `index`
    fn write_block(&mut self, index: usize, buf: &Block) -> io::Result<()>;

    /// make every written block durable
    fn flush(&mut self) -> io::Result<()>;
}

pub(crate) fn out_of_range(index: usize, block_count: usize) -> io::Error {
    io::Error::new(
        ErrorKind::InvalidInput,
        format!("block {index} is out of range, device has {block_count} blocks"),
    )
}

/// an image file mapped into memory
#[derive(Debug)]
pub struct ImageDisk {
    mmap: MmapMut,
    block_count: usize,
}

impl ImageDisk {
    /// open an existing image for read and write
    /// # Params
    /// - `image_path`: the path of the image file,\
    /// something like `Block Device`,like **/dev/sda1**
    pub fn open<P>(image_path: P) -> io::Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(image_path.as_ref())?;
        let len = file.metadata()?.len();
        if len == 0 || len % BLOCK_SIZE as u64 != 0 {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("image size {len} is not a positive multiple of {BLOCK_SIZE}"),
            ));
        }

        // Safety
        // the image is not expected to be resized or modified by anyone else
        // while it is mapped, see https://docs.rs/memmap2/0.5.10/memmap2/struct.MmapMut.html
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self {
            mmap,
            block_count: (len / BLOCK_SIZE as u64) as usize,
        })
    }

    /// create a new zero-filled image holding `block_count` blocks,
    /// an existing file is never overwritten
    pub fn create<P>(image_path: P, block_count: usize) -> io::Result<Self>
    where
        P: AsRef<Path>,
    {
        if block_count == 0 {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "an image needs at least one block",
            ));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(image_path.as_ref())?;
        // all blocks are zero after `set_len`
        file.set_len((block_count * BLOCK_SIZE) as u64)?;
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { mmap, block_count })
    }

    #[inline]
    fn block_range(&self, index: usize) -> io::Result<std::ops::Range<usize>> {
        if index >= self.block_count {
            return Err(out_of_range(index, self.block_count));
        }
        let start = index * BLOCK_SIZE;
        Ok(start..start + BLOCK_SIZE)
    }
}

impl BlockDevice for ImageDisk {
    fn block_count(&self) -> usize {
        self.block_count
    }

    fn read_block(&self, index: usize, buf: &mut Block) -> io::Result<()> {
        let range = self.block_range(index)?;
        buf.copy_from_slice(&self.mmap[range]);
        Ok(())
    }

    fn write_block(&mut self, index: usize, buf: &Block) -> io::Result<()> {
        let range = self.block_range(index)?;
        self.mmap[range].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.mmap.flush()
    }
}
