use log::{debug, warn};

use crate::{
    block_device::BlockDevice,
    error::{FsError, Result},
};

use super::{fs_layout::spans, validate_filename, Fd, FileSummary, FileSystem};

/// file and directory operations
impl<D: BlockDevice> FileSystem<D> {
    /// create an empty file in the root directory
    pub fn create(&mut self, filename: &str) -> Result<()> {
        self.volume_mut()?.root_dir.create(filename).map(|_| ())
    }

    /// delete a file that no descriptor refers to
    pub fn delete(&mut self, filename: &str) -> Result<()> {
        let (volume, open_files) = self.parts_mut()?;
        volume
            .root_dir
            .delete(filename, &mut volume.fat, open_files)
    }

    /// list the files of the root directory
    pub fn list(&self) -> Result<impl Iterator<Item = FileSummary> + '_> {
        Ok(self.volume()?.root_dir.list())
    }

    pub fn open(&mut self, filename: &str) -> Result<Fd> {
        validate_filename(filename)?;
        let (volume, open_files) = self.parts_mut()?;
        let (slot, _) = volume
            .root_dir
            .lookup(filename)
            .ok_or(FsError::FileNotFound)?;
        open_files.open(slot)
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        let (_, open_files) = self.parts_mut()?;
        open_files.close(fd)
    }

    /// current size of the file opened as `fd`
    pub fn stat(&self, fd: Fd) -> Result<u32> {
        let volume = self.volume()?;
        self.open_files().stat(fd, &volume.root_dir)
    }

    /// move the cursor of `fd` to `offset`, which may not pass the end of the file
    pub fn lseek(&mut self, fd: Fd, offset: u32) -> Result<()> {
        let (volume, open_files) = self.parts_mut()?;
        open_files.seek(fd, offset, &volume.root_dir)
    }
}

/// read and write file contents
impl<D: BlockDevice> FileSystem<D> {
    /// write `data` at the cursor of `fd`, growing the file as needed
    /// # Return
    /// the number of bytes written, which is short when the disk fills up
    /// or a block can't be written
    pub fn write(&mut self, fd: Fd, data: &[u8]) -> Result<usize> {
        let (volume, open_files) = self.parts_mut()?;
        let file = open_files.get(fd)?;
        let entry = *volume
            .root_dir
            .entry(file.slot)
            .ok_or(FsError::InvalidDescriptor)?;
        if data.is_empty() {
            return Ok(0);
        }
        debug!(
            "write {} bytes to {:?} at offset {}",
            data.len(),
            entry.name(),
            file.offset
        );

        let mut first_block = entry.first_block();
        let mut chain = volume
            .fat
            .chain(first_block)
            .collect::<Result<Vec<u16>>>()?;
        let mut written = 0usize;
        for span in spans(file.offset as u64, data.len()) {
            let fresh = span.logical >= chain.len();
            let block = if !fresh {
                chain[span.logical]
            } else if span.logical > chain.len() {
                return Err(FsError::invalid_image(format!(
                    "chain of {:?} has {} blocks, too short for its size",
                    entry.name(),
                    chain.len()
                )));
            } else {
                let Ok(block) = volume.fat.allocate_block() else {
                    warn!("disk full after writing {written} of {} bytes", data.len());
                    break;
                };
                match chain.last() {
                    Some(tail) => volume.fat.extend_chain(*tail, block),
                    None => first_block = Some(block),
                }
                chain.push(block);
                block
            };

            if let Err(e) =
                volume.write_data_block(block, span.offset_in_block, &data[span.buf_range()], fresh)
            {
                warn!("writing data block {block} failed: {e}");
                if fresh {
                    chain.pop();
                    volume.fat.release_tail(chain.last().copied(), block);
                    if chain.is_empty() {
                        first_block = None;
                    }
                }
                break;
            }
            written += span.len;
        }

        let end = file.offset + written as u32;
        let entry = volume
            .root_dir
            .entry_mut(file.slot)
            .ok_or(FsError::InvalidDescriptor)?;
        entry.set_first_block(first_block);
        entry.size = entry.size.max(end);
        open_files.set_offset(fd, end)?;
        Ok(written)
    }

    /// read into `buf` from the cursor of `fd`, never past the end of the file
    /// # Return
    /// the number of bytes read, 0 at the end of the file
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let (volume, open_files) = self.parts_mut()?;
        let file = open_files.get(fd)?;
        let entry = volume
            .root_dir
            .entry(file.slot)
            .ok_or(FsError::InvalidDescriptor)?;
        let should_read = buf.len().min(entry.size.saturating_sub(file.offset) as usize);
        debug!(
            "read {should_read} bytes from {:?} at offset {}",
            entry.name(),
            file.offset
        );

        let start_block = file.offset as usize / super::BLOCK_SIZE;
        let mut blocks = volume.fat.chain(entry.first_block()).skip(start_block);
        let mut total_read = 0usize;
        for span in spans(file.offset as u64, should_read) {
            let block = match blocks.next() {
                Some(Ok(block)) => block,
                Some(Err(e)) => {
                    warn!("stopped reading {:?}: {e}", entry.name());
                    break;
                }
                None => {
                    warn!("chain of {:?} ends before its size", entry.name());
                    break;
                }
            };
            if let Err(e) =
                volume.read_data_block(block, span.offset_in_block, &mut buf[span.buf_range()])
            {
                warn!("reading data block {block} failed: {e}");
                break;
            }
            total_read += span.len;
        }

        open_files.set_offset(fd, file.offset + total_read as u32)?;
        Ok(total_read)
    }
}
