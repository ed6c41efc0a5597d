use std::{
    cell::RefCell,
    collections::BTreeSet,
    io::{self, ErrorKind},
    rc::Rc,
};

use crate::block_device::{out_of_range, Block, BlockDevice};
use crate::fs::BLOCK_SIZE;

/// an in-memory device for tests,
/// clones share the same blocks so a volume can be mounted again after unmount
#[derive(Debug, Clone)]
pub struct RamDisk {
    blocks: Rc<RefCell<Vec<u8>>>,
    failing: Rc<RefCell<BTreeSet<usize>>>,
    block_count: usize,
}

impl RamDisk {
    pub fn new(block_count: usize) -> Self {
        Self {
            blocks: Rc::new(RefCell::new(vec![0u8; block_count * BLOCK_SIZE])),
            failing: Rc::default(),
            block_count,
        }
    }

    /// make every read and write of block `index` fail from now on
    pub fn fail_block(&self, index: usize) {
        self.failing.borrow_mut().insert(index);
    }

    pub fn heal(&self) {
        self.failing.borrow_mut().clear();
    }

    fn check(&self, index: usize) -> io::Result<usize> {
        if index >= self.block_count {
            return Err(out_of_range(index, self.block_count));
        }
        if self.failing.borrow().contains(&index) {
            return Err(io::Error::new(
                ErrorKind::Other,
                format!("injected failure on block {index}"),
            ));
        }
        Ok(index * BLOCK_SIZE)
    }
}

impl BlockDevice for RamDisk {
    fn block_count(&self) -> usize {
        self.block_count
    }

    fn read_block(&self, index: usize, buf: &mut Block) -> io::Result<()> {
        let start = self.check(index)?;
        buf.copy_from_slice(&self.blocks.borrow()[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&mut self, index: usize, buf: &Block) -> io::Result<()> {
        let start = self.check(index)?;
        self.blocks.borrow_mut()[start..start + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
