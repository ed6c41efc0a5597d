use std::io;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{FsError, Result};

/// Trait for fixed-size records stored byte-exact inside a block
/// # Note
/// records are encoded with [bincode::config::legacy],
/// which is little endian with fixed-width integers and no length prefix on arrays
pub trait BlockRecord: Serialize + DeserializeOwned {
    /// encoded size in bytes
    const SIZE: usize;

    /// serialize into the front of `buf`
    /// # Returns
    /// The number of bytes written if successful
    fn encode_into(&self, buf: &mut [u8]) -> Result<usize> {
        let config = bincode::config::legacy();
        bincode::serde::encode_into_slice(self, buf, config)
            .map_err(|e| FsError::BlockIo(io::Error::new(io::ErrorKind::Other, e.to_string())))
    }

    /// deserialize from the front of `buf`
    fn decode_from(buf: &[u8]) -> Result<Self> {
        let config = bincode::config::legacy();
        let (object, _bytes_read): (Self, usize) =
            bincode::serde::decode_from_slice(buf, config)
                .map_err(|e| FsError::invalid_image(e.to_string()))?;
        Ok(object)
    }
}
