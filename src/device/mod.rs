//! Random-access byte devices that archives are read from.
//!
//! A device reads or writes an exact byte range at an absolute offset and
//! does no buffering of its own. Archives only ever read; `write_at` exists
//! so a device can stand in for the whole underlying file.

mod file;
mod memory;

pub use file::FileDevice;
pub use memory::MemoryDevice;

use crate::error::Result;

/// A random-access device holding an archive image.
pub trait BlockDevice: Send + Sync {
    /// Fill `buf` with the bytes at `offset`.
    ///
    /// Fails with an `UnexpectedEof` I/O error if fewer than `buf.len()`
    /// bytes are available.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Write all of `data` at `offset`.
    fn write_at(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Current size of the device in bytes.
    fn len(&self) -> Result<u64>;

    /// Returns true if the device holds no bytes.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for Box<D> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_at(offset, buf)
    }

    fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        (**self).write_at(offset, data)
    }

    fn len(&self) -> Result<u64> {
        (**self).len()
    }
}
