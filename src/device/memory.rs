//! In-memory device.

use super::BlockDevice;
use crate::error::Result;
use parking_lot::RwLock;
use std::io;

/// A device backed by a byte vector.
///
/// Useful for archives already loaded into memory and for building test
/// images. Writes past the end grow the image, zero-filling any gap.
#[derive(Debug, Default)]
pub struct MemoryDevice {
    data: RwLock<Vec<u8>>,
}

impl MemoryDevice {
    /// Create an empty device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a device holding `data`.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data: RwLock::new(data) }
    }

    /// Copy of the current image.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Consume the device and return its image.
    pub fn into_inner(self) -> Vec<u8> {
        self.data.into_inner()
    }
}

impl BlockDevice for MemoryDevice {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let data = self.data.read();
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let end = start.checked_add(buf.len());
        match end {
            Some(end) if end <= data.len() => {
                buf.copy_from_slice(&data[start..end]);
                Ok(())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("read of {} bytes at {:#x} past end of device", buf.len(), offset),
            )
            .into()),
        }
    }

    fn write_at(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset too large"))?;
        let end = start.checked_add(bytes.len()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "write past end of address space")
        })?;

        let mut data = self.data.write();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(bytes);
        Ok(())
    }

    fn len(&self) -> Result<u64> {
        Ok(self.data.read().len() as u64)
    }
}
