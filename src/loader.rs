//! Block chain loader.
//!
//! Reads the archive header and turns a chain of blocks into one
//! contiguous payload.

use crate::device::BlockDevice;
use crate::error::{Error, Result};
use crate::format::{ArchiveHeader, SuccessorPointer, BLOCK_POINTER_SIZE, HEADER_SIZE};
use bytes::{Bytes, BytesMut};

/// Reads block chains out of an archive device.
///
/// Usage:
/// ```no_run
/// use datdisk::device::FileDevice;
/// use datdisk::loader::BlockLoader;
///
/// let device = FileDevice::open("client_portal.dat").unwrap();
/// let loader = BlockLoader::open(device, 0x140).unwrap();
/// let root = loader.read_chain_to_vec(loader.tree_root(), 984).unwrap();
/// ```
#[derive(Debug)]
pub struct BlockLoader<D> {
    device: D,
    header: ArchiveHeader,
}

impl<D: BlockDevice> BlockLoader<D> {
    /// Read the header at `header_offset` and wrap the device.
    pub fn open(device: D, header_offset: u64) -> Result<Self> {
        let mut buf = [0u8; HEADER_SIZE];
        device.read_at(header_offset, &mut buf)?;
        let header = ArchiveHeader::decode(&buf)?;
        Ok(Self { device, header })
    }

    /// The header read at open.
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// Head block address of the root tree node.
    pub fn tree_root(&self) -> u32 {
        self.header.tree_root
    }

    /// Bytes per physical block.
    pub fn block_size(&self) -> usize {
        self.header.block_size as usize
    }

    /// Payload bytes carried by one full block.
    pub fn payload_per_block(&self) -> usize {
        self.header.payload_per_block()
    }

    /// The underlying device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Fill `dest` with the payload of the chain starting at `head`.
    ///
    /// The chain must supply exactly `dest.len()` bytes. Blocks are read
    /// whole except the last, which is read only as far as the payload
    /// needs. A flagged successor fails the read even when the flagged
    /// block completed it; bytes already copied are left in `dest` but
    /// must not be trusted.
    pub fn read_chain(&self, head: u32, dest: &mut [u8]) -> Result<()> {
        if dest.is_empty() {
            return Ok(());
        }
        if head == 0 {
            return Err(Error::InvalidAddress(head));
        }

        let per_block = self.payload_per_block();
        // Bounded by the request, not by the header's block size.
        let mut scratch = vec![0u8; BLOCK_POINTER_SIZE + per_block.min(dest.len())];
        let mut block = head;
        let mut rest = dest;

        loop {
            let take = per_block.min(rest.len());
            let raw = &mut scratch[..BLOCK_POINTER_SIZE + take];
            self.device.read_at(u64::from(block), raw)?;

            let (pointer, payload) = raw.split_at(BLOCK_POINTER_SIZE);
            let next = SuccessorPointer::decode([pointer[0], pointer[1], pointer[2], pointer[3]]);

            let (head_part, tail) = std::mem::take(&mut rest).split_at_mut(take);
            head_part.copy_from_slice(payload);
            rest = tail;

            // A flagged pointer poisons the whole request; nothing past this
            // block is read.
            if next.is_flagged() {
                log::debug!("Chain block {:#x} carries the corruption flag", block);
                return Err(Error::ChainFlagged { block });
            }
            if rest.is_empty() {
                return Ok(());
            }
            if next.is_end() {
                return Err(Error::ChainTruncated { remaining: rest.len() });
            }
            block = next.address();
        }
    }

    /// Read a chain of `length` bytes into a new buffer.
    pub fn read_chain_to_vec(&self, head: u32, length: usize) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(length);
        self.read_chain(head, &mut buf)?;
        Ok(buf.freeze())
    }
}
