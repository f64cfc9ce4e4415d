//! Helpers for building archive images in unit tests.

use crate::config::DEFAULT_HEADER_OFFSET;
use crate::device::{BlockDevice, MemoryDevice};
use crate::format::{
    ArchiveHeader, DirectoryEntry, NodeRecord, SuccessorPointer, BLOCK_POINTER_SIZE, HEADER_SIZE,
};

/// Lays out blocks after the header of an in-memory image.
pub(crate) struct ImageWriter {
    device: MemoryDevice,
    header: ArchiveHeader,
    next_block: u32,
}

impl ImageWriter {
    pub(crate) fn new(block_size: u32) -> Self {
        let header_end = DEFAULT_HEADER_OFFSET as u32 + HEADER_SIZE as u32;
        let first_block = header_end.div_ceil(block_size) * block_size;
        Self {
            device: MemoryDevice::from_vec(vec![0u8; first_block as usize]),
            header: ArchiveHeader::new(block_size, 0),
            next_block: first_block,
        }
    }

    fn payload_per_block(&self) -> usize {
        self.header.payload_per_block()
    }

    /// Address the next written chain will start at.
    pub(crate) fn next_address(&self) -> u32 {
        self.next_block
    }

    pub(crate) fn set_tree_root(&mut self, address: u32) {
        self.header.tree_root = address;
    }

    /// Write `data` as a chain of full blocks and return its head.
    pub(crate) fn write_chain(&mut self, data: &[u8]) -> u32 {
        let block_size = self.header.block_size;
        let count = data.len().div_ceil(self.payload_per_block()).max(1);
        let addresses: Vec<u32> =
            (0..count as u32).map(|i| self.next_block + i * block_size).collect();
        self.next_block += count as u32 * block_size;

        let chunks = data.chunks(self.payload_per_block()).chain(std::iter::repeat(&[][..]));
        for (i, chunk) in chunks.take(count).enumerate() {
            let next = addresses.get(i + 1).copied().unwrap_or(0);
            let mut block = SuccessorPointer::new(next, false).encode().to_vec();
            block.extend_from_slice(chunk);
            block.resize(block_size as usize, 0);
            self.device.write_at(u64::from(addresses[i]), &block).unwrap();
        }
        addresses[0]
    }

    /// Write a node record as a chain and return its head.
    pub(crate) fn write_node(&mut self, entries: Vec<DirectoryEntry>, branches: &[u32]) -> u32 {
        let record = NodeRecord::new(entries, branches).unwrap();
        self.write_chain(&record.encode())
    }

    fn successor(&self, block: u32) -> SuccessorPointer {
        let mut raw = [0u8; BLOCK_POINTER_SIZE];
        self.device.read_at(u64::from(block), &mut raw).unwrap();
        SuccessorPointer::decode(raw)
    }

    pub(crate) fn set_successor(&mut self, block: u32, next: u32, flagged: bool) {
        let pointer = SuccessorPointer::new(next, flagged);
        self.device.write_at(u64::from(block), &pointer.encode()).unwrap();
    }

    /// Set the corruption flag on a block, keeping its successor address.
    pub(crate) fn flag_block(&mut self, block: u32) {
        let next = self.successor(block).address();
        self.set_successor(block, next, true);
    }

    /// Addresses of every block in the chain starting at `head`.
    pub(crate) fn chain_blocks(&self, head: u32) -> Vec<u32> {
        let mut blocks = vec![head];
        let mut next = self.successor(head);
        while !next.is_end() {
            blocks.push(next.address());
            next = self.successor(next.address());
        }
        blocks
    }

    pub(crate) fn finish(self) -> MemoryDevice {
        self.device.write_at(DEFAULT_HEADER_OFFSET, &self.header.encode()).unwrap();
        self.device
    }
}

/// Entries whose payload location is derived from the ID.
pub(crate) fn entries(ids: &[u32]) -> Vec<DirectoryEntry> {
    ids.iter().map(|&id| DirectoryEntry::new(id, 0x1000 + id, id * 2)).collect()
}

/// Root {10, 20, 30} over leaves {1, 5, 8}, {11, 15}, {21, 25, 28} and
/// {31, 40}.
pub(crate) fn two_level_image() -> MemoryDevice {
    let mut writer = ImageWriter::new(1024);
    let left = writer.write_node(entries(&[1, 5, 8]), &[]);
    let middle = writer.write_node(entries(&[11, 15]), &[]);
    let right = writer.write_node(entries(&[21, 25, 28]), &[]);
    let last = writer.write_node(entries(&[31, 40]), &[]);
    let root = writer.write_node(entries(&[10, 20, 30]), &[left, middle, right, last]);
    writer.set_tree_root(root);
    writer.finish()
}
