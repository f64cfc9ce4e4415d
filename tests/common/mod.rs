// Shared helpers for datdisk integration tests
// Builds archive files on disk from sorted (id, payload) lists

#![allow(dead_code)]

use datdisk::format::{
    ArchiveHeader, DirectoryEntry, NodeRecord, SuccessorPointer, BLOCK_POINTER_SIZE, HEADER_SIZE,
};
use datdisk::{BlockDevice, MemoryDevice};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const HEADER_OFFSET: u64 = 0x140;

/// Deterministic payload for an id.
pub fn payload_for(id: u32, len: usize) -> Vec<u8> {
    (0..len).map(|i| (id as usize).wrapping_mul(31).wrapping_add(i) as u8).collect()
}

/// Where an entry's payload was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub chain_head: u32,
    pub length: u32,
}

/// Writes a complete archive image block by block.
pub struct ArchiveBuilder {
    device: MemoryDevice,
    block_size: u32,
    next_block: u32,
    fanout: usize,
    placements: BTreeMap<u32, Placement>,
    nodes: Vec<u32>,
}

impl ArchiveBuilder {
    /// `fanout` is the maximum number of entries per node, at least 2.
    pub fn new(block_size: u32, fanout: usize) -> Self {
        assert!(fanout >= 2 && fanout <= 61);
        let header_end = HEADER_OFFSET as u32 + HEADER_SIZE as u32;
        let first_block = header_end.div_ceil(block_size) * block_size;
        Self {
            device: MemoryDevice::from_vec(vec![0u8; first_block as usize]),
            block_size,
            next_block: first_block,
            fanout,
            placements: BTreeMap::new(),
            nodes: Vec::new(),
        }
    }

    fn payload_per_block(&self) -> usize {
        self.block_size as usize - BLOCK_POINTER_SIZE
    }

    /// Writes `data` as a chain and returns its head address.
    pub fn write_chain(&mut self, data: &[u8]) -> u32 {
        let per_block = self.payload_per_block();
        let count = data.len().div_ceil(per_block).max(1);
        let addresses: Vec<u32> =
            (0..count as u32).map(|i| self.next_block + i * self.block_size).collect();
        self.next_block += count as u32 * self.block_size;

        for (i, address) in addresses.iter().enumerate() {
            let start = (i * per_block).min(data.len());
            let end = ((i + 1) * per_block).min(data.len());
            let next = addresses.get(i + 1).copied().unwrap_or(0);

            let mut block = SuccessorPointer::new(next, false).encode().to_vec();
            block.extend_from_slice(&data[start..end]);
            block.resize(self.block_size as usize, 0);
            self.device.write_at(u64::from(*address), &block).unwrap();
        }
        addresses[0]
    }

    fn write_tree(&mut self, entries: &[DirectoryEntry]) -> u32 {
        let n = entries.len();
        if n <= self.fanout {
            return self.write_node(entries.to_vec(), &[]);
        }

        // c children need c - 1 separators and at least one entry each.
        let children = (self.fanout + 1).min((n + 1) / 2);
        let remaining = n - (children - 1);
        let base = remaining / children;
        let extra = remaining % children;

        let mut separators = Vec::with_capacity(children - 1);
        let mut branches = Vec::with_capacity(children);
        let mut pos = 0;
        for child in 0..children {
            let take = base + usize::from(child < extra);
            branches.push(self.write_tree(&entries[pos..pos + take]));
            pos += take;
            if child + 1 < children {
                separators.push(entries[pos]);
                pos += 1;
            }
        }

        self.write_node(separators, &branches)
    }

    /// Writes one node record and returns its head address.
    pub fn write_node(&mut self, entries: Vec<DirectoryEntry>, branches: &[u32]) -> u32 {
        let record = NodeRecord::new(entries, branches).unwrap();
        let address = self.write_chain(&record.encode());
        self.nodes.push(address);
        address
    }

    /// Writes a payload and returns its directory entry.
    pub fn write_entry(&mut self, id: u32, data: &[u8]) -> DirectoryEntry {
        let head = self.write_chain(data);
        self.placements.insert(id, Placement { chain_head: head, length: data.len() as u32 });
        DirectoryEntry::new(id, head, data.len() as u32)
    }

    /// Writes the header naming `root` and returns the image.
    pub fn finish(self, root: u32) -> BuiltImage {
        let header = ArchiveHeader::new(self.block_size, root);
        self.device.write_at(HEADER_OFFSET, &header.encode()).unwrap();

        BuiltImage {
            bytes: self.device.into_inner(),
            block_size: self.block_size,
            root,
            placements: self.placements,
            nodes: self.nodes,
        }
    }

    /// Writes every payload, then the tree over them, then the header.
    pub fn build(mut self, items: &[(u32, Vec<u8>)]) -> BuiltImage {
        let mut sorted: Vec<&(u32, Vec<u8>)> = items.iter().collect();
        sorted.sort_by_key(|(id, _)| *id);
        sorted.dedup_by_key(|(id, _)| *id);

        let dir_entries: Vec<DirectoryEntry> =
            sorted.into_iter().map(|(id, data)| self.write_entry(*id, data)).collect();

        let root = self.write_tree(&dir_entries);
        self.finish(root)
    }
}

/// A finished archive image and its layout.
pub struct BuiltImage {
    pub bytes: Vec<u8>,
    pub block_size: u32,
    pub root: u32,
    pub placements: BTreeMap<u32, Placement>,
    pub nodes: Vec<u32>,
}

impl BuiltImage {
    pub fn device(&self) -> MemoryDevice {
        MemoryDevice::from_vec(self.bytes.clone())
    }

    pub fn successor(&self, block: u32) -> SuccessorPointer {
        let at = block as usize;
        let raw = [self.bytes[at], self.bytes[at + 1], self.bytes[at + 2], self.bytes[at + 3]];
        SuccessorPointer::decode(raw)
    }

    pub fn set_successor(&mut self, block: u32, pointer: SuccessorPointer) {
        let at = block as usize;
        self.bytes[at..at + BLOCK_POINTER_SIZE].copy_from_slice(&pointer.encode());
    }

    /// Sets the corruption flag on a block, keeping its successor.
    pub fn flag_block(&mut self, block: u32) {
        let next = self.successor(block).address();
        self.set_successor(block, SuccessorPointer::new(next, true));
    }

    /// Blocks of the chain starting at `head`.
    pub fn chain_blocks(&self, head: u32) -> Vec<u32> {
        let mut blocks = vec![head];
        let mut next = self.successor(head);
        while !next.is_end() {
            blocks.push(next.address());
            next = self.successor(next.address());
        }
        blocks
    }

    /// Writes the image to `name` inside `dir`.
    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, &self.bytes).unwrap();
        path
    }
}

/// Items with ids `ids`, each payload `len(id)` bytes long.
pub fn items(
    ids: impl IntoIterator<Item = u32>,
    len: impl Fn(u32) -> usize,
) -> Vec<(u32, Vec<u8>)> {
    ids.into_iter().map(|id| (id, payload_for(id, len(id)))).collect()
}

/// Builds an image and writes it into a fresh temp dir.
pub fn archive_file(
    block_size: u32,
    fanout: usize,
    items: &[(u32, Vec<u8>)],
) -> (TempDir, PathBuf, BuiltImage) {
    let dir = TempDir::new().unwrap();
    let image = ArchiveBuilder::new(block_size, fanout).build(items);
    let path = image.write_to(dir.path(), "client_portal.dat");
    (dir, path, image)
}

pub fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}
