//! Tree node records and directory entries.

use crate::error::{Error, Result};
use crate::format::{MAX_BRANCHES, MAX_ENTRIES, NODE_RECORD_SIZE};
use bytes::{Buf, BufMut, BytesMut};

/// Maps an entry ID to the chain holding its payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DirectoryEntry {
    /// Entry ID, the tree's key.
    pub id: u32,
    /// Head block address of the payload chain.
    pub chain_head: u32,
    /// Exact payload length in bytes.
    pub length: u32,
}

impl DirectoryEntry {
    /// Create a new DirectoryEntry
    pub fn new(id: u32, chain_head: u32, length: u32) -> Self {
        Self { id, chain_head, length }
    }

    fn put(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.id);
        buf.put_u32_le(self.chain_head);
        buf.put_u32_le(self.length);
    }

    fn get(buf: &mut &[u8]) -> Self {
        Self { id: buf.get_u32_le(), chain_head: buf.get_u32_le(), length: buf.get_u32_le() }
    }
}

/// The decoded payload of one tree node.
///
/// Format (984 bytes):
/// ```text
/// [branches: 62 x u32]          // child head block addresses
/// [entry_count: u32]            // at most 61
/// [entries: 61 x 12 bytes]      // {id, chain_head, length}, first entry_count used
/// ```
///
/// Unused slots are decoded but not kept. A node whose first branch is
/// zero is a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    branches: [u32; MAX_BRANCHES],
    entries: Vec<DirectoryEntry>,
}

impl NodeRecord {
    /// Create a leaf holding `entries`.
    pub fn leaf(entries: Vec<DirectoryEntry>) -> Result<Self> {
        Self::new(entries, &[])
    }

    /// Create a node from its entries and child addresses.
    ///
    /// An internal node passes `entries.len() + 1` branches; a leaf passes
    /// none. Entries must be strictly ascending by ID.
    pub fn new(entries: Vec<DirectoryEntry>, branches: &[u32]) -> Result<Self> {
        if entries.len() > MAX_ENTRIES {
            return Err(Error::invalid_argument(format!(
                "Node holds at most {} entries, got {}",
                MAX_ENTRIES,
                entries.len()
            )));
        }
        if branches.len() > MAX_BRANCHES {
            return Err(Error::invalid_argument(format!(
                "Node holds at most {} branches, got {}",
                MAX_BRANCHES,
                branches.len()
            )));
        }
        if entries.windows(2).any(|pair| pair[0].id >= pair[1].id) {
            return Err(Error::invalid_argument("Entries must be strictly ascending by id"));
        }

        let mut slots = [0u32; MAX_BRANCHES];
        slots[..branches.len()].copy_from_slice(branches);
        Ok(Self { branches: slots, entries })
    }

    /// Directory entries, ascending by ID.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Number of directory entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Child head block address in slot `index`, or 0 if out of range.
    pub fn branch_address(&self, index: usize) -> u32 {
        self.branches.get(index).copied().unwrap_or(0)
    }

    /// Returns true if the first child slot is empty.
    pub fn is_leaf(&self) -> bool {
        self.branches[0] == 0
    }

    /// Number of meaningful child slots: 0 for a leaf, entry count + 1 otherwise.
    pub fn branch_count(&self) -> usize {
        if self.is_leaf() {
            0
        } else {
            self.entries.len() + 1
        }
    }

    /// Encode the record to bytes (984 bytes)
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(NODE_RECORD_SIZE);
        for branch in &self.branches {
            buf.put_u32_le(*branch);
        }
        buf.put_u32_le(self.entries.len() as u32);
        for entry in &self.entries {
            entry.put(&mut buf);
        }
        buf.resize(NODE_RECORD_SIZE, 0);
        buf.to_vec()
    }

    /// Decode a record from bytes.
    ///
    /// Entry order is not checked here; an unsorted node only misroutes
    /// lookups and never breaks memory safety.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != NODE_RECORD_SIZE {
            return Err(Error::corruption(format!(
                "Node record size mismatch: expected {}, got {}",
                NODE_RECORD_SIZE,
                data.len()
            )));
        }

        let mut buf = data;
        let mut branches = [0u32; MAX_BRANCHES];
        for branch in branches.iter_mut() {
            *branch = buf.get_u32_le();
        }

        let entry_count = buf.get_u32_le() as usize;
        if entry_count > MAX_ENTRIES {
            return Err(Error::corruption(format!(
                "Node entry count {} exceeds fanout {}",
                entry_count, MAX_ENTRIES
            )));
        }

        let entries = (0..entry_count).map(|_| DirectoryEntry::get(&mut buf)).collect();
        Ok(Self { branches, entries })
    }
}
