//! On-disk format of a DAT archive.
//!
//! ## File Format
//!
//! ```text
//! [0x000 .. 0x140)   // unused by the reader
//! [Header: 80B]      // at HEADER_OFFSET, holds block size and tree root
//! [Block]            // every other byte belongs to some block
//! [Block]
//! ...
//! ```
//!
//! ## Block Format
//!
//! Every block is `block_size` bytes:
//!
//! ```text
//! [successor: u32]              // bit 31 = corruption flag, bits 0..31 = next block
//! [payload: block_size - 4]
//! ```
//!
//! A successor of zero ends the chain. Blobs and tree nodes are both
//! stored as chains; only the reader's interpretation differs.
//!
//! ## Node Format
//!
//! A tree node's chain payload is a fixed 984-byte record: 62 child block
//! addresses, an entry count, then 61 directory entry slots. See
//! [`NodeRecord`].
//!
//! All integers are little-endian.

pub mod header;
pub mod node;

pub use header::ArchiveHeader;
pub use node::{DirectoryEntry, NodeRecord};

/// Width of the successor pointer at the start of every block.
pub const BLOCK_POINTER_SIZE: usize = 4;

/// High bit of a successor pointer, set when the chain is corrupt.
pub const CORRUPTION_FLAG: u32 = 0x8000_0000;

/// Maximum number of directory entries in one node.
pub const MAX_ENTRIES: usize = 61;

/// Maximum number of child slots in one node.
pub const MAX_BRANCHES: usize = MAX_ENTRIES + 1;

/// Encoded size of a [`DirectoryEntry`].
pub const DIRECTORY_ENTRY_SIZE: usize = 12;

/// Encoded size of a [`NodeRecord`]: branches, entry count, entries.
pub const NODE_RECORD_SIZE: usize = MAX_BRANCHES * 4 + 4 + MAX_ENTRIES * DIRECTORY_ENTRY_SIZE;

/// Encoded size of an [`ArchiveHeader`].
pub const HEADER_SIZE: usize = 80;

/// The successor field at the start of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessorPointer(u32);

impl SuccessorPointer {
    /// Wrap a raw on-disk pointer value.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Build a pointer to `address`, optionally carrying the corruption flag.
    pub fn new(address: u32, flagged: bool) -> Self {
        let raw = address & !CORRUPTION_FLAG;
        Self(if flagged { raw | CORRUPTION_FLAG } else { raw })
    }

    /// Decode from the first four bytes of a block.
    pub fn decode(data: [u8; BLOCK_POINTER_SIZE]) -> Self {
        Self(u32::from_le_bytes(data))
    }

    /// Encode to the four bytes stored at the start of a block.
    pub fn encode(&self) -> [u8; BLOCK_POINTER_SIZE] {
        self.0.to_le_bytes()
    }

    /// The raw value, flag included.
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Address of the next block with the flag cleared; zero ends the chain.
    pub fn address(&self) -> u32 {
        self.0 & !CORRUPTION_FLAG
    }

    /// Returns true if the corruption flag is set.
    pub fn is_flagged(&self) -> bool {
        self.0 & CORRUPTION_FLAG != 0
    }

    /// Returns true if this is the last block of its chain.
    pub fn is_end(&self) -> bool {
        self.address() == 0
    }
}
