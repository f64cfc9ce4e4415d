//! Archive header.
//!
//! The header is a fixed-size (80 bytes) record at a fixed offset near the
//! start of the file. The reader needs only the block size and the tree
//! root; the remaining fields are kept so callers can inspect them.

use crate::error::{Error, Result};
use crate::format::{BLOCK_POINTER_SIZE, HEADER_SIZE};
use bytes::{Buf, BufMut, BytesMut};

/// The archive header.
///
/// Format:
/// ```text
/// [file_type: u32][block_size: u32][file_size: u32]
/// [data_set: u32][data_subset: u32]
/// [free_head: u32][free_tail: u32][free_count: u32]
/// [tree_root: u32]
/// [new_lru: u32][old_lru: u32][use_lru: u32]
/// [master_map_id: u32][engine_pack_version: u32][game_pack_version: u32]
/// [version_major: 16 bytes][version_minor: u32]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveHeader {
    /// Format tag of the file.
    pub file_type: u32,
    /// Bytes per physical block, successor pointer included.
    pub block_size: u32,
    /// Size of the archive file as recorded by its writer.
    pub file_size: u32,
    /// Which data set the archive holds (portal, cell, ...).
    pub data_set: u32,
    /// Sub-division of the data set.
    pub data_subset: u32,
    /// Head of the free block list.
    pub free_head: u32,
    /// Tail of the free block list.
    pub free_tail: u32,
    /// Number of free blocks.
    pub free_count: u32,
    /// Head block address of the root tree node.
    pub tree_root: u32,
    /// Newest entry of the writer's LRU list.
    pub new_lru: u32,
    /// Oldest entry of the writer's LRU list.
    pub old_lru: u32,
    /// Whether the writer kept an LRU list.
    pub use_lru: u32,
    /// ID of the master map entry.
    pub master_map_id: u32,
    /// Engine content version.
    pub engine_pack_version: u32,
    /// Game content version.
    pub game_pack_version: u32,
    /// Opaque major version stamp.
    pub version_major: [u8; 16],
    /// Minor version number.
    pub version_minor: u32,
}

impl ArchiveHeader {
    /// Create a header with the two fields the reader depends on.
    pub fn new(block_size: u32, tree_root: u32) -> Self {
        Self { block_size, tree_root, ..Default::default() }
    }

    /// Payload bytes carried by one full block.
    pub fn payload_per_block(&self) -> usize {
        (self.block_size as usize).saturating_sub(BLOCK_POINTER_SIZE)
    }

    /// Encode the header to bytes (80 bytes)
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);
        for value in [
            self.file_type,
            self.block_size,
            self.file_size,
            self.data_set,
            self.data_subset,
            self.free_head,
            self.free_tail,
            self.free_count,
            self.tree_root,
            self.new_lru,
            self.old_lru,
            self.use_lru,
            self.master_map_id,
            self.engine_pack_version,
            self.game_pack_version,
        ] {
            buf.put_u32_le(value);
        }
        buf.put_slice(&self.version_major);
        buf.put_u32_le(self.version_minor);

        debug_assert_eq!(buf.len(), HEADER_SIZE);
        buf.to_vec()
    }

    /// Decode a header from bytes.
    ///
    /// Rejects headers whose block size leaves no room for payload.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != HEADER_SIZE {
            return Err(Error::corruption(format!(
                "Header size mismatch: expected {}, got {}",
                HEADER_SIZE,
                data.len()
            )));
        }

        let mut buf = data;
        let mut header = Self {
            file_type: buf.get_u32_le(),
            block_size: buf.get_u32_le(),
            file_size: buf.get_u32_le(),
            data_set: buf.get_u32_le(),
            data_subset: buf.get_u32_le(),
            free_head: buf.get_u32_le(),
            free_tail: buf.get_u32_le(),
            free_count: buf.get_u32_le(),
            tree_root: buf.get_u32_le(),
            new_lru: buf.get_u32_le(),
            old_lru: buf.get_u32_le(),
            use_lru: buf.get_u32_le(),
            master_map_id: buf.get_u32_le(),
            engine_pack_version: buf.get_u32_le(),
            game_pack_version: buf.get_u32_le(),
            ..Default::default()
        };
        buf.copy_to_slice(&mut header.version_major);
        header.version_minor = buf.get_u32_le();

        if header.block_size as usize <= BLOCK_POINTER_SIZE {
            return Err(Error::corruption(format!(
                "Block size {} leaves no room for payload",
                header.block_size
            )));
        }

        Ok(header)
    }
}
