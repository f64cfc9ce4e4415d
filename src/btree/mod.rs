//! On-disk B-tree index.
//!
//! The index maps 32-bit entry IDs to [`DirectoryEntry`] records. Nodes are
//! stored as block chains and decoded lazily: opening the index decodes only
//! the root, and every other node is decoded the first time a lookup or scan
//! reaches it, then cached by its parent for the life of the index.
//!
//! ## Navigation
//!
//! Within a node, entries are ascending by ID. Branch `i` holds the IDs
//! between entry `i - 1` and entry `i`; the last branch holds everything
//! above the last entry.
//!
//! ```text
//!              [ 10 | 20 | 30 ]
//!             /     |    |     \
//!      [1 5 8] [11 15] [21 25 28] [31 40]
//! ```
//!
//! The tree need not be balanced. A child pointer naming a node already on
//! the path from the root is treated as a failed branch, so damaged files
//! with cyclic pointers cannot trap a walk.

pub mod node;
pub mod scan;

pub use node::TreeNode;
pub use scan::{ProgressSpan, ScanCallbacks};

/// Depth bound used when no limit is configured.
pub(crate) const UNLIMITED_DEPTH: usize = usize::MAX;

use crate::config::Preload;
use crate::device::BlockDevice;
use crate::error::Result;
use crate::format::DirectoryEntry;
use crate::loader::BlockLoader;

/// The root node and the read operations over the whole tree.
#[derive(Debug)]
pub struct TreeIndex {
    root: TreeNode,
    max_depth: usize,
}

impl TreeIndex {
    /// Decode the root node named by the loader's header.
    pub fn load<D: BlockDevice>(loader: &BlockLoader<D>) -> Result<Self> {
        Self::load_with_depth(loader, UNLIMITED_DEPTH)
    }

    /// Decode the root node, stopping walks `max_depth` levels below it.
    pub fn load_with_depth<D: BlockDevice>(
        loader: &BlockLoader<D>,
        max_depth: usize,
    ) -> Result<Self> {
        let root = TreeNode::load(loader, loader.tree_root())?;
        Ok(Self { root, max_depth })
    }

    /// The root node.
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Find the entry for `id`.
    ///
    /// A node that cannot be decoded on the way down makes the lookup
    /// report `None`.
    pub fn lookup<D: BlockDevice>(
        &self,
        loader: &BlockLoader<D>,
        id: u32,
    ) -> Option<DirectoryEntry> {
        self.root.lookup_within(loader, id, self.max_depth)
    }

    /// Report every entry with `min <= id <= max` in ascending order,
    /// with progress running from `progress` to `progress + progress_delta`.
    pub fn scan_range<D: BlockDevice>(
        &self,
        loader: &BlockLoader<D>,
        min: u32,
        max: u32,
        progress: f32,
        progress_delta: f32,
        callbacks: &mut ScanCallbacks<'_>,
    ) {
        self.root.scan_range_within(
            loader,
            min,
            max,
            ProgressSpan::new(progress, progress_delta),
            callbacks,
            self.max_depth,
        );
    }

    /// Decode nodes ahead of any query.
    ///
    /// Returns the number of nodes decoded below the root.
    pub fn preload<D: BlockDevice>(&self, loader: &BlockLoader<D>, preload: Preload) -> usize {
        match preload {
            Preload::None => 0,
            Preload::Children => self.root.load_children(loader),
            Preload::All => self.root.load_recursive_within(loader, self.max_depth),
        }
    }

    /// Number of decoded nodes, the root included.
    pub fn cached_nodes(&self) -> usize {
        self.root.cached_nodes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_HEADER_OFFSET;
    use crate::device::MemoryDevice;
    use crate::error::Error;
    use crate::testutil::{entries, two_level_image, ImageWriter};

    fn open_loader(device: MemoryDevice) -> BlockLoader<MemoryDevice> {
        BlockLoader::open(device, DEFAULT_HEADER_OFFSET).unwrap()
    }

    #[test]
    fn test_index_lookup() {
        let loader = open_loader(two_level_image());
        let index = TreeIndex::load(&loader).unwrap();

        assert_eq!(index.lookup(&loader, 15).map(|e| e.id), Some(15));
        assert_eq!(index.lookup(&loader, 16), None);
    }

    #[test]
    fn test_index_zero_root_fails() {
        let loader = open_loader(ImageWriter::new(1024).finish());
        let result = TreeIndex::load(&loader);
        assert!(matches!(result, Err(Error::InvalidAddress(0))));
    }

    #[test]
    fn test_index_corrupt_root_fails() {
        let mut writer = ImageWriter::new(1024);
        let root = writer.write_node(entries(&[1]), &[]);
        writer.flag_block(root);
        writer.set_tree_root(root);
        let loader = open_loader(writer.finish());

        let result = TreeIndex::load(&loader);
        assert!(matches!(result, Err(Error::ChainFlagged { .. })));
    }

    #[test]
    fn test_index_preload() {
        let loader = open_loader(two_level_image());

        let index = TreeIndex::load(&loader).unwrap();
        assert_eq!(index.preload(&loader, Preload::None), 0);
        assert_eq!(index.cached_nodes(), 1);

        assert_eq!(index.preload(&loader, Preload::Children), 4);
        assert_eq!(index.cached_nodes(), 5);

        let index = TreeIndex::load(&loader).unwrap();
        assert_eq!(index.preload(&loader, Preload::All), 4);
        assert_eq!(index.cached_nodes(), 5);
    }

    #[test]
    fn test_index_skewed_tree_is_not_capped() {
        let mut writer = ImageWriter::new(1024);
        let mut node = writer.write_node(entries(&[100]), &[]);
        for level in (0..50).rev() {
            let left = writer.write_node(entries(&[2 * level]), &[]);
            node = writer.write_node(entries(&[2 * level + 1]), &[left, node]);
        }
        writer.set_tree_root(node);
        let loader = open_loader(writer.finish());

        let index = TreeIndex::load(&loader).unwrap();
        assert_eq!(index.lookup(&loader, 100).map(|e| e.id), Some(100));
        assert_eq!(index.cached_nodes(), 51);
    }

    #[test]
    fn test_index_depth_cap() {
        let loader = open_loader(two_level_image());
        let index = TreeIndex::load_with_depth(&loader, 1).unwrap();
        assert_eq!(index.lookup(&loader, 25).map(|e| e.id), Some(25));

        let mut writer = ImageWriter::new(1024);
        let a = writer.write_node(entries(&[1]), &[]);
        let b = writer.write_node(entries(&[3]), &[]);
        let inner = writer.write_node(entries(&[2]), &[a, b]);
        let root = writer.write_node(entries(&[5]), &[inner, 0]);
        writer.set_tree_root(root);
        let loader = open_loader(writer.finish());

        let shallow = TreeIndex::load_with_depth(&loader, 1).unwrap();
        assert_eq!(shallow.lookup(&loader, 2).map(|e| e.id), Some(2));
        assert_eq!(shallow.lookup(&loader, 3), None);

        let deep = TreeIndex::load_with_depth(&loader, 2).unwrap();
        assert_eq!(deep.lookup(&loader, 3).map(|e| e.id), Some(3));
    }
}
