//! Decoded tree nodes and point lookup.

use crate::btree::UNLIMITED_DEPTH;
use crate::device::BlockDevice;
use crate::error::{Error, Result};
use crate::format::{DirectoryEntry, NodeRecord, NODE_RECORD_SIZE};
use crate::loader::BlockLoader;
use std::fmt;
use std::sync::OnceLock;

/// Cache slot for one child: unset until first visited, then either the
/// decoded child or `None` if it could not be loaded.
type BranchSlot = OnceLock<Option<Box<TreeNode>>>;

/// One decoded B-tree node.
///
/// The node owns its record and one cache slot per meaningful branch.
/// Children are decoded the first time a lookup or scan reaches them and
/// are kept until the node is dropped. A child that fails to load stays
/// absent; it is not retried. So does a child whose address is already on
/// the path from the root to this node.
pub struct TreeNode {
    address: u32,
    record: NodeRecord,
    branches: Box<[BranchSlot]>,
    /// Addresses of the nodes above this one, root first.
    ancestors: Box<[u32]>,
}

impl TreeNode {
    /// Decode the node whose chain starts at `address`.
    pub fn load<D: BlockDevice>(loader: &BlockLoader<D>, address: u32) -> Result<Self> {
        Self::load_below(loader, address, Box::default())
    }

    fn load_below<D: BlockDevice>(
        loader: &BlockLoader<D>,
        address: u32,
        ancestors: Box<[u32]>,
    ) -> Result<Self> {
        if address == 0 {
            return Err(Error::InvalidAddress(address));
        }

        let mut buf = [0u8; NODE_RECORD_SIZE];
        loader.read_chain(address, &mut buf)?;
        let record = NodeRecord::decode(&buf)?;

        let branches = (0..record.branch_count()).map(|_| OnceLock::new()).collect();
        Ok(Self { address, record, branches, ancestors })
    }

    /// Head block address this node was read from.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// The decoded record.
    pub fn record(&self) -> &NodeRecord {
        &self.record
    }

    /// Directory entries, ascending by ID.
    pub fn entries(&self) -> &[DirectoryEntry] {
        self.record.entries()
    }

    /// Number of directory entries.
    pub fn entry_count(&self) -> usize {
        self.record.entry_count()
    }

    /// Number of nodes above this one.
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    /// Returns true if `address` is this node or one of its ancestors.
    pub fn is_on_path(&self, address: u32) -> bool {
        address == self.address || self.ancestors.contains(&address)
    }

    /// Returns true if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.record.is_leaf()
    }

    /// 0 for a leaf, entry count + 1 otherwise.
    pub fn branch_count(&self) -> usize {
        self.record.branch_count()
    }

    /// The child in slot `index`, decoding it on first use.
    ///
    /// Returns `None` for a leaf, for an index past the last branch, for a
    /// child that failed to load and for a child pointing back up the path.
    pub fn branch<D: BlockDevice>(
        &self,
        loader: &BlockLoader<D>,
        index: usize,
    ) -> Option<&TreeNode> {
        let slot = self.branches.get(index)?;
        slot.get_or_init(|| {
            let address = self.record.branch_address(index);
            if self.is_on_path(address) {
                log::warn!(
                    "Branch {} of node {:#x} points back at ancestor {:#x}",
                    index,
                    self.address,
                    address
                );
                return None;
            }

            let path = self.ancestors.iter().copied().chain([self.address]).collect();
            match TreeNode::load_below(loader, address, path) {
                Ok(child) => Some(Box::new(child)),
                Err(e) => {
                    log::warn!(
                        "Failed to load branch {} ({:#x}) of node {:#x}: {}",
                        index,
                        address,
                        self.address,
                        e
                    );
                    None
                }
            }
        })
        .as_deref()
    }

    /// The child in slot `index` if it has already been decoded.
    pub fn cached_branch(&self, index: usize) -> Option<&TreeNode> {
        self.branches.get(index)?.get()?.as_deref()
    }

    /// Find the entry for `id` in this subtree.
    pub fn lookup<D: BlockDevice>(
        &self,
        loader: &BlockLoader<D>,
        id: u32,
    ) -> Option<DirectoryEntry> {
        self.lookup_within(loader, id, UNLIMITED_DEPTH)
    }

    pub(crate) fn lookup_within<D: BlockDevice>(
        &self,
        loader: &BlockLoader<D>,
        id: u32,
        max_depth: usize,
    ) -> Option<DirectoryEntry> {
        let mut node = self;
        let mut depth = 0;

        loop {
            // First entry with id <= entry.id; on a miss that is also the
            // branch to the entry's left.
            let index = match node.entries().binary_search_by_key(&id, |entry| entry.id) {
                Ok(found) => return Some(node.entries()[found]),
                Err(index) => index,
            };

            if node.is_leaf() {
                return None;
            }
            if depth >= max_depth {
                log::warn!("Lookup of {:#x} exceeded tree depth {}", id, max_depth);
                return None;
            }

            node = node.branch(loader, index)?;
            depth += 1;
        }
    }

    /// Decode every immediate child that is not cached yet.
    ///
    /// Returns the number of children now cached.
    pub fn load_children<D: BlockDevice>(&self, loader: &BlockLoader<D>) -> usize {
        (0..self.branch_count()).filter(|&index| self.branch(loader, index).is_some()).count()
    }

    /// Decode the whole subtree below this node.
    ///
    /// Returns the number of nodes cached below this one.
    pub fn load_children_recursive<D: BlockDevice>(&self, loader: &BlockLoader<D>) -> usize {
        self.load_recursive_within(loader, UNLIMITED_DEPTH)
    }

    pub(crate) fn load_recursive_within<D: BlockDevice>(
        &self,
        loader: &BlockLoader<D>,
        depth_left: usize,
    ) -> usize {
        if depth_left == 0 {
            if !self.is_leaf() {
                log::warn!("Preload stopped at node {:#x}: tree depth exceeded", self.address);
            }
            return 0;
        }

        (0..self.branch_count())
            .filter_map(|index| self.branch(loader, index))
            .map(|child| 1 + child.load_recursive_within(loader, depth_left - 1))
            .sum()
    }

    /// Number of decoded nodes in this subtree, this node included.
    pub fn cached_nodes(&self) -> usize {
        1 + (0..self.branches.len())
            .filter_map(|index| self.cached_branch(index))
            .map(TreeNode::cached_nodes)
            .sum::<usize>()
    }
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("address", &format_args!("{:#x}", self.address))
            .field("entries", &self.entry_count())
            .field("leaf", &self.is_leaf())
            .field("depth", &self.depth())
            .field("cached_nodes", &self.cached_nodes())
            .finish()
    }
}
