//! # datdisk - A Reader for Block-Chained DAT Archives
//!
//! datdisk reads DAT archives: single files holding many independent byte
//! blobs ("entries") indexed by a 32-bit ID through an on-disk B-tree. Each
//! blob is stored as a singly-linked chain of fixed-size blocks.
//!
//! ## Architecture
//!
//! The reader consists of a few layers:
//!
//! - **Device**: Random-access reads of exact byte ranges
//! - **Format**: Bit-exact header, node and pointer encodings
//! - **BlockLoader**: Reads the header and turns block chains into payloads
//! - **TreeIndex**: Lazily decoded B-tree with lookup and range scans
//! - **Archive**: Ties the loader and index together behind one handle
//!
//! Archives are read-only.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use datdisk::Archive;
//!
//! # fn main() -> Result<(), datdisk::Error> {
//! let archive = Archive::open("client_portal.dat")?;
//!
//! // Point lookup
//! if let Some(entry) = archive.get_entry(0x0600_0001)? {
//!     println!("Found {} bytes", entry.len());
//! }
//!
//! // Range enumeration with progress
//! archive.find_ids_in_range(
//!     0x0600_0000,
//!     0x06FF_FFFF,
//!     |id, _| println!("{:#010x}", id),
//!     |percent| println!("{:.1}%", percent),
//! );
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod btree;
pub mod config;
pub mod device;
pub mod disks;
pub mod error;
pub mod format;
pub mod loader;

#[cfg(test)]
mod testutil;

// Re-exports
pub use btree::{ScanCallbacks, TreeIndex, TreeNode};
pub use config::{DiskPaths, Options, Preload};
pub use device::{BlockDevice, FileDevice, MemoryDevice};
pub use disks::ArchiveSet;
pub use error::{Error, Result};
pub use format::{ArchiveHeader, DirectoryEntry};
pub use loader::BlockLoader;

use bytes::Bytes;
use std::path::Path;
use std::time::Instant;

/// A payload read out of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// ID the payload was looked up by.
    pub id: u32,
    /// The payload bytes.
    pub data: Bytes,
}

impl Entry {
    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// An open DAT archive.
///
/// Owns the block loader and the tree index. Only the root node is decoded
/// at open unless [`Options::preload`] asks for more.
///
/// # Thread Safety
///
/// `Archive` can be shared across threads using `Arc<Archive>`. Device
/// reads are serialised and each tree node is decoded at most once, so
/// concurrent lookups see the same cached nodes. Scan callbacks may call
/// back into the archive.
#[derive(Debug)]
pub struct Archive<D = FileDevice> {
    loader: BlockLoader<D>,
    index: TreeIndex,
}

impl Archive<FileDevice> {
    /// Opens the archive at `path` with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened
    /// - The header cannot be read or is invalid
    /// - The root node cannot be read
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use datdisk::Archive;
    ///
    /// # fn main() -> Result<(), datdisk::Error> {
    /// let archive = Archive::open("client_cell_1.dat")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, Options::default())
    }

    /// Opens the archive at `path` with the given options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        let path = path.as_ref();
        options.validate()?;

        let device = FileDevice::open(path)?;
        let archive = Self::from_device(device, options)?;

        log::info!(
            "Opened archive {:?}: block size {}, tree root {:#x}",
            path,
            archive.header().block_size,
            archive.header().tree_root
        );
        Ok(archive)
    }

    /// Path the archive was opened from.
    pub fn path(&self) -> &Path {
        self.loader.device().path()
    }
}

impl<D: BlockDevice> Archive<D> {
    /// Opens an archive stored on an arbitrary device.
    ///
    /// Reads the header, decodes the root node, then applies the preload
    /// strategy. Fails if either read fails; no archive is returned then.
    pub fn from_device(device: D, options: Options) -> Result<Self> {
        options.validate()?;

        let loader = BlockLoader::open(device, options.header_offset)?;
        let index = match options.max_tree_depth {
            Some(max_depth) => TreeIndex::load_with_depth(&loader, max_depth)?,
            None => TreeIndex::load(&loader)?,
        };

        let preloaded = index.preload(&loader, options.preload);
        if preloaded > 0 {
            log::debug!("Preloaded {} tree nodes ({:?})", preloaded, options.preload);
        }

        Ok(Self { loader, index })
    }

    /// The archive header.
    pub fn header(&self) -> &ArchiveHeader {
        self.loader.header()
    }

    /// The block loader.
    pub fn loader(&self) -> &BlockLoader<D> {
        &self.loader
    }

    /// The tree index.
    pub fn index(&self) -> &TreeIndex {
        &self.index
    }

    /// Looks up the directory entry for `id`.
    ///
    /// Returns `None` if the ID is not in the tree or a node on the way
    /// to it cannot be decoded.
    pub fn lookup(&self, id: u32) -> Option<DirectoryEntry> {
        self.index.lookup(&self.loader, id)
    }

    /// Reads the payload stored under `id`.
    ///
    /// Returns `Ok(None)` if the ID is not in the tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload chain is corrupt, too short, or
    /// cannot be read.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use datdisk::Archive;
    /// # fn main() -> Result<(), datdisk::Error> {
    /// # let archive = Archive::open("client_portal.dat")?;
    /// if let Some(entry) = archive.get_entry(0x0E00_0002)? {
    ///     println!("{:#x}: {} bytes", entry.id, entry.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_entry(&self, id: u32) -> Result<Option<Entry>> {
        let Some(info) = self.lookup(id) else {
            return Ok(None);
        };

        let data = self.loader.read_chain_to_vec(info.chain_head, info.length as usize)?;
        Ok(Some(Entry { id, data }))
    }

    /// Reads a chain directly from a head address obtained by an earlier
    /// lookup, filling all of `dest`.
    pub fn read_chain(&self, chain_head: u32, dest: &mut [u8]) -> Result<()> {
        self.loader.read_chain(chain_head, dest)
    }

    /// Reads `length` bytes of the chain at `chain_head` into a new buffer.
    pub fn read_chain_to_vec(&self, chain_head: u32, length: usize) -> Result<Bytes> {
        self.loader.read_chain_to_vec(chain_head, length)
    }

    /// Calls `on_entry` for every ID in `min..=max`, in ascending order.
    ///
    /// `on_progress` receives the percentage of the tree covered so far,
    /// never decreasing and always finishing on exactly 100.0.
    pub fn find_ids_in_range<E, P>(&self, min: u32, max: u32, mut on_entry: E, mut on_progress: P)
    where
        E: FnMut(u32, &DirectoryEntry),
        P: FnMut(f32),
    {
        let start = Instant::now();

        let mut callbacks = ScanCallbacks::new(&mut on_entry, &mut on_progress);
        self.index.scan_range(&self.loader, min, max, 0.0, 100.0, &mut callbacks);

        log::debug!(
            "Search for ids {:#x}..={:#x} completed in {:.3} seconds",
            min,
            max,
            start.elapsed().as_secs_f64()
        );
    }

    /// Collects the directory entries for every ID in `min..=max`.
    pub fn entries_in_range(&self, min: u32, max: u32) -> Vec<DirectoryEntry> {
        let mut entries = Vec::new();
        self.find_ids_in_range(min, max, |_, entry| entries.push(*entry), |_| {});
        entries
    }
}
