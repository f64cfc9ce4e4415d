//! Configuration options for opening archives.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Absolute file offset of the archive header.
pub const DEFAULT_HEADER_OFFSET: u64 = 0x140;

/// Configuration options for opening an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Absolute offset of the header record.
    /// Default: 0x140
    pub header_offset: u64,

    /// How much of the tree to decode at open time.
    /// Default: Preload::None (decode on first touch)
    pub preload: Preload,

    /// Optional limit on how far a lookup, scan or preload may descend
    /// below the root. Cyclic child pointers are detected without it.
    /// Default: None (unlimited)
    pub max_tree_depth: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            header_offset: DEFAULT_HEADER_OFFSET,
            preload: Preload::None,
            max_tree_depth: None,
        }
    }
}

/// Tree pre-warming strategies applied when an archive is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preload {
    /// Decode nodes lazily as lookups and scans reach them.
    #[default]
    None,

    /// Decode the root's immediate children.
    Children,

    /// Decode the entire tree. Slow on large archives.
    All,
}

impl Options {
    /// Creates a new Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the header offset.
    pub fn header_offset(mut self, offset: u64) -> Self {
        self.header_offset = offset;
        self
    }

    /// Sets the preload strategy.
    pub fn preload(mut self, preload: Preload) -> Self {
        self.preload = preload;
        self
    }

    /// Limits the tree depth walks may reach.
    pub fn max_tree_depth(mut self, depth: usize) -> Self {
        self.max_tree_depth = Some(depth);
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_tree_depth == Some(0) {
            return Err(Error::invalid_argument("max_tree_depth must be > 0"));
        }
        Ok(())
    }
}

/// Locations of the portal and cell archives a client opens together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskPaths {
    /// Path of the portal archive.
    pub portal: PathBuf,

    /// Path of the cell archive.
    pub cell: PathBuf,
}

impl DiskPaths {
    /// Creates a new DiskPaths.
    pub fn new(portal: impl Into<PathBuf>, cell: impl Into<PathBuf>) -> Self {
        Self { portal: portal.into(), cell: cell.into() }
    }

    /// Resolves both archives inside one directory using their usual file
    /// names, `client_portal.dat` and `client_cell_1.dat`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join("client_portal.dat"), dir.join("client_cell_1.dat"))
    }

    /// Parses paths from a JSON document such as
    /// `{"portal": "client_portal.dat", "cell": "client_cell_1.dat"}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON path file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
