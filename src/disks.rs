//! The portal and cell archive pair.
//!
//! A client reads two archives side by side: the portal archive holds
//! shared game data, the cell archive holds landblock data. Both are
//! opened together and either failure aborts the pair.

use crate::config::{DiskPaths, Options};
use crate::device::FileDevice;
use crate::error::Result;
use crate::Archive;

/// Both client archives, opened with the same options.
#[derive(Debug)]
pub struct ArchiveSet<D = FileDevice> {
    portal: Archive<D>,
    cell: Archive<D>,
}

impl ArchiveSet<FileDevice> {
    /// Opens the portal archive, then the cell archive.
    ///
    /// # Errors
    ///
    /// Returns the first open error. A portal archive that opened is
    /// dropped if the cell archive fails.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use datdisk::{ArchiveSet, DiskPaths, Options};
    ///
    /// # fn main() -> Result<(), datdisk::Error> {
    /// let disks = ArchiveSet::open(&DiskPaths::in_dir("/opt/client"), Options::default())?;
    /// let portal_root = disks.portal().header().tree_root;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(paths: &DiskPaths, options: Options) -> Result<Self> {
        let portal = Archive::open_with_options(&paths.portal, options.clone())?;
        let cell = Archive::open_with_options(&paths.cell, options)?;
        Ok(Self { portal, cell })
    }
}

impl<D> ArchiveSet<D> {
    /// Pairs two already opened archives.
    pub fn from_archives(portal: Archive<D>, cell: Archive<D>) -> Self {
        Self { portal, cell }
    }

    /// The portal archive.
    pub fn portal(&self) -> &Archive<D> {
        &self.portal
    }

    /// The cell archive.
    pub fn cell(&self) -> &Archive<D> {
        &self.cell
    }

    /// Splits the pair back into `(portal, cell)`.
    pub fn into_parts(self) -> (Archive<D>, Archive<D>) {
        (self.portal, self.cell)
    }
}
