//! Scratch-tree resource guard.

use std::path::Path;

use tempfile::TempDir;

use sourcemark_shared::{Result, SourcemarkError};

/// An exclusively owned temporary directory holding one unpacked container.
///
/// The tree lives under the system temp root and is deleted when the value
/// is dropped, on success and failure paths alike.
#[derive(Debug)]
pub struct ScratchTree {
    dir: TempDir,
}

impl ScratchTree {
    /// Create a fresh, uniquely named scratch directory.
    pub(crate) fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("sourcemark-")
            .tempdir()
            .map_err(|e| SourcemarkError::io(std::env::temp_dir(), e))?;
        Ok(Self { dir })
    }

    /// Root of the scratch tree.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
