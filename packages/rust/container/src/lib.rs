//! Zip container round-tripping for EPUB files.
//!
//! [`unpack`] extracts a container into a [`ScratchTree`]; [`repack`] writes
//! the (possibly modified) tree back into a fresh archive and atomically
//! replaces the original file. Entry contents are preserved byte-for-byte;
//! compression of individual entries is not.

mod scratch;

use std::fs::File;
use std::io;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::ZipArchive;
use zip::write::SimpleFileOptions;

use sourcemark_shared::{Result, SourcemarkError};

pub use scratch::ScratchTree;

/// OCF container member that must lead the archive, stored uncompressed.
const MIMETYPE_ENTRY: &str = "mimetype";

// ---------------------------------------------------------------------------
// Unpack
// ---------------------------------------------------------------------------

/// Extract every entry of `container` into a fresh scratch tree.
///
/// Fails if the path is unreadable or is not a valid zip archive. Writes
/// only under the system temp root.
pub fn unpack(container: &Path) -> Result<ScratchTree> {
    let file = File::open(container).map_err(|e| SourcemarkError::io(container, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        SourcemarkError::archive(format!(
            "{} is not a readable zip archive: {e}",
            container.display()
        ))
    })?;

    let scratch = ScratchTree::new()?;
    archive.extract(scratch.path()).map_err(|e| {
        SourcemarkError::archive(format!("failed to extract {}: {e}", container.display()))
    })?;

    info!(
        container = %container.display(),
        entries = archive.len(),
        scratch = %scratch.path().display(),
        "unpacked container"
    );

    Ok(scratch)
}

// ---------------------------------------------------------------------------
// Repack
// ---------------------------------------------------------------------------

/// Write every file under `scratch_root` into a new archive and atomically
/// replace `container` with it.
///
/// Entry names are the files' paths relative to the scratch root with
/// forward-slash separators. The archive is staged in a temp file next to
/// `container` and renamed over it only after a complete, successful write,
/// so a mid-write failure never truncates the original.
pub fn repack(scratch_root: &Path, container: &Path) -> Result<()> {
    let mut entries = collect_entries(scratch_root)?;
    // mimetype leads the archive and is stored uncompressed, keeping the
    // output a conforming OCF container.
    if let Some(pos) = entries.iter().position(|e| e == MIMETYPE_ENTRY) {
        let mimetype = entries.remove(pos);
        entries.insert(0, mimetype);
    }

    let parent = container
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let staged = NamedTempFile::new_in(parent).map_err(|e| SourcemarkError::io(parent, e))?;
    let mut zip = zip::ZipWriter::new(staged);

    // Fixed member timestamp: repacking the same tree twice yields the same bytes.
    let stamp = zip::DateTime::from_date_and_time(1980, 1, 1, 0, 0, 0)
        .map_err(|e| SourcemarkError::archive(format!("invalid archive timestamp: {e}")))?;
    let deflated = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(stamp);
    let stored = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .last_modified_time(stamp);

    for name in &entries {
        let path = scratch_root.join(name);
        let options = if name == MIMETYPE_ENTRY { stored } else { deflated };

        zip.start_file(name.as_str(), options)
            .map_err(|e| SourcemarkError::archive(format!("cannot add entry {name}: {e}")))?;
        let mut source = File::open(&path).map_err(|e| SourcemarkError::io(&path, e))?;
        io::copy(&mut source, &mut zip).map_err(|e| SourcemarkError::io(&path, e))?;
        debug!(entry = %name, "packed entry");
    }

    let staged = zip
        .finish()
        .map_err(|e| SourcemarkError::archive(format!("cannot finalize archive: {e}")))?;
    staged
        .persist(container)
        .map_err(|e| SourcemarkError::io(container, e.error))?;

    info!(
        container = %container.display(),
        entries = entries.len(),
        "repacked container"
    );

    Ok(())
}

/// Collect the sorted relative entry names of every file under `root`.
fn collect_entries(root: &Path) -> Result<Vec<String>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            SourcemarkError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        entries.push(entry_name(root, entry.path())?);
    }
    entries.sort();
    Ok(entries)
}

/// Archive entry name for `path`: relative to `root`, forward-slash separated.
fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        SourcemarkError::archive(format!("{} escapes the scratch tree", path.display()))
    })?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
