mod tar_gz;
mod zip;

use crate::runtime::Runtime;
use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};

pub use tar_gz::TarGzReader;
pub use zip::ZipReader;

/// Read access to the entries of a package archive.
///
/// Entry names are slash-separated paths relative to the archive root,
/// without a leading `./`. Directory entries are not reported.
pub trait ArchiveReader {
    /// Read every file entry whose name passes `filter`, in archive order,
    /// in a single pass over the archive.
    fn read_matching(
        &self,
        runtime: &dyn Runtime,
        filter: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<(String, Vec<u8>)>>;

    /// Extract every entry under `prefix` into `dest`, stripping the prefix.
    /// Returns the number of files written.
    fn extract_prefix(&self, runtime: &dyn Runtime, prefix: &str, dest: &Path) -> Result<u64>;
}

/// Returns true if `path` has an archive extension we can read.
pub fn can_handle(path: &Path) -> bool {
    TarGzReader::can_handle(path) || ZipReader::can_handle(path)
}

/// Open the archive at `path`, picking the reader from its extension.
pub fn open_archive(path: &Path) -> Result<Box<dyn ArchiveReader>> {
    if TarGzReader::can_handle(path) {
        return Ok(Box::new(TarGzReader::new(path.to_path_buf())));
    }
    if ZipReader::can_handle(path) {
        return Ok(Box::new(ZipReader::new(path.to_path_buf())));
    }
    Err(anyhow!("Unsupported archive format: {}", path.display()))
}

/// Normalize a raw entry name: forward slashes, no leading `./` or `/`.
pub(crate) fn normalize_entry_name(raw: &str) -> String {
    let name = raw.replace('\\', "/");
    let mut name = name.as_str();
    while let Some(rest) = name.strip_prefix("./") {
        name = rest;
    }
    name.trim_start_matches('/').to_string()
}

/// Where an entry lands when extracting `prefix` into `dest`, if it is under the prefix.
pub(crate) fn extraction_target(entry: &str, prefix: &str, dest: &Path) -> Option<PathBuf> {
    let rel = entry.strip_prefix(prefix)?;
    if rel.is_empty() {
        return None;
    }
    crate::runtime::safe_join(dest, rel)
}
