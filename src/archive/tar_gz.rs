use crate::runtime::Runtime;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::debug;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::Archive;

use super::{ArchiveReader, extraction_target, normalize_entry_name};

/// Reader for .tar.gz / .tgz archives.
///
/// Tar streams are not seekable, so every operation is one full pass.
pub struct TarGzReader {
    path: PathBuf,
}

impl TarGzReader {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn can_handle(archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }

    fn open(&self, runtime: &dyn Runtime) -> Result<Archive<GzDecoder<Box<dyn Read + Send>>>> {
        let file = runtime
            .open(&self.path)
            .with_context(|| format!("Failed to open archive at {:?}", self.path))?;
        Ok(Archive::new(GzDecoder::new(file)))
    }
}

impl ArchiveReader for TarGzReader {
    #[tracing::instrument(skip(self, runtime, filter))]
    fn read_matching(
        &self,
        runtime: &dyn Runtime,
        filter: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<(String, Vec<u8>)>> {
        let mut archive = self.open(runtime)?;
        let mut found = Vec::new();
        for entry in archive
            .entries()
            .with_context(|| format!("Failed to read tar entries from {:?}", self.path))?
        {
            let mut entry = entry?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = normalize_entry_name(&entry.path()?.to_string_lossy());
            if !filter(&name) {
                continue;
            }
            let mut contents = Vec::new();
            entry
                .read_to_end(&mut contents)
                .with_context(|| format!("Failed to read {} from {:?}", name, self.path))?;
            found.push((name, contents));
        }
        Ok(found)
    }

    #[tracing::instrument(skip(self, runtime))]
    fn extract_prefix(&self, runtime: &dyn Runtime, prefix: &str, dest: &Path) -> Result<u64> {
        let mut archive = self.open(runtime)?;
        runtime.create_dir_all(dest)?;

        let mut written = 0;
        for entry in archive.entries()? {
            let mut entry = entry?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let name = normalize_entry_name(&entry.path()?.to_string_lossy());
            let Some(full_path) = extraction_target(&name, prefix, dest) else {
                continue;
            };

            if let Some(parent) = full_path.parent() {
                runtime.create_dir_all(parent)?;
            }
            let mut dest_file = runtime.create_file(&full_path)?;
            std::io::copy(&mut entry, &mut dest_file)
                .with_context(|| format!("Failed to extract file {:?}", full_path))?;
            written += 1;

            #[cfg(unix)]
            if let Ok(mode) = entry.header().mode()
                && let Err(e) = runtime.set_permissions(&full_path, mode)
            {
                debug!("Failed to set permissions on {:?}: {}", full_path, e);
            }
        }

        debug!("Extracted {} file(s) under {:?} to {:?}", written, prefix, dest);
        Ok(written)
    }
}
