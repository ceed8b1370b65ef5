use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::debug;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use super::{ArchiveReader, extraction_target, normalize_entry_name};

/// Reader for .zip archives
pub struct ZipReader {
    path: PathBuf,
}

impl ZipReader {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn can_handle(archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".zip")
    }

    fn open(&self, runtime: &dyn Runtime) -> Result<ZipArchive<Cursor<Vec<u8>>>> {
        let mut file = runtime
            .open(&self.path)
            .with_context(|| format!("Failed to open archive at {:?}", self.path))?;

        // zip needs Read + Seek, Runtime::open only gives Read
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read archive {:?}", self.path))?;

        ZipArchive::new(Cursor::new(buffer))
            .with_context(|| format!("Failed to parse ZIP archive {:?}", self.path))
    }
}

impl ArchiveReader for ZipReader {
    #[tracing::instrument(skip(self, runtime, filter))]
    fn read_matching(
        &self,
        runtime: &dyn Runtime,
        filter: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<(String, Vec<u8>)>> {
        let mut archive = self.open(runtime)?;
        let mut found = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .with_context(|| format!("Failed to read ZIP entry {}", i))?;
            if entry.is_dir() {
                continue;
            }
            let name = normalize_entry_name(entry.name());
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
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .with_context(|| format!("Failed to read ZIP entry {}", i))?;
            if entry.is_dir() {
                continue;
            }

            let name = normalize_entry_name(entry.name());
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
            if let Some(mode) = entry.unix_mode()
                && let Err(e) = runtime.set_permissions(&full_path, mode)
            {
                debug!("Failed to set permissions on {:?}: {}", full_path, e);
            }
        }

        debug!("Extracted {} file(s) under {:?} to {:?}", written, prefix, dest);
        Ok(written)
    }
}
