use anyhow::Result;
use log::{debug, warn};
use std::path::{Path, PathBuf};

use super::{Cached, PackageRepository};
use crate::archive::open_archive;
use crate::error::PackageError;
use crate::package::{DESCRIPTOR_FILE, Descriptor, Package, PackageIdentifier, PackageSource};
use crate::runtime::Runtime;

/// Read-only packages stored inside a zip or tar.gz archive.
///
/// Every `.../package.json` entry defines a package whose contents are the
/// entries under the same directory prefix.
pub struct ArchiveRepository<R: Runtime> {
    runtime: R,
    path: PathBuf,
    cache: Cached<Vec<Package>>,
}

impl<R: Runtime> ArchiveRepository<R> {
    pub fn new(runtime: R, path: PathBuf) -> Self {
        Self {
            runtime,
            path,
            cache: Cached::new(),
        }
    }

    #[tracing::instrument(skip(self), fields(archive = ?self.path))]
    fn scan(&self) -> Result<Vec<Package>> {
        let reader = open_archive(&self.path)?;
        let mut descriptors: Vec<(String, String, Vec<u8>)> = reader
            .read_matching(&self.runtime, &|name| descriptor_prefix(name).is_some())?
            .into_iter()
            .filter_map(|(entry, bytes)| {
                descriptor_prefix(&entry).map(|prefix| (prefix, entry, bytes))
            })
            .collect();
        descriptors.sort_by(|a, b| a.0.cmp(&b.0));

        let mut packages = Vec::new();
        let mut claimed: Vec<String> = Vec::new();
        for (prefix, entry, bytes) in descriptors {
            if let Some(outer) = claimed.iter().find(|outer| prefix.starts_with(outer.as_str())) {
                debug!("Ignoring {} nested inside package at {:?}", entry, outer);
                continue;
            }
            // A descriptor claims its prefix even when it fails to load.
            claimed.push(prefix.clone());

            let descriptor = match Descriptor::from_slice(&bytes, Path::new(&entry)) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    warn!("Skipping {} in {:?}: {:#}", entry, self.path, e);
                    continue;
                }
            };

            let source = PackageSource::Archive {
                archive: self.path.clone(),
                prefix,
            };
            match Package::from_descriptor(descriptor, source) {
                Ok(package) => packages.push(package),
                Err(e) => warn!("Skipping {} in {:?}: {}", entry, self.path, e),
            }
        }

        debug!("Found {} package(s) in {:?}", packages.len(), self.path);
        Ok(packages)
    }
}

/// `foo/1.0/package.json` -> `foo/1.0/`, `package.json` -> ``.
fn descriptor_prefix(entry: &str) -> Option<String> {
    if entry == DESCRIPTOR_FILE {
        return Some(String::new());
    }
    entry
        .strip_suffix(DESCRIPTOR_FILE)
        .filter(|prefix| prefix.ends_with('/'))
        .map(str::to_string)
}

impl<R: Runtime> PackageRepository for ArchiveRepository<R> {
    fn describe(&self) -> String {
        format!("archive:{}", self.path.display())
    }

    fn packages(&self) -> Result<&[Package]> {
        self.cache.ensure_loaded(|| self.scan()).map(Vec::as_slice)
    }

    fn refresh(&mut self) {
        self.cache.invalidate();
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn install_package(&mut self, _package: &Package) -> Result<bool> {
        Err(PackageError::read_only(self.describe()).into())
    }

    fn uninstall_package(&mut self, _pattern: &PackageIdentifier) -> Result<Vec<Package>> {
        Err(PackageError::read_only(self.describe()).into())
    }

    fn replace_package(&mut self, _package: &Package) -> Result<bool> {
        Err(PackageError::read_only(self.describe()).into())
    }
}
