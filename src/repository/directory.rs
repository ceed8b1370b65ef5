use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use super::{Cached, PackageRepository};
use crate::error::PackageError;
use crate::package::{DESCRIPTOR_FILE, Descriptor, Package, PackageIdentifier, PackageSource};
use crate::runtime::{Runtime, safe_join};

/// Packages stored on disk under a root directory.
///
/// Installed layout: `<root>/<name>/<version>/package.json`, with an
/// optional alias symlink `<root>/<name>/<symlink> -> <version>`.
/// Scanning accepts any layout: every directory holding a descriptor is a
/// package, and its subdirectories are not searched further.
pub struct DirectoryRepository<R: Runtime> {
    runtime: R,
    root: PathBuf,
    cache: Cached<Vec<Package>>,
}

impl<R: Runtime> DirectoryRepository<R> {
    pub fn new(runtime: R, root: PathBuf) -> Self {
        Self {
            runtime,
            root,
            cache: Cached::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns: `<root>/<name>`
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Returns: `<root>/<name>/<version>`
    pub fn version_dir(&self, package: &Package) -> PathBuf {
        self.package_dir(package.name())
            .join(package.version().as_str())
    }

    #[tracing::instrument(skip(self), fields(root = ?self.root))]
    fn scan(&self) -> Result<Vec<Package>> {
        let mut found = Vec::new();
        if !self.runtime.exists(&self.root) {
            debug!("Repository root {:?} does not exist", self.root);
            return Ok(found);
        }
        for entry in self.runtime.read_dir(&self.root)? {
            self.scan_dir(&entry, &mut found)?;
        }
        debug!("Found {} package(s) under {:?}", found.len(), self.root);
        Ok(found)
    }

    fn scan_dir(&self, dir: &Path, found: &mut Vec<Package>) -> Result<()> {
        if self.runtime.is_symlink(dir) || !self.runtime.is_dir(dir) {
            return Ok(());
        }

        let descriptor_path = dir.join(DESCRIPTOR_FILE);
        if self.runtime.exists(&descriptor_path) {
            match self.load_package(dir, &descriptor_path) {
                Ok(package) => found.push(package),
                Err(e) => warn!("Skipping {:?}: {:#}", dir, e),
            }
            return Ok(());
        }

        for entry in self.runtime.read_dir(dir)? {
            self.scan_dir(&entry, found)?;
        }
        Ok(())
    }

    fn load_package(&self, dir: &Path, descriptor_path: &Path) -> Result<Package> {
        let descriptor = Descriptor::load(&self.runtime, descriptor_path)?;
        let source = PackageSource::Directory {
            path: dir.to_path_buf(),
        };
        Ok(Package::from_descriptor(descriptor, source)?)
    }

    fn installed_dir(&self, package: &Package) -> PathBuf {
        match package.source() {
            PackageSource::Directory { path } if path.starts_with(&self.root) => path.clone(),
            _ => self.version_dir(package),
        }
    }

    /// Point `<root>/<name>/<alias>` at the freshly installed version.
    fn link_alias(&self, package: &Package, alias: &str) -> Result<()> {
        let name_dir = self.package_dir(package.name());
        let link = safe_join(&name_dir, alias).filter(|l| l.parent() == Some(name_dir.as_path()));
        let Some(link) = link else {
            warn!("Ignoring invalid symlink alias {:?} for {}", alias, package);
            return Ok(());
        };

        if self.runtime.is_symlink(&link) {
            self.runtime.remove_symlink(&link)?;
        } else if self.runtime.exists(&link) {
            warn!("{:?} exists and is not a symlink, not creating alias", link);
            return Ok(());
        }

        self.runtime
            .symlink(Path::new(package.version().as_str()), &link)
            .with_context(|| format!("Failed to create alias {:?} for {}", link, package))?;
        debug!("Linked {:?} -> {}", link, package.version());
        Ok(())
    }

    /// Remove the alias only while it still points into `version_dir`.
    fn unlink_alias(&self, package: &Package, version_dir: &Path) -> Result<()> {
        let Some(alias) = package.symlink() else {
            return Ok(());
        };
        let Some(link) = version_dir
            .parent()
            .and_then(|name_dir| safe_join(name_dir, alias))
        else {
            return Ok(());
        };
        if self.runtime.is_symlink(&link) {
            self.runtime
                .remove_symlink_if_target_under(&link, version_dir)?;
        }
        Ok(())
    }

    fn remove_if_empty(&self, dir: &Path) {
        if dir == self.root || !dir.starts_with(&self.root) {
            return;
        }
        if self.runtime.exists(dir)
            && let Ok(entries) = self.runtime.read_dir(dir)
            && entries.is_empty()
        {
            if let Err(e) = self.runtime.remove_dir_all(dir) {
                debug!("Leaving empty {:?} in place: {:#}", dir, e);
            }
        }
    }

    fn contains_identity(&self, package: &Package) -> Result<bool> {
        Ok(self.packages()?.iter().any(|p| p.same_identity(package)))
    }
}

impl<R: Runtime> PackageRepository for DirectoryRepository<R> {
    fn describe(&self) -> String {
        format!("directory:{}", self.root.display())
    }

    fn packages(&self) -> Result<&[Package]> {
        self.cache.ensure_loaded(|| self.scan()).map(Vec::as_slice)
    }

    fn refresh(&mut self) {
        self.cache.invalidate();
    }

    #[tracing::instrument(skip(self, package), fields(package = %package))]
    fn install_package(&mut self, package: &Package) -> Result<bool> {
        if self.contains_identity(package)? {
            debug!("{} is already installed in {:?}", package, self.root);
            return Ok(false);
        }

        let dest = self.version_dir(package);
        if self.runtime.exists(&dest) {
            warn!("Removing leftover directory {:?}", dest);
            self.runtime.remove_dir_all(&dest)?;
        }

        package
            .materialize(&self.runtime, &dest)
            .with_context(|| format!("Failed to install {} into {:?}", package, dest))?;

        if let Some(alias) = package.symlink() {
            self.link_alias(package, alias)?;
        }

        self.refresh();
        info!("Installed {} into {:?}", package, dest);
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    fn uninstall_package(&mut self, pattern: &PackageIdentifier) -> Result<Vec<Package>> {
        let matches = self.find_packages(pattern)?;
        if matches.is_empty() {
            return Ok(matches);
        }

        for package in &matches {
            let dir = self.installed_dir(package);
            self.unlink_alias(package, &dir)?;

            if self.runtime.exists(&dir) {
                self.runtime
                    .remove_dir_all(&dir)
                    .with_context(|| format!("Failed to remove {:?}", dir))?;
            }
            if self.runtime.exists(&dir) {
                return Err(PackageError::Storage {
                    path: dir,
                    reason: format!("directory still present after uninstalling {}", package),
                }
                .into());
            }

            if let Some(parent) = dir.parent() {
                self.remove_if_empty(parent);
            }
            info!("Uninstalled {} from {:?}", package, dir);
        }

        self.refresh();
        Ok(matches)
    }
}
