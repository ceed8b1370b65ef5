//! Package repositories.
//!
//! Every storage form implements [`PackageRepository`]. The package list is
//! loaded lazily and cached until [`PackageRepository::refresh`] or a
//! successful mutation throws it away.
//!
//! # Structure
//!
//! - `directory` - Packages stored as `<root>/<name>/<version>/` directories
//! - `archive` - Read-only packages inside a zip or tar.gz archive
//! - `memory` - A plain in-memory package list
//! - `bundle` - Read-only union of several repositories
//! - `read_only` - Decorator rejecting mutation of any repository

mod archive;
mod bundle;
mod cache;
mod directory;
mod memory;
mod read_only;

use anyhow::Result;
use std::cmp::Ordering;

use crate::package::{Package, PackageIdentifier, PackageMatcher};

pub use archive::ArchiveRepository;
pub use bundle::RepositoryBundle;
pub use cache::Cached;
pub use directory::DirectoryRepository;
pub use memory::MemoryRepository;
pub use read_only::ReadOnlyRepository;

pub trait PackageRepository {
    /// Human-readable description, e.g. `directory:/opt/pkgs`.
    fn describe(&self) -> String;

    /// All packages, loading them on first access.
    fn packages(&self) -> Result<&[Package]>;

    /// Drop the cached package list so the next access reloads it.
    fn refresh(&mut self);

    fn is_read_only(&self) -> bool {
        false
    }

    /// Install `package`. Returns false if an identical package is already present.
    fn install_package(&mut self, package: &Package) -> Result<bool>;

    /// Remove every package matching `pattern` exactly and return them.
    fn uninstall_package(&mut self, pattern: &PackageIdentifier) -> Result<Vec<Package>>;

    fn find_matching(&self, matcher: &PackageMatcher) -> Result<Vec<Package>> {
        Ok(self
            .packages()?
            .iter()
            .filter(|p| matcher.matches(p))
            .cloned()
            .collect())
    }

    fn find_packages(&self, pattern: &PackageIdentifier) -> Result<Vec<Package>> {
        self.find_matching(&PackageMatcher::exact(pattern.clone()))
    }

    /// The newest package matching `pattern`.
    fn find_package(&self, pattern: &PackageIdentifier) -> Result<Option<Package>> {
        self.find_best(&PackageMatcher::exact(pattern.clone()))
    }

    fn find_best(&self, matcher: &PackageMatcher) -> Result<Option<Package>> {
        Ok(latest(self.find_matching(matcher)?))
    }

    fn contains_package(&self, pattern: &PackageIdentifier) -> Result<bool> {
        let matcher = PackageMatcher::exact(pattern.clone());
        Ok(self.packages()?.iter().any(|p| matcher.matches(p)))
    }

    /// Swap the installed package named like `package` for `package`.
    ///
    /// Returns false without side effects when nothing of that name is installed.
    fn replace_package(&mut self, package: &Package) -> Result<bool> {
        let by_name = PackageIdentifier::any_version(package.name())?;
        let installed = self.find_packages(&by_name)?;
        if installed.is_empty() {
            return Ok(false);
        }
        for existing in &installed {
            self.uninstall_package(&existing.identifier())?;
        }
        self.install_package(package)
    }
}

impl<T: PackageRepository + ?Sized> PackageRepository for Box<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn packages(&self) -> Result<&[Package]> {
        (**self).packages()
    }

    fn refresh(&mut self) {
        (**self).refresh()
    }

    fn is_read_only(&self) -> bool {
        (**self).is_read_only()
    }

    fn install_package(&mut self, package: &Package) -> Result<bool> {
        (**self).install_package(package)
    }

    fn uninstall_package(&mut self, pattern: &PackageIdentifier) -> Result<Vec<Package>> {
        (**self).uninstall_package(pattern)
    }

    fn replace_package(&mut self, package: &Package) -> Result<bool> {
        (**self).replace_package(package)
    }
}

/// Order used to pick the newest of several candidates: version, then timestamp.
pub fn compare_newest(a: &Package, b: &Package) -> Ordering {
    a.version()
        .cmp(b.version())
        .then_with(|| a.timestamp().cmp(&b.timestamp()))
}

/// The newest package in `packages`, if any.
pub fn latest(packages: impl IntoIterator<Item = Package>) -> Option<Package> {
    packages.into_iter().max_by(compare_newest)
}
