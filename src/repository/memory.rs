use anyhow::Result;
use log::debug;

use super::PackageRepository;
use crate::package::{Package, PackageIdentifier, PackageMatcher};

/// Repository backed by a plain package list.
///
/// Nothing is materialized; install and uninstall edit the list in place.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    packages: Vec<Package>,
}

impl MemoryRepository {
    pub fn new(packages: Vec<Package>) -> Self {
        Self { packages }
    }
}

impl FromIterator<Package> for MemoryRepository {
    fn from_iter<I: IntoIterator<Item = Package>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl PackageRepository for MemoryRepository {
    fn describe(&self) -> String {
        format!("memory:{} package(s)", self.packages.len())
    }

    fn packages(&self) -> Result<&[Package]> {
        Ok(&self.packages)
    }

    fn refresh(&mut self) {}

    fn install_package(&mut self, package: &Package) -> Result<bool> {
        if self.packages.iter().any(|p| p.same_identity(package)) {
            debug!("{} already present in memory repository", package);
            return Ok(false);
        }
        self.packages.push(package.clone());
        Ok(true)
    }

    fn uninstall_package(&mut self, pattern: &PackageIdentifier) -> Result<Vec<Package>> {
        let matcher = PackageMatcher::exact(pattern.clone());
        let (removed, kept): (Vec<Package>, Vec<Package>) = std::mem::take(&mut self.packages)
            .into_iter()
            .partition(|p| matcher.matches(p));
        self.packages = kept;
        Ok(removed)
    }
}
