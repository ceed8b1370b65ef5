use anyhow::Result;
use std::collections::HashSet;

use super::{Cached, PackageRepository};
use crate::error::PackageError;
use crate::package::{Package, PackageIdentifier, Version};

/// Read-only union of several repositories, in preference order.
///
/// When two repositories hold the same package (same name ignoring case,
/// same version), the copy from the earlier repository wins.
pub struct RepositoryBundle {
    repositories: Vec<Box<dyn PackageRepository>>,
    cache: Cached<Vec<Package>>,
}

impl RepositoryBundle {
    pub fn new(repositories: Vec<Box<dyn PackageRepository>>) -> Self {
        Self {
            repositories,
            cache: Cached::new(),
        }
    }

    pub fn push(&mut self, repository: Box<dyn PackageRepository>) {
        self.repositories.push(repository);
        self.cache.invalidate();
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    fn merge(&self) -> Result<Vec<Package>> {
        let mut seen: HashSet<(String, Version)> = HashSet::new();
        let mut merged = Vec::new();
        for repository in &self.repositories {
            for package in repository.packages()? {
                let key = (package.name().to_ascii_lowercase(), package.version().clone());
                if seen.insert(key) {
                    merged.push(package.clone());
                }
            }
        }
        Ok(merged)
    }
}

impl PackageRepository for RepositoryBundle {
    fn describe(&self) -> String {
        let parts: Vec<String> = self.repositories.iter().map(|r| r.describe()).collect();
        format!("bundle[{}]", parts.join(", "))
    }

    fn packages(&self) -> Result<&[Package]> {
        self.cache.ensure_loaded(|| self.merge()).map(Vec::as_slice)
    }

    fn refresh(&mut self) {
        for repository in &mut self.repositories {
            repository.refresh();
        }
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
