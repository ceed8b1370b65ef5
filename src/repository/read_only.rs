use anyhow::Result;

use super::PackageRepository;
use crate::error::PackageError;
use crate::package::{Package, PackageIdentifier};

/// Wraps any repository and rejects every mutation.
#[derive(Debug)]
pub struct ReadOnlyRepository<T> {
    inner: T,
}

impl<T: PackageRepository> ReadOnlyRepository<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn reject(&self) -> anyhow::Error {
        PackageError::read_only(self.inner.describe()).into()
    }
}

impl<T: PackageRepository> PackageRepository for ReadOnlyRepository<T> {
    fn describe(&self) -> String {
        format!("read-only {}", self.inner.describe())
    }

    fn packages(&self) -> Result<&[Package]> {
        self.inner.packages()
    }

    fn refresh(&mut self) {
        self.inner.refresh()
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn install_package(&mut self, _package: &Package) -> Result<bool> {
        Err(self.reject())
    }

    fn uninstall_package(&mut self, _pattern: &PackageIdentifier) -> Result<Vec<Package>> {
        Err(self.reject())
    }

    fn replace_package(&mut self, _package: &Package) -> Result<bool> {
        Err(self.reject())
    }
}
