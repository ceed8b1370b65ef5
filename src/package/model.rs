use anyhow::{Context, Result};
use log::debug;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::{Descriptor, PackageDependency, PackageIdentifier, Version};
use crate::archive::open_archive;
use crate::error::PackageError;
use crate::runtime::{Runtime, safe_join};

/// Where a package's contents come from when it is materialized.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageSource {
    /// Files held in memory, keyed by slash-separated relative path.
    Memory { files: BTreeMap<String, Vec<u8>> },
    /// A package directory discovered by a directory scan.
    Directory { path: PathBuf },
    /// The subset of an archive under `prefix` (e.g. `foo/1.0/`).
    Archive { archive: PathBuf, prefix: String },
    /// An existing directory copied verbatim.
    Component { path: PathBuf },
    /// Metadata only, no content.
    Bootstrap,
}

/// One installable unit.
///
/// Equality compares name and version only.
#[derive(Debug, Clone)]
pub struct Package {
    name: String,
    version: Version,
    kind: String,
    description: String,
    dependencies: Vec<PackageDependency>,
    symlink: Option<String>,
    timestamp: Option<String>,
    source: PackageSource,
}

impl Package {
    pub fn new(name: impl Into<String>, version: Version) -> Result<Self, PackageError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            version,
            kind: "bundle".to_string(),
            description: String::new(),
            dependencies: Vec::new(),
            symlink: None,
            timestamp: None,
            source: PackageSource::Bootstrap,
        })
    }

    /// Shorthand for `Package::new` with a version string.
    pub fn parse(name: &str, version: &str) -> Result<Self, PackageError> {
        Self::new(name, Version::parse(version)?)
    }

    pub fn from_descriptor(
        descriptor: Descriptor,
        source: PackageSource,
    ) -> Result<Self, PackageError> {
        let Descriptor {
            name,
            version,
            kind,
            description,
            dependencies,
            symlink,
            timestamp,
        } = descriptor;
        validate_name(&name)?;
        Ok(Self {
            name,
            version,
            kind,
            description,
            dependencies,
            symlink,
            timestamp,
            source,
        })
    }

    pub fn to_descriptor(&self) -> Descriptor {
        Descriptor {
            name: self.name.clone(),
            version: self.version.clone(),
            kind: self.kind.clone(),
            description: self.description.clone(),
            dependencies: self.dependencies.clone(),
            symlink: self.symlink.clone(),
            timestamp: self.timestamp.clone(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dependency(mut self, dependency: PackageDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<PackageDependency>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_symlink(mut self, symlink: impl Into<String>) -> Self {
        self.symlink = Some(symlink.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_source(mut self, source: PackageSource) -> Self {
        self.source = source;
        self
    }

    /// Add an in-memory file; switches the source to `Memory` if needed.
    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        if !matches!(self.source, PackageSource::Memory { .. }) {
            self.source = PackageSource::Memory {
                files: BTreeMap::new(),
            };
        }
        if let PackageSource::Memory { files } = &mut self.source {
            files.insert(path.into(), contents.into());
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn dependencies(&self) -> &[PackageDependency] {
        &self.dependencies
    }

    pub fn symlink(&self) -> Option<&str> {
        self.symlink.as_deref()
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    pub fn source(&self) -> &PackageSource {
        &self.source
    }

    /// Canonical `name:version` rendering.
    pub fn id(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }

    pub fn identifier(&self) -> PackageIdentifier {
        PackageIdentifier::from_parts(self.name.clone(), Some(self.version.clone()))
    }

    /// Path or URL the package was loaded from, if it has one.
    pub fn location(&self) -> Option<String> {
        match &self.source {
            PackageSource::Directory { path } | PackageSource::Component { path } => {
                Some(path.display().to_string())
            }
            PackageSource::Archive { archive, prefix } => {
                Some(format!("{}!/{}", archive.display(), prefix))
            }
            PackageSource::Memory { .. } | PackageSource::Bootstrap => None,
        }
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Same name (ignoring case) and same version.
    pub fn same_identity(&self, other: &Package) -> bool {
        self.has_name(&other.name) && self.version == other.version
    }

    /// A snapshot package carries a mutation timestamp.
    pub fn is_snapshot(&self) -> bool {
        self.timestamp.is_some()
    }

    /// True if both are snapshots of the same package and `self` is newer.
    pub fn replacing_snapshot(&self, other: &Package) -> bool {
        match (&self.timestamp, &other.timestamp) {
            (Some(mine), Some(theirs)) => self.has_name(&other.name) && mine > theirs,
            _ => false,
        }
    }

    /// Write the package contents and its descriptor into `dest`.
    #[tracing::instrument(skip(self, runtime), fields(package = %self.id()))]
    pub fn materialize(&self, runtime: &dyn Runtime, dest: &Path) -> Result<()> {
        runtime.create_dir_all(dest)?;

        match &self.source {
            PackageSource::Memory { files } => {
                for (rel, contents) in files {
                    let target = safe_join(dest, rel).ok_or_else(|| PackageError::Storage {
                        path: dest.to_path_buf(),
                        reason: format!("refusing to write outside package directory: {}", rel),
                    })?;
                    if let Some(parent) = target.parent() {
                        runtime.create_dir_all(parent)?;
                    }
                    runtime.write(&target, contents)?;
                }
                debug!("Wrote {} in-memory file(s) to {:?}", files.len(), dest);
            }
            PackageSource::Directory { path } | PackageSource::Component { path } => {
                let copied = runtime
                    .copy_dir_all(path, dest)
                    .with_context(|| format!("Failed to copy {:?} to {:?}", path, dest))?;
                debug!("Copied {} file(s) from {:?} to {:?}", copied, path, dest);
            }
            PackageSource::Archive { archive, prefix } => {
                let reader = open_archive(archive)?;
                reader
                    .extract_prefix(runtime, prefix, dest)
                    .with_context(|| format!("Failed to extract {} from {:?}", prefix, archive))?;
            }
            PackageSource::Bootstrap => {}
        }

        self.to_descriptor().write(runtime, dest)
    }
}

fn validate_name(name: &str) -> Result<(), PackageError> {
    if name.trim().is_empty() {
        return Err(PackageError::MissingName);
    }
    let bad = name.contains(['/', '\\', ':', '@'])
        || name.chars().any(char::is_whitespace)
        || name == "."
        || name.contains("..");
    if bad {
        return Err(PackageError::InvalidIdentifier {
            input: name.to_string(),
            reason: "package names may not contain path separators, ':', '@' or whitespace"
                .to_string(),
        });
    }
    Ok(())
}

/// Packages are equal when they share an identity: names compare
/// case-insensitively and versions by value.
impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

impl Eq for Package {}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}
