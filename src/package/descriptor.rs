use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{PackageDependency, Version};
use crate::error::PackageError;
use crate::runtime::Runtime;

/// File name of the descriptor found at the root of every package.
pub const DESCRIPTOR_FILE: &str = "package.json";

fn default_kind() -> String {
    "bundle".to_string()
}

/// On-disk package metadata (`package.json`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub name: String,
    pub version: Version,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<PackageDependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symlink: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Descriptor {
    #[tracing::instrument(skip(runtime))]
    pub fn load(runtime: &dyn Runtime, path: &Path) -> Result<Self> {
        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read descriptor {:?}", path))?;
        Self::from_slice(content.as_bytes(), path)
    }

    /// Parse descriptor bytes; `origin` is only used in error messages.
    pub fn from_slice(bytes: &[u8], origin: &Path) -> Result<Self> {
        let descriptor: Descriptor = serde_json::from_slice(bytes)
            .with_context(|| format!("Invalid descriptor {:?}", origin))?;
        if descriptor.name.trim().is_empty() {
            return Err(PackageError::MissingName)
                .with_context(|| format!("Invalid descriptor {:?}", origin));
        }
        Ok(descriptor)
    }

    /// Write `package.json` into `dir`, creating the directory if needed.
    #[tracing::instrument(skip(self, runtime))]
    pub fn write(&self, runtime: &dyn Runtime, dir: &Path) -> Result<()> {
        if !runtime.exists(dir) {
            runtime.create_dir_all(dir)?;
        }
        let path = dir.join(DESCRIPTOR_FILE);
        let content = serde_json::to_string_pretty(self)?;
        runtime
            .write(&path, content.as_bytes())
            .with_context(|| format!("Failed to save descriptor to {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::kind_of;
    use crate::runtime::{MockRuntime, RealRuntime};
    use mockall::predicate::eq;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_applied() {
        let d = Descriptor::from_slice(
            br#"{"name":"foo","version":"1.0","homepage":"ignored"}"#,
            Path::new("foo/package.json"),
        )
        .unwrap();
        assert_eq!(d.kind, "bundle");
        assert_eq!(d.description, "");
        assert!(d.dependencies.is_empty());
        assert_eq!(d.symlink, None);
        assert_eq!(d.timestamp, None);
    }

    #[test]
    fn test_full_descriptor() {
        let d = Descriptor::from_slice(
            br#"{
                "name": "app",
                "version": "2.1-SNAPSHOT",
                "type": "service",
                "description": "the app",
                "dependencies": ["core:1.0", "ui@client"],
                "symlink": "current",
                "timestamp": "20240102T000000"
            }"#,
            Path::new("app/package.json"),
        )
        .unwrap();
        assert_eq!(d.kind, "service");
        assert!(d.version.is_snapshot());
        assert_eq!(d.dependencies.len(), 2);
        assert_eq!(d.dependencies[1].target(), Some("client"));
        assert_eq!(d.symlink.as_deref(), Some("current"));
    }

    #[test]
    fn test_rejects_empty_name() {
        let err = Descriptor::from_slice(br#"{"name":" ","version":"1"}"#, Path::new("x"))
            .unwrap_err();
        assert_eq!(kind_of(&err), Some(&PackageError::MissingName));
    }

    #[test]
    fn test_rejects_bad_version() {
        assert!(
            Descriptor::from_slice(br#"{"name":"a","version":"one"}"#, Path::new("x")).is_err()
        );
        assert!(Descriptor::from_slice(br#"{"name":"a"}"#, Path::new("x")).is_err());
    }

    #[test]
    fn test_write_and_load() -> Result<()> {
        let dir = tempdir()?;
        let original = Descriptor::from_slice(
            br#"{"name":"foo","version":"1.2","dependencies":["bar@server"]}"#,
            Path::new("x"),
        )?;

        let pkg_dir = dir.path().join("foo/1.2");
        original.write(&RealRuntime, &pkg_dir)?;
        let loaded = Descriptor::load(&RealRuntime, &pkg_dir.join(DESCRIPTOR_FILE))?;

        assert_eq!(loaded, original);
        Ok(())
    }

    #[test]
    fn test_write_error_has_context() {
        let mut runtime = MockRuntime::new();
        let dir = PathBuf::from("/repo/foo/1.0");
        runtime.expect_exists().with(eq(dir.clone())).returning(|_| true);
        runtime
            .expect_write()
            .returning(|_, _| Err(anyhow::anyhow!("disk full")));

        let d = Descriptor::from_slice(br#"{"name":"foo","version":"1.0"}"#, Path::new("x"))
            .unwrap();
        let err = d.write(&runtime, &dir).unwrap_err();
        assert!(format!("{:#}", err).contains("disk full"));
        assert!(err.to_string().contains("Failed to save descriptor"));
    }
}
