//! Package identifiers (`name[:version]`) and dependencies (`name[:version][@target]`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Package, Version};
use crate::error::PackageError;

/// A package name with an optional version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageIdentifier {
    name: String,
    version: Option<Version>,
}

impl PackageIdentifier {
    pub fn new(name: impl Into<String>, version: Option<Version>) -> Result<Self, PackageError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PackageError::MissingName);
        }
        Ok(Self { name, version })
    }

    // Callers guarantee a non-empty name.
    pub(crate) fn from_parts(name: String, version: Option<Version>) -> Self {
        Self { name, version }
    }

    /// Identifier matching any version of `name`.
    pub fn any_version(name: impl Into<String>) -> Result<Self, PackageError> {
        Self::new(name, None)
    }

    pub fn parse(input: &str) -> Result<Self, PackageError> {
        let invalid = |reason: &str| PackageError::InvalidIdentifier {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        if trimmed.matches(':').count() > 1 {
            return Err(invalid("more than one ':'"));
        }

        let (name, version) = match trimmed.split_once(':') {
            Some((name, version)) => (name.trim(), Some(version.trim())),
            None => (trimmed, None),
        };

        if name.is_empty() {
            return Err(invalid("empty package name"));
        }

        let version = match version {
            Some("") => return Err(invalid("empty version after ':'")),
            Some(v) => Some(Version::parse(v)?),
            None => None,
        };

        Ok(Self {
            name: name.to_string(),
            version,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// Same name (ignoring ASCII case) as `name`.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for PackageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}:{}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for PackageIdentifier {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageIdentifier {
    type Error = PackageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PackageIdentifier> for String {
    fn from(value: PackageIdentifier) -> Self {
        value.to_string()
    }
}

/// A dependency edge: an identifier optionally restricted to a deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageDependency {
    identifier: PackageIdentifier,
    target: Option<String>,
}

impl PackageDependency {
    pub fn new(identifier: PackageIdentifier, target: Option<String>) -> Self {
        Self { identifier, target }
    }

    pub fn parse(input: &str) -> Result<Self, PackageError> {
        let invalid = |reason: &str| PackageError::InvalidIdentifier {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if input.matches('@').count() > 1 {
            return Err(invalid("more than one '@'"));
        }

        let (rest, target) = match input.rsplit_once('@') {
            Some((rest, target)) => {
                let target = target.trim();
                if target.is_empty() {
                    return Err(invalid("empty target after '@'"));
                }
                (rest, Some(target.to_string()))
            }
            None => (input, None),
        };

        Ok(Self {
            identifier: PackageIdentifier::parse(rest)?,
            target,
        })
    }

    pub fn identifier(&self) -> &PackageIdentifier {
        &self.identifier
    }

    pub fn name(&self) -> &str {
        self.identifier.name()
    }

    pub fn version(&self) -> Option<&Version> {
        self.identifier.version()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}

impl fmt::Display for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier)?;
        if let Some(target) = &self.target {
            write!(f, "@{}", target)?;
        }
        Ok(())
    }
}

impl FromStr for PackageDependency {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageDependency {
    type Error = PackageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PackageDependency> for String {
    fn from(value: PackageDependency) -> Self {
        value.to_string()
    }
}

/// Everything callers may hand to the manager to name a package.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageSpecifier {
    Identifier(PackageIdentifier),
    Text(String),
    NameVersion(String, Option<String>),
}

impl PackageSpecifier {
    pub fn canonicalize(&self) -> Result<PackageIdentifier, PackageError> {
        match self {
            PackageSpecifier::Identifier(id) => Ok(id.clone()),
            PackageSpecifier::Text(text) => PackageIdentifier::parse(text),
            PackageSpecifier::NameVersion(name, version) => {
                let version = version.as_deref().map(Version::parse).transpose()?;
                PackageIdentifier::new(name.trim(), version)
            }
        }
    }
}

impl From<PackageIdentifier> for PackageSpecifier {
    fn from(value: PackageIdentifier) -> Self {
        PackageSpecifier::Identifier(value)
    }
}

impl From<&PackageIdentifier> for PackageSpecifier {
    fn from(value: &PackageIdentifier) -> Self {
        PackageSpecifier::Identifier(value.clone())
    }
}

impl From<&PackageDependency> for PackageSpecifier {
    fn from(value: &PackageDependency) -> Self {
        PackageSpecifier::Identifier(value.identifier.clone())
    }
}

impl From<&Package> for PackageSpecifier {
    fn from(value: &Package) -> Self {
        PackageSpecifier::Identifier(value.identifier())
    }
}

impl From<&str> for PackageSpecifier {
    fn from(value: &str) -> Self {
        PackageSpecifier::Text(value.to_string())
    }
}

impl From<String> for PackageSpecifier {
    fn from(value: String) -> Self {
        PackageSpecifier::Text(value)
    }
}

impl From<(&str, &str)> for PackageSpecifier {
    fn from((name, version): (&str, &str)) -> Self {
        PackageSpecifier::NameVersion(name.to_string(), Some(version.to_string()))
    }
}
