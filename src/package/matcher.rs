use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Package, PackageIdentifier};

/// How a pattern's version is compared with a candidate's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Versions must be equal after zero-padding.
    #[default]
    Exact,
    /// Leading segments up to the pattern's precision must be equal.
    Compatible,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Exact => f.write_str("exact"),
            MatchMode::Compatible => f.write_str("compatible"),
        }
    }
}

/// Decides whether candidate packages match a pattern identifier.
///
/// Names are compared ignoring ASCII case. A pattern without a version
/// matches every version of the name.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageMatcher {
    pattern: PackageIdentifier,
    mode: MatchMode,
}

impl PackageMatcher {
    pub fn new(pattern: PackageIdentifier, mode: MatchMode) -> Self {
        Self { pattern, mode }
    }

    pub fn exact(pattern: PackageIdentifier) -> Self {
        Self::new(pattern, MatchMode::Exact)
    }

    pub fn compatible(pattern: PackageIdentifier) -> Self {
        Self::new(pattern, MatchMode::Compatible)
    }

    pub fn pattern(&self) -> &PackageIdentifier {
        &self.pattern
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn matches(&self, candidate: &Package) -> bool {
        if !candidate.has_name(self.pattern.name()) {
            return false;
        }
        match (self.pattern.version(), self.mode) {
            (None, _) => true,
            (Some(wanted), MatchMode::Exact) => candidate.version() == wanted,
            (Some(wanted), MatchMode::Compatible) => candidate.version().is_compatible_with(wanted),
        }
    }
}
