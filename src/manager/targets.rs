use std::collections::BTreeSet;

use crate::package::PackageDependency;

/// Deployment targets (e.g. `client`, `server`) this installation supports.
///
/// Dependencies without a target are always supported. Target names are
/// compared ignoring ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    targets: BTreeSet<String>,
}

impl TargetSet {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            targets: targets
                .into_iter()
                .map(|t| t.as_ref().trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn contains(&self, target: &str) -> bool {
        self.targets.contains(&target.to_ascii_lowercase())
    }

    pub fn supports(&self, dependency: &PackageDependency) -> bool {
        dependency.target().is_none_or(|t| self.contains(t))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }
}
