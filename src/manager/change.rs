use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::package::{Package, PackageIdentifier};
use crate::repository::{PackageRepository, latest};

/// Whether installed packages may be overwritten unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallPolicy {
    /// Install missing packages, upgrade older ones, refresh newer snapshots.
    #[default]
    Install,
    /// Always replace what is installed.
    Force,
}

/// What to do with one package to bring the installed repository up to date.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageChange {
    Install(Package),
    Replace { package: Package, installed: Package },
    Uninstall(Package),
    Skip(Package),
}

impl PackageChange {
    /// The package the change is about (the new one for a replace).
    pub fn package(&self) -> &Package {
        match self {
            PackageChange::Install(p)
            | PackageChange::Uninstall(p)
            | PackageChange::Skip(p)
            | PackageChange::Replace { package: p, .. } => p,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            PackageChange::Install(_) => "install",
            PackageChange::Replace { .. } => "replace",
            PackageChange::Uninstall(_) => "uninstall",
            PackageChange::Skip(_) => "skip",
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, PackageChange::Skip(_))
    }

    /// Apply the change to `repository`. Returns true if anything changed.
    #[tracing::instrument(skip_all, fields(change = %self))]
    pub fn apply(&self, repository: &mut dyn PackageRepository) -> Result<bool> {
        match self {
            PackageChange::Install(package) => repository
                .install_package(package)
                .with_context(|| format!("Failed to install {}", package)),
            PackageChange::Replace { package, installed } => {
                repository
                    .uninstall_package(&installed.identifier())
                    .with_context(|| format!("Failed to remove {}", installed))?;
                repository
                    .install_package(package)
                    .with_context(|| format!("Failed to install {}", package))?;
                Ok(true)
            }
            PackageChange::Uninstall(package) => {
                let removed = repository
                    .uninstall_package(&package.identifier())
                    .with_context(|| format!("Failed to uninstall {}", package))?;
                Ok(!removed.is_empty())
            }
            PackageChange::Skip(package) => {
                debug!("Skipping {}", package);
                Ok(false)
            }
        }
    }
}

impl fmt::Display for PackageChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageChange::Replace { package, installed } => {
                write!(f, "replace {} with {}", installed, package)
            }
            other => write!(f, "{} {}", other.action(), other.package()),
        }
    }
}

/// Computes the [`PackageChange`] for an available package.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageChangeFactory {
    policy: InstallPolicy,
}

impl PackageChangeFactory {
    pub fn new(policy: InstallPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> InstallPolicy {
        self.policy
    }

    /// Compare `available` with what `installed` holds under the same name.
    pub fn change_for(
        &self,
        available: &Package,
        installed: &dyn PackageRepository,
    ) -> Result<PackageChange> {
        let by_name = PackageIdentifier::any_version(available.name())?;
        let candidates = installed.find_packages(&by_name)?;
        Ok(self.decide(available, candidates))
    }

    /// Pure decision over the installed packages sharing `available`'s name.
    pub fn decide(&self, available: &Package, installed: Vec<Package>) -> PackageChange {
        let force = self.policy == InstallPolicy::Force;

        if let Some(same) = installed.iter().find(|p| p.same_identity(available)) {
            if force || available.replacing_snapshot(same) {
                return PackageChange::Replace {
                    package: available.clone(),
                    installed: same.clone(),
                };
            }
            return PackageChange::Skip(available.clone());
        }

        let Some(current) = latest(installed) else {
            return PackageChange::Install(available.clone());
        };

        let newer = available.version() > current.version();
        let fresher_snapshot = available.replacing_snapshot(&current);
        if force || newer || fresher_snapshot {
            PackageChange::Replace {
                package: available.clone(),
                installed: current,
            }
        } else {
            PackageChange::Skip(available.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;

    fn pkg(name: &str, version: &str) -> Package {
        Package::parse(name, version).unwrap()
    }

    fn snapshot(version: &str, ts: &str) -> Package {
        pkg("foo", version).with_timestamp(ts)
    }

    #[test]
    fn test_install_when_missing() {
        let factory = PackageChangeFactory::default();
        let change = factory.decide(&pkg("foo", "1"), vec![]);
        assert_eq!(change, PackageChange::Install(pkg("foo", "1")));
        assert_eq!(change.to_string(), "install foo:1");
    }

    #[test]
    fn test_skip_same_version() {
        let factory = PackageChangeFactory::default();
        let change = factory.decide(&pkg("foo", "1.0"), vec![pkg("foo", "1")]);
        assert!(change.is_skip());
    }

    #[test]
    fn test_force_replaces_same_version() {
        let factory = PackageChangeFactory::new(InstallPolicy::Force);
        let change = factory.decide(&pkg("foo", "1.0"), vec![pkg("foo", "1.0")]);
        assert_eq!(change.action(), "replace");
    }

    #[test]
    fn test_upgrade_and_no_downgrade() {
        let factory = PackageChangeFactory::default();

        let change = factory.decide(&pkg("foo", "2.0"), vec![pkg("foo", "1.0")]);
        assert_eq!(
            change,
            PackageChange::Replace {
                package: pkg("foo", "2.0"),
                installed: pkg("foo", "1.0"),
            }
        );
        assert_eq!(change.to_string(), "replace foo:1.0 with foo:2.0");

        assert!(factory.decide(&pkg("foo", "1.0"), vec![pkg("foo", "2.0")]).is_skip());
    }

    #[test]
    fn test_force_downgrades() {
        let factory = PackageChangeFactory::new(InstallPolicy::Force);
        let change = factory.decide(&pkg("foo", "1.0"), vec![pkg("foo", "2.0")]);
        assert_eq!(change.action(), "replace");
    }

    #[test]
    fn test_snapshot_replacement_follows_timestamp() {
        let factory = PackageChangeFactory::default();
        let t1 = snapshot("1.0-SNAPSHOT", "20240101T000000");
        let t2 = snapshot("1.0-SNAPSHOT", "20240201T000000");

        assert_eq!(factory.decide(&t2, vec![t1.clone()]).action(), "replace");
        assert!(factory.decide(&t1, vec![t2]).is_skip());
    }

    #[test]
    fn test_apply_replace_on_memory_repository() {
        let mut repo = MemoryRepository::new(vec![pkg("foo", "1.0"), pkg("bar", "1")]);
        let change = PackageChange::Replace {
            package: pkg("foo", "2.0"),
            installed: pkg("foo", "1.0"),
        };

        assert!(change.apply(&mut repo).unwrap());

        let foo = repo
            .find_packages(&PackageIdentifier::parse("foo").unwrap())
            .unwrap();
        assert_eq!(foo, vec![pkg("foo", "2.0")]);
    }

    #[test]
    fn test_change_for_uses_repository() {
        let repo = MemoryRepository::new(vec![pkg("foo", "1.0"), pkg("foo", "1.5")]);
        let factory = PackageChangeFactory::default();

        let change = factory.change_for(&pkg("foo", "1.2"), &repo).unwrap();
        assert!(change.is_skip());

        let change = factory.change_for(&pkg("foo", "2"), &repo).unwrap();
        match change {
            PackageChange::Replace { installed, .. } => {
                assert_eq!(installed.version().as_str(), "1.5")
            }
            other => panic!("unexpected {}", other),
        }
    }

    #[test]
    fn test_skip_and_uninstall_apply() {
        let mut repo = MemoryRepository::new(vec![pkg("foo", "1.0")]);
        assert!(!PackageChange::Skip(pkg("foo", "1.0")).apply(&mut repo).unwrap());
        assert!(PackageChange::Uninstall(pkg("foo", "1.0")).apply(&mut repo).unwrap());
        assert!(repo.packages().unwrap().is_empty());
        assert!(!PackageChange::Uninstall(pkg("foo", "1.0")).apply(&mut repo).unwrap());
    }

    #[test]
    fn test_policy_serde() {
        let policy: InstallPolicy = serde_json::from_str("\"force\"").unwrap();
        assert_eq!(policy, InstallPolicy::Force);
        assert_eq!(InstallPolicy::default(), InstallPolicy::Install);
    }
}
