//! Package manager - computes and applies changes between an "available"
//! repository and an "installed" one.
//!
//! # Structure
//!
//! - `closure` - Transitive dependency resolution with conflict detection
//! - `change` - Install/replace/uninstall/skip decisions and policy
//! - `targets` - Supported deployment targets for dependency filtering

mod change;
mod closure;
mod targets;

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::{BTreeMap, HashSet};

use crate::error::PackageError;
use crate::package::{
    MatchMode, Package, PackageIdentifier, PackageMatcher, PackageSpecifier, Version,
};
use crate::repository::{PackageRepository, compare_newest};

pub use change::{InstallPolicy, PackageChange, PackageChangeFactory};
pub use closure::{Closure, closure_of_packages};
pub use targets::TargetSet;

/// Options for [`PackageManager::install`]
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Also install supported dependencies, recursively
    pub install_dependencies: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            install_dependencies: true,
        }
    }
}

/// Options for [`PackageManager::uninstall`]
#[derive(Debug, Clone, Default)]
pub struct UninstallOptions {
    /// Also uninstall the supported dependencies of every removed package
    pub uninstall_dependencies: bool,
}

/// Options for [`PackageManager::changes_with`] and [`PackageManager::update_with`]
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Uninstall installed packages whose name is no longer available
    pub prune: bool,
}

/// Top-level facade over an available and an installed repository.
pub struct PackageManager<A: PackageRepository, I: PackageRepository> {
    available: A,
    installed: I,
    targets: TargetSet,
    factory: PackageChangeFactory,
    match_mode: MatchMode,
}

impl<A: PackageRepository, I: PackageRepository> PackageManager<A, I> {
    pub fn new(available: A, installed: I) -> Self {
        Self {
            available,
            installed,
            targets: TargetSet::default(),
            factory: PackageChangeFactory::default(),
            match_mode: MatchMode::default(),
        }
    }

    pub fn with_targets(mut self, targets: TargetSet) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_policy(mut self, policy: InstallPolicy) -> Self {
        self.factory = PackageChangeFactory::new(policy);
        self
    }

    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    pub fn available(&self) -> &A {
        &self.available
    }

    pub fn installed(&self) -> &I {
        &self.installed
    }

    pub fn targets(&self) -> &TargetSet {
        &self.targets
    }

    pub fn policy(&self) -> InstallPolicy {
        self.factory.policy()
    }

    /// Drop both repositories' caches.
    pub fn refresh(&mut self) {
        self.available.refresh();
        self.installed.refresh();
    }

    /// Resolve to a concrete package, looking in available first, then installed.
    pub fn resolve(&self, spec: impl Into<PackageSpecifier>) -> Result<Package> {
        let id = spec.into().canonicalize()?;
        self.resolve_available_first(&id)
    }

    fn matcher(&self, id: &PackageIdentifier) -> PackageMatcher {
        PackageMatcher::new(id.clone(), self.match_mode)
    }

    fn resolve_available_first(&self, id: &PackageIdentifier) -> Result<Package> {
        let matcher = self.matcher(id);
        if let Some(package) = self.available.find_best(&matcher)? {
            return Ok(package);
        }
        self.installed
            .find_best(&matcher)?
            .ok_or_else(|| PackageError::unresolved(id.to_string()).into())
    }

    fn resolve_installed_first(&self, id: &PackageIdentifier) -> Result<Package> {
        let matcher = self.matcher(id);
        if let Some(package) = self.installed.find_best(&matcher)? {
            return Ok(package);
        }
        self.available
            .find_best(&matcher)?
            .ok_or_else(|| PackageError::unresolved(id.to_string()).into())
    }

    /// Install a package and, unless disabled, its supported dependencies.
    ///
    /// Returns the packages that were actually installed or replaced. On
    /// error, changes applied before the failure stay applied.
    #[tracing::instrument(skip(self, spec, options))]
    pub fn install(
        &mut self,
        spec: impl Into<PackageSpecifier>,
        options: &InstallOptions,
    ) -> Result<Vec<Package>> {
        let id = spec.into().canonicalize()?;
        let mut processed = HashSet::new();
        let mut applied = Vec::new();
        self.install_recursive(&id, options, &mut processed, &mut applied)?;
        Ok(applied)
    }

    fn install_recursive(
        &mut self,
        id: &PackageIdentifier,
        options: &InstallOptions,
        processed: &mut HashSet<(String, Version)>,
        applied: &mut Vec<Package>,
    ) -> Result<()> {
        let package = self.resolve_available_first(id)?;
        let key = (package.name().to_ascii_lowercase(), package.version().clone());
        if !processed.insert(key) {
            debug!("{} already processed", package);
            return Ok(());
        }

        let change = self.factory.change_for(&package, &self.installed)?;
        debug!("{}", change);
        if change.apply(&mut self.installed)? {
            info!("{}", change);
            applied.push(package.clone());
        }

        if !options.install_dependencies {
            return Ok(());
        }
        for dependency in package.dependencies() {
            if !self.targets.supports(dependency) {
                debug!("Skipping unsupported dependency {} of {}", dependency, package);
                continue;
            }
            self.install_recursive(dependency.identifier(), options, processed, applied)
                .with_context(|| format!("Failed to install dependency of {}", package))?;
        }
        Ok(())
    }

    /// Remove every installed package matching `spec`.
    ///
    /// Fails with [`PackageError::Unresolved`] if nothing matches.
    #[tracing::instrument(skip(self, spec, options))]
    pub fn uninstall(
        &mut self,
        spec: impl Into<PackageSpecifier>,
        options: &UninstallOptions,
    ) -> Result<Vec<Package>> {
        let id = spec.into().canonicalize()?;
        let mut removed = Vec::new();
        self.uninstall_recursive(&id, options, true, &mut removed)?;
        Ok(removed)
    }

    fn uninstall_recursive(
        &mut self,
        id: &PackageIdentifier,
        options: &UninstallOptions,
        required: bool,
        removed: &mut Vec<Package>,
    ) -> Result<()> {
        let matcher = self.matcher(id);
        let mut batch = Vec::new();
        while let Some(package) = self.installed.find_best(&matcher)? {
            let gone = self.installed.uninstall_package(&package.identifier())?;
            if gone.is_empty() {
                break;
            }
            for package in &gone {
                info!("uninstall {}", package);
            }
            batch.extend(gone);
        }

        if batch.is_empty() {
            if required {
                return Err(PackageError::unresolved(id.to_string()).into());
            }
            return Ok(());
        }
        removed.extend(batch.iter().cloned());

        if options.uninstall_dependencies {
            for package in &batch {
                for dependency in package.dependencies() {
                    if self.targets.supports(dependency) {
                        self.uninstall_recursive(dependency.identifier(), options, false, removed)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Changes that would bring the installed repository up to date.
    pub fn changes(&self) -> Result<Vec<PackageChange>> {
        self.changes_with(&UpdateOptions::default())
    }

    /// One change per available package name, evaluated for its newest
    /// version, plus uninstalls of vanished names when pruning.
    ///
    /// Older available versions of a name produce no change of their own, so
    /// available `foo:1` and `foo:2` with nothing installed yield a single
    /// `install foo:2`, and one update never replaces the same installed
    /// package twice.
    #[tracing::instrument(skip(self))]
    pub fn changes_with(&self, options: &UpdateOptions) -> Result<Vec<PackageChange>> {
        let mut newest: BTreeMap<String, &Package> = BTreeMap::new();
        for package in self.available.packages()? {
            newest
                .entry(package.name().to_ascii_lowercase())
                .and_modify(|current| {
                    if compare_newest(package, *current).is_gt() {
                        *current = package;
                    }
                })
                .or_insert(package);
        }

        let mut changes = Vec::with_capacity(newest.len());
        for package in newest.values() {
            changes.push(self.factory.change_for(package, &self.installed)?);
        }

        if options.prune {
            for installed in self.installed.packages()? {
                if !newest.contains_key(&installed.name().to_ascii_lowercase()) {
                    changes.push(PackageChange::Uninstall(installed.clone()));
                }
            }
        }
        Ok(changes)
    }

    pub fn has_changes(&self) -> Result<bool> {
        Ok(self.changes()?.iter().any(|c| !c.is_skip()))
    }

    pub fn update(&mut self) -> Result<Vec<PackageChange>> {
        self.update_with(&UpdateOptions::default())
    }

    /// Apply every non-skip change. Returns the changes that took effect.
    #[tracing::instrument(skip(self))]
    pub fn update_with(&mut self, options: &UpdateOptions) -> Result<Vec<PackageChange>> {
        let changes = self.changes_with(options)?;
        let mut applied = Vec::new();
        for change in changes.into_iter().filter(|c| !c.is_skip()) {
            if change.apply(&mut self.installed)? {
                info!("{}", change);
                applied.push(change);
            }
        }
        Ok(applied)
    }

    /// Dependency closure of one package, or of everything installed.
    ///
    /// Dependencies resolve against installed packages first.
    pub fn closure(&self, spec: Option<PackageSpecifier>) -> Result<Closure> {
        let seeds: Vec<PackageIdentifier> = match spec {
            Some(spec) => vec![spec.canonicalize()?],
            None => self
                .installed
                .packages()?
                .iter()
                .map(Package::identifier)
                .collect(),
        };
        closure_of_packages(
            seeds,
            |id| self.resolve_installed_first(id),
            |dependency| self.targets.supports(dependency),
        )
    }
}
