//! Transitive dependency closure.

use anyhow::{Context, Result};
use log::debug;
use std::collections::BTreeMap;

use crate::error::PackageError;
use crate::package::{Package, PackageDependency, PackageIdentifier};

/// Resolved packages keyed by lower-cased package name.
pub type Closure = BTreeMap<String, Package>;

/// Resolve `seeds` and everything they depend on.
///
/// `resolve` turns an identifier into a concrete package; `include` filters
/// dependency edges (e.g. by deployment target). Excluded edges are never
/// resolved. A name reached with two different versions is a
/// [`PackageError::Conflict`]; a dependency without a version is satisfied
/// by whatever version of that name is already in the closure.
#[tracing::instrument(skip_all)]
pub fn closure_of_packages<F, D>(
    seeds: impl IntoIterator<Item = PackageIdentifier>,
    mut resolve: F,
    include: D,
) -> Result<Closure>
where
    F: FnMut(&PackageIdentifier) -> Result<Package>,
    D: Fn(&PackageDependency) -> bool,
{
    let mut closure = Closure::new();
    let mut pending: Vec<(PackageIdentifier, Option<String>)> =
        seeds.into_iter().map(|id| (id, None)).collect();
    pending.reverse();

    while let Some((id, required_by)) = pending.pop() {
        let key = id.name().to_ascii_lowercase();
        if let Some(existing) = closure.get(&key)
            && id.version().is_none_or(|v| v == existing.version())
        {
            continue;
        }

        let package = resolve(&id).with_context(|| match &required_by {
            Some(parent) => format!("Failed to resolve {} required by {}", id, parent),
            None => format!("Failed to resolve {}", id),
        })?;

        if let Some(existing) = closure.get(&key) {
            if existing.version() == package.version() {
                continue;
            }
            return Err(PackageError::Conflict {
                name: package.name().to_string(),
                existing: existing.version().to_string(),
                requested: package.version().to_string(),
            }
            .into());
        }

        let parent = package.id();
        for dependency in package.dependencies().iter().rev() {
            if include(dependency) {
                pending.push((dependency.identifier().clone(), Some(parent.clone())));
            } else {
                debug!("Skipping dependency {} of {}", dependency, parent);
            }
        }
        closure.insert(key, package);
    }

    Ok(closure)
}
