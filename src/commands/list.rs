use anyhow::Result;
use log::debug;
use std::io::Write;

use super::Manager;
use crate::package::Package;
use crate::repository::PackageRepository;
use crate::runtime::Runtime;

/// List installed packages, or the available ones with `available`.
#[tracing::instrument(skip(manager, out))]
pub fn list<R: Runtime>(manager: &Manager<R>, available: bool, out: &mut dyn Write) -> Result<()> {
    let (label, packages) = if available {
        ("available", manager.available().packages()?)
    } else {
        ("installed", manager.installed().packages()?)
    };
    debug!("Found {} {} package(s)", packages.len(), label);

    if packages.is_empty() {
        writeln!(out, "No packages {}.", label)?;
        return Ok(());
    }

    let mut sorted: Vec<&Package> = packages.iter().collect();
    sorted.sort_by(|a, b| {
        a.name()
            .to_ascii_lowercase()
            .cmp(&b.name().to_ascii_lowercase())
            .then_with(|| a.version().cmp(b.version()))
    });

    for package in sorted {
        if package.description().is_empty() {
            writeln!(out, "{}", package)?;
        } else {
            writeln!(out, "{}  {}", package, package.description())?;
        }
    }
    Ok(())
}
