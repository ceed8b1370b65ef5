use anyhow::Result;
use std::io::Write;

use super::Manager;
use crate::manager::InstallOptions;
use crate::runtime::Runtime;

/// Install `spec` (and its dependencies unless `options` say otherwise).
#[tracing::instrument(skip(manager, options, out))]
pub fn install<R: Runtime>(
    manager: &mut Manager<R>,
    spec: &str,
    options: &InstallOptions,
    out: &mut dyn Write,
) -> Result<()> {
    let installed = manager.install(spec, options)?;
    if installed.is_empty() {
        let package = manager.resolve(spec)?;
        writeln!(out, "{} is already installed.", package)?;
        return Ok(());
    }
    for package in installed {
        writeln!(out, "Installed {}", package)?;
    }
    Ok(())
}
