use anyhow::Result;
use std::io::Write;

use super::Manager;
use crate::manager::UninstallOptions;
use crate::runtime::Runtime;

/// Uninstall every installed package matching `spec`.
#[tracing::instrument(skip(manager, options, out))]
pub fn uninstall<R: Runtime>(
    manager: &mut Manager<R>,
    spec: &str,
    options: &UninstallOptions,
    out: &mut dyn Write,
) -> Result<()> {
    for package in manager.uninstall(spec, options)? {
        writeln!(out, "Uninstalled {}", package)?;
    }
    Ok(())
}
