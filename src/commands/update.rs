use anyhow::Result;
use std::io::Write;

use super::Manager;
use crate::manager::UpdateOptions;
use crate::runtime::Runtime;

/// Print the pending changes without applying them.
#[tracing::instrument(skip(manager, options, out))]
pub fn changes<R: Runtime>(
    manager: &Manager<R>,
    options: &UpdateOptions,
    out: &mut dyn Write,
) -> Result<()> {
    let pending: Vec<_> = manager
        .changes_with(options)?
        .into_iter()
        .filter(|c| !c.is_skip())
        .collect();
    if pending.is_empty() {
        writeln!(out, "No changes.")?;
        return Ok(());
    }
    for change in pending {
        writeln!(out, "{}", change)?;
    }
    Ok(())
}

/// Apply every pending change.
#[tracing::instrument(skip(manager, options, out))]
pub fn update<R: Runtime>(
    manager: &mut Manager<R>,
    options: &UpdateOptions,
    out: &mut dyn Write,
) -> Result<()> {
    let applied = manager.update_with(options)?;
    if applied.is_empty() {
        writeln!(out, "Everything is up to date.")?;
        return Ok(());
    }
    for change in applied {
        writeln!(out, "{}", change)?;
    }
    Ok(())
}
