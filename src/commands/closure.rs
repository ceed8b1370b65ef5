use anyhow::Result;
use std::io::Write;

use super::Manager;
use crate::package::PackageSpecifier;
use crate::runtime::Runtime;

/// Print the dependency closure of `spec`, or of everything installed.
#[tracing::instrument(skip(manager, out))]
pub fn closure<R: Runtime>(
    manager: &Manager<R>,
    spec: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    let closure = manager.closure(spec.map(PackageSpecifier::from))?;
    for package in closure.values() {
        match package.location() {
            Some(location) => writeln!(out, "{}  {}", package, location)?,
            None => writeln!(out, "{}", package)?,
        }
    }
    Ok(())
}
