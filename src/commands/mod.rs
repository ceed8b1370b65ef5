//! Command handlers behind the `pkgman` binary.
//!
//! Each handler runs one operation on a [`Manager`] and writes a plain-text
//! report to the given writer.

use anyhow::{Context, Result, bail};
use log::debug;
use std::path::{Path, PathBuf};

use crate::archive;
use crate::config::ManagerConfig;
use crate::manager::PackageManager;
use crate::repository::{
    ArchiveRepository, DirectoryRepository, MemoryRepository, PackageRepository,
    ReadOnlyRepository, RepositoryBundle,
};
use crate::runtime::Runtime;

mod closure;
mod install;
mod list;
mod uninstall;
mod update;

pub use closure::closure;
pub use install::install;
pub use list::list;
pub use uninstall::uninstall;
pub use update::{changes, update};

/// Manager over the configured available repositories and an installed directory.
pub type Manager<R> = PackageManager<Box<dyn PackageRepository>, DirectoryRepository<R>>;

/// Open one available repository: an archive file or a directory tree.
pub fn open_repository<R>(runtime: R, path: &Path) -> Result<Box<dyn PackageRepository>>
where
    R: Runtime + 'static,
{
    if !runtime.exists(path) {
        bail!("Repository {:?} does not exist", path);
    }
    if runtime.is_dir(path) {
        debug!("Opening directory repository {:?}", path);
        return Ok(Box::new(ReadOnlyRepository::new(DirectoryRepository::new(
            runtime,
            path.to_path_buf(),
        ))));
    }
    if archive::can_handle(path) {
        debug!("Opening archive repository {:?}", path);
        return Ok(Box::new(ArchiveRepository::new(runtime, path.to_path_buf())));
    }
    bail!(
        "Unsupported repository {:?}: expected a directory, .zip or .tar.gz",
        path
    )
}

/// Open the available side. Several paths are merged, earlier paths winning.
pub fn open_available<R>(runtime: R, paths: &[PathBuf]) -> Result<Box<dyn PackageRepository>>
where
    R: Runtime + Clone + 'static,
{
    match paths {
        [] => {
            debug!("No available repository configured");
            Ok(Box::new(ReadOnlyRepository::new(MemoryRepository::default())))
        }
        [single] => open_repository(runtime, single),
        many => {
            let repositories = many
                .iter()
                .map(|path| open_repository(runtime.clone(), path))
                .collect::<Result<Vec<_>>>()?;
            Ok(Box::new(RepositoryBundle::new(repositories)))
        }
    }
}

/// Wire up a [`Manager`] from an effective configuration.
#[tracing::instrument(skip(runtime, config))]
pub fn build_manager<R>(runtime: R, config: &ManagerConfig) -> Result<Manager<R>>
where
    R: Runtime + Clone + 'static,
{
    let available = open_available(runtime.clone(), &config.available)
        .context("Failed to open available repositories")?;
    let root = config.installed_root(&runtime)?;
    debug!("Installed repository at {:?}", root);
    let installed = DirectoryRepository::new(runtime, root);

    Ok(PackageManager::new(available, installed)
        .with_targets(config.target_set())
        .with_policy(config.policy)
        .with_match_mode(config.match_mode))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::package::Package;
    use crate::runtime::RealRuntime;
    use std::path::Path;

    /// Write `packages` into a fresh directory repository at `root`.
    pub fn seed(root: &Path, packages: &[Package]) {
        let mut repo = DirectoryRepository::new(RealRuntime, root.to_path_buf());
        for package in packages {
            repo.install_package(package).unwrap();
        }
    }

    pub fn manager(available: &Path, installed: &Path) -> Manager<RealRuntime> {
        let config = ManagerConfig {
            available: vec![available.to_path_buf()],
            installed: Some(installed.to_path_buf()),
            ..Default::default()
        };
        build_manager(RealRuntime, &config).unwrap()
    }

    pub fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }
}
