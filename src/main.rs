use anyhow::Result;
use clap::Parser;
use pkgman::commands;
use pkgman::config::{ConfigOverrides, ManagerConfig};
use pkgman::manager::{InstallOptions, UninstallOptions, UpdateOptions};
use pkgman::runtime::RealRuntime;
use std::path::PathBuf;

/// pkgman - install packages from directory or archive repositories
///
/// Packages are installed into a directory repository (default: ~/.pkgman).
/// Available repositories are directories or .zip/.tar.gz archives holding
/// package.json descriptors. PKGMAN_AVAILABLE and PKGMAN_INSTALLED override
/// the config file; command line flags override both.
///
/// Examples:
///   pkgman --available ./repo.zip install app:1.0
///   pkgman --available ./repo changes --prune
#[derive(Parser, Debug)]
#[command(author, version = env!("PKGMAN_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: <config dir>/pkgman/config.json)
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Available repository: a directory, .zip or .tar.gz (repeatable)
    #[arg(long, short = 'a', value_name = "PATH", global = true)]
    pub available: Vec<PathBuf>,

    /// Installed repository directory
    #[arg(long, short = 'i', value_name = "PATH", global = true)]
    pub installed: Option<PathBuf>,

    /// Supported deployment target for dependencies (repeatable)
    #[arg(long = "target", short = 't', value_name = "NAME", global = true)]
    pub targets: Vec<String>,

    /// Replace installed packages even when they are up to date
    #[arg(long, global = true)]
    pub force: bool,

    /// Match versions by prefix ("1" matches "1.2.3")
    #[arg(long, global = true)]
    pub compatible: bool,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List installed (or available) packages
    List(ListArgs),

    /// Install a package and its dependencies
    Install(InstallArgs),

    /// Uninstall every installed version of a package
    Uninstall(UninstallArgs),

    /// Show what an update would change
    Changes(UpdateArgs),

    /// Bring installed packages up to date
    Update(UpdateArgs),

    /// Print the dependency closure of a package, or of everything installed
    Closure(ClosureArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// List the available repositories instead
    #[arg(long)]
    pub available_only: bool,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Package to install, "name" or "name:version"
    #[arg(value_name = "PACKAGE")]
    pub package: String,

    /// Do not install dependencies
    #[arg(long)]
    pub no_deps: bool,
}

#[derive(clap::Args, Debug)]
pub struct UninstallArgs {
    /// Package to uninstall, "name" or "name:version"
    #[arg(value_name = "PACKAGE")]
    pub package: String,

    /// Also uninstall the package's dependencies
    #[arg(long)]
    pub with_deps: bool,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Also uninstall packages no longer available
    #[arg(long)]
    pub prune: bool,
}

#[derive(clap::Args, Debug)]
pub struct ClosureArgs {
    /// Package to start from (default: everything installed)
    #[arg(value_name = "PACKAGE")]
    pub package: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_file: self.config.clone(),
            available: self.available.clone(),
            installed: self.installed.clone(),
            targets: self.targets.clone(),
            force: self.force,
            compatible: self.compatible,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let runtime = RealRuntime;
    let config = ManagerConfig::resolve(&runtime, &cli.overrides())?;
    let mut manager = commands::build_manager(runtime, &config)?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::List(args) => commands::list(&manager, args.available_only, &mut out)?,
        Commands::Install(args) => {
            let options = InstallOptions {
                install_dependencies: !args.no_deps,
            };
            commands::install(&mut manager, &args.package, &options, &mut out)?
        }
        Commands::Uninstall(args) => {
            let options = UninstallOptions {
                uninstall_dependencies: args.with_deps,
            };
            commands::uninstall(&mut manager, &args.package, &options, &mut out)?
        }
        Commands::Changes(args) => {
            let options = UpdateOptions { prune: args.prune };
            commands::changes(&manager, &options, &mut out)?
        }
        Commands::Update(args) => {
            let options = UpdateOptions { prune: args.prune };
            commands::update(&mut manager, &options, &mut out)?
        }
        Commands::Closure(args) => {
            commands::closure(&manager, args.package.as_deref(), &mut out)?
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_install_parsing() {
        let cli = Cli::try_parse_from(["pkgman", "install", "app:1.0"]).unwrap();
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.package, "app:1.0");
                assert!(!args.no_deps);
            }
            _ => panic!("Expected Install command"),
        }
        assert_eq!(cli.installed, None);
        assert!(cli.available.is_empty());
    }

    #[test]
    fn test_cli_repeatable_globals() {
        let cli = Cli::try_parse_from([
            "pkgman",
            "--available",
            "/a",
            "update",
            "--available",
            "/b.zip",
            "-t",
            "server",
            "--prune",
        ])
        .unwrap();
        assert_eq!(
            cli.available,
            vec![PathBuf::from("/a"), PathBuf::from("/b.zip")]
        );
        assert_eq!(cli.targets, vec!["server"]);
        match cli.command {
            Commands::Update(args) => assert!(args.prune),
            _ => panic!("Expected Update command"),
        }
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "pkgman",
            "uninstall",
            "app",
            "--with-deps",
            "--installed",
            "/tmp/pkgs",
            "--force",
            "--compatible",
        ])
        .unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.installed, Some(PathBuf::from("/tmp/pkgs")));
        assert!(overrides.force);
        assert!(overrides.compatible);
        match cli.command {
            Commands::Uninstall(args) => assert!(args.with_deps),
            _ => panic!("Expected Uninstall command"),
        }
    }

    #[test]
    fn test_cli_closure_package_is_optional() {
        let cli = Cli::try_parse_from(["pkgman", "closure"]).unwrap();
        match cli.command {
            Commands::Closure(args) => assert_eq!(args.package, None),
            _ => panic!("Expected Closure command"),
        }
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["pkgman", "app"]).is_err());
    }
}
