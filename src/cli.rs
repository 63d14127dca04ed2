//! Command-line front end: list and toggle SteamVR settings

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use crate::config::Preferences;
use crate::openvr_paths::RuntimePaths;
use crate::setting::VRSetting;
use crate::steam_library::LibraryIndex;
use crate::vr_config::{SaveReport, VRConfig};

#[derive(Debug, Parser)]
#[command(name = "steamvr-exconfig", version, about = "Toggle SteamVR app autolaunch and driver enablement")]
pub struct Cli {
    /// OpenVR registry file to use instead of the remembered/detected one
    #[arg(long, global = true, value_name = "PATH")]
    pub registry: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show apps and drivers with their current state (default)
    List,
    /// Show the resolved runtime paths and Steam libraries
    Paths,
    /// Show where a Steam app is installed
    Locate {
        /// Numeric Steam app id
        app_id: String,
    },
    /// Turn autolaunch on or off for an app
    App {
        /// App identifier or readable name
        target: String,
        state: Toggle,
    },
    /// Enable or disable a driver
    Driver {
        /// Driver name or readable name
        target: String,
        state: Toggle,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    fn enabled(self) -> bool {
        self == Toggle::On
    }
}

fn state_label(enabled: bool) -> &'static str {
    if enabled { "on " } else { "off" }
}

/// Registry given on the command line wins; otherwise the remembered one,
/// detected and written to the preferences on first run
fn resolve_paths(cli: &Cli, prefs: &mut Preferences) -> Result<RuntimePaths> {
    if let Some(registry) = &cli.registry {
        return RuntimePaths::from_registry_file(registry).context("Couldn't load the OpenVR registry");
    }

    let remembered = prefs.openvr_registry_path.is_some();
    let paths = RuntimePaths::resolve(prefs).context("Couldn't load the OpenVR registry")?;
    if !remembered {
        if let Err(e) = prefs.save() {
            error!(error = %e, "Couldn't remember the registry location");
        }
    }
    Ok(paths)
}

pub fn run(cli: Cli, prefs: &mut Preferences) -> Result<ExitCode> {
    let paths = resolve_paths(&cli, prefs)?;
    let libraries = LibraryIndex::load(paths.config_dir());

    match cli.command.unwrap_or(Command::List) {
        Command::List => {
            let config = load_config(&paths, &libraries)?;
            print_listing(&config);
            Ok(ExitCode::SUCCESS)
        }
        Command::Paths => {
            print_paths(&paths, &libraries);
            Ok(ExitCode::SUCCESS)
        }
        Command::Locate { app_id } => match libraries.install_location(&app_id) {
            Some(location) => {
                println!("{}", location.display());
                Ok(ExitCode::SUCCESS)
            }
            None => match libraries.find_install_root(&app_id) {
                Some(root) => bail!("App {app_id} is listed in {} but its manifest is unusable", root.display()),
                None => bail!("App {app_id} is not installed in any Steam library"),
            },
        },
        Command::App { target, state } => {
            let mut config = load_config(&paths, &libraries)?;
            let Some(app) = config.find_app_mut(&target) else {
                bail!("No app matches '{target}'");
            };
            app.set_enabled(state.enabled());
            info!(app = %app.readable_name, autolaunch = state.enabled(), "Toggled autolaunch");
            Ok(finish_save(config.save()))
        }
        Command::Driver { target, state } => {
            let mut config = load_config(&paths, &libraries)?;
            let Some(driver) = config.find_driver_mut(&target) else {
                bail!("No always-active driver matches '{target}'");
            };
            driver.set_enabled(state.enabled());
            info!(driver = %driver.internal_name, enabled = state.enabled(), "Toggled driver");
            Ok(finish_save(config.save()))
        }
    }
}

fn load_config(paths: &RuntimePaths, libraries: &LibraryIndex) -> Result<VRConfig> {
    VRConfig::load(paths, libraries).context("Couldn't read SteamVR settings")
}

fn finish_save(report: SaveReport) -> ExitCode {
    if report.is_success() {
        println!("Saved.");
        return ExitCode::SUCCESS;
    }

    for (name, e) in &report.failed_apps {
        eprintln!("Failed to save {name}: {e}");
    }
    if let Some(e) = &report.driver_error {
        eprintln!("Failed to save driver settings: {e}");
    }
    ExitCode::FAILURE
}

fn print_listing(config: &VRConfig) {
    let mut apps: Vec<_> = config.apps.iter().collect();
    apps.sort_by_key(|app| app.readable_name.to_lowercase());

    println!("Autolaunch");
    if apps.is_empty() {
        println!("  (no apps)");
    }
    for app in apps {
        println!("  [{}] {} ({})", state_label(app.enabled()), app.readable_name, app.identifier);
    }

    println!();
    println!("Drivers");
    if config.drivers.is_empty() {
        println!("  (no always-active drivers)");
    }
    for driver in &config.drivers {
        println!("  [{}] {} ({})", state_label(driver.enabled()), driver.readable_name, driver.internal_name);
    }
}

fn print_paths(paths: &RuntimePaths, libraries: &LibraryIndex) {
    println!("config:       {}", paths.config_dir().display());
    println!("runtime:      {}", paths.runtime_dir().display());
    println!("app configs:  {}", paths.app_config_dir().display());
    println!("settings:     {}", paths.settings_file().display());
    println!("drivers:");
    for dir in paths.driver_dirs() {
        let origin = if paths.external_drivers().contains(&dir) { "external" } else { "bundled" };
        println!("  {} ({origin})", dir.display());
    }
    println!("libraries:");
    for root in libraries.roots() {
        println!("  {} ({} apps)", root.path.display(), root.apps.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_toggle_commands() {
        let cli = Cli::try_parse_from(["steamvr-exconfig", "driver", "gamepad", "off"]).unwrap();
        match cli.command {
            Some(Command::Driver { target, state }) => {
                assert_eq!(target, "gamepad");
                assert_eq!(state, Toggle::Off);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["steamvr-exconfig", "app", "VRChat", "on", "--registry", "/x.vrpath"]).unwrap();
        assert_eq!(cli.registry, Some(PathBuf::from("/x.vrpath")));
        assert!(matches!(cli.command, Some(Command::App { state: Toggle::On, .. })));

        assert!(Cli::try_parse_from(["steamvr-exconfig", "app", "VRChat", "maybe"]).is_err());
    }

    #[test]
    fn test_default_command_is_list() {
        let cli = Cli::try_parse_from(["steamvr-exconfig"]).unwrap();
        assert!(cli.command.is_none());
    }
}
