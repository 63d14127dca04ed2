#![forbid(unsafe_code)]

mod app_settings;
mod cli;
mod config;
mod constants;
mod driver_settings;
mod error;
mod keyvalues;
mod names;
mod openvr_paths;
mod setting;
mod settings_file;
mod steam_library;
mod vr_config;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::Level as TraceLevel;
use tracing_subscriber::FmtSubscriber;

use cli::Cli;
use config::Preferences;

fn parse_log_level(level: &str) -> TraceLevel {
    match level.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Loaded before logging is up, so its own messages are not shown
    let mut prefs = Preferences::load();

    // LOG_LEVEL wins over the preference file
    let log_level = parse_log_level(&std::env::var("LOG_LEVEL").unwrap_or_else(|_| prefs.log_level.clone()));

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    cli::run(cli, &mut prefs)
}
