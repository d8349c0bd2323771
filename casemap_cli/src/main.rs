mod cli;
mod display;
mod error;

use std::path::Path;

use casemap::config::Config;
use casemap::error::CasemapError;
use clap::Parser;
use cli::{Cli, RunCommand};
use error::CasemapCliResult;
use log::debug;

const DEFAULT_LOGGING_LEVEL: &str = "warn";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set RUST_LOG to `DEFAULT_LOGGING_LEVEL` if not set
    let _ =
        std::env::var("RUST_LOG").map_err(|_| std::env::set_var("RUST_LOG", DEFAULT_LOGGING_LEVEL));
    pretty_env_logger::init_timed();
    let args = Cli::parse();
    debug!("args: {args:?}");

    if let Err(err) = run(args).await {
        println!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run(args: Cli) -> CasemapCliResult<()> {
    let config = read_config_from_toml(args.config.as_deref())?;
    debug!("config: {config:?}");
    if let Some(command) = args.command {
        command.run(config).await?;
    }
    Ok(())
}

/// Reads `explicit_path` when given, otherwise `<config dir>/casemap/config.toml`
/// (macOS: ~/Library/Application Support/casemap/config.toml). Only the default file may be
/// absent, in which case defaults are used.
fn read_config_from_toml(explicit_path: Option<&Path>) -> CasemapCliResult<Config> {
    let file_path = match explicit_path {
        Some(path) => path.to_path_buf(),
        None => match dirs::config_dir() {
            Some(dir) => dir.join("casemap").join("config.toml"),
            None => return Ok(Config::default()),
        },
    };
    match std::fs::read_to_string(&file_path) {
        Ok(contents) => toml::from_str(&contents).map_err(|err| {
            CasemapError::InvalidConfig(format!("{}: {}", file_path.display(), err.message()))
                .into()
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit_path.is_none() => {
            Ok(Config::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CasemapError::InputNotFound(file_path).into())
        }
        Err(e) => Err(e.into()),
    }
}
