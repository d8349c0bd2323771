use std::io;
use std::path::PathBuf;

use casemap::{
    config::Config,
    switcher::{LineSelections, MapSwitcher},
    Casemap, MapData,
};
use clap::{command, Args, Parser, Subcommand};
use enum_dispatch::enum_dispatch;
use log::{debug, info};
use spinners::{Spinner, Spinners};

use crate::display::{display_map_summary, display_series_preview};
use crate::error::CasemapCliResult;

const DEFAULT_PROGRESS_SPINNER: Spinners = Spinners::Dots;
const COMPLETE_PROGRESS_STRING: &str = "✔";
const RUNNING_TAIL_STRING: &str = "...";
const FETCHING_GEOMETRIES_STRING: &str = "Loading metrics and fetching country boundaries";

/// Trait that defines what to run when a given subcommand is invoked.
#[enum_dispatch]
pub trait RunCommand {
    async fn run(&self, config: Config) -> CasemapCliResult<()>;
}

/// Loads map data behind a spinner unless `quiet` is set.
async fn load_map_data(casemap: &Casemap, quiet: bool) -> CasemapCliResult<MapData> {
    let sp = (!quiet).then(|| {
        Spinner::with_timer(
            DEFAULT_PROGRESS_SPINNER,
            FETCHING_GEOMETRIES_STRING.to_string() + RUNNING_TAIL_STRING,
        )
    });
    let data = casemap.load_map_data().await;
    if let Some(mut s) = sp {
        s.stop_with_symbol(COMPLETE_PROGRESS_STRING);
    }
    Ok(data?)
}

/// The `series` command reshapes the configured country's case counts into a tidy daily CSV.
#[derive(Args, Debug)]
pub struct SeriesCommand;

impl RunCommand for SeriesCommand {
    async fn run(&self, config: Config) -> CasemapCliResult<()> {
        info!("Running `series` subcommand");
        let casemap = Casemap::new_with_config(config);
        let report = casemap.process_series()?;
        println!("Success! Processed data saved at: {}", report.output_path.display());
        display_series_preview(&report)?;
        if let Some(chart_path) = &report.chart_path {
            println!("Chart saved at: {}", chart_path.display());
        }
        Ok(())
    }
}

/// The `map` command draws a static choropleth of the configured metric.
#[derive(Args, Debug)]
pub struct MapCommand {
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for MapCommand {
    async fn run(&self, config: Config) -> CasemapCliResult<()> {
        info!("Running `map` subcommand");
        let casemap = Casemap::new_with_config(config);
        let data = load_map_data(&casemap, self.quiet).await?;
        let renderer = casemap.render_static_map(&data)?;

        let metric = &casemap.config.map.default_metric;
        display_map_summary(
            metric,
            data.joined.geometry_count(),
            data.joined.matched_count(metric)?,
            renderer.path(),
        );
        Ok(())
    }
}

/// The `explore` command redraws the map for each metric picked on standard input.
#[derive(Args, Debug)]
pub struct ExploreCommand {
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for ExploreCommand {
    async fn run(&self, config: Config) -> CasemapCliResult<()> {
        info!("Running `explore` subcommand");
        let casemap = Casemap::new_with_config(config);
        let MapData { metrics, joined } = load_map_data(&casemap, self.quiet).await?;
        let renderer = casemap.renderer(&casemap.config.map.explore_output_path)?;
        println!("Map is redrawn at: {}", renderer.path().display());

        let mut switcher = MapSwitcher::new(joined, &metrics, &casemap.config.map, renderer)?;
        let mut events = LineSelections::new(io::stdin().lock(), io::stdout());
        let redraws = switcher.run(&mut events)?;
        debug!("Explore session finished after {redraws} redraws");
        println!("\nLast metric shown: {}", switcher.selected());
        Ok(())
    }
}

/// The entrypoint for the CLI.
#[derive(Parser, Debug)]
#[command(version, about="Casemap tidies country case series and draws world population maps", long_about = None, name="casemap")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[arg(
        short = 'q',
        long = "quiet",
        help = "\
            Do not print progress spinner to stdout. Results and logs (when `RUST_LOG`\n\
            is set) will still be printed.",
        global = true
    )]
    quiet: bool,
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Read configuration from FILE instead of the user config directory",
        global = true
    )]
    pub config: Option<PathBuf>,
}

/// Commands contains the list of subcommands avaliable for use in the CLI.
/// Each command should implmement the RunCommand trait and specify the list
/// of required args for that command.
#[derive(Subcommand, Debug)]
#[enum_dispatch(RunCommand)]
pub enum Commands {
    /// Write the tidy daily series of one country
    Series(SeriesCommand),
    /// Draw a world map of one population metric
    Map(MapCommand),
    /// Pick population metrics one after another and redraw the map for each
    Explore(ExploreCommand),
}

#[cfg(test)]
mod tests {
    use casemap::error::CasemapError;

    use super::*;
    use crate::error::CasemapCliError;

    #[test]
    fn cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_should_parse_after_subcommand() {
        let cli = Cli::parse_from(["casemap", "map", "-q", "--config", "casemap.toml"]);
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("casemap.toml")));
        assert!(matches!(cli.command, Some(Commands::Map(MapCommand { quiet: true, .. }))));
    }

    #[test]
    fn run_settings_should_not_be_flags() {
        for args in [
            vec!["casemap", "series", "--country", "France"],
            vec!["casemap", "map", "--metric", "Growth Rate"],
            vec!["casemap", "explore", "-o", "map.svg"],
        ] {
            assert!(Cli::try_parse_from(args).is_err());
        }
    }

    fn series_config(dir: &std::path::Path, input: &str, country: &str) -> Config {
        let path = dir.join("cases.csv");
        std::fs::write(&path, input).unwrap();
        let mut config = Config::default();
        config.series.input_path = path;
        config.series.output_dir = dir.join("out");
        config.series.target_country = country.into();
        config.series.plot = false;
        config
    }

    #[tokio::test]
    async fn test_series_command() {
        let dir = tempfile::tempdir().unwrap();
        let config = series_config(
            dir.path(),
            "Country/Region,India,France\n\
             Province/State,,\n\
             1/22/20,1,4\n\
             1/23/20,2,0\n\
             1/24/20,x,1\n",
            "India",
        );
        let result = SeriesCommand.run(config).await;
        assert!(result.is_ok());

        let written =
            std::fs::read_to_string(dir.path().join("out").join("processed_India_data.csv"))
                .unwrap();
        assert_eq!(written.lines().count(), 4);
    }

    #[tokio::test]
    async fn series_command_should_report_missing_country() {
        let dir = tempfile::tempdir().unwrap();
        let config = series_config(
            dir.path(),
            "Country/Region,France\nProvince/State,\n1/22/20,1\n",
            "Atlantis",
        );
        let err = SeriesCommand.run(config).await.unwrap_err();
        assert_eq!(err.to_string(), "Country 'Atlantis' not found in the file.");
        assert!(!dir
            .path()
            .join("out")
            .join("processed_Atlantis_data.csv")
            .exists());
    }

    #[tokio::test]
    async fn map_command_should_fail_without_metrics() {
        let mut config = Config::default();
        config.map.metrics_path = "RAW_DATA/not_here.csv".into();
        let map_command = MapCommand { quiet: true };
        let err = map_command.run(config).await.unwrap_err();
        let CasemapCliError::Anyhow(err) = err else {
            panic!("unexpected error: {err:?}");
        };
        assert!(matches!(
            err.downcast_ref::<CasemapError>(),
            Some(CasemapError::InputNotFound(_))
        ));
    }
}
