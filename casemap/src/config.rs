use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::COL;

/// Run configuration for both pipelines. Every field has a default so a partial TOML file only
/// needs to override what differs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub series: SeriesConfig,
    pub map: MapConfig,
}

/// Configuration for the country series normalizer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SeriesConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub target_country: String,
    /// Number of data rows after the header that hold sub-national labels rather than counts.
    pub metadata_rows: usize,
    pub preview_rows: usize,
    pub plot: bool,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        SeriesConfig {
            input_path: PathBuf::from("RAW_DATA")
                .join("Covid_19")
                .join("COVID-19 data from John Hopkins University")
                .join("CONVENIENT_global_confirmed_cases.csv"),
            output_dir: "temp_DATA".into(),
            target_country: "India".into(),
            metadata_rows: 1,
            preview_rows: 5,
            plot: true,
        }
    }
}

impl SeriesConfig {
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("processed_{}_data.csv", self.target_country))
    }

    pub fn chart_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("processed_{}_chart.png", self.target_country))
    }
}

/// Configuration shared by the static and interactive map renderers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    pub metrics_path: PathBuf,
    /// URL or local path of the country boundaries. A `.fgb` suffix selects FlatGeobuf,
    /// anything else is read as GeoJSON.
    pub geometry_source: String,
    pub metrics_key: String,
    pub geometry_key: String,
    pub default_metric: String,
    pub title: String,
    pub legend_label: String,
    pub output_path: PathBuf,
    pub explore_output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Identifier and descriptive columns never offered as a metric.
    pub excluded_columns: Vec<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            metrics_path: Path::new("RAW_DATA").join("world_population.csv"),
            geometry_source: "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson/ne_110m_admin_0_countries.geojson".into(),
            metrics_key: COL::CCA3.into(),
            geometry_key: COL::ADM0_A3.into(),
            default_metric: "2022 Population".into(),
            title: "World Population Map (2022)".into(),
            legend_label: "Population (2022)".into(),
            output_path: "population_map.png".into(),
            explore_output_path: "population_map_explore.png".into(),
            width: 1500,
            height: 1000,
            excluded_columns: [
                COL::RANK,
                COL::CCA3,
                COL::COUNTRY_TERRITORY,
                COL::COUNTRY,
                COL::CAPITAL,
                COL::CONTINENT,
                COL::GEOMETRY,
                COL::ADM0_A3,
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths_should_follow_target_country() {
        let config = SeriesConfig {
            output_dir: "out".into(),
            target_country: "Italy".into(),
            ..Default::default()
        };
        assert_eq!(
            config.output_path(),
            Path::new("out").join("processed_Italy_data.csv")
        );
        assert_eq!(
            config.chart_path(),
            Path::new("out").join("processed_Italy_chart.png")
        );
    }

    #[test]
    fn partial_config_should_keep_defaults() {
        let config: Config = serde_json::from_str(r#"{"series": {"target_country": "US"}}"#)
            .expect("partial config should deserialize");
        assert_eq!(config.series.target_country, "US");
        assert_eq!(config.series.metadata_rows, 1);
        assert_eq!(config.map, MapConfig::default());
    }
}
