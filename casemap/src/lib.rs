use anyhow::Result;
use log::{debug, info};
use map::JoinedMapData;
use polars::frame::DataFrame;
use render::{MapRenderer, SceneRenderer};
use series::SeriesReport;

use crate::config::Config;
use crate::geo::GeometrySource;

// Re-exports
pub use column_names as COL;

// Modules
pub mod column_names;
pub mod config;
pub mod error;
pub mod geo;
pub mod map;
pub mod metrics;
pub mod render;
pub mod series;
pub mod switcher;

/// Metrics joined onto geometries, ready to be drawn.
pub struct MapData {
    pub metrics: DataFrame,
    pub joined: JoinedMapData,
}

/// Type for the case series and population map pipelines
pub struct Casemap {
    pub config: Config,
}

impl Casemap {
    /// Setup the Casemap object with default configuration
    pub fn new() -> Self {
        Self::new_with_config(Config::default())
    }

    /// Setup the Casemap object with custom configuration
    pub fn new_with_config(config: Config) -> Self {
        debug!("config: {config:?}");
        Self { config }
    }

    /// Reshapes the configured country's case counts and writes the tidy CSV
    pub fn process_series(&self) -> Result<SeriesReport> {
        series::run(&self.config.series)
    }

    /// Loads the metrics table, then fetches geometries and joins the two. The metrics file is
    /// checked first so that a missing file never triggers a download.
    pub async fn load_map_data(&self) -> Result<MapData> {
        let map_config = &self.config.map;
        let metrics = metrics::load_metrics(&map_config.metrics_path)?;
        let source = GeometrySource::from(map_config.geometry_source.as_str());
        let geometries = geo::get_geometries(&source, &map_config.geometry_key).await?;
        let joined = JoinedMapData::new(&geometries, &metrics, map_config)?;
        Ok(MapData { metrics, joined })
    }

    /// Builds the renderer for `path` at the configured size
    pub fn renderer(&self, path: &std::path::Path) -> Result<MapRenderer> {
        let map_config = &self.config.map;
        Ok(MapRenderer::for_path(
            path,
            (map_config.width, map_config.height),
        )?)
    }

    /// Draws the configured default metric with title and legend
    pub fn render_static_map(&self, data: &MapData) -> Result<MapRenderer> {
        let map_config = &self.config.map;
        let renderer = self.renderer(&map_config.output_path)?;
        let scene = data.joined.scene(
            &map_config.default_metric,
            &map_config.title,
            Some(map_config.legend_label.as_str()),
        )?;
        renderer.render(&scene)?;
        info!("Map saved at {}", renderer.path().display());
        Ok(renderer)
    }
}

impl Default for Casemap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CasemapError;

    #[test]
    fn static_map_should_require_metric_column() {
        let mut config = Config::default();
        config.map.default_metric = "Missing".into();
        let casemap = Casemap::new_with_config(config);
        let metrics = map::tests::test_metrics();
        let joined =
            JoinedMapData::new(&map::tests::test_geometries(), &metrics, &casemap.config.map)
                .unwrap();
        let err = casemap
            .render_static_map(&MapData { metrics, joined })
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CasemapError>(),
            Some(CasemapError::MetricNotFound(_))
        ));
    }

    #[tokio::test]
    async fn missing_metrics_should_stop_before_fetching() {
        let mut config = Config::default();
        config.map.metrics_path = "RAW_DATA/not_here.csv".into();
        config.map.geometry_source = "http://127.0.0.1:9/unreachable.geojson".into();
        let err = Casemap::new_with_config(config)
            .load_map_data()
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<CasemapError>(),
            Some(CasemapError::InputNotFound(_))
        ));
    }

    #[tokio::test]
    async fn map_data_should_load_from_local_geojson() {
        let dir = tempfile::tempdir().unwrap();
        let metrics_path = dir.path().join("world_population.csv");
        std::fs::write(
            &metrics_path,
            "Rank,CCA3,Country/Territory,Continent,2022 Population\n\
             1,AAA,Aland,Europe,100\n\
             2,BBB,Bland,Asia,300\n",
        )
        .unwrap();
        let geometry_path = dir.path().join("countries.geojson");
        std::fs::write(
            &geometry_path,
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"ADM0_A3": "AAA"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 0]]]}},
                {"type": "Feature", "properties": {"ADM0_A3": "CCC"},
                 "geometry": {"type": "Polygon", "coordinates": [[[20, 0], [30, 0], [30, 10], [20, 0]]]}}
            ]}"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.map.metrics_path = metrics_path;
        config.map.geometry_source = geometry_path.to_string_lossy().into_owned();
        config.map.output_path = dir.path().join("map.svg");
        config.map.width = 300;
        config.map.height = 200;
        let casemap = Casemap::new_with_config(config);

        let data = casemap.load_map_data().await.unwrap();
        assert_eq!(data.joined.geometry_count(), 2);
        assert_eq!(data.joined.matched_count("2022 Population").unwrap(), 1);

        let scene = data
            .joined
            .scene("2022 Population", &casemap.config.map.title, Some("Population"))
            .unwrap();
        assert_eq!(scene.layers.len(), 2);
        assert!(scene.legend.is_some());
        let renderer = casemap.renderer(&casemap.config.map.output_path).unwrap();
        assert!(matches!(renderer, MapRenderer::Svg(_)));
    }
}
