use std::fmt::Display;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use flatgeobuf::geozero::ToWkt;
use flatgeobuf::{FeatureProperties, HttpFgbReader};
use geojson::GeoJson;
use log::{debug, info};
use polars::{frame::DataFrame, prelude::NamedFrom, series::Series};
use wkt::ToWkt as _;

use crate::error::CasemapError;
use crate::COL;

/// Where country boundaries are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometrySource {
    GeoJsonUrl(String),
    FlatGeobufUrl(String),
    GeoJsonFile(PathBuf),
}

impl From<&str> for GeometrySource {
    fn from(value: &str) -> Self {
        let is_remote = value.starts_with("http://") || value.starts_with("https://");
        let is_fgb = value.to_ascii_lowercase().ends_with(".fgb");
        match (is_remote, is_fgb) {
            (true, true) => GeometrySource::FlatGeobufUrl(value.to_string()),
            (true, false) => GeometrySource::GeoJsonUrl(value.to_string()),
            (false, _) => GeometrySource::GeoJsonFile(PathBuf::from(value)),
        }
    }
}

impl Display for GeometrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometrySource::GeoJsonUrl(url) | GeometrySource::FlatGeobufUrl(url) => {
                write!(f, "{url}")
            }
            GeometrySource::GeoJsonFile(path) => write!(f, "{}", path.display()),
        }
    }
}

fn geometry_frame(key: &str, codes: Vec<String>, geoms: Vec<String>) -> Result<DataFrame> {
    let codes = Series::new(key, codes);
    let geoms = Series::new(COL::GEOMETRY, geoms);
    Ok(DataFrame::new(vec![codes, geoms])?)
}

/// Parses a GeoJSON document into a frame of (`key`, WKT geometry). Features without the key
/// property or without a geometry are skipped.
pub fn geometries_from_geojson(text: &str, key: &str) -> Result<DataFrame> {
    let features = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => bail!("expected features, found a bare geometry"),
    };

    let mut codes: Vec<String> = vec![];
    let mut geoms: Vec<String> = vec![];
    for feature in features {
        let Some(code) = feature
            .property(key)
            .and_then(|value| value.as_str())
            .map(str::to_string)
        else {
            debug!("Skipping feature without '{key}'");
            continue;
        };
        let Some(geometry) = feature.geometry else {
            debug!("Skipping '{code}' without geometry");
            continue;
        };
        let geom: geo::Geometry<f64> = geometry
            .value
            .try_into()
            .with_context(|| format!("failed to convert geometry of '{code}'"))?;
        codes.push(code);
        geoms.push(geom.wkt_string());
    }
    geometry_frame(key, codes, geoms)
}

async fn get_geojson_from_url(url: &str, key: &str) -> Result<DataFrame> {
    let text = reqwest::get(url)
        .await?
        .error_for_status()?
        .text()
        .await?;
    geometries_from_geojson(&text, key)
}

/// Function to request geometries from a remotely hosted FGB
async fn get_fgb_from_url(file_url: &str, key: &str) -> Result<DataFrame> {
    let fgb = HttpFgbReader::open(file_url).await?;
    let mut fgb = fgb.select_all().await?;

    let mut codes: Vec<String> = vec![];
    let mut geoms: Vec<String> = vec![];
    while let Some(feature) = fgb.next().await? {
        let props = feature.properties()?;
        let Some(code) = props.get(key) else {
            debug!("Skipping feature without '{key}'");
            continue;
        };
        codes.push(code.clone());
        geoms.push(feature.to_wkt()?);
    }
    geometry_frame(key, codes, geoms)
}

/// Fetches country boundaries from `source` as a frame with columns `key` and `geometry`
/// (WKT). Any failure is reported as `GeometryUnreachable` naming the source.
pub async fn get_geometries(source: &GeometrySource, key: &str) -> Result<DataFrame> {
    info!("Fetching geometries from {source}");
    let result = match source {
        GeometrySource::GeoJsonUrl(url) => get_geojson_from_url(url, key).await,
        GeometrySource::FlatGeobufUrl(url) => get_fgb_from_url(url, key).await,
        GeometrySource::GeoJsonFile(path) => std::fs::read_to_string(path)
            .map_err(|err| anyhow!(err))
            .and_then(|text| geometries_from_geojson(&text, key)),
    };
    match result {
        Ok(df) => {
            debug!("Fetched {} geometries", df.height());
            Ok(df)
        }
        Err(err) => Err(CasemapError::GeometryUnreachable {
            location: source.to_string(),
            reason: format!("{err:#}"),
        }
        .into()),
    }
}
