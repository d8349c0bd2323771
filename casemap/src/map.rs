//! Joins country metrics onto country geometries and turns the result into a `MapScene`: an
//! ordered list of filled layers plus an optional colour-scale legend.

use anyhow::{anyhow, Result};
use geo::geometry::Geometry;
use geo::MultiPolygon;
use log::{debug, info};
use polars::prelude::*;
use wkt::TryFromWkt;

use crate::config::MapConfig;
use crate::error::CasemapError;
use crate::COL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Neutral fill drawn beneath every metric layer.
pub const BASE_FILL: Rgb = Rgb(211, 211, 211);
/// Fill for countries whose metric value is absent.
pub const MISSING_FILL: Rgb = Rgb(211, 211, 211);
pub const EDGE: Rgb = Rgb(0, 0, 0);

/// Sequential orange-red ramp, light to dark.
const OR_RD: [Rgb; 9] = [
    Rgb(255, 247, 236),
    Rgb(254, 232, 200),
    Rgb(253, 212, 158),
    Rgb(253, 187, 132),
    Rgb(252, 141, 89),
    Rgb(239, 101, 72),
    Rgb(215, 48, 31),
    Rgb(179, 0, 0),
    Rgb(127, 0, 0),
];

fn lerp(from: Rgb, to: Rgb, t: f64) -> Rgb {
    let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    Rgb(
        channel(from.0, to.0),
        channel(from.1, to.1),
        channel(from.2, to.2),
    )
}

/// Samples the ramp at `t` in `[0, 1]`; out-of-range values are clamped.
pub fn or_rd(t: f64) -> Rgb {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (OR_RD.len() - 1) as f64;
    let idx = (scaled.floor() as usize).min(OR_RD.len() - 2);
    lerp(OR_RD[idx], OR_RD[idx + 1], scaled - idx as f64)
}

/// Linear mapping of metric values onto the colour ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    /// Spans the present values, or `None` when every value is absent.
    pub fn from_values(values: &[Option<f64>]) -> Option<Self> {
        let (min, max) = values
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
                (min.min(*v), max.max(*v))
            });
        (min <= max).then_some(Self { min, max })
    }

    pub fn color(&self, value: f64) -> Rgb {
        if self.max > self.min {
            or_rd((value - self.min) / (self.max - self.min))
        } else {
            or_rd(0.5)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerKind {
    Base,
    Metric(String),
}

#[derive(Debug, Clone)]
pub struct Shape {
    pub code: Option<String>,
    pub polygons: MultiPolygon<f64>,
    pub fill: Rgb,
    pub value: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Layer {
    pub kind: LayerKind,
    pub shapes: Vec<Shape>,
}

#[derive(Debug, Clone)]
pub struct Legend {
    pub label: String,
    pub scale: ColorScale,
}

/// Everything needed to draw one map, bottom layer first.
#[derive(Debug, Clone)]
pub struct MapScene {
    pub title: String,
    pub layers: Vec<Layer>,
    pub legend: Option<Legend>,
}

impl MapScene {
    pub fn layer(&self, kind: &LayerKind) -> Option<&Layer> {
        self.layers.iter().find(|layer| &layer.kind == kind)
    }
}

/// A country outline with the code it was read under.
#[derive(Debug, Clone)]
struct Outline {
    code: Option<String>,
    polygons: MultiPolygon<f64>,
}

fn polygons_from_wkt(wkt_str: &str) -> Result<MultiPolygon<f64>> {
    let geom: Geometry<f64> = Geometry::try_from_wkt_str(wkt_str)
        .map_err(|err| anyhow!("Invalid geometry well-known text: {err:?}"))?;
    Ok(match geom {
        Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
        Geometry::MultiPolygon(polygons) => polygons,
        other => {
            debug!("Ignoring non-areal geometry: {other:?}");
            MultiPolygon::new(vec![])
        }
    })
}

fn outlines(df: &DataFrame, key: &str) -> Result<Vec<Outline>> {
    let codes = df.column(key)?.cast(&DataType::String)?;
    let geometries = df.column(COL::GEOMETRY)?;
    codes
        .str()?
        .into_iter()
        .zip(geometries.str()?)
        .map(|(code, wkt_str)| {
            let polygons = match wkt_str {
                Some(wkt_str) => polygons_from_wkt(wkt_str)?,
                None => MultiPolygon::new(vec![]),
            };
            Ok(Outline {
                code: code.map(str::to_string),
                polygons,
            })
        })
        .collect()
}

/// Left join of `geometries` (keyed by `geometry_key`) against `metrics` (keyed by
/// `metrics_key`). Every geometry row is kept; unmatched rows carry null metrics.
pub fn join(
    geometries: &DataFrame,
    metrics: &DataFrame,
    geometry_key: &str,
    metrics_key: &str,
) -> Result<DataFrame> {
    for (df, key) in [(geometries, geometry_key), (metrics, metrics_key)] {
        if df.get_column_index(key).is_none() {
            return Err(
                CasemapError::InvalidConfig(format!("join column '{key}' is missing")).into(),
            );
        }
    }
    let joined = geometries
        .clone()
        .lazy()
        .join(
            metrics
                .clone()
                .lazy()
                .with_column(col(metrics_key).cast(DataType::String)),
            [col(geometry_key)],
            [col(metrics_key)],
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;
    debug!("Joined map data with shape: {:?}", joined.shape());
    Ok(joined)
}

/// Reads a numeric metric column as `f64`, with nulls and non-finite values as `None`.
pub fn metric_values(df: &DataFrame, metric: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(metric)
        .map_err(|_| CasemapError::MetricNotFound(metric.to_string()))?;
    if !column.dtype().is_numeric() {
        return Err(CasemapError::MetricNotFound(metric.to_string()).into());
    }
    let values = column.cast(&DataType::Float64)?;
    Ok(values
        .f64()?
        .into_iter()
        .map(|value| value.filter(|v| v.is_finite()))
        .collect())
}

/// Geometries joined with metrics, with outlines parsed once for repeated drawing.
#[derive(Debug)]
pub struct JoinedMapData {
    pub joined: DataFrame,
    base: Vec<Outline>,
    rows: Vec<Outline>,
}

impl JoinedMapData {
    pub fn new(geometries: &DataFrame, metrics: &DataFrame, config: &MapConfig) -> Result<Self> {
        let joined = join(
            geometries,
            metrics,
            &config.geometry_key,
            &config.metrics_key,
        )?;
        let base = outlines(geometries, &config.geometry_key)?;
        let rows = outlines(&joined, &config.geometry_key)?;
        info!(
            "Joined {} metric rows onto {} geometries",
            metrics.height(),
            base.len()
        );
        Ok(Self { joined, base, rows })
    }

    pub fn geometry_count(&self) -> usize {
        self.base.len()
    }

    /// Number of joined rows that have a value for `metric`.
    pub fn matched_count(&self, metric: &str) -> Result<usize> {
        Ok(metric_values(&self.joined, metric)?
            .iter()
            .filter(|value| value.is_some())
            .count())
    }

    /// Builds a complete scene for `metric`: the neutral base layer, then the metric layer.
    /// A legend is attached only when `legend_label` is given.
    pub fn scene(&self, metric: &str, title: &str, legend_label: Option<&str>) -> Result<MapScene> {
        let values = metric_values(&self.joined, metric)?;
        let scale = ColorScale::from_values(&values);

        let base = Layer {
            kind: LayerKind::Base,
            shapes: self
                .base
                .iter()
                .map(|outline| Shape {
                    code: outline.code.clone(),
                    polygons: outline.polygons.clone(),
                    fill: BASE_FILL,
                    value: None,
                })
                .collect(),
        };
        let metric_layer = Layer {
            kind: LayerKind::Metric(metric.to_string()),
            shapes: self
                .rows
                .iter()
                .zip(values)
                .map(|(outline, value)| Shape {
                    code: outline.code.clone(),
                    polygons: outline.polygons.clone(),
                    fill: match (value, scale) {
                        (Some(value), Some(scale)) => scale.color(value),
                        _ => MISSING_FILL,
                    },
                    value,
                })
                .collect(),
        };
        let legend = legend_label.zip(scale).map(|(label, scale)| Legend {
            label: label.to_string(),
            scale,
        });

        Ok(MapScene {
            title: title.to_string(),
            layers: vec![base, metric_layer],
            legend,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_geometries() -> DataFrame {
        df!(
            COL::ADM0_A3 => &["AAA", "BBB", "CCC"],
            COL::GEOMETRY => &[
                "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))",
                "MULTIPOLYGON (((20 0, 30 0, 30 10, 20 0)), ((40 0, 50 0, 50 10, 40 0)))",
                "POLYGON ((-10 -10, -5 -10, -5 -5, -10 -10))"
            ]
        )
        .unwrap()
    }

    pub(crate) fn test_metrics() -> DataFrame {
        df!(
            COL::RANK => &[2i64, 1],
            COL::CCA3 => &["BBB", "AAA"],
            COL::COUNTRY_TERRITORY => &["Bland", "Aland"],
            COL::CONTINENT => &["Asia", "Europe"],
            "2022 Population" => &[300i64, 100],
            "Growth Rate" => &[0.5f64, 1.5]
        )
        .unwrap()
    }

    fn test_data() -> JoinedMapData {
        JoinedMapData::new(&test_geometries(), &test_metrics(), &MapConfig::default()).unwrap()
    }

    fn shape<'a>(layer: &'a Layer, code: &str) -> &'a Shape {
        layer
            .shapes
            .iter()
            .find(|shape| shape.code.as_deref() == Some(code))
            .unwrap()
    }

    #[test]
    fn join_should_keep_every_geometry() {
        let data = test_data();
        assert_eq!(data.geometry_count(), 3);
        assert_eq!(data.joined.height(), 3);
        assert_eq!(data.matched_count("2022 Population").unwrap(), 2);
    }

    #[test]
    fn unmatched_geometry_should_get_missing_fill() {
        let scene = test_data()
            .scene("2022 Population", "Population", Some("Population (2022)"))
            .unwrap();
        let metric = scene
            .layer(&LayerKind::Metric("2022 Population".into()))
            .unwrap();
        assert_eq!(metric.shapes.len(), 3);
        let missing = shape(metric, "CCC");
        assert_eq!(missing.fill, MISSING_FILL);
        assert_eq!(missing.value, None);
        assert_eq!(shape(metric, "AAA").fill, OR_RD[0]);
        assert_eq!(shape(metric, "BBB").fill, OR_RD[8]);
        assert_eq!(shape(metric, "BBB").polygons.0.len(), 2);
    }

    #[test]
    fn base_layer_should_sit_beneath_metric_layer() {
        let scene = test_data().scene("Growth Rate", "Growth", None).unwrap();
        assert_eq!(scene.layers.len(), 2);
        assert_eq!(scene.layers[0].kind, LayerKind::Base);
        assert_eq!(scene.layers[0].shapes.len(), 3);
        assert!(scene.layers[0]
            .shapes
            .iter()
            .all(|shape| shape.fill == BASE_FILL));
        assert_eq!(scene.layers[1].kind, LayerKind::Metric("Growth Rate".into()));
        assert!(scene.legend.is_none());
    }

    #[test]
    fn legend_should_span_present_values() {
        let scene = test_data()
            .scene("2022 Population", "Population", Some("Population (2022)"))
            .unwrap();
        let legend = scene.legend.unwrap();
        assert_eq!(legend.label, "Population (2022)");
        assert_eq!(legend.scale, ColorScale { min: 100.0, max: 300.0 });
    }

    #[test]
    fn unknown_or_text_metric_should_be_rejected() {
        let data = test_data();
        for metric in ["Area", COL::CONTINENT] {
            let err = data.scene(metric, "title", None).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<CasemapError>(),
                Some(CasemapError::MetricNotFound(name)) if name == metric
            ));
        }
    }

    #[test]
    fn join_should_require_key_columns() {
        let err = join(&test_geometries(), &test_metrics(), "ISO_A3", COL::CCA3).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CasemapError>(),
            Some(CasemapError::InvalidConfig(_))
        ));
    }

    #[test]
    fn ramp_should_hit_both_ends() {
        assert_eq!(or_rd(0.0), OR_RD[0]);
        assert_eq!(or_rd(1.0), OR_RD[8]);
        assert_eq!(or_rd(2.0), OR_RD[8]);
        assert_eq!(or_rd(f64::NAN), OR_RD[0]);
        assert_eq!(or_rd(0.125), OR_RD[1]);
    }

    #[test]
    fn scale_should_ignore_absent_values() {
        assert_eq!(ColorScale::from_values(&[None, None]), None);
        let scale = ColorScale::from_values(&[Some(5.0), None, Some(5.0)]).unwrap();
        assert_eq!(scale.color(5.0), or_rd(0.5));
    }
}
