//! Drawing with `plotters`: the cumulative-cases line chart and the choropleth scenes built in
//! [`crate::map`].

use std::path::{Path, PathBuf};

use anyhow::Result;
use enum_dispatch::enum_dispatch;
use itertools::Itertools;
use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;
use strum_macros::EnumString;

use crate::error::CasemapError;
use crate::map::{Legend, MapScene, Rgb, EDGE};
use crate::series::CountrySeries;

const CAPTION_FONT: (&str, u32) = ("sans-serif", 30);
const LEGEND_HEIGHT: i32 = 90;
const LEGEND_STEPS: usize = 200;

/// Image formats the map renderer can produce, chosen by output file extension.
#[derive(Clone, Copy, Debug, EnumString, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    pub fn from_path(path: &Path) -> Result<Self, CasemapError> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .ok_or_else(|| {
                CasemapError::InvalidConfig(format!(
                    "unsupported image format for '{}' (expected .png or .svg)",
                    path.display()
                ))
            })
    }
}

/// Trait for anything able to put a `MapScene` on a surface. Every call draws the full scene
/// onto a cleared surface.
#[enum_dispatch]
pub trait SceneRenderer {
    fn render(&self, scene: &MapScene) -> Result<()>;
}

/// Enum of renderers, one for each supported image format
#[enum_dispatch(SceneRenderer)]
#[derive(Debug, Clone)]
pub enum MapRenderer {
    Png(PngRenderer),
    Svg(SvgRenderer),
}

impl MapRenderer {
    pub fn for_path(path: &Path, size: (u32, u32)) -> Result<Self, CasemapError> {
        let path = path.to_path_buf();
        Ok(match ImageFormat::from_path(&path)? {
            ImageFormat::Png => MapRenderer::Png(PngRenderer { path, size }),
            ImageFormat::Svg => MapRenderer::Svg(SvgRenderer { path, size }),
        })
    }

    pub fn path(&self) -> &Path {
        match self {
            MapRenderer::Png(renderer) => &renderer.path,
            MapRenderer::Svg(renderer) => &renderer.path,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PngRenderer {
    pub path: PathBuf,
    pub size: (u32, u32),
}

impl SceneRenderer for PngRenderer {
    fn render(&self, scene: &MapScene) -> Result<()> {
        let root = BitMapBackend::new(&self.path, self.size).into_drawing_area();
        draw_scene(&root, scene)?;
        root.present()?;
        debug!("Rendered '{}' to {}", scene.title, self.path.display());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SvgRenderer {
    pub path: PathBuf,
    pub size: (u32, u32),
}

impl SceneRenderer for SvgRenderer {
    fn render(&self, scene: &MapScene) -> Result<()> {
        let root = SVGBackend::new(&self.path, self.size).into_drawing_area();
        draw_scene(&root, scene)?;
        root.present()?;
        debug!("Rendered '{}' to {}", scene.title, self.path.display());
        Ok(())
    }
}

fn to_color(rgb: Rgb) -> RGBColor {
    RGBColor(rgb.0, rgb.1, rgb.2)
}

/// Formats a legend tick so that population-sized values stay readable.
fn format_tick(value: f64) -> String {
    if value.abs() >= 1e4 {
        format!("{value:.2e}")
    } else {
        format!("{value:.2}")
    }
}

/// Clears `root` and draws the layers in order, plate carrée (lon, lat) projection, axes off.
fn draw_scene<DB>(root: &DrawingArea<DB, Shift>, scene: &MapScene) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let (_, height) = root.dim_in_pixel();
    let legend_height = if scene.legend.is_some() {
        LEGEND_HEIGHT
    } else {
        0
    };
    let (map_area, legend_area) = root.split_vertically(height as i32 - legend_height);

    let mut chart = ChartBuilder::on(&map_area)
        .margin(10)
        .caption(&scene.title, CAPTION_FONT)
        .build_cartesian_2d(-180.0f64..180.0f64, -90.0f64..90.0f64)?;

    let edge = to_color(EDGE).stroke_width(1);
    for layer in &scene.layers {
        for shape in &layer.shapes {
            let fill = to_color(shape.fill).filled();
            for polygon in shape.polygons.iter() {
                let exterior = polygon
                    .exterior()
                    .coords()
                    .map(|coord| (coord.x, coord.y))
                    .collect_vec();
                chart.draw_series(std::iter::once(Polygon::new(exterior.clone(), fill)))?;
                chart.draw_series(std::iter::once(PathElement::new(exterior, edge)))?;
            }
        }
    }

    if let Some(legend) = &scene.legend {
        draw_legend(&legend_area, legend)?;
    }
    Ok(())
}

/// Horizontal colour bar with value ticks and the legend label underneath.
fn draw_legend<DB>(area: &DrawingArea<DB, Shift>, legend: &Legend) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (low, high) = if legend.scale.max > legend.scale.min {
        (legend.scale.min, legend.scale.max)
    } else {
        (legend.scale.min - 0.5, legend.scale.max + 0.5)
    };
    let mut chart = ChartBuilder::on(area)
        .margin_left(120)
        .margin_right(120)
        .margin_bottom(5)
        .x_label_area_size(50)
        .build_cartesian_2d(low..high, 0.0f64..1.0f64)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .disable_y_axis()
        .x_labels(6)
        .x_label_formatter(&|value: &f64| format_tick(*value))
        .x_desc(legend.label.as_str())
        .draw()?;

    let step = (high - low) / LEGEND_STEPS as f64;
    chart.draw_series((0..LEGEND_STEPS).map(|idx| {
        let left = low + step * idx as f64;
        let color = to_color(legend.scale.color(left + step / 2.0));
        Rectangle::new([(left, 0.0), (left + step, 1.0)], color.filled())
    }))?;
    Ok(())
}

/// Draws `confirmed` against `day_index` as a single line into a PNG at `path`.
pub fn draw_series_chart(series: &CountrySeries, path: &Path, size: (u32, u32)) -> Result<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let max_day = series
        .rows
        .last()
        .map_or(0, |row| row.day_index)
        .max(1);
    let (low, high) = series
        .rows
        .iter()
        .fold((0.0f64, 0.0f64), |(low, high), row| {
            (low.min(row.confirmed), high.max(row.confirmed))
        });
    let high = if high > low { high } else { low + 1.0 };

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(format!("{} Cumulative Cases", series.country), CAPTION_FONT)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(0i64..max_day, low..high)?;
    chart
        .configure_mesh()
        .x_desc("Day")
        .y_desc("Confirmed")
        .draw()?;
    chart.draw_series(LineSeries::new(
        series.rows.iter().map(|row| (row.day_index, row.confirmed)),
        &BLUE,
    ))?;
    root.present()?;
    debug!("Rendered chart to {}", path.display());
    Ok(())
}
