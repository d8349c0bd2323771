//! Reshapes a wide case-count table (one column per country, one row per date) into the tidy
//! daily series of a single country.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use itertools::Itertools;
use log::{debug, info, warn};
use polars::prelude::*;

use crate::config::SeriesConfig;
use crate::error::CasemapError;
use crate::render::draw_series_chart;
use crate::COL;

/// Date label layouts accepted in the first column, tried in order.
const DATE_FORMATS: [&str; 5] = [
    "%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d", "%m-%d-%Y", "%d-%m-%Y",
];
const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";
const CHART_SIZE: (u32, u32) = (1000, 500);

/// One observed date of a `CountrySeries`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRow {
    pub date: NaiveDate,
    pub day_index: i64,
    pub confirmed: f64,
    pub new_cases: f64,
}

/// The tidy series of one country, in ascending date order.
#[derive(Debug, Clone, PartialEq)]
pub struct CountrySeries {
    pub country: String,
    pub rows: Vec<SeriesRow>,
}

impl CountrySeries {
    /// Builds the series from `(date, new_cases)` pairs that are already sorted by date.
    fn from_sorted(country: &str, observations: Vec<(NaiveDate, f64)>) -> Self {
        let start = observations.first().map(|(date, _)| *date);
        let mut confirmed = 0.0;
        let rows = observations
            .into_iter()
            .map(|(date, new_cases)| {
                confirmed += new_cases;
                SeriesRow {
                    date,
                    day_index: start.map_or(0, |start| (date - start).num_days()),
                    confirmed,
                    new_cases,
                }
            })
            .collect();
        Self {
            country: country.to_string(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Columns `Date, Day, Confirmed, New_Cases`, with dates formatted as `YYYY-MM-DD`.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let dates = self
            .rows
            .iter()
            .map(|row| row.date.format(OUTPUT_DATE_FORMAT).to_string())
            .collect_vec();
        let days = self.rows.iter().map(|row| row.day_index).collect_vec();
        let confirmed = self.rows.iter().map(|row| row.confirmed).collect_vec();
        let new_cases = self.rows.iter().map(|row| row.new_cases).collect_vec();
        df!(
            COL::DATE => dates,
            COL::DAY => days,
            COL::CONFIRMED => confirmed,
            COL::NEW_CASES => new_cases
        )
    }
}

/// Outcome of a normalizer run.
#[derive(Debug)]
pub struct SeriesReport {
    pub output_path: PathBuf,
    pub chart_path: Option<PathBuf>,
    pub series: CountrySeries,
    pub preview: DataFrame,
}

pub fn parse_date_label(label: &str) -> Result<NaiveDate, CasemapError> {
    let label = label.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(label, format).ok())
        .ok_or_else(|| CasemapError::InvalidDate(label.to_string()))
}

/// Reads a count cell. Anything that is not a finite number counts as zero.
pub fn coerce_count(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Reads the wide table with every column as text.
pub fn load_raw_table(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(CasemapError::InputNotFound(path.to_path_buf()).into());
    }
    info!("Loading wide table from {}", path.display());
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    debug!("Wide table shape: {:?}", df.shape());
    Ok(df)
}

/// Extracts the target country's column from `raw` and derives the tidy series. The first
/// column of `raw` holds the date labels.
pub fn normalize(raw: &DataFrame, config: &SeriesConfig) -> Result<CountrySeries> {
    let target = config.target_country.as_str();
    let labels = match raw.get_columns().first() {
        Some(labels) if labels.name() != target && raw.get_column_index(target).is_some() => {
            labels
        }
        _ => return Err(CasemapError::CountryNotFound(target.to_string()).into()),
    };

    let offset = config.metadata_rows.min(raw.height());
    let length = raw.height() - offset;
    let labels = labels
        .slice(offset as i64, length)
        .cast(&DataType::String)?;
    let counts = raw
        .column(target)?
        .slice(offset as i64, length)
        .cast(&DataType::String)?;

    let mut observations = labels
        .str()?
        .into_iter()
        .zip(counts.str()?)
        .map(|(label, count)| {
            let date = parse_date_label(label.unwrap_or_default())?;
            Ok((date, coerce_count(count)))
        })
        .collect::<Result<Vec<_>, CasemapError>>()?;
    // Stable, so rows sharing a date keep their file order.
    observations.sort_by_key(|(date, _)| *date);

    let series = CountrySeries::from_sorted(target, observations);
    info!("Derived {} rows for '{}'", series.len(), target);
    Ok(series)
}

pub fn write_csv(series: &CountrySeries, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut df = series.to_dataframe()?;
    let mut file =
        File::create(path).with_context(|| format!("Failed to write {}", path.display()))?;
    CsvWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}

/// Runs the normalizer end to end: load, derive, write, and (optionally) chart.
///
/// Chart failures are logged and leave the written CSV untouched.
pub fn run(config: &SeriesConfig) -> Result<SeriesReport> {
    let raw = load_raw_table(&config.input_path)?;
    let series = normalize(&raw, config)?;
    let output_path = config.output_path();
    write_csv(&series, &output_path)?;
    info!("Wrote {} rows to {}", series.len(), output_path.display());

    let preview = series.to_dataframe()?.head(Some(config.preview_rows));
    let chart_path = if config.plot {
        let chart_path = config.chart_path();
        match draw_series_chart(&series, &chart_path, CHART_SIZE) {
            Ok(()) => Some(chart_path),
            Err(err) => {
                warn!("Failed to render chart {}: {err:#}", chart_path.display());
                None
            }
        }
    } else {
        None
    };

    Ok(SeriesReport {
        output_path,
        chart_path,
        series,
        preview,
    })
}
