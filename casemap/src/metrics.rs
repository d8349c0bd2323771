//! Loading the per-country metrics table and deciding which of its columns can be shown.

use std::path::Path;

use anyhow::Result;
use log::{debug, info};
use polars::prelude::*;

use crate::error::CasemapError;
use crate::COL;

pub fn load_metrics(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(CasemapError::InputNotFound(path.to_path_buf()).into());
    }
    info!("Loading metrics from {}", path.display());
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    debug!("Metrics shape: {:?}", df.shape());
    Ok(df)
}

fn is_excluded(name: &str, excluded: &[String]) -> bool {
    name.ends_with(COL::JOIN_SUFFIX) || excluded.iter().any(|column| column == name)
}

/// Numeric columns of `metrics` that are not identifiers or descriptive fields, in schema order.
pub fn eligible_columns(metrics: &DataFrame, excluded: &[String]) -> Vec<String> {
    metrics
        .get_columns()
        .iter()
        .filter(|series| series.dtype().is_numeric())
        .map(|series| series.name().to_string())
        .filter(|name| !is_excluded(name, excluded))
        .collect()
}

/// The configured default when it is eligible, otherwise the first eligible column.
pub fn default_selection(eligible: &[String], configured: &str) -> Result<String, CasemapError> {
    eligible
        .iter()
        .find(|column| column.as_str() == configured)
        .or_else(|| eligible.first())
        .cloned()
        .ok_or(CasemapError::NoEligibleMetrics)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::config::MapConfig;
    use crate::map::tests::test_metrics;

    fn excluded() -> Vec<String> {
        MapConfig::default().excluded_columns
    }

    #[test]
    fn eligible_columns_should_skip_identifiers_and_text() {
        let eligible = eligible_columns(&test_metrics(), &excluded());
        assert_eq!(eligible, vec!["2022 Population", "Growth Rate"]);
    }

    #[test]
    fn eligible_columns_should_not_depend_on_order() {
        let metrics = test_metrics();
        let reordered = metrics
            .select([
                "Growth Rate",
                COL::CONTINENT,
                COL::CCA3,
                "2022 Population",
                COL::RANK,
                COL::COUNTRY_TERRITORY,
            ])
            .unwrap();
        let original: BTreeSet<_> = eligible_columns(&metrics, &excluded()).into_iter().collect();
        let shuffled: BTreeSet<_> = eligible_columns(&reordered, &excluded())
            .into_iter()
            .collect();
        assert_eq!(original, shuffled);
    }

    #[test]
    fn join_artifacts_should_be_excluded() {
        let metrics = df!(
            "Area" => &[1.0f64],
            "Area_right" => &[2.0f64]
        )
        .unwrap();
        assert_eq!(eligible_columns(&metrics, &[]), vec!["Area"]);
    }

    #[test]
    fn default_selection_should_prefer_configured_column() {
        let eligible = vec!["2022 Population".to_string(), "Growth Rate".to_string()];
        assert_eq!(
            default_selection(&eligible, "Growth Rate").unwrap(),
            "Growth Rate"
        );
        assert_eq!(
            default_selection(&eligible, "1970 Population").unwrap(),
            "2022 Population"
        );
        assert!(matches!(
            default_selection(&[], "2022 Population"),
            Err(CasemapError::NoEligibleMetrics)
        ));
    }

    #[test]
    fn load_metrics_should_infer_numeric_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world_population.csv");
        std::fs::write(
            &path,
            "Rank,CCA3,Country/Territory,Capital,Continent,2022 Population,2020 Population,Growth Rate\n\
             36,AFG,Afghanistan,Kabul,Asia,41128771,38972230,1.0257\n\
             138,ALB,Albania,Tirana,Europe,2842321,2866849,0.9957\n",
        )
        .unwrap();
        let metrics = load_metrics(&path).unwrap();
        assert_eq!(metrics.shape(), (2, 8));
        assert_eq!(
            eligible_columns(&metrics, &excluded()),
            vec!["2022 Population", "2020 Population", "Growth Rate"]
        );
    }

    #[test]
    fn load_metrics_should_report_missing_file() {
        let err = load_metrics(Path::new("RAW_DATA/does_not_exist.csv")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CasemapError>(),
            Some(CasemapError::InputNotFound(_))
        ));
    }
}
