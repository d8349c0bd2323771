//! This module stores the column names used across both pipelines: the headers of the tidy
//! series output, and the join keys and descriptive columns of the country metrics and geometry
//! tables. These must be kept in sync with the upstream input files.

pub const DATE: &str = "Date";
pub const DAY: &str = "Day";
pub const CONFIRMED: &str = "Confirmed";
pub const NEW_CASES: &str = "New_Cases";

/// Header of the first column of the wide case-count table.
pub const COUNTRY_REGION: &str = "Country/Region";

/// Three-letter country code in the metrics table.
pub const CCA3: &str = "CCA3";
/// Three-letter admin code in the Natural Earth geometry layer.
pub const ADM0_A3: &str = "ADM0_A3";
pub const GEOMETRY: &str = "geometry";

pub const RANK: &str = "Rank";
pub const COUNTRY: &str = "Country";
pub const COUNTRY_TERRITORY: &str = "Country/Territory";
pub const CAPITAL: &str = "Capital";
pub const CONTINENT: &str = "Continent";

/// Suffix polars appends to clashing right-hand columns in a join.
pub const JOIN_SUFFIX: &str = "_right";
