//! Static registry of the built-in QC metric series configurations.
//!
//! Each entry maps a metric-type key to the schema/query coordinates its
//! series are fetched from and the axis labels it plots under. Dual-series
//! metrics carry a second set of coordinates.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::config::SeriesArity;
use crate::error::{QcTrendError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSeriesConfig {
    pub name: &'static str,
    pub title: &'static str,
    pub series1_label: &'static str,
    pub series1_schema_name: &'static str,
    pub series1_query_name: &'static str,
    pub series2_label: Option<&'static str>,
    pub series2_schema_name: Option<&'static str>,
    pub series2_query_name: Option<&'static str>,
}

impl MetricSeriesConfig {
    pub fn series_arity(&self) -> SeriesArity {
        if self.series2_query_name.is_some() {
            SeriesArity::Dual
        } else {
            SeriesArity::Single
        }
    }
}

const SCHEMA: &str = "targetedms";

pub static METRIC_SERIES_CONFIGS: [MetricSeriesConfig; 8] = [
    MetricSeriesConfig {
        name: "retentionTime",
        title: "Retention Time",
        series1_label: "Retention Time",
        series1_schema_name: SCHEMA,
        series1_query_name: "QCMetric_retentionTime",
        series2_label: None,
        series2_schema_name: None,
        series2_query_name: None,
    },
    MetricSeriesConfig {
        name: "peakArea",
        title: "Peak Area",
        series1_label: "Peak Area",
        series1_schema_name: SCHEMA,
        series1_query_name: "QCMetric_peakArea",
        series2_label: None,
        series2_schema_name: None,
        series2_query_name: None,
    },
    MetricSeriesConfig {
        name: "fwhm",
        title: "Full Width at Half Maximum (FWHM)",
        series1_label: "Full Width at Half Maximum (FWHM)",
        series1_schema_name: SCHEMA,
        series1_query_name: "QCMetric_fwhm",
        series2_label: None,
        series2_schema_name: None,
        series2_query_name: None,
    },
    MetricSeriesConfig {
        name: "fwb",
        title: "Full Width at Base (FWB)",
        series1_label: "Full Width at Base (FWB)",
        series1_schema_name: SCHEMA,
        series1_query_name: "QCMetric_fwb",
        series2_label: None,
        series2_schema_name: None,
        series2_query_name: None,
    },
    MetricSeriesConfig {
        name: "ratio",
        title: "Light/Heavy Ratio",
        series1_label: "Light/Heavy Ratio",
        series1_schema_name: SCHEMA,
        series1_query_name: "QCMetric_lhRatio",
        series2_label: None,
        series2_schema_name: None,
        series2_query_name: None,
    },
    MetricSeriesConfig {
        name: "transitionPrecursorRatio",
        title: "Transition/Precursor Area Ratio",
        series1_label: "Transition/Precursor Area Ratio",
        series1_schema_name: SCHEMA,
        series1_query_name: "QCMetric_transitionPrecursorRatio",
        series2_label: None,
        series2_schema_name: None,
        series2_query_name: None,
    },
    MetricSeriesConfig {
        name: "transitionAndPrecursorArea",
        title: "Transition/Precursor Areas",
        series1_label: "Transition Area",
        series1_schema_name: SCHEMA,
        series1_query_name: "QCMetric_transitionArea",
        series2_label: Some("Precursor Area"),
        series2_schema_name: Some(SCHEMA),
        series2_query_name: Some("QCMetric_precursorArea"),
    },
    MetricSeriesConfig {
        name: "massAccuracy",
        title: "Mass Accuracy",
        series1_label: "Mass Accuracy",
        series1_schema_name: SCHEMA,
        series1_query_name: "QCMetric_massAccuracy",
        series2_label: None,
        series2_schema_name: None,
        series2_query_name: None,
    },
];

static BY_NAME: Lazy<FxHashMap<&'static str, &'static MetricSeriesConfig>> = Lazy::new(|| {
    METRIC_SERIES_CONFIGS
        .iter()
        .map(|config| (config.name, config))
        .collect()
});

/// Look up a metric series configuration by its metric-type key.
pub fn metric_series_config(name: &str) -> Option<&'static MetricSeriesConfig> {
    BY_NAME.get(name).copied()
}

/// Like [`metric_series_config`], but an unknown key is an error.
pub fn require_metric_series_config(name: &str) -> Result<&'static MetricSeriesConfig> {
    metric_series_config(name).ok_or_else(|| QcTrendError::UnknownMetric(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup() {
        let config = metric_series_config("retentionTime").unwrap();
        assert_eq!(config.title, "Retention Time");
        assert_eq!(config.series_arity(), SeriesArity::Single);
        assert!(metric_series_config("noSuchMetric").is_none());
        assert!(require_metric_series_config("noSuchMetric").is_err());
    }

    #[test]
    fn dual_series_metric() {
        let config = metric_series_config("transitionAndPrecursorArea").unwrap();
        assert_eq!(config.series_arity(), SeriesArity::Dual);
        assert_eq!(config.series2_label, Some("Precursor Area"));
        assert_eq!(config.series2_query_name, Some("QCMetric_precursorArea"));
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = METRIC_SERIES_CONFIGS.iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), METRIC_SERIES_CONFIGS.len());
    }
}
