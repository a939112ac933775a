//! Plot request configuration and the tuning constants shared across the
//! pipeline.

use chrono::NaiveDateTime;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::payload::MetricProps;
use crate::plot_type::PlotType;

/// Render individual point markers only while the largest series stays at or
/// under this many points; past it, trend lines only.
pub const MAX_POINTS_PER_SERIES: usize = 300;

/// Lower control limit for moving-range charts.
pub const MOVING_RANGE_LOWER_LIMIT: f64 = 0.0;

/// Upper control limit weight for moving-range charts (D4 for n = 2).
pub const MOVING_RANGE_UPPER_LIMIT_WEIGHT: f64 = 3.268;

/// Decision interval for CUSUM charts.
pub const CUSUM_CONTROL_LIMIT: f64 = 5.0;

/// A fragment range narrower than this is treated as degenerate and widened.
pub const DEGENERATE_RANGE_EPSILON: f64 = 0.0001;

/// Reference-window truncation is abandoned for a series when fewer than this
/// many points sit between the computed first/last indices. Empirical
/// threshold.
pub const FILTER_MIN_KEPT_POINTS: usize = 6;

/// How many points the kept-range end index is pulled back when truncation
/// does run. Empirical, paired with [`FILTER_MIN_KEPT_POINTS`].
pub const FILTER_SKIP_POINTS: usize = 6;

/// Substitution value mentioned in the log-scale zero notice. The pipeline
/// never rewrites values itself; the renderer does.
pub const LOG_SCALE_EPSILON: f64 = 0.000_000_1;

/// Point-shape categories used by Levey-Jennings and moving-range charts.
pub const SHAPE_DOMAIN: [&str; 4] = ["Include", "Exclude", "Include-Outlier", "Exclude-Outlier"];

/// Minimum abbreviation length fed to the legend prefix helper.
pub const LEGEND_PREFIX_MIN_LENGTH: usize = 3;

/// Rapid repeated refresh requests are coalesced within this window.
pub const REFRESH_DEBOUNCE_MS: u64 = 500;

/// Which of the two metric series an observation belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
pub enum SeriesType {
    #[strum(serialize = "series1")]
    #[serde(rename = "series1")]
    Series1,
    #[strum(serialize = "series2")]
    #[serde(rename = "series2")]
    Series2,
}

impl SeriesType {
    /// Wire encoding: 2 means series 2, anything else series 1.
    pub fn from_wire(value: Option<i32>) -> Self {
        if value == Some(2) {
            SeriesType::Series2
        } else {
            SeriesType::Series1
        }
    }
}

/// Whether the metric plots one value series or two (left/right y-axis).
/// Carried explicitly in configuration rather than inferred from which field
/// names happen to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeriesArity {
    #[default]
    Single,
    Dual,
}

impl SeriesArity {
    pub fn from_metric(metric: &MetricProps) -> Self {
        if metric.series2_query_name.is_some() || metric.series2_label.is_some() {
            SeriesArity::Dual
        } else {
            SeriesArity::Single
        }
    }

    pub fn is_dual(self) -> bool {
        matches!(self, SeriesArity::Dual)
    }
}

/// Requested y-axis scale.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
pub enum YAxisScale {
    #[default]
    #[strum(serialize = "linear")]
    #[serde(rename = "linear")]
    Linear,
    #[strum(serialize = "log")]
    #[serde(rename = "log")]
    Log,
    #[strum(serialize = "percentDeviation")]
    #[serde(rename = "percentDeviation")]
    PercentDeviation,
    #[strum(serialize = "standardDeviation")]
    #[serde(rename = "standardDeviation")]
    StandardDeviation,
}

impl YAxisScale {
    pub fn is_log(self) -> bool {
        matches!(self, YAxisScale::Log)
    }
}

/// Configuration for one plot data request.
///
/// # Example
///
/// ```rust
/// use qctrend::config::{PlotConfig, YAxisScale};
/// use qctrend::plot_type::PlotType;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PlotConfig::new()
///     .plot_types(vec![PlotType::LeveyJennings, PlotType::MovingRange])
///     .y_axis_scale(YAxisScale::Log)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Builder, Clone, Debug)]
#[builder(setter(into, strip_option), default)]
pub struct PlotConfig {
    /// Plot types to shape data for
    #[builder(default = "vec![PlotType::LeveyJennings]")]
    pub plot_types: Vec<PlotType>,

    /// Requested y-axis scale
    pub y_axis_scale: YAxisScale,

    /// Group x-axis values by date instead of one tick per acquisition
    pub grouped_x: bool,

    /// Overlay every fragment on one combined plot
    pub single_plot: bool,

    /// One or two value series per metric
    pub series_arity: SeriesArity,

    /// Window size for the trailing mean / trailing CV statistics
    #[builder(default = "10", setter(into = false))]
    pub trailing_runs: usize,

    /// Total number of runs available for the active filter
    #[builder(setter(into = false))]
    pub runs: usize,

    /// Visible range start; also the cut point for reference-window
    /// truncation
    pub start_date: Option<NaiveDateTime>,

    /// Visible range end
    pub end_date: Option<NaiveDateTime>,

    /// Paging window over the fragment blocks, `(start, end)` exclusive of
    /// `end`. The whole result set when unset.
    pub page_window: Option<(usize, usize)>,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            plot_types: vec![PlotType::LeveyJennings],
            y_axis_scale: YAxisScale::Linear,
            grouped_x: false,
            single_plot: false,
            series_arity: SeriesArity::Single,
            trailing_runs: 10,
            runs: 0,
            start_date: None,
            end_date: None,
            page_window: None,
        }
    }
}

impl PlotConfig {
    /// Create a new builder for PlotConfig
    pub fn new() -> PlotConfigBuilder {
        PlotConfigBuilder::default()
    }

    pub fn shows(&self, plot_type: PlotType) -> bool {
        self.plot_types.contains(&plot_type)
    }

    /// Any plot type that reads the raw (non-Levey-Jennings) guide-set
    /// statistics.
    pub fn shows_raw_guide_set_consumer(&self) -> bool {
        self.plot_types
            .iter()
            .any(|plot_type| *plot_type != PlotType::LeveyJennings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_type_wire_mapping() {
        assert_eq!(SeriesType::from_wire(Some(2)), SeriesType::Series2);
        assert_eq!(SeriesType::from_wire(Some(1)), SeriesType::Series1);
        assert_eq!(SeriesType::from_wire(None), SeriesType::Series1);
        assert_eq!(SeriesType::from_wire(Some(7)), SeriesType::Series1);
    }

    #[test]
    fn arity_from_metric_props() {
        let mut metric = MetricProps::default();
        assert_eq!(SeriesArity::from_metric(&metric), SeriesArity::Single);
        metric.series2_label = Some("Precursor Area".to_string());
        assert_eq!(SeriesArity::from_metric(&metric), SeriesArity::Dual);
    }

    #[test]
    fn builder_defaults() {
        let config = PlotConfig::new().build().unwrap();
        assert_eq!(config.plot_types, vec![PlotType::LeveyJennings]);
        assert!(!config.shows(PlotType::MovingRange));
        assert!(!config.shows_raw_guide_set_consumer());
    }
}
