//! The six trend-plot types behind one module interface.
//!
//! Each plot type knows how to shape a raw row into plot-ready fields, fold
//! an observation into the running per-series extents, turn finished extents
//! into a y-axis domain, and describe its extra legend entries. The
//! orchestrator iterates the subset selected by configuration; modules never
//! see each other.

pub mod cusum;
pub mod levey_jennings;
pub mod moving_range;
pub mod trailing_cv;
pub mod trailing_mean;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::config::{PlotConfig, SeriesArity, SeriesType, YAxisScale};
use crate::guide_set::GuideSetIndex;
use crate::payload::{MetricProps, RawMetricRow};
use crate::series::{FragmentSeries, SeriesExtents, ShapedPoint};

pub use cusum::CusumModule;
pub use levey_jennings::LeveyJenningsModule;
pub use moving_range::MovingRangeModule;
pub use trailing_cv::TrailingCvModule;
pub use trailing_mean::TrailingMeanModule;

/// The trend-plot types a request can enable.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
pub enum PlotType {
    #[strum(serialize = "Levey-Jennings")]
    #[serde(rename = "Levey-Jennings")]
    LeveyJennings,
    #[strum(serialize = "Moving Range")]
    #[serde(rename = "Moving Range")]
    MovingRange,
    #[strum(serialize = "CUSUMm")]
    #[serde(rename = "CUSUMm")]
    CusumMean,
    #[strum(serialize = "CUSUMv")]
    #[serde(rename = "CUSUMv")]
    CusumVariable,
    #[strum(serialize = "Trailing Mean")]
    #[serde(rename = "Trailing Mean")]
    TrailingMean,
    #[strum(serialize = "Trailing CV")]
    #[serde(rename = "Trailing CV")]
    TrailingCv,
}

/// Computed y-axis range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotDomain {
    pub min: f64,
    pub max: f64,
}

/// Marker/line styles a legend entry can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LegendShape {
    Circle,
    Triangle,
    Square,
    Diamond,
    X,
    MeanLine,
    StdDevLine,
    LimitLine,
    SolidLine,
    DashedLine,
    /// Zero-size path reserving legend space for plot alignment.
    EmptyPath,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegendEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<LegendShape>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub separator: bool,
    #[serde(rename = "hoverText", skip_serializing_if = "Option::is_none")]
    pub hover_text: Option<String>,
}

impl LegendEntry {
    pub fn separator(text: &str) -> Self {
        LegendEntry {
            name: None,
            text: text.to_string(),
            color: None,
            shape: None,
            separator: true,
            hover_text: None,
        }
    }

    pub fn line(text: String, color: &str, shape: LegendShape) -> Self {
        LegendEntry {
            name: None,
            text,
            color: Some(color.to_string()),
            shape: Some(shape),
            separator: false,
            hover_text: None,
        }
    }

    /// Empty entry reserving legend space so sibling plots align.
    pub fn empty() -> Self {
        LegendEntry {
            name: None,
            text: String::new(),
            color: None,
            shape: Some(LegendShape::EmptyPath),
            separator: false,
            hover_text: None,
        }
    }
}

/// Scale/overlay context shared by every module operation.
#[derive(Debug, Clone, Copy)]
pub struct PlotEnv {
    pub y_axis_scale: YAxisScale,
    pub single_plot: bool,
    pub series_arity: SeriesArity,
}

impl PlotEnv {
    pub fn from_config(config: &PlotConfig) -> Self {
        PlotEnv {
            y_axis_scale: config.y_axis_scale,
            single_plot: config.single_plot,
            series_arity: config.series_arity,
        }
    }
}

/// Per-row context handed to `shape_row`.
pub struct RowContext<'a> {
    pub fragment: &'a str,
    pub series_type: SeriesType,
    pub guide_set_id: Option<i64>,
    pub guide_sets: &'a GuideSetIndex,
    pub metric: &'a MetricProps,
}

impl RowContext<'_> {
    /// The guide-set statistics for this row, when the row references a real
    /// (id > 0) guide set that was trained for this fragment + series type.
    pub fn guide_set_stats(&self) -> Option<&crate::guide_set::SeriesStats> {
        match self.guide_set_id {
            Some(id) if id > 0 => self.guide_sets.series_stats(id, self.fragment, self.series_type),
            _ => None,
        }
    }
}

/// Context for legend assembly.
pub struct LegendContext<'a> {
    pub metric: &'a MetricProps,
    pub env: PlotEnv,
}

/// One plot type's slice of the pipeline.
pub trait PlotTypeModule {
    fn plot_type(&self) -> PlotType;

    /// Copy this plot type's fields from the raw row onto the shaped point.
    fn shape_row(
        &self,
        row: &RawMetricRow,
        ctx: &RowContext<'_>,
        env: &PlotEnv,
        point: &mut ShapedPoint,
    );

    /// Fold the shaped point into the fragment's running extents and
    /// log-scale flags.
    fn accumulate(&self, series: &mut FragmentSeries, point: &ShapedPoint, env: &PlotEnv);

    /// Final y-axis domain from accumulated extents. `None` when this plot
    /// type delegates the domain to the renderer (dual-series axes).
    fn domain(&self, extents: &SeriesExtents, env: &PlotEnv) -> Option<PlotDomain>;

    /// Fold one fragment's extents into the all-series combined extents.
    fn fold_combined(&self, combined: &mut SeriesExtents, series: &FragmentSeries);

    /// Extra legend entries specific to this plot type.
    fn legend(&self, ctx: &LegendContext<'_>) -> Vec<LegendEntry>;
}

/// The modules for the enabled plot types, in canonical shaping order.
pub fn active_modules(plot_types: &[PlotType]) -> Vec<Box<dyn PlotTypeModule>> {
    const ORDER: [PlotType; 6] = [
        PlotType::LeveyJennings,
        PlotType::MovingRange,
        PlotType::CusumMean,
        PlotType::CusumVariable,
        PlotType::TrailingMean,
        PlotType::TrailingCv,
    ];
    ORDER
        .iter()
        .filter(|plot_type| plot_types.contains(*plot_type))
        .map(|plot_type| module_for(*plot_type))
        .collect()
}

fn module_for(plot_type: PlotType) -> Box<dyn PlotTypeModule> {
    match plot_type {
        PlotType::LeveyJennings => Box::new(LeveyJenningsModule),
        PlotType::MovingRange => Box::new(MovingRangeModule),
        PlotType::CusumMean => Box::new(CusumModule { mean: true }),
        PlotType::CusumVariable => Box::new(CusumModule { mean: false }),
        PlotType::TrailingMean => Box::new(TrailingMeanModule),
        PlotType::TrailingCv => Box::new(TrailingCvModule),
    }
}

/// Field-name pair the combined plot's legend binds each fragment entry to.
pub fn combined_legend_series(plot_type: PlotType) -> [&'static str; 2] {
    match plot_type {
        PlotType::MovingRange => ["MR_series1", "MR_series2"],
        PlotType::CusumMean => ["CUSUMmP_series1", "CUSUMmP_series2"],
        PlotType::CusumVariable => ["CUSUMvP_series1", "CUSUMvP_series2"],
        _ => ["value_series1", "value_series2"],
    }
}

/// Y-axis label for a plot type, from the metric's own axis label and the
/// requested value conversion.
pub fn y_scale_label(plot_type: PlotType, y_axis_scale: YAxisScale, label: Option<&str>) -> String {
    match plot_type {
        PlotType::CusumMean | PlotType::CusumVariable => "Sum of Deviations".to_string(),
        PlotType::TrailingCv => "CV (%)".to_string(),
        PlotType::TrailingMean => label.unwrap_or_default().to_string(),
        PlotType::LeveyJennings | PlotType::MovingRange => {
            let base = label.unwrap_or_default();
            match y_axis_scale {
                YAxisScale::PercentDeviation => format!("{base} (Percent of Mean)"),
                YAxisScale::StandardDeviation => format!("{base} (Standard Deviations)"),
                _ => base.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn plot_type_labels_round_trip() {
        assert_eq!(PlotType::LeveyJennings.to_string(), "Levey-Jennings");
        assert_eq!(PlotType::CusumMean.to_string(), "CUSUMm");
        assert_eq!(PlotType::from_str("Moving Range").unwrap(), PlotType::MovingRange);
        assert_eq!(PlotType::from_str("Trailing CV").unwrap(), PlotType::TrailingCv);
        assert!(PlotType::from_str("Shewhart").is_err());
    }

    #[test]
    fn active_modules_follow_canonical_order() {
        let modules = active_modules(&[PlotType::TrailingCv, PlotType::LeveyJennings]);
        let order: Vec<PlotType> = modules.iter().map(|m| m.plot_type()).collect();
        assert_eq!(order, vec![PlotType::LeveyJennings, PlotType::TrailingCv]);
    }

    #[test]
    fn axis_labels() {
        assert_eq!(
            y_scale_label(PlotType::CusumMean, YAxisScale::Linear, Some("Retention Time")),
            "Sum of Deviations"
        );
        assert_eq!(y_scale_label(PlotType::TrailingCv, YAxisScale::Linear, None), "CV (%)");
        assert_eq!(
            y_scale_label(PlotType::LeveyJennings, YAxisScale::Linear, Some("Peak Area")),
            "Peak Area"
        );
        assert_eq!(
            y_scale_label(
                PlotType::LeveyJennings,
                YAxisScale::StandardDeviation,
                Some("Peak Area")
            ),
            "Peak Area (Standard Deviations)"
        );
    }
}
