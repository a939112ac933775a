//! Levey-Jennings metric-value plot.
//!
//! Raw values are compared against the guide set's mean ± k·stddev band. The
//! band statistics ride on each point rather than the plot, so different
//! reference periods along the x-axis draw different bands.

use crate::config::YAxisScale;
use crate::payload::{MetricStatus, RawMetricRow};
use crate::series::{FragmentSeries, SeriesExtents, ShapedPoint, fold_max, fold_min, valid};

use super::{
    LegendContext, LegendEntry, LegendShape, PlotDomain, PlotEnv, PlotType, PlotTypeModule,
    RowContext,
};

pub struct LeveyJenningsModule;

impl PlotTypeModule for LeveyJenningsModule {
    fn plot_type(&self) -> PlotType {
        PlotType::LeveyJennings
    }

    fn shape_row(
        &self,
        row: &RawMetricRow,
        ctx: &RowContext<'_>,
        env: &PlotEnv,
        point: &mut ShapedPoint,
    ) {
        if let Some(stats) = ctx.guide_set_stats() {
            point.mean = stats.mean;
            point.std_dev = stats.std_dev;
        }

        if env.series_arity.is_dual() {
            match ctx.series_type {
                crate::config::SeriesType::Series1 => point.value_series1 = row.value,
                crate::config::SeriesType::Series2 => point.value_series2 = row.value,
            }
        } else {
            point.value = row.value;
        }

        let base = if row.ignore_in_qc { "Exclude" } else { "Include" };
        let outlier = if row.value_outlier { "-Outlier" } else { "" };
        point.lj_shape = Some(format!("{base}{outlier}"));
    }

    fn accumulate(&self, series: &mut FragmentSeries, point: &ShapedPoint, env: &PlotEnv) {
        if let Some(val) = valid(point.value) {
            fold_min(&mut series.extents.min, val);
            fold_max(&mut series.extents.max, val);

            if env.y_axis_scale.is_log() && val <= 0.0 {
                series.show_log_invalid = true;
            }

            // The ±3·stddev band is left out of the extents on the combined
            // plot so reference bands do not dominate the shared scale.
            if !env.single_plot {
                if let Some(mean) = valid(point.mean) {
                    let sd = valid(point.std_dev).unwrap_or(0.0);
                    let mut min_sd = mean - 3.0 * sd;
                    if !series.show_log_invalid && env.y_axis_scale.is_log() && min_sd <= 0.0 {
                        // Relax the multiplier until the lower band edge is
                        // positive rather than pushing a log scale below zero.
                        series.show_log_warning = true;
                        for multiplier in (0..=2).rev() {
                            min_sd = mean - multiplier as f64 * sd;
                            if min_sd > 0.0 {
                                break;
                            }
                        }
                    }
                    fold_min(&mut series.extents.min, min_sd);
                    fold_max(&mut series.extents.max, mean + 3.0 * sd);
                }
            }
        } else if env.series_arity.is_dual()
            && !series.show_log_invalid
            && env.y_axis_scale.is_log()
        {
            let invalid = |v: Option<f64>| valid(v).is_some_and(|v| v <= 0.0);
            if invalid(point.value_series1) || invalid(point.value_series2) {
                series.show_log_invalid = true;
            }
        }
    }

    fn domain(&self, extents: &SeriesExtents, env: &PlotEnv) -> Option<PlotDomain> {
        if env.series_arity.is_dual() {
            return None;
        }
        Some(PlotDomain {
            min: extents.min?,
            max: extents.max?,
        })
    }

    fn fold_combined(&self, combined: &mut SeriesExtents, series: &FragmentSeries) {
        if let Some(min) = series.extents.min {
            fold_min(&mut combined.min, min);
        }
        if let Some(max) = series.extents.max {
            fold_max(&mut combined.max, max);
        }
    }

    fn legend(&self, ctx: &LegendContext<'_>) -> Vec<LegendEntry> {
        let mut entries = Vec::new();
        if ctx.metric.series2_label.is_none() {
            let status = ctx.metric.metric_status;
            if matches!(
                status,
                MetricStatus::ValueCutoff | MetricStatus::MeanDeviationCutoff
            ) {
                if let Some(upper) = ctx.metric.upper_bound.filter(|bound| bound.is_finite()) {
                    entries.push(LegendEntry::line(
                        format!("Upper: {upper}"),
                        "red",
                        LegendShape::StdDevLine,
                    ));
                }
                if let Some(lower) = ctx.metric.lower_bound.filter(|bound| bound.is_finite()) {
                    entries.push(LegendEntry::line(
                        format!("Lower: {lower}"),
                        "red",
                        LegendShape::StdDevLine,
                    ));
                }
            }

            if matches!(status, MetricStatus::LeveyJennings | MetricStatus::PlotOnly)
                && !ctx.env.single_plot
                && ctx.env.y_axis_scale == YAxisScale::StandardDeviation
            {
                let upper = ctx.metric.upper_bound.filter(|b| b.is_finite()).unwrap_or(3.0);
                let lower = ctx.metric.lower_bound.filter(|b| b.is_finite()).unwrap_or(-3.0);
                let text = if lower == -upper {
                    format!("+/- {upper} Std Dev")
                } else {
                    format!(
                        "{}{upper}/{}{lower} Std Dev",
                        if upper > 0.0 { "+" } else { "" },
                        if lower > 0.0 { "+" } else { "" }
                    )
                };
                entries.push(LegendEntry::line(text, "red", LegendShape::StdDevLine));
            }

            if !ctx.env.single_plot {
                entries.push(LegendEntry::line(
                    "Mean".to_string(),
                    "darkgrey",
                    LegendShape::MeanLine,
                ));
            }
        }

        if !entries.is_empty() {
            entries.insert(0, LegendEntry::separator(""));
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SeriesArity, SeriesType};
    use crate::guide_set::GuideSetIndex;
    use crate::payload::{DataType, MetricProps};
    use crate::series::PointKind;
    use approx::assert_relative_eq;

    fn env(scale: YAxisScale, single_plot: bool) -> PlotEnv {
        PlotEnv {
            y_axis_scale: scale,
            single_plot,
            series_arity: SeriesArity::Single,
        }
    }

    fn shaped(value: f64, mean: Option<f64>, std_dev: Option<f64>) -> ShapedPoint {
        let mut point = ShapedPoint::empty(PointKind::Data);
        point.value = Some(value);
        point.mean = mean;
        point.std_dev = std_dev;
        point
    }

    fn series() -> FragmentSeries {
        FragmentSeries::new("PEPTIDEA", DataType::Peptide, None, None)
    }

    #[test]
    fn shape_classification() {
        let module = LeveyJenningsModule;
        let guide_sets = GuideSetIndex::default();
        let metric = MetricProps::default();
        let ctx = RowContext {
            fragment: "PEPTIDEA",
            series_type: SeriesType::Series1,
            guide_set_id: None,
            guide_sets: &guide_sets,
            metric: &metric,
        };
        let env = env(YAxisScale::Linear, false);

        let mut point = ShapedPoint::empty(PointKind::Data);
        let row = RawMetricRow {
            value: Some(4.0),
            ignore_in_qc: true,
            value_outlier: true,
            ..Default::default()
        };
        module.shape_row(&row, &ctx, &env, &mut point);
        assert_eq!(point.lj_shape.as_deref(), Some("Exclude-Outlier"));

        let mut point = ShapedPoint::empty(PointKind::Data);
        let row = RawMetricRow {
            value: Some(4.0),
            ..Default::default()
        };
        module.shape_row(&row, &ctx, &env, &mut point);
        assert_eq!(point.lj_shape.as_deref(), Some("Include"));
    }

    #[test]
    fn band_widens_extents_on_individual_plots() {
        let module = LeveyJenningsModule;
        let mut s = series();
        module.accumulate(&mut s, &shaped(10.0, Some(10.0), Some(1.0)), &env(YAxisScale::Linear, false));
        assert_relative_eq!(s.extents.min.unwrap(), 7.0);
        assert_relative_eq!(s.extents.max.unwrap(), 13.0);
    }

    #[test]
    fn band_excluded_from_combined_plot_extents() {
        let module = LeveyJenningsModule;
        let mut s = series();
        module.accumulate(&mut s, &shaped(10.0, Some(10.0), Some(1.0)), &env(YAxisScale::Linear, true));
        assert_relative_eq!(s.extents.min.unwrap(), 10.0);
        assert_relative_eq!(s.extents.max.unwrap(), 10.0);
    }

    #[test]
    fn log_scale_relaxes_band_multiplier() {
        let module = LeveyJenningsModule;
        let mut s = series();
        // mean - 3sd and mean - 2sd are negative, mean - 1sd is positive
        module.accumulate(&mut s, &shaped(5.0, Some(5.0), Some(3.0)), &env(YAxisScale::Log, false));
        assert!(s.show_log_warning);
        assert!(!s.show_log_invalid);
        assert_relative_eq!(s.extents.min.unwrap(), 2.0);
        assert_relative_eq!(s.extents.max.unwrap(), 14.0);
    }

    #[test]
    fn nonpositive_value_on_log_scale_flags_invalid() {
        let module = LeveyJenningsModule;
        let mut s = series();
        module.accumulate(&mut s, &shaped(0.0, None, None), &env(YAxisScale::Log, false));
        assert!(s.show_log_invalid);
        assert!(!s.show_log_warning);
    }

    #[test]
    fn dual_series_log_check_without_plain_value() {
        let module = LeveyJenningsModule;
        let mut s = series();
        let mut point = ShapedPoint::empty(PointKind::Data);
        point.value_series2 = Some(-1.0);
        let env = PlotEnv {
            y_axis_scale: YAxisScale::Log,
            single_plot: false,
            series_arity: SeriesArity::Dual,
        };
        module.accumulate(&mut s, &point, &env);
        assert!(s.show_log_invalid);
    }

    #[test]
    fn domain_is_single_series_only() {
        let module = LeveyJenningsModule;
        let mut extents = SeriesExtents::default();
        extents.min = Some(1.0);
        extents.max = Some(2.0);
        assert!(module.domain(&extents, &env(YAxisScale::Linear, false)).is_some());

        let dual = PlotEnv {
            y_axis_scale: YAxisScale::Linear,
            single_plot: false,
            series_arity: SeriesArity::Dual,
        };
        assert!(module.domain(&extents, &dual).is_none());
    }

    #[test]
    fn mean_legend_entry_on_individual_plots() {
        let module = LeveyJenningsModule;
        let metric = MetricProps::default();
        let ctx = LegendContext {
            metric: &metric,
            env: env(YAxisScale::Linear, false),
        };
        let legend = module.legend(&ctx);
        assert!(legend[0].separator);
        assert!(legend.iter().any(|entry| entry.text == "Mean"));
    }
}
