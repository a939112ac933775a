//! Moving-range dispersion plot.
//!
//! Plots the absolute difference between successive observations. The upper
//! control limit is the guide-set mean moving range scaled by the D4 weight;
//! the lower limit is fixed at zero.

use crate::config::{
    MOVING_RANGE_LOWER_LIMIT, MOVING_RANGE_UPPER_LIMIT_WEIGHT, SeriesType, YAxisScale,
};
use crate::payload::RawMetricRow;
use crate::series::{FragmentSeries, SeriesExtents, ShapedPoint, fold_max, fold_min, valid};

use super::{
    LegendContext, LegendEntry, LegendShape, PlotDomain, PlotEnv, PlotType, PlotTypeModule,
    RowContext,
};

pub struct MovingRangeModule;

impl PlotTypeModule for MovingRangeModule {
    fn plot_type(&self) -> PlotType {
        PlotType::MovingRange
    }

    fn shape_row(
        &self,
        row: &RawMetricRow,
        ctx: &RowContext<'_>,
        env: &PlotEnv,
        point: &mut ShapedPoint,
    ) {
        if let Some(stats) = ctx.guide_set_stats() {
            point.mean_mr = stats.mean_mr;
            point.stddev_mr = stats.std_dev_mr;
        }

        if env.series_arity.is_dual() {
            match ctx.series_type {
                SeriesType::Series1 => point.mr_series1 = row.mr,
                SeriesType::Series2 => point.mr_series2 = row.mr,
            }
        } else {
            point.mr = row.mr;
        }

        let base = if row.ignore_in_qc { "Exclude" } else { "Include" };
        let outlier = if row.mr_outlier { "-Outlier" } else { "" };
        point.mr_shape = Some(format!("{base}{outlier}"));
    }

    fn accumulate(&self, series: &mut FragmentSeries, point: &ShapedPoint, env: &PlotEnv) {
        if let Some(val) = valid(point.mr) {
            fold_min(&mut series.extents.min_mr, val);
            fold_max(&mut series.extents.max_mr, val);

            if env.y_axis_scale.is_log() && val <= 0.0 {
                series.show_log_epsilon_warning = true;
            }

            // The mean moving range is left out of the max on the combined
            // plot, mirroring the Levey-Jennings band exclusion.
            if !env.single_plot {
                if let Some(mean) = valid(point.mean_mr) {
                    fold_max(&mut series.extents.max_mr_mean, mean);
                }
            }
        } else if env.series_arity.is_dual()
            && !series.show_log_invalid
            && env.y_axis_scale.is_log()
        {
            let invalid = |v: Option<f64>| valid(v).is_some_and(|v| v <= 0.0);
            if invalid(point.mr_series1) || invalid(point.mr_series2) {
                series.show_log_invalid = true;
            }
        }
    }

    fn domain(&self, extents: &SeriesExtents, env: &PlotEnv) -> Option<PlotDomain> {
        if env.series_arity.is_dual() {
            return None;
        }
        if extents.min_mr.is_none() && extents.max_mr.is_none() {
            return None;
        }
        let lower = MOVING_RANGE_LOWER_LIMIT.min(extents.min_mr.unwrap_or(0.0));
        let upper = (extents.max_mr_mean.unwrap_or(0.0) * MOVING_RANGE_UPPER_LIMIT_WEIGHT)
            .max(extents.max_mr.unwrap_or(0.0));
        Some(PlotDomain {
            min: lower,
            max: upper,
        })
    }

    fn fold_combined(&self, combined: &mut SeriesExtents, series: &FragmentSeries) {
        if let Some(min) = series.extents.min_mr {
            fold_min(&mut combined.min_mr, min);
        }
        if let Some(max) = series.extents.max_mr {
            fold_max(&mut combined.max_mr, max);
        }
    }

    fn legend(&self, ctx: &LegendContext<'_>) -> Vec<LegendEntry> {
        // Limits are not drawn for standard-deviation conversion, the
        // combined overlay, or dual-series metrics.
        if ctx.env.y_axis_scale == YAxisScale::StandardDeviation
            || ctx.env.single_plot
            || ctx.metric.series2_label.is_some()
        {
            return Vec::new();
        }
        vec![
            LegendEntry::separator("Moving Range"),
            LegendEntry::line("Upper/Lower Limit".to_string(), "red", LegendShape::LimitLine),
        ]
    }
}
