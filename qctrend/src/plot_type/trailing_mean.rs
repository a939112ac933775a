//! Trailing mean plot: moving average of the previous N runs.

use crate::config::SeriesType;
use crate::payload::RawMetricRow;
use crate::series::{FragmentSeries, SeriesExtents, ShapedPoint, fold_max, fold_min, valid};

use super::{
    LegendContext, LegendEntry, PlotDomain, PlotEnv, PlotType, PlotTypeModule, RowContext,
};

pub struct TrailingMeanModule;

impl PlotTypeModule for TrailingMeanModule {
    fn plot_type(&self) -> PlotType {
        PlotType::TrailingMean
    }

    fn shape_row(
        &self,
        row: &RawMetricRow,
        ctx: &RowContext<'_>,
        env: &PlotEnv,
        point: &mut ShapedPoint,
    ) {
        if env.series_arity.is_dual() {
            match ctx.series_type {
                SeriesType::Series1 => point.trailing_mean_series1 = row.trailing_mean,
                SeriesType::Series2 => point.trailing_mean_series2 = row.trailing_mean,
            }
        } else {
            point.trailing_mean = row.trailing_mean;
        }
    }

    fn accumulate(&self, series: &mut FragmentSeries, point: &ShapedPoint, env: &PlotEnv) {
        if let Some(val) = valid(point.trailing_mean) {
            fold_min(&mut series.extents.min_trailing_mean, val);
            fold_max(&mut series.extents.max_trailing_mean, val);

            if env.y_axis_scale.is_log() && val <= 0.0 {
                series.show_log_invalid = true;
            }
        } else if env.series_arity.is_dual()
            && !series.show_log_invalid
            && env.y_axis_scale.is_log()
        {
            let invalid = |v: Option<f64>| valid(v).is_some_and(|v| v <= 0.0);
            if invalid(point.trailing_mean_series1) || invalid(point.trailing_mean_series2) {
                series.show_log_invalid = true;
            }
        }
    }

    fn domain(&self, extents: &SeriesExtents, env: &PlotEnv) -> Option<PlotDomain> {
        if env.series_arity.is_dual() {
            return None;
        }
        Some(PlotDomain {
            min: extents.min_trailing_mean?,
            max: extents.max_trailing_mean?,
        })
    }

    fn fold_combined(&self, _combined: &mut SeriesExtents, _series: &FragmentSeries) {
        // trailing statistics do not participate in the combined overlay fold
    }

    fn legend(&self, _ctx: &LegendContext<'_>) -> Vec<LegendEntry> {
        vec![LegendEntry::empty()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SeriesArity, YAxisScale};
    use crate::payload::DataType;
    use crate::series::PointKind;
    use approx::assert_relative_eq;

    fn env() -> PlotEnv {
        PlotEnv {
            y_axis_scale: YAxisScale::Linear,
            single_plot: false,
            series_arity: SeriesArity::Single,
        }
    }

    #[test]
    fn domain_is_observed_range() {
        let module = TrailingMeanModule;
        let mut series = FragmentSeries::new("PEPTIDEA", DataType::Peptide, None, None);
        for val in [4.0, 4.6, 3.8] {
            let mut point = ShapedPoint::empty(PointKind::Data);
            point.trailing_mean = Some(val);
            module.accumulate(&mut series, &point, &env());
        }
        let domain = module.domain(&series.extents, &env()).unwrap();
        assert_relative_eq!(domain.min, 3.8);
        assert_relative_eq!(domain.max, 4.6);
    }

    #[test]
    fn missing_values_do_not_fold() {
        let module = TrailingMeanModule;
        let mut series = FragmentSeries::new("PEPTIDEA", DataType::Peptide, None, None);
        module.accumulate(&mut series, &ShapedPoint::empty(PointKind::Data), &env());
        assert!(series.extents.min_trailing_mean.is_none());
        assert!(module.domain(&series.extents, &env()).is_none());
    }
}
