//! Trailing coefficient-of-variation plot.
//!
//! The y-axis domain is anchored to the conventional 20% acceptable-CV band:
//! when everything observed sits under 20 the range is exactly [0, 20];
//! larger values round the ceiling up to the next multiple of ten.

use crate::config::SeriesType;
use crate::payload::RawMetricRow;
use crate::series::{FragmentSeries, SeriesExtents, ShapedPoint, fold_max, fold_min, valid};

use super::{
    LegendContext, LegendEntry, PlotDomain, PlotEnv, PlotType, PlotTypeModule, RowContext,
};

/// Conventional acceptable-CV ceiling, in percent.
const ACCEPTABLE_CV: f64 = 20.0;

pub struct TrailingCvModule;

impl PlotTypeModule for TrailingCvModule {
    fn plot_type(&self) -> PlotType {
        PlotType::TrailingCv
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
                SeriesType::Series1 => point.trailing_cv_series1 = row.trailing_cv,
                SeriesType::Series2 => point.trailing_cv_series2 = row.trailing_cv,
            }
        } else {
            point.trailing_cv = row.trailing_cv;
        }
    }

    fn accumulate(&self, series: &mut FragmentSeries, point: &ShapedPoint, env: &PlotEnv) {
        if let Some(val) = valid(point.trailing_cv) {
            fold_min(&mut series.extents.trailing_cv_min, val);
            fold_max(&mut series.extents.trailing_cv_max, val);

            if env.y_axis_scale.is_log() && val <= 0.0 {
                series.show_log_invalid = true;
            }
        } else if env.series_arity.is_dual()
            && !series.show_log_invalid
            && env.y_axis_scale.is_log()
        {
            let invalid = |v: Option<f64>| valid(v).is_some_and(|v| v <= 0.0);
            if invalid(point.trailing_cv_series1) || invalid(point.trailing_cv_series2) {
                series.show_log_invalid = true;
            }
        }
    }

    fn domain(&self, extents: &SeriesExtents, env: &PlotEnv) -> Option<PlotDomain> {
        if env.series_arity.is_dual() {
            return None;
        }
        let min = extents.trailing_cv_min?;
        let max = extents.trailing_cv_max?;
        if min < ACCEPTABLE_CV && max < ACCEPTABLE_CV {
            return Some(PlotDomain {
                min: 0.0,
                max: ACCEPTABLE_CV,
            });
        }
        Some(PlotDomain {
            min: 0.0,
            max: (max / 10.0).ceil() * 10.0,
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

    fn accumulated(values: &[f64]) -> FragmentSeries {
        let module = TrailingCvModule;
        let mut series = FragmentSeries::new("PEPTIDEA", DataType::Peptide, None, None);
        for &val in values {
            let mut point = ShapedPoint::empty(PointKind::Data);
            point.trailing_cv = Some(val);
            module.accumulate(&mut series, &point, &env());
        }
        series
    }

    #[test]
    fn everything_under_twenty_clamps_to_the_band() {
        let series = accumulated(&[4.0, 11.2, 17.9]);
        let domain = TrailingCvModule.domain(&series.extents, &env()).unwrap();
        assert_relative_eq!(domain.min, 0.0);
        assert_relative_eq!(domain.max, 20.0);
    }

    #[test]
    fn larger_values_round_ceiling_to_next_ten() {
        let series = accumulated(&[12.0, 47.0]);
        let domain = TrailingCvModule.domain(&series.extents, &env()).unwrap();
        assert_relative_eq!(domain.min, 0.0);
        assert_relative_eq!(domain.max, 50.0);
    }

    #[test]
    fn max_just_over_twenty() {
        let series = accumulated(&[21.0, 22.0]);
        let domain = TrailingCvModule.domain(&series.extents, &env()).unwrap();
        assert_relative_eq!(domain.min, 0.0);
        assert_relative_eq!(domain.max, 30.0);
    }
}
