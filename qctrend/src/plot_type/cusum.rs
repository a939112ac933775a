//! CUSUM control-chart plots, in mean-shift and variability-shift variants.
//!
//! Each variant tracks a positive and a negative accumulator. The negative
//! sum is plotted at or below zero, so CUSUM panels are never compatible
//! with a log scale.

use crate::config::{CUSUM_CONTROL_LIMIT, SeriesType};
use crate::payload::RawMetricRow;
use crate::series::{FragmentSeries, SeriesExtents, ShapedPoint, fold_max, fold_min, valid};

use super::{
    LegendContext, LegendEntry, LegendShape, PlotDomain, PlotEnv, PlotType, PlotTypeModule,
    RowContext,
};

pub struct CusumModule {
    /// Mean-shift (CUSUMm) when true, variability-shift (CUSUMv) when false.
    pub mean: bool,
}

impl PlotTypeModule for CusumModule {
    fn plot_type(&self) -> PlotType {
        if self.mean {
            PlotType::CusumMean
        } else {
            PlotType::CusumVariable
        }
    }

    fn shape_row(
        &self,
        row: &RawMetricRow,
        ctx: &RowContext<'_>,
        env: &PlotEnv,
        point: &mut ShapedPoint,
    ) {
        let (positive, negative) = if self.mean {
            (row.cusum_mp, row.cusum_mn)
        } else {
            (row.cusum_vp, row.cusum_vn)
        };

        if env.series_arity.is_dual() {
            match (self.mean, ctx.series_type) {
                (true, SeriesType::Series1) => {
                    point.cusum_mp_series1 = positive;
                    point.cusum_mn_series1 = negative;
                }
                (true, SeriesType::Series2) => {
                    point.cusum_mp_series2 = positive;
                    point.cusum_mn_series2 = negative;
                }
                (false, SeriesType::Series1) => {
                    point.cusum_vp_series1 = positive;
                    point.cusum_vn_series1 = negative;
                }
                (false, SeriesType::Series2) => {
                    point.cusum_vp_series2 = positive;
                    point.cusum_vn_series2 = negative;
                }
            }
        } else if self.mean {
            point.cusum_mp = positive;
            point.cusum_mn = negative;
        } else {
            point.cusum_vp = positive;
            point.cusum_vn = negative;
        }
    }

    fn accumulate(&self, series: &mut FragmentSeries, point: &ShapedPoint, _env: &PlotEnv) {
        // CUSUM-negative is always at or below zero
        series.show_log_invalid = true;

        let (positive, negative) = if self.mean {
            (point.cusum_mp, point.cusum_mn)
        } else {
            (point.cusum_vp, point.cusum_vn)
        };
        let (Some(positive), Some(negative)) = (valid(positive), valid(negative)) else {
            return;
        };

        let extents = &mut series.extents;
        if self.mean {
            fold_min(&mut extents.min_cusum_mn, negative);
            fold_max(&mut extents.max_cusum_mn, negative);
            fold_min(&mut extents.min_cusum_mp, positive);
            fold_max(&mut extents.max_cusum_mp, positive);
        } else {
            fold_min(&mut extents.min_cusum_vn, negative);
            fold_max(&mut extents.max_cusum_vn, negative);
            fold_min(&mut extents.min_cusum_vp, positive);
            fold_max(&mut extents.max_cusum_vp, positive);
        }
    }

    fn domain(&self, extents: &SeriesExtents, env: &PlotEnv) -> Option<PlotDomain> {
        if env.series_arity.is_dual() {
            return None;
        }
        let (min_p, min_n, max_p, max_n) = if self.mean {
            (
                extents.min_cusum_mp,
                extents.min_cusum_mn,
                extents.max_cusum_mp,
                extents.max_cusum_mn,
            )
        } else {
            (
                extents.min_cusum_vp,
                extents.min_cusum_vn,
                extents.max_cusum_vp,
                extents.max_cusum_vn,
            )
        };
        let lower = (-CUSUM_CONTROL_LIMIT - 1.0)
            .min(min_p.unwrap_or(0.0))
            .min(min_n.unwrap_or(0.0));
        let upper = (CUSUM_CONTROL_LIMIT + 1.0)
            .max(max_p.unwrap_or(0.0))
            .max(max_n.unwrap_or(0.0));
        Some(PlotDomain {
            min: lower,
            max: upper,
        })
    }

    fn fold_combined(&self, combined: &mut SeriesExtents, series: &FragmentSeries) {
        let extents = &series.extents;
        if self.mean {
            if let Some(min) = extents.min_cusum_mn {
                fold_min(&mut combined.min_cusum_mn, min);
            }
            if let Some(max) = extents.max_cusum_mn {
                fold_max(&mut combined.max_cusum_mn, max);
            }
            if let Some(min) = extents.min_cusum_mp {
                fold_min(&mut combined.min_cusum_mp, min);
            }
            if let Some(max) = extents.max_cusum_mp {
                fold_max(&mut combined.max_cusum_mp, max);
            }
        } else {
            if let Some(min) = extents.min_cusum_vn {
                fold_min(&mut combined.min_cusum_vn, min);
            }
            if let Some(max) = extents.max_cusum_vn {
                fold_max(&mut combined.max_cusum_vn, max);
            }
            if let Some(min) = extents.min_cusum_vp {
                fold_min(&mut combined.min_cusum_vp, min);
            }
            if let Some(max) = extents.max_cusum_vp {
                fold_max(&mut combined.max_cusum_vp, max);
            }
        }
    }

    fn legend(&self, _ctx: &LegendContext<'_>) -> Vec<LegendEntry> {
        vec![
            LegendEntry::separator("CUSUM Group"),
            LegendEntry::line("CUSUM-".to_string(), "#000000", LegendShape::DashedLine),
            LegendEntry::line("CUSUM+".to_string(), "#000000", LegendShape::SolidLine),
        ]
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

    fn shaped(positive: f64, negative: f64, mean: bool) -> ShapedPoint {
        let mut point = ShapedPoint::empty(PointKind::Data);
        if mean {
            point.cusum_mp = Some(positive);
            point.cusum_mn = Some(negative);
        } else {
            point.cusum_vp = Some(positive);
            point.cusum_vn = Some(negative);
        }
        point
    }

    #[test]
    fn always_log_invalid() {
        let module = CusumModule { mean: true };
        let mut series = FragmentSeries::new("PEPTIDEA", DataType::Peptide, None, None);
        module.accumulate(&mut series, &ShapedPoint::empty(PointKind::Data), &env());
        assert!(series.show_log_invalid);
    }

    #[test]
    fn domain_padded_past_control_limit() {
        let module = CusumModule { mean: true };
        let mut series = FragmentSeries::new("PEPTIDEA", DataType::Peptide, None, None);
        module.accumulate(&mut series, &shaped(2.0, -1.5, true), &env());

        let domain = module.domain(&series.extents, &env()).unwrap();
        assert_relative_eq!(domain.min, -CUSUM_CONTROL_LIMIT - 1.0);
        assert_relative_eq!(domain.max, CUSUM_CONTROL_LIMIT + 1.0);
    }

    #[test]
    fn observed_sums_extend_the_domain() {
        let module = CusumModule { mean: false };
        let mut series = FragmentSeries::new("PEPTIDEA", DataType::Peptide, None, None);
        module.accumulate(&mut series, &shaped(9.5, -8.0, false), &env());

        let domain = module.domain(&series.extents, &env()).unwrap();
        assert_relative_eq!(domain.min, -8.0);
        assert_relative_eq!(domain.max, 9.5);
    }

    #[test]
    fn skips_extents_unless_both_sums_valid() {
        let module = CusumModule { mean: true };
        let mut series = FragmentSeries::new("PEPTIDEA", DataType::Peptide, None, None);
        let mut point = ShapedPoint::empty(PointKind::Data);
        point.cusum_mp = Some(1.0); // negative missing
        module.accumulate(&mut series, &point, &env());
        assert!(series.extents.max_cusum_mp.is_none());
    }

    #[test]
    fn variants_fill_their_own_fields() {
        let mean_module = CusumModule { mean: true };
        let var_module = CusumModule { mean: false };
        let guide_sets = crate::guide_set::GuideSetIndex::default();
        let metric = crate::payload::MetricProps::default();
        let ctx = RowContext {
            fragment: "PEPTIDEA",
            series_type: crate::config::SeriesType::Series1,
            guide_set_id: None,
            guide_sets: &guide_sets,
            metric: &metric,
        };
        let row = RawMetricRow {
            cusum_mp: Some(1.0),
            cusum_mn: Some(-1.0),
            cusum_vp: Some(2.0),
            cusum_vn: Some(-2.0),
            ..Default::default()
        };

        let mut point = ShapedPoint::empty(PointKind::Data);
        mean_module.shape_row(&row, &ctx, &env(), &mut point);
        var_module.shape_row(&row, &ctx, &env(), &mut point);
        assert_eq!(point.cusum_mp, Some(1.0));
        assert_eq!(point.cusum_vn, Some(-2.0));
        assert!(point.cusum_mp_series1.is_none());
    }
}
