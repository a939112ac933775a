//! Plot-ready points and per-fragment series state.
//!
//! A [`ShapedPoint`] is the unit the renderer consumes: raw observation
//! fields renamed to the stable per-plot-type keys, sample-file attributes
//! flattened in, and the three x-axis keys attached. A [`FragmentSeries`]
//! owns the ordered points for one analyte plus the running min/max extents
//! each enabled plot type maintains while rows stream through.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::config::SeriesType;
use crate::dates::optional_datetime;
use crate::payload::DataType;

/// Real observation or a gap-fill placeholder inserted so every fragment
/// renders against the common x-axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PointKind {
    #[serde(rename = "data")]
    Data,
    #[serde(rename = "missing")]
    Missing,
}

/// Marker separating reference-range training points from in-range points
/// when the reference guide-set window is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReferenceRangeSeries {
    GuideSet,
    InRange,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShapedPoint {
    #[serde(rename = "type")]
    pub kind: PointKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mz: Option<String>,

    // x-axis keys
    #[serde(rename = "fullDate", skip_serializing_if = "Option::is_none")]
    pub full_date: Option<String>,
    #[serde(rename = "date", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "groupedXTick", skip_serializing_if = "Option::is_none")]
    pub grouped_x_tick: Option<String>,

    // joined sample-file attributes, kept for click handlers and hover text
    #[serde(rename = "SampleFileId", skip_serializing_if = "Option::is_none")]
    pub sample_file_id: Option<i64>,
    #[serde(rename = "ReplicateId", skip_serializing_if = "Option::is_none")]
    pub replicate_id: Option<i64>,
    #[serde(rename = "ReplicateName", skip_serializing_if = "Option::is_none")]
    pub replicate_name: Option<String>,
    #[serde(rename = "PrecursorId", skip_serializing_if = "Option::is_none")]
    pub precursor_id: Option<i64>,
    #[serde(rename = "PrecursorChromInfoId", skip_serializing_if = "Option::is_none")]
    pub precursor_chrom_info_id: Option<i64>,
    #[serde(rename = "FilePath", skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(rename = "IgnoreInQC")]
    pub ignore_in_qc: bool,
    #[serde(rename = "dataType", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    #[serde(rename = "SeriesType", skip_serializing_if = "Option::is_none")]
    pub series_type: Option<SeriesType>,

    // guide-set membership
    #[serde(rename = "guideSetId", skip_serializing_if = "Option::is_none")]
    pub guide_set_id: Option<i64>,
    #[serde(
        rename = "inGuideSetTrainingRange",
        skip_serializing_if = "Option::is_none"
    )]
    pub in_guide_set_training_range: Option<bool>,
    /// Hover-only counter of consecutive runs since the last entry into a
    /// training window.
    #[serde(rename = "TrainingSeqIdx", skip_serializing_if = "Option::is_none")]
    pub training_seq_idx: Option<u32>,
    #[serde(
        rename = "ReferenceRangeSeries",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_range_series: Option<ReferenceRangeSeries>,

    // Levey-Jennings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(rename = "value_series1", skip_serializing_if = "Option::is_none")]
    pub value_series1: Option<f64>,
    #[serde(rename = "value_series2", skip_serializing_if = "Option::is_none")]
    pub value_series2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(rename = "stdDev", skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
    #[serde(rename = "LJShape", skip_serializing_if = "Option::is_none")]
    pub lj_shape: Option<String>,

    // moving range
    #[serde(rename = "MR", skip_serializing_if = "Option::is_none")]
    pub mr: Option<f64>,
    #[serde(rename = "MR_series1", skip_serializing_if = "Option::is_none")]
    pub mr_series1: Option<f64>,
    #[serde(rename = "MR_series2", skip_serializing_if = "Option::is_none")]
    pub mr_series2: Option<f64>,
    #[serde(rename = "meanMR", skip_serializing_if = "Option::is_none")]
    pub mean_mr: Option<f64>,
    #[serde(rename = "stddevMR", skip_serializing_if = "Option::is_none")]
    pub stddev_mr: Option<f64>,
    #[serde(rename = "MRShape", skip_serializing_if = "Option::is_none")]
    pub mr_shape: Option<String>,

    // CUSUM mean-shift
    #[serde(rename = "CUSUMmP", skip_serializing_if = "Option::is_none")]
    pub cusum_mp: Option<f64>,
    #[serde(rename = "CUSUMmN", skip_serializing_if = "Option::is_none")]
    pub cusum_mn: Option<f64>,
    #[serde(rename = "CUSUMmP_series1", skip_serializing_if = "Option::is_none")]
    pub cusum_mp_series1: Option<f64>,
    #[serde(rename = "CUSUMmP_series2", skip_serializing_if = "Option::is_none")]
    pub cusum_mp_series2: Option<f64>,
    #[serde(rename = "CUSUMmN_series1", skip_serializing_if = "Option::is_none")]
    pub cusum_mn_series1: Option<f64>,
    #[serde(rename = "CUSUMmN_series2", skip_serializing_if = "Option::is_none")]
    pub cusum_mn_series2: Option<f64>,

    // CUSUM variability-shift
    #[serde(rename = "CUSUMvP", skip_serializing_if = "Option::is_none")]
    pub cusum_vp: Option<f64>,
    #[serde(rename = "CUSUMvN", skip_serializing_if = "Option::is_none")]
    pub cusum_vn: Option<f64>,
    #[serde(rename = "CUSUMvP_series1", skip_serializing_if = "Option::is_none")]
    pub cusum_vp_series1: Option<f64>,
    #[serde(rename = "CUSUMvP_series2", skip_serializing_if = "Option::is_none")]
    pub cusum_vp_series2: Option<f64>,
    #[serde(rename = "CUSUMvN_series1", skip_serializing_if = "Option::is_none")]
    pub cusum_vn_series1: Option<f64>,
    #[serde(rename = "CUSUMvN_series2", skip_serializing_if = "Option::is_none")]
    pub cusum_vn_series2: Option<f64>,

    // trailing window statistics
    #[serde(rename = "TrailingMean", skip_serializing_if = "Option::is_none")]
    pub trailing_mean: Option<f64>,
    #[serde(
        rename = "TrailingMean_series1",
        skip_serializing_if = "Option::is_none"
    )]
    pub trailing_mean_series1: Option<f64>,
    #[serde(
        rename = "TrailingMean_series2",
        skip_serializing_if = "Option::is_none"
    )]
    pub trailing_mean_series2: Option<f64>,
    #[serde(rename = "TrailingCV", skip_serializing_if = "Option::is_none")]
    pub trailing_cv: Option<f64>,
    #[serde(rename = "TrailingCV_series1", skip_serializing_if = "Option::is_none")]
    pub trailing_cv_series1: Option<f64>,
    #[serde(rename = "TrailingCV_series2", skip_serializing_if = "Option::is_none")]
    pub trailing_cv_series2: Option<f64>,
    #[serde(
        rename = "TrailingStartDate",
        with = "optional_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub trailing_start_date: Option<NaiveDateTime>,
    #[serde(
        rename = "TrailingEndDate",
        with = "optional_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub trailing_end_date: Option<NaiveDateTime>,
}

impl ShapedPoint {
    pub fn empty(kind: PointKind) -> Self {
        ShapedPoint {
            kind,
            fragment: None,
            mz: None,
            full_date: None,
            date: None,
            grouped_x_tick: None,
            sample_file_id: None,
            replicate_id: None,
            replicate_name: None,
            precursor_id: None,
            precursor_chrom_info_id: None,
            file_path: None,
            ignore_in_qc: false,
            data_type: None,
            series_type: None,
            guide_set_id: None,
            in_guide_set_training_range: None,
            training_seq_idx: None,
            reference_range_series: None,
            value: None,
            value_series1: None,
            value_series2: None,
            mean: None,
            std_dev: None,
            lj_shape: None,
            mr: None,
            mr_series1: None,
            mr_series2: None,
            mean_mr: None,
            stddev_mr: None,
            mr_shape: None,
            cusum_mp: None,
            cusum_mn: None,
            cusum_mp_series1: None,
            cusum_mp_series2: None,
            cusum_mn_series1: None,
            cusum_mn_series2: None,
            cusum_vp: None,
            cusum_vn: None,
            cusum_vp_series1: None,
            cusum_vp_series2: None,
            cusum_vn_series1: None,
            cusum_vn_series2: None,
            trailing_mean: None,
            trailing_mean_series1: None,
            trailing_mean_series2: None,
            trailing_cv: None,
            trailing_cv_series1: None,
            trailing_cv_series2: None,
            trailing_start_date: None,
            trailing_end_date: None,
        }
    }

    /// Gap-fill placeholder carrying only the x-axis keys.
    pub fn missing(full_date: String, date: String, grouped_x_tick: String) -> Self {
        let mut point = ShapedPoint::empty(PointKind::Missing);
        point.full_date = Some(full_date);
        point.date = Some(date);
        point.grouped_x_tick = Some(grouped_x_tick);
        point
    }

    pub fn is_missing(&self) -> bool {
        self.kind == PointKind::Missing
    }
}

/// Running min/max per plot type. Slots stay `None` until the first valid
/// observation folds in.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SeriesExtents {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(rename = "minMR", skip_serializing_if = "Option::is_none")]
    pub min_mr: Option<f64>,
    #[serde(rename = "maxMR", skip_serializing_if = "Option::is_none")]
    pub max_mr: Option<f64>,
    #[serde(rename = "maxMRMean", skip_serializing_if = "Option::is_none")]
    pub max_mr_mean: Option<f64>,
    #[serde(rename = "minCUSUMmP", skip_serializing_if = "Option::is_none")]
    pub min_cusum_mp: Option<f64>,
    #[serde(rename = "maxCUSUMmP", skip_serializing_if = "Option::is_none")]
    pub max_cusum_mp: Option<f64>,
    #[serde(rename = "minCUSUMmN", skip_serializing_if = "Option::is_none")]
    pub min_cusum_mn: Option<f64>,
    #[serde(rename = "maxCUSUMmN", skip_serializing_if = "Option::is_none")]
    pub max_cusum_mn: Option<f64>,
    #[serde(rename = "minCUSUMvP", skip_serializing_if = "Option::is_none")]
    pub min_cusum_vp: Option<f64>,
    #[serde(rename = "maxCUSUMvP", skip_serializing_if = "Option::is_none")]
    pub max_cusum_vp: Option<f64>,
    #[serde(rename = "minCUSUMvN", skip_serializing_if = "Option::is_none")]
    pub min_cusum_vn: Option<f64>,
    #[serde(rename = "maxCUSUMvN", skip_serializing_if = "Option::is_none")]
    pub max_cusum_vn: Option<f64>,
    #[serde(rename = "minTrailingMean", skip_serializing_if = "Option::is_none")]
    pub min_trailing_mean: Option<f64>,
    #[serde(rename = "maxTrailingMean", skip_serializing_if = "Option::is_none")]
    pub max_trailing_mean: Option<f64>,
    #[serde(rename = "TrailingCVMin", skip_serializing_if = "Option::is_none")]
    pub trailing_cv_min: Option<f64>,
    #[serde(rename = "TrailingCVMax", skip_serializing_if = "Option::is_none")]
    pub trailing_cv_max: Option<f64>,
}

/// Fold a candidate into a running minimum slot.
pub fn fold_min(slot: &mut Option<f64>, candidate: f64) {
    if slot.is_none() || candidate < slot.unwrap_or(f64::INFINITY) {
        *slot = Some(candidate);
    }
}

/// Fold a candidate into a running maximum slot.
pub fn fold_max(slot: &mut Option<f64>, candidate: f64) {
    if slot.is_none() || candidate > slot.unwrap_or(f64::NEG_INFINITY) {
        *slot = Some(candidate);
    }
}

/// Validity predicate shared by every accumulator: present and not NaN.
pub fn valid(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

/// All points and running state for one analyte.
#[derive(Debug, Clone, Serialize)]
pub struct FragmentSeries {
    pub fragment: String,
    #[serde(rename = "dataType")]
    pub data_type: DataType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mz: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "precursorScoped")]
    pub precursor_scoped: bool,
    pub data: Vec<ShapedPoint>,
    #[serde(flatten)]
    pub extents: SeriesExtents,
    #[serde(rename = "showLogInvalid")]
    pub show_log_invalid: bool,
    #[serde(rename = "showLogWarning")]
    pub show_log_warning: bool,
    #[serde(rename = "showLogEpsilonWarning")]
    pub show_log_epsilon_warning: bool,
}

impl FragmentSeries {
    pub fn new(fragment: &str, data_type: DataType, mz: Option<f64>, color: Option<String>) -> Self {
        FragmentSeries {
            fragment: fragment.to_string(),
            data_type,
            mz: mz.map(|mz| format!("{mz:.4}")),
            color,
            precursor_scoped: false,
            data: Vec::new(),
            extents: SeriesExtents::default(),
            show_log_invalid: false,
            show_log_warning: false,
            show_log_epsilon_warning: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_helpers_track_extremes() {
        let mut slot = None;
        fold_min(&mut slot, 5.0);
        fold_min(&mut slot, 3.0);
        fold_min(&mut slot, 4.0);
        assert_eq!(slot, Some(3.0));

        let mut slot = None;
        fold_max(&mut slot, 5.0);
        fold_max(&mut slot, 9.0);
        fold_max(&mut slot, 7.0);
        assert_eq!(slot, Some(9.0));
    }

    #[test]
    fn validity_predicate() {
        assert_eq!(valid(Some(1.5)), Some(1.5));
        assert_eq!(valid(Some(f64::NAN)), None);
        assert_eq!(valid(None), None);
    }

    #[test]
    fn missing_points_serialize_sparse() {
        let point = ShapedPoint::missing(
            "2024-03-01 10:30".to_string(),
            "2024-03-01".to_string(),
            "2024-03-01".to_string(),
        );
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["type"], "missing");
        assert_eq!(json["fullDate"], "2024-03-01 10:30");
        assert!(json.get("value").is_none());
        assert!(json.get("MR").is_none());
    }

    #[test]
    fn mz_formats_to_four_decimals() {
        let series = FragmentSeries::new("PEPTIDEA", DataType::Peptide, Some(575.31111), None);
        assert_eq!(series.mz.as_deref(), Some("575.3111"));
    }
}
