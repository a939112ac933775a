//! Deserialized shapes of the two remote payloads.
//!
//! The query layer returns one payload per plot request
//! (`plotDataRows` + `metricProps` + `sampleFiles`) and one list of QC
//! annotation rows. Field names mirror the wire format; anything the server
//! may omit is optional and absence never raises an error here — missing
//! statistics simply mean "no reference band to draw" downstream.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::SeriesType;
use crate::dates::optional_datetime;

/// The plot-data payload for one metric.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotDataPayload {
    #[serde(default)]
    pub plot_data_rows: Vec<PlotDataRow>,
    #[serde(default)]
    pub metric_props: MetricProps,
    #[serde(default)]
    pub sample_files: Vec<SampleFileInfo>,
    /// Server-side hint that points outside the reference guide-set window
    /// should be cut from the visible range.
    #[serde(default, rename = "filterQCPoints")]
    pub filter_qc_points: bool,
}

/// One fragment block: the series label plus its guide-set statistics and
/// raw per-run observations.
#[derive(Debug, Clone, Deserialize)]
pub struct PlotDataRow {
    #[serde(rename = "SeriesLabel")]
    pub series_label: String,
    #[serde(default, rename = "DataType")]
    pub data_type: DataType,
    #[serde(default, rename = "mz")]
    pub mz: Option<f64>,
    #[serde(default, rename = "SeriesColor")]
    pub series_color: Option<String>,
    #[serde(default, rename = "GuideSetStats")]
    pub guide_set_stats: Vec<GuideSetStatRow>,
    #[serde(default, rename = "data")]
    pub data: Vec<RawMetricRow>,
}

/// The analyte class a fragment label belongs to. Peptide labels get
/// modification stripping in the legend helper; small-molecule ion labels do
/// not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataType {
    #[default]
    Peptide,
    #[serde(rename = "ion")]
    Ion,
}

/// One raw observation for a (sample file, series type) pair. Which of the
/// statistic fields are populated depends on the plot types the server was
/// asked to compute.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMetricRow {
    #[serde(rename = "SampleFileId")]
    pub sample_file_id: i64,
    /// 1 or 2 on the wire; anything other than 2 resolves to series 1.
    #[serde(default, rename = "SeriesType")]
    pub series_type: Option<i32>,
    #[serde(default, rename = "Value")]
    pub value: Option<f64>,
    #[serde(default, rename = "MR")]
    pub mr: Option<f64>,
    #[serde(default, rename = "CUSUMmP")]
    pub cusum_mp: Option<f64>,
    #[serde(default, rename = "CUSUMmN")]
    pub cusum_mn: Option<f64>,
    #[serde(default, rename = "CUSUMvP")]
    pub cusum_vp: Option<f64>,
    #[serde(default, rename = "CUSUMvN")]
    pub cusum_vn: Option<f64>,
    #[serde(default, rename = "TrailingMean")]
    pub trailing_mean: Option<f64>,
    #[serde(default, rename = "TrailingCV")]
    pub trailing_cv: Option<f64>,
    #[serde(default, rename = "TrailingStartDate", with = "optional_datetime")]
    pub trailing_start_date: Option<NaiveDateTime>,
    #[serde(default, rename = "TrailingEndDate", with = "optional_datetime")]
    pub trailing_end_date: Option<NaiveDateTime>,
    #[serde(default, rename = "IgnoreInQC")]
    pub ignore_in_qc: bool,
    #[serde(default, rename = "ValueOutlier")]
    pub value_outlier: bool,
    #[serde(default, rename = "MROutlier")]
    pub mr_outlier: bool,
    /// True while the run sits inside its guide set's training window; drives
    /// the hover-only training sequence index.
    #[serde(default, rename = "InsideGuideSet")]
    pub inside_guide_set: bool,
    #[serde(default, rename = "PrecursorId")]
    pub precursor_id: Option<i64>,
    #[serde(default, rename = "PrecursorChromInfoId")]
    pub precursor_chrom_info_id: Option<i64>,
}

impl RawMetricRow {
    pub fn series_type(&self) -> SeriesType {
        SeriesType::from_wire(self.series_type)
    }
}

/// Sample-file metadata joined onto every point by id.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleFileInfo {
    #[serde(rename = "SampleId")]
    pub sample_id: i64,
    #[serde(default, rename = "FilePath")]
    pub file_path: Option<String>,
    #[serde(default, rename = "ReplicateId")]
    pub replicate_id: Option<i64>,
    #[serde(default, rename = "ReplicateName")]
    pub replicate_name: Option<String>,
    #[serde(default, rename = "AcquiredTime", with = "optional_datetime")]
    pub acquired_time: Option<NaiveDateTime>,
    /// 0 means "no guide set".
    #[serde(default, rename = "GuideSetId")]
    pub guide_set_id: Option<i64>,
    #[serde(default, rename = "InGuideSetTrainingRange")]
    pub in_guide_set_training_range: bool,
}

/// One guide-set statistics row. Field names vary by plot type: the
/// Levey-Jennings aggregation fills `LJMean`/`LJStdDev`, the raw aggregation
/// fills `MeanMR`/`StdDevMR`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuideSetStatRow {
    #[serde(default, rename = "GuideSetId")]
    pub guide_set_id: i64,
    #[serde(default, rename = "SeriesType")]
    pub series_type: Option<i32>,
    #[serde(default, rename = "NumRecords")]
    pub num_records: Option<u64>,
    #[serde(default, rename = "LJMean")]
    pub lj_mean: Option<f64>,
    #[serde(default, rename = "LJStdDev")]
    pub lj_std_dev: Option<f64>,
    #[serde(default, rename = "MeanMR")]
    pub mean_mr: Option<f64>,
    #[serde(default, rename = "StdDevMR")]
    pub std_dev_mr: Option<f64>,
    #[serde(default, rename = "TrainingStart", with = "optional_datetime")]
    pub training_start: Option<NaiveDateTime>,
    #[serde(default, rename = "TrainingEnd", with = "optional_datetime")]
    pub training_end: Option<NaiveDateTime>,
    #[serde(default, rename = "ReferenceEnd", with = "optional_datetime")]
    pub reference_end: Option<NaiveDateTime>,
    #[serde(default, rename = "Comment")]
    pub comment: Option<String>,
}

impl GuideSetStatRow {
    pub fn series_type(&self) -> SeriesType {
        SeriesType::from_wire(self.series_type)
    }
}

/// Axis labels, bounds, and series coordinates for the metric being plotted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricProps {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub series1_label: Option<String>,
    #[serde(default)]
    pub series1_schema_name: Option<String>,
    #[serde(default)]
    pub series1_query_name: Option<String>,
    #[serde(default)]
    pub series2_label: Option<String>,
    #[serde(default)]
    pub series2_schema_name: Option<String>,
    #[serde(default)]
    pub series2_query_name: Option<String>,
    #[serde(default)]
    pub y_axis_label1: Option<String>,
    #[serde(default)]
    pub y_axis_label2: Option<String>,
    #[serde(default)]
    pub precursor_scoped: bool,
    #[serde(default)]
    pub upper_bound: Option<f64>,
    #[serde(default)]
    pub lower_bound: Option<f64>,
    #[serde(default)]
    pub metric_status: MetricStatus,
}

impl MetricProps {
    pub fn series_label(&self, series_type: SeriesType) -> Option<&str> {
        match series_type {
            SeriesType::Series1 => self.series1_label.as_deref(),
            SeriesType::Series2 => self.series2_label.as_deref(),
        }
    }
}

/// How the metric compares raw values against its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MetricStatus {
    #[default]
    LeveyJennings,
    PlotOnly,
    ValueCutoff,
    MeanDeviationCutoff,
}

/// One QC event marker. Annotations widen plotted date ranges and contribute
/// legend entries; they never participate in statistics.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationRow {
    #[serde(rename = "Date", with = "optional_datetime")]
    pub date: Option<NaiveDateTime>,
    #[serde(default, rename = "Description")]
    pub description: Option<String>,
    #[serde(default, rename = "Created", with = "optional_datetime")]
    pub created: Option<NaiveDateTime>,
    #[serde(default, rename = "CreatedBy")]
    pub created_by: Option<String>,
    #[serde(default, rename = "Name")]
    pub name: String,
    #[serde(default, rename = "Color")]
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_payload() {
        let json = r#"{
            "plotDataRows": [{
                "SeriesLabel": "LVNELTEFAK",
                "DataType": "Peptide",
                "mz": 575.3111,
                "GuideSetStats": [
                    {"GuideSetId": 1, "SeriesType": 1, "NumRecords": 10, "LJMean": 4.1, "LJStdDev": 0.2}
                ],
                "data": [
                    {"SampleFileId": 7, "SeriesType": 1, "Value": 4.05, "IgnoreInQC": false}
                ]
            }],
            "metricProps": {"name": "Retention Time", "series1Label": "Retention Time"},
            "sampleFiles": [
                {"SampleId": 7, "AcquiredTime": "2024-03-01 10:30:00", "ReplicateId": 3, "GuideSetId": 1}
            ],
            "filterQCPoints": false
        }"#;

        let payload: PlotDataPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.plot_data_rows.len(), 1);
        let row = &payload.plot_data_rows[0];
        assert_eq!(row.series_label, "LVNELTEFAK");
        assert_eq!(row.data[0].series_type(), SeriesType::Series1);
        assert_eq!(row.guide_set_stats[0].lj_mean, Some(4.1));
        assert_eq!(payload.sample_files[0].guide_set_id, Some(1));
    }

    #[test]
    fn missing_statistics_stay_none() {
        let json = r#"{"GuideSetId": 2, "SeriesType": 2}"#;
        let stat: GuideSetStatRow = serde_json::from_str(json).unwrap();
        assert_eq!(stat.series_type(), SeriesType::Series2);
        assert!(stat.lj_mean.is_none());
        assert!(stat.mean_mr.is_none());
    }

    #[test]
    fn annotation_rows_parse() {
        let json = r#"{"Date": "2024-02-10 00:00:00", "Name": "Instrumentation Change", "Color": "FF0000"}"#;
        let row: AnnotationRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.name, "Instrumentation Change");
        assert!(row.date.is_some());
    }
}
