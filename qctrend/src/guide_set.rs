//! Guide-set reference statistics, indexed for the per-point join.
//!
//! Two aggregation passes feed the index. The Levey-Jennings pass carries
//! `LJMean`/`LJStdDev` (plus the training record count); the raw pass carries
//! `MeanMR`/`StdDevMR` for the moving-range, CUSUM and trailing plots. Rows
//! with a guide-set id of 0 (or none) do not describe a real trained set:
//! they accumulate into the "default guide set" map, keyed by series label
//! only, which is the fallback reference for points that carry no guide set.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::config::SeriesType;
use crate::payload::PlotDataRow;

/// Reference mean/stddev for one (guide set, series label, series type).
/// Either side may be absent; absent statistics mean "no band to draw".
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SeriesStats {
    #[serde(rename = "NumRecords", skip_serializing_if = "Option::is_none")]
    pub num_records: Option<u64>,
    #[serde(rename = "Mean", skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(rename = "StdDev", skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
    #[serde(rename = "MeanMR", skip_serializing_if = "Option::is_none")]
    pub mean_mr: Option<f64>,
    #[serde(rename = "StdDevMR", skip_serializing_if = "Option::is_none")]
    pub std_dev_mr: Option<f64>,
}

/// One trained reference interval and its per-series statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GuideSet {
    #[serde(rename = "TrainingStart", with = "crate::dates::optional_datetime")]
    pub training_start: Option<NaiveDateTime>,
    #[serde(rename = "TrainingEnd", with = "crate::dates::optional_datetime")]
    pub training_end: Option<NaiveDateTime>,
    #[serde(rename = "ReferenceEnd", with = "crate::dates::optional_datetime")]
    pub reference_end: Option<NaiveDateTime>,
    #[serde(rename = "Comment", skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "Series")]
    pub series: FxHashMap<String, FxHashMap<SeriesType, SeriesStats>>,
}

/// Fallback statistics for points without a guide set, split the way the two
/// aggregation passes deliver them.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DefaultGuideSetEntry {
    #[serde(rename = "LJ", skip_serializing_if = "Option::is_none")]
    pub lj: Option<ReferenceStats>,
    #[serde(rename = "MR", skip_serializing_if = "Option::is_none")]
    pub mr: Option<ReferenceStats>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReferenceStats {
    #[serde(rename = "NumRecords", skip_serializing_if = "Option::is_none")]
    pub num_records: Option<u64>,
    #[serde(rename = "Mean", skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(rename = "StdDev", skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
}

/// Lookup from guide-set id to reference statistics, plus the default
/// (un-scoped) guide set per series label.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GuideSetIndex {
    #[serde(rename = "guideSets")]
    pub guide_sets: FxHashMap<i64, GuideSet>,
    #[serde(rename = "defaultGuideSets")]
    pub default_guide_set: FxHashMap<String, FxHashMap<SeriesType, DefaultGuideSetEntry>>,
}

impl GuideSetIndex {
    /// Build the index from the guide-set statistics attached to each
    /// fragment block. `include_lj` runs the Levey-Jennings-keyed pass,
    /// `include_raw` the MeanMR/StdDevMR-keyed pass.
    pub fn build(rows: &[PlotDataRow], include_lj: bool, include_raw: bool) -> Self {
        let mut index = GuideSetIndex::default();
        if include_lj {
            index.add_lj_stats(rows);
        }
        if include_raw {
            index.add_raw_stats(rows);
        }
        index
    }

    fn add_lj_stats(&mut self, rows: &[PlotDataRow]) {
        for row in rows {
            for stat in &row.guide_set_stats {
                let series_type = stat.series_type();
                if stat.guide_set_id > 0 {
                    let guide_set = self
                        .guide_sets
                        .entry(stat.guide_set_id)
                        .or_insert_with(|| GuideSet {
                            training_start: stat.training_start,
                            training_end: stat.training_end,
                            reference_end: stat.reference_end,
                            comment: stat.comment.clone(),
                            series: FxHashMap::default(),
                        });
                    let stats = guide_set
                        .series
                        .entry(row.series_label.clone())
                        .or_default()
                        .entry(series_type)
                        .or_default();
                    stats.num_records = stat.num_records;
                    stats.mean = stat.lj_mean;
                    stats.std_dev = stat.lj_std_dev;
                } else {
                    let entry = self
                        .default_guide_set
                        .entry(row.series_label.clone())
                        .or_default()
                        .entry(series_type)
                        .or_default();
                    entry.lj = Some(ReferenceStats {
                        num_records: stat.num_records,
                        mean: stat.lj_mean,
                        std_dev: stat.lj_std_dev,
                    });
                }
            }
        }
    }

    fn add_raw_stats(&mut self, rows: &[PlotDataRow]) {
        for row in rows {
            for stat in &row.guide_set_stats {
                let series_type = stat.series_type();
                if stat.guide_set_id > 0 {
                    let guide_set = self
                        .guide_sets
                        .entry(stat.guide_set_id)
                        .or_insert_with(|| GuideSet {
                            training_start: stat.training_start,
                            training_end: stat.training_end,
                            reference_end: stat.reference_end,
                            comment: stat.comment.clone(),
                            series: FxHashMap::default(),
                        });
                    let stats = guide_set
                        .series
                        .entry(row.series_label.clone())
                        .or_default()
                        .entry(series_type)
                        .or_default();
                    stats.mean_mr = stat.mean_mr;
                    stats.std_dev_mr = stat.std_dev_mr;
                } else {
                    let entry = self
                        .default_guide_set
                        .entry(row.series_label.clone())
                        .or_default()
                        .entry(series_type)
                        .or_default();
                    entry.mr = Some(ReferenceStats {
                        num_records: stat.num_records,
                        mean: stat.mean_mr,
                        std_dev: stat.std_dev_mr,
                    });
                }
            }
        }
    }

    pub fn get(&self, guide_set_id: i64) -> Option<&GuideSet> {
        self.guide_sets.get(&guide_set_id)
    }

    /// Statistics for one (guide set, fragment, series type), if trained.
    pub fn series_stats(
        &self,
        guide_set_id: i64,
        series_label: &str,
        series_type: SeriesType,
    ) -> Option<&SeriesStats> {
        self.guide_sets
            .get(&guide_set_id)?
            .series
            .get(series_label)?
            .get(&series_type)
    }

    pub fn default_stats(
        &self,
        series_label: &str,
        series_type: SeriesType,
    ) -> Option<&DefaultGuideSetEntry> {
        self.default_guide_set.get(series_label)?.get(&series_type)
    }

    /// Resolve the Levey-Jennings reference for a point. A missing or zero
    /// guide-set id falls back to the default guide set, never to the per-id
    /// map.
    pub fn resolve_lj_reference(
        &self,
        guide_set_id: Option<i64>,
        series_label: &str,
        series_type: SeriesType,
    ) -> Option<(Option<f64>, Option<f64>)> {
        match guide_set_id {
            Some(id) if id > 0 => self
                .series_stats(id, series_label, series_type)
                .map(|stats| (stats.mean, stats.std_dev)),
            _ => self
                .default_stats(series_label, series_type)?
                .lj
                .map(|stats| (stats.mean, stats.std_dev)),
        }
    }

    /// Training start of the oldest guide set, used to zoom trailing plots.
    pub fn earliest_training_start(&self) -> Option<NaiveDateTime> {
        self.guide_sets
            .values()
            .filter_map(|guide_set| guide_set.training_start)
            .min()
    }

    pub fn is_empty(&self) -> bool {
        self.guide_sets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::GuideSetStatRow;

    fn row_with_stats(label: &str, stats: Vec<GuideSetStatRow>) -> PlotDataRow {
        PlotDataRow {
            series_label: label.to_string(),
            data_type: Default::default(),
            mz: None,
            series_color: None,
            guide_set_stats: stats,
            data: vec![],
        }
    }

    fn lj_stat(guide_set_id: i64, series_type: i32, mean: f64, std_dev: f64) -> GuideSetStatRow {
        GuideSetStatRow {
            guide_set_id,
            series_type: Some(series_type),
            num_records: Some(12),
            lj_mean: Some(mean),
            lj_std_dev: Some(std_dev),
            ..Default::default()
        }
    }

    #[test]
    fn groups_by_id_label_and_series_type() {
        let rows = vec![
            row_with_stats("PEPTIDEA", vec![lj_stat(1, 1, 4.0, 0.2), lj_stat(1, 2, 9.0, 0.5)]),
            row_with_stats("PEPTIDEB", vec![lj_stat(1, 1, 7.0, 0.1)]),
        ];
        let index = GuideSetIndex::build(&rows, true, false);

        let a1 = index.series_stats(1, "PEPTIDEA", SeriesType::Series1).unwrap();
        assert_eq!(a1.mean, Some(4.0));
        let a2 = index.series_stats(1, "PEPTIDEA", SeriesType::Series2).unwrap();
        assert_eq!(a2.mean, Some(9.0));
        let b1 = index.series_stats(1, "PEPTIDEB", SeriesType::Series1).unwrap();
        assert_eq!(b1.std_dev, Some(0.1));
    }

    #[test]
    fn zero_id_accumulates_into_default_guide_set() {
        let rows = vec![row_with_stats("PEPTIDEA", vec![lj_stat(0, 1, 4.0, 0.2)])];
        let index = GuideSetIndex::build(&rows, true, false);

        assert!(index.guide_sets.is_empty());
        let entry = index.default_stats("PEPTIDEA", SeriesType::Series1).unwrap();
        assert_eq!(entry.lj.unwrap().mean, Some(4.0));
    }

    #[test]
    fn fallback_never_reads_the_per_id_map() {
        let rows = vec![row_with_stats(
            "PEPTIDEA",
            vec![lj_stat(3, 1, 10.0, 1.0), lj_stat(0, 1, 4.0, 0.2)],
        )];
        let index = GuideSetIndex::build(&rows, true, false);

        // id 0 and missing id both resolve from the default map
        let (mean, _) = index
            .resolve_lj_reference(Some(0), "PEPTIDEA", SeriesType::Series1)
            .unwrap();
        assert_eq!(mean, Some(4.0));
        let (mean, _) = index
            .resolve_lj_reference(None, "PEPTIDEA", SeriesType::Series1)
            .unwrap();
        assert_eq!(mean, Some(4.0));
        // a real id resolves from its own guide set
        let (mean, _) = index
            .resolve_lj_reference(Some(3), "PEPTIDEA", SeriesType::Series1)
            .unwrap();
        assert_eq!(mean, Some(10.0));
    }

    #[test]
    fn raw_pass_merges_mr_stats_into_lj_entries() {
        let mut stat = lj_stat(2, 1, 4.0, 0.2);
        stat.mean_mr = Some(0.3);
        stat.std_dev_mr = Some(0.05);
        let rows = vec![row_with_stats("PEPTIDEA", vec![stat])];
        let index = GuideSetIndex::build(&rows, true, true);

        let stats = index.series_stats(2, "PEPTIDEA", SeriesType::Series1).unwrap();
        assert_eq!(stats.mean, Some(4.0));
        assert_eq!(stats.mean_mr, Some(0.3));
        assert_eq!(stats.std_dev_mr, Some(0.05));
    }

    #[test]
    fn missing_fields_leave_stats_undefined() {
        let stat = GuideSetStatRow {
            guide_set_id: 5,
            series_type: Some(1),
            ..Default::default()
        };
        let rows = vec![row_with_stats("PEPTIDEA", vec![stat])];
        let index = GuideSetIndex::build(&rows, true, true);

        let stats = index.series_stats(5, "PEPTIDEA", SeriesType::Series1).unwrap();
        assert!(stats.mean.is_none());
        assert!(stats.std_dev.is_none());
        assert!(stats.mean_mr.is_none());
    }
}
