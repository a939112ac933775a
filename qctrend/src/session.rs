//! The plot data orchestrator.
//!
//! One [`PlotSession`] is built per render pass from the two remote payloads
//! and the request configuration, runs the enabled plot-type modules over the
//! raw rows, and produces a [`PlotData`] ready for the renderer. Nothing
//! survives between passes; a data refresh rebuilds everything from scratch.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use itertools::Itertools;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::{debug, warn};

use crate::annotations::{AnnotationSet, process_annotations};
use crate::config::{
    DEGENERATE_RANGE_EPSILON, FILTER_MIN_KEPT_POINTS, FILTER_SKIP_POINTS, LEGEND_PREFIX_MIN_LENGTH,
    LOG_SCALE_EPSILON, MAX_POINTS_PER_SERIES, PlotConfig, SHAPE_DOMAIN, SeriesType,
};
use crate::dates::{format_axis_key, format_date, format_full_date, parse_datetime};
use crate::error::{QcTrendError, Result};
use crate::guide_set::GuideSetIndex;
use crate::legend::UniquePrefixGenerator;
use crate::payload::{AnnotationRow, DataType, PlotDataPayload};
use crate::plot_type::{
    LegendContext, LegendEntry, PlotDomain, PlotEnv, PlotType, PlotTypeModule, active_modules,
    combined_legend_series,
};
use crate::series::{
    FragmentSeries, PointKind, ReferenceRangeSeries, SeriesExtents, ShapedPoint,
};

/// Categorical colors for the combined overlay, one per fragment.
pub const GROUP_COLORS: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

pub fn empty_result_message() -> &'static str {
    "There were no records found. The date filter applied may be too restrictive."
}

pub fn log_invalid_message() -> &'static str {
    "Log scale invalid for values \u{2264} 0. Reverting to linear y-axis scale."
}

pub fn log_warning_message() -> &'static str {
    "For log scale, standard deviations below the mean with negative values have been omitted."
}

pub fn log_epsilon_message() -> String {
    format!("Values that are 0 have been replaced with {LOG_SCALE_EPSILON} for log scale plot.")
}

/// Severity of a per-panel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelMessageKind {
    Error,
    Info,
}

/// Inline message replacing or annotating one plot panel. Sibling plot types
/// are unaffected.
#[derive(Debug, Clone, Serialize)]
pub struct PanelMessage {
    #[serde(rename = "plotType")]
    pub plot_type: PlotType,
    pub kind: PanelMessageKind,
    pub text: String,
}

/// Computed y-axis domain for one plot type.
#[derive(Debug, Clone, Serialize)]
pub struct DomainEntry {
    #[serde(rename = "plotType")]
    pub plot_type: PlotType,
    #[serde(flatten)]
    pub domain: PlotDomain,
}

/// One fragment's shaped series plus its final per-plot-type domains.
#[derive(Debug, Clone, Serialize)]
pub struct FragmentPlotData {
    #[serde(flatten)]
    pub series: FragmentSeries,
    pub domains: Vec<DomainEntry>,
}

/// All fragments overlaid for the combined ("All Series") plot.
#[derive(Debug, Clone, Serialize)]
pub struct CombinedPlotData {
    pub data: Vec<ShapedPoint>,
    #[serde(flatten)]
    pub extents: SeriesExtents,
    #[serde(rename = "showLogInvalid")]
    pub show_log_invalid: bool,
    pub domains: Vec<DomainEntry>,
}

/// Legend entries for one plot type.
#[derive(Debug, Clone, Serialize)]
pub struct PlotTypeLegend {
    #[serde(rename = "plotType")]
    pub plot_type: PlotType,
    pub entries: Vec<LegendEntry>,
}

/// Everything the renderer needs for one pass.
#[derive(Debug, Clone, Serialize)]
pub struct PlotData {
    pub fragments: Vec<FragmentPlotData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined: Option<CombinedPlotData>,
    /// Trailing panels plot against a zoomed copy of each series.
    #[serde(rename = "trailingFragments", skip_serializing_if = "Option::is_none")]
    pub trailing_fragments: Option<Vec<FragmentSeries>>,
    #[serde(rename = "showDataPoints")]
    pub show_data_points: bool,
    #[serde(rename = "guideSets")]
    pub guide_sets: GuideSetIndex,
    pub annotations: AnnotationSet,
    #[serde(rename = "legendPrefixes")]
    pub legend_prefixes: FxHashMap<String, String>,
    pub legends: Vec<PlotTypeLegend>,
    #[serde(rename = "panelMessages")]
    pub panel_messages: Vec<PanelMessage>,
    #[serde(rename = "emptyMessage", skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<String>,
    /// Set when the truncation safety net pushed the visible start date back.
    #[serde(rename = "adjustedStartDate", skip_serializing_if = "Option::is_none")]
    pub adjusted_start_date: Option<String>,
    /// Whether reference-window truncation was actually applied.
    #[serde(rename = "filterApplied")]
    pub filter_applied: bool,
    /// Point-shape categories the renderer binds LJShape/MRShape against.
    #[serde(rename = "shapeDomain")]
    pub shape_domain: Vec<&'static str>,
}

impl PlotData {
    pub fn fragment(&self, label: &str) -> Option<&FragmentPlotData> {
        self.fragments
            .iter()
            .find(|fragment| fragment.series.fragment == label)
    }
}

/// Kept-range cut indices for one (fragment, series type).
#[derive(Debug, Clone, Copy, Default)]
struct FilterIndices {
    /// First index after the training-range points to cut.
    first: Option<usize>,
    /// First index on/after the visible window start.
    last: Option<usize>,
}

/// Shape raw rows, sample files, and annotations into renderer-ready series.
pub fn process_plot_data(
    payload: &PlotDataPayload,
    annotation_rows: &[AnnotationRow],
    config: &PlotConfig,
) -> Result<PlotData> {
    PlotSession::new(payload, annotation_rows, config)?.run()
}

/// Scratch state for one render pass.
struct PlotSession<'a> {
    payload: &'a PlotDataPayload,
    config: &'a PlotConfig,
    env: PlotEnv,
    modules: Vec<Box<dyn PlotTypeModule>>,
    guide_sets: GuideSetIndex,
    page: (usize, usize),
    fragment_order: Vec<String>,
    fragments: FxHashMap<String, FragmentSeries>,
    all_plot_dates: Vec<NaiveDateTime>,
    annotations: AnnotationSet,
    filter_points: FxHashMap<String, BTreeMap<SeriesType, FilterIndices>>,
    filter_qc_points: bool,
    adjusted_start_date: Option<String>,
}

impl<'a> PlotSession<'a> {
    fn new(
        payload: &'a PlotDataPayload,
        annotation_rows: &'a [AnnotationRow],
        config: &'a PlotConfig,
    ) -> Result<Self> {
        let rows = payload.plot_data_rows.len();
        let page = config.page_window.unwrap_or((0, rows));
        if page.0 > page.1 || page.1 > rows {
            return Err(QcTrendError::InvalidPageWindow {
                start: page.0,
                end: page.1,
                rows,
            });
        }

        let include_lj = config.shows(PlotType::LeveyJennings);
        let include_raw = config.shows_raw_guide_set_consumer();
        let guide_sets = GuideSetIndex::build(&payload.plot_data_rows, include_lj, include_raw);

        Ok(PlotSession {
            payload,
            config,
            env: PlotEnv::from_config(config),
            modules: active_modules(&config.plot_types),
            guide_sets,
            page,
            fragment_order: Vec::new(),
            fragments: FxHashMap::default(),
            all_plot_dates: Vec::new(),
            annotations: process_annotations(annotation_rows, config.grouped_x),
            filter_points: FxHashMap::default(),
            filter_qc_points: payload.filter_qc_points,
            adjusted_start_date: None,
        })
    }

    fn run(mut self) -> Result<PlotData> {
        self.shape_rows();
        let date_union = self.date_union();

        let prefix_generator = UniquePrefixGenerator::new(
            self.fragment_order.iter().map(|label| {
                let is_peptide = self
                    .fragments
                    .get(label)
                    .is_none_or(|series| series.data_type == DataType::Peptide);
                (label.as_str(), is_peptide)
            }),
            LEGEND_PREFIX_MIN_LENGTH,
        );

        for label in self.fragment_order.clone() {
            let Some(series) = self.fragments.get_mut(&label) else {
                continue;
            };
            widen_degenerate_range(&mut series.extents);
            gap_fill(series, &date_union, self.config.grouped_x);
        }

        if self.filter_qc_points {
            self.compute_filter_points();
        }

        // the marker cap looks at series lengths before any truncation
        let show_data_points = self
            .fragment_order
            .iter()
            .filter_map(|label| self.fragments.get(label))
            .map(|series| series.data.len())
            .max()
            .unwrap_or(0)
            <= MAX_POINTS_PER_SERIES;

        if self.filter_qc_points {
            self.apply_truncation_safety_net();
            self.truncate_out_of_range_points();
        }

        let combined = self.build_combined();
        let trailing_fragments = self.build_trailing_fragments();
        let legends = self.build_legends(&prefix_generator);
        let panel_messages = self.panel_messages();

        let legend_prefixes = self
            .fragment_order
            .iter()
            .map(|label| {
                let data_type = self
                    .fragments
                    .get(label)
                    .map_or(DataType::Peptide, |series| series.data_type);
                let abbreviated =
                    prefix_generator.unique_prefix(label, data_type == DataType::Peptide);
                (label.clone(), abbreviated)
            })
            .collect();

        let mut fragment_map = std::mem::take(&mut self.fragments);
        let fragments: Vec<FragmentPlotData> = self
            .fragment_order
            .iter()
            .filter_map(|label| fragment_map.remove(label))
            .map(|series| {
                let domains = self.domains_for(&series.extents);
                FragmentPlotData { series, domains }
            })
            .collect();

        let empty_message = if fragments.is_empty() {
            Some(empty_result_message().to_string())
        } else {
            None
        };

        debug!(
            fragments = fragments.len(),
            show_data_points,
            filter_applied = self.filter_qc_points,
            "plot data pass complete"
        );

        Ok(PlotData {
            fragments,
            combined,
            trailing_fragments,
            show_data_points,
            guide_sets: self.guide_sets,
            annotations: self.annotations,
            legend_prefixes,
            legends,
            panel_messages,
            empty_message,
            adjusted_start_date: self.adjusted_start_date,
            filter_applied: self.filter_qc_points,
            shape_domain: SHAPE_DOMAIN.to_vec(),
        })
    }

    /// Steps 3-5: join sample files, drive the per-row transforms, track the
    /// training sequence index, and collect every plotted date.
    fn shape_rows(&mut self) {
        let sample_files: FxHashMap<i64, &crate::payload::SampleFileInfo> = self
            .payload
            .sample_files
            .iter()
            .map(|file| (file.sample_id, file))
            .collect();

        let mut found_training = false;
        let mut training_seq_idx: u32 = 1;

        let (page_start, page_end) = self.page;
        for block in &self.payload.plot_data_rows[page_start..page_end] {
            let fragment = &block.series_label;
            if !self.fragments.contains_key(fragment) {
                let mut series = FragmentSeries::new(
                    fragment,
                    block.data_type,
                    block.mz,
                    block.series_color.clone(),
                );
                series.precursor_scoped = self.payload.metric_props.precursor_scoped;
                self.fragments.insert(fragment.clone(), series);
                self.fragment_order.push(fragment.clone());
            }

            for raw in &block.data {
                let Some(sample_file) = sample_files.get(&raw.sample_file_id) else {
                    warn!(sample_file_id = raw.sample_file_id, "row references unknown sample file");
                    continue;
                };
                let series_type = raw.series_type();

                let mut point = ShapedPoint::empty(PointKind::Data);
                point.fragment = Some(fragment.clone());
                point.mz = block.mz.map(|mz| format!("{mz:.4}"));
                point.sample_file_id = Some(raw.sample_file_id);
                point.replicate_id = sample_file.replicate_id;
                point.replicate_name = sample_file.replicate_name.clone();
                point.precursor_id = raw.precursor_id;
                point.precursor_chrom_info_id = raw.precursor_chrom_info_id;
                point.file_path = sample_file.file_path.clone();
                point.ignore_in_qc = raw.ignore_in_qc;
                point.data_type = Some(block.data_type);
                point.series_type = Some(series_type);
                if let Some(acquired) = sample_file.acquired_time {
                    point.full_date = Some(format_full_date(&acquired));
                    point.date = Some(format_date(&acquired));
                    point.grouped_x_tick = Some(format_date(&acquired));
                }

                let known_guide_set = sample_file
                    .guide_set_id
                    .filter(|id| *id > 0)
                    .and_then(|id| self.guide_sets.get(id))
                    .filter(|guide_set| guide_set.series.contains_key(fragment));

                if let Some(guide_set) = known_guide_set {
                    point.guide_set_id = sample_file.guide_set_id;
                    point.in_guide_set_training_range =
                        Some(sample_file.in_guide_set_training_range);
                    let training_start = guide_set
                        .training_start
                        .map(|start| format_full_date(&start))
                        .unwrap_or_else(|| "0".to_string());
                    let membership = if sample_file.in_guide_set_training_range {
                        "include"
                    } else {
                        "notinclude"
                    };
                    point.grouped_x_tick = point
                        .grouped_x_tick
                        .map(|tick| format!("{tick}|{training_start}|{membership}"));

                    // the index resets to 1 each time a run transitions into
                    // a training window from outside it
                    if raw.inside_guide_set {
                        if !found_training {
                            found_training = true;
                            training_seq_idx = 1;
                        }
                    } else {
                        found_training = false;
                    }
                    point.training_seq_idx = Some(training_seq_idx);
                    training_seq_idx += 1;
                }

                if self.config.shows(PlotType::TrailingMean)
                    || self.config.shows(PlotType::TrailingCv)
                {
                    point.trailing_start_date = raw.trailing_start_date;
                    point.trailing_end_date = raw.trailing_end_date;
                }

                let ctx = crate::plot_type::RowContext {
                    fragment,
                    series_type,
                    guide_set_id: sample_file.guide_set_id,
                    guide_sets: &self.guide_sets,
                    metric: &self.payload.metric_props,
                };
                for module in &self.modules {
                    module.shape_row(raw, &ctx, &self.env, &mut point);
                }

                let series = self
                    .fragments
                    .get_mut(fragment)
                    .expect("fragment created above");
                for module in &self.modules {
                    module.accumulate(series, &point, &self.env);
                }
                series.data.push(point);

                if let Some(acquired) = sample_file.acquired_time {
                    self.all_plot_dates.push(acquired);
                }
            }
        }
    }

    /// Step 6: distinct dates across every fragment plus every annotation,
    /// ascending.
    fn date_union(&self) -> Vec<NaiveDateTime> {
        let mut dates = self.all_plot_dates.clone();
        dates.extend(
            self.annotations
                .annotations
                .iter()
                .filter_map(|annotation| annotation.date),
        );
        dates.sort();
        dates
            .into_iter()
            .dedup_by(|a, b| format_full_date(a) == format_full_date(b))
            .collect()
    }

    /// Step 8: the cut indices for reference-window truncation, plus the
    /// per-point series marker separating training points from in-range
    /// points.
    fn compute_filter_points(&mut self) {
        let Some(start_date) = self.config.start_date else {
            return;
        };
        for label in &self.fragment_order {
            let Some(series) = self.fragments.get_mut(label) else {
                continue;
            };
            let entries = self.filter_points.entry(label.clone()).or_default();
            for (index, point) in series.data.iter_mut().enumerate() {
                if point.is_missing() {
                    continue;
                }
                let Some(series_type) = point.series_type else {
                    continue;
                };
                let indices = entries.entry(series_type).or_default();

                let in_training = point.in_guide_set_training_range.unwrap_or(false);
                let training_end = point
                    .guide_set_id
                    .and_then(|id| self.guide_sets.get(id))
                    .and_then(|guide_set| guide_set.training_end);
                let reference_training =
                    in_training && training_end.is_some_and(|end| end <= start_date);
                if reference_training {
                    indices.first = Some(index + 1);
                    point.reference_range_series = Some(ReferenceRangeSeries::GuideSet);
                } else {
                    point.reference_range_series = Some(ReferenceRangeSeries::InRange);
                }

                if indices.last.is_none() {
                    let on_or_after_start = point
                        .full_date
                        .as_deref()
                        .and_then(|full| parse_datetime(full).ok())
                        .is_some_and(|date| date >= start_date);
                    if on_or_after_start {
                        indices.last = Some(index);
                    }
                }
            }
        }
    }

    /// The <6-point safety net: with too little context between the cut
    /// indices, truncation is abandoned entirely and the visible start date
    /// is pushed back instead; otherwise the kept-range end pulls back by the
    /// skip amount.
    fn apply_truncation_safety_net(&mut self) {
        for label in self.fragment_order.clone() {
            let Some(entries) = self.filter_points.get_mut(&label) else {
                continue;
            };
            let Some(series) = self.fragments.get(&label) else {
                continue;
            };
            for indices in entries.values_mut() {
                let (Some(first), Some(last)) = (indices.first, indices.last) else {
                    continue;
                };
                if (last as isize) - (first as isize) < FILTER_MIN_KEPT_POINTS as isize {
                    self.filter_qc_points = false;
                    self.adjusted_start_date = point_date(series, first);
                } else {
                    let new_last = last - FILTER_SKIP_POINTS;
                    indices.last = Some(new_last);
                    self.adjusted_start_date = point_date(series, new_last + 1);
                }
            }
        }
    }

    /// Step 9: drop the marked ranges. The new point vector is built fully
    /// before replacing the old one, so cut indices for both series types
    /// keep referring to the original positions.
    fn truncate_out_of_range_points(&mut self) {
        if !self.filter_qc_points {
            return;
        }
        for (label, entries) in &self.filter_points {
            let Some(series) = self.fragments.get_mut(label) else {
                continue;
            };
            let len = series.data.len();
            let mut remove = vec![false; len];
            for indices in entries.values() {
                let (Some(first), Some(last)) = (indices.first, indices.last) else {
                    continue;
                };
                let last = last.min(len.saturating_sub(1));
                if first > last {
                    continue;
                }
                for slot in remove.iter_mut().take(last + 1).skip(first) {
                    *slot = true;
                }
            }
            let old = std::mem::take(&mut series.data);
            series.data = old
                .into_iter()
                .enumerate()
                .filter_map(|(index, point)| (!remove[index]).then_some(point))
                .collect();
        }
    }

    /// Step 10: the all-series overlay, when requested and the metric is
    /// precursor-scoped.
    fn build_combined(&self) -> Option<CombinedPlotData> {
        if !self.config.single_plot || !self.payload.metric_props.precursor_scoped {
            return None;
        }
        let mut data = Vec::new();
        let mut extents = SeriesExtents::default();
        let mut show_log_invalid = false;
        for label in &self.fragment_order {
            let Some(series) = self.fragments.get(label) else {
                continue;
            };
            data.extend(series.data.iter().cloned());
            for module in &self.modules {
                module.fold_combined(&mut extents, series);
            }
            show_log_invalid |= series.show_log_invalid;
        }
        let domains = self.domains_for(&extents);
        Some(CombinedPlotData {
            data,
            extents,
            show_log_invalid,
            domains,
        })
    }

    fn build_trailing_fragments(&self) -> Option<Vec<FragmentSeries>> {
        if !self.config.shows(PlotType::TrailingMean) && !self.config.shows(PlotType::TrailingCv) {
            return None;
        }
        Some(
            self.fragment_order
                .iter()
                .filter_map(|label| self.fragments.get(label))
                .map(|series| zoom_date_range_for_trailing(series, &self.guide_sets))
                .collect(),
        )
    }

    fn domains_for(&self, extents: &SeriesExtents) -> Vec<DomainEntry> {
        self.modules
            .iter()
            .filter_map(|module| {
                module
                    .domain(extents, &self.env)
                    .map(|domain| DomainEntry {
                        plot_type: module.plot_type(),
                        domain,
                    })
            })
            .collect()
    }

    /// Legend descriptor lists per plot type: the combined assembly (analyte
    /// sections + per-fragment entries) in overlay mode, otherwise the plot
    /// type's own entries plus the annotation legend.
    fn build_legends(&self, prefixes: &UniquePrefixGenerator) -> Vec<PlotTypeLegend> {
        let ctx = LegendContext {
            metric: &self.payload.metric_props,
            env: self.env,
        };
        self.modules
            .iter()
            .map(|module| {
                let entries = if self.config.single_plot && self.payload.metric_props.precursor_scoped
                {
                    self.combined_legend(module.as_ref(), prefixes)
                } else {
                    let mut entries = module.legend(&ctx);
                    entries.extend(self.annotations.legend.iter().cloned());
                    entries
                };
                PlotTypeLegend {
                    plot_type: module.plot_type(),
                    entries,
                }
            })
            .collect()
    }

    fn combined_legend(
        &self,
        module: &dyn PlotTypeModule,
        prefixes: &UniquePrefixGenerator,
    ) -> Vec<LegendEntry> {
        let metric = &self.payload.metric_props;
        let dual = self.env.series_arity.is_dual();
        let y_axis_count = if dual { 2 } else { 1 };
        let series_fields = combined_legend_series(module.plot_type());

        let mut entries = self.annotations.legend.clone();
        let mut proteomics = vec![LegendEntry::separator("Peptides")];
        let mut ions = vec![LegendEntry::separator("Ions")];

        if dual {
            if let Some(label) = metric.series1_label.as_deref() {
                proteomics.push(LegendEntry::separator(label));
                ions.push(LegendEntry::separator(label));
            }
        }

        for (index, label) in self.fragment_order.iter().enumerate() {
            let Some(series) = self.fragments.get(label) else {
                continue;
            };
            let section = if series.data_type == DataType::Peptide {
                &mut proteomics
            } else {
                &mut ions
            };
            let name = if dual {
                format!("{label}|{}", series_fields[0])
            } else {
                label.clone()
            };
            section.push(fragment_legend_entry(
                name,
                prefixes.unique_prefix(label, series.data_type == DataType::Peptide),
                label,
                GROUP_COLORS[index % GROUP_COLORS.len()],
            ));
        }

        if dual {
            if let Some(label) = metric.series2_label.as_deref() {
                proteomics.push(LegendEntry::separator(label));
                ions.push(LegendEntry::separator(label));
            }
            let offset = self.fragment_order.len();
            for (index, label) in self.fragment_order.iter().enumerate() {
                let Some(series) = self.fragments.get(label) else {
                    continue;
                };
                let section = if series.data_type == DataType::Peptide {
                    &mut proteomics
                } else {
                    &mut ions
                };
                section.push(fragment_legend_entry(
                    format!("{label}|{}", series_fields[1]),
                    prefixes.unique_prefix(label, series.data_type == DataType::Peptide),
                    label,
                    GROUP_COLORS[(offset + index) % GROUP_COLORS.len()],
                ));
            }
        }

        // a section earns its place only with at least one non-separator
        // entry beyond the axis separators
        if proteomics.len() > y_axis_count + 1 {
            entries.extend(proteomics);
        }
        if ions.len() > y_axis_count + 1 {
            entries.extend(ions);
        }

        let ctx = LegendContext {
            metric,
            env: self.env,
        };
        entries.extend(module.legend(&ctx));
        entries
    }

    /// Per-plot-type precondition and log-scale notes. A violated
    /// precondition replaces that panel only.
    fn panel_messages(&self) -> Vec<PanelMessage> {
        let runs = if self.config.runs > 0 {
            self.config.runs
        } else {
            self.payload.sample_files.len()
        };
        let mut messages = Vec::new();
        for module in &self.modules {
            let plot_type = module.plot_type();
            match plot_type {
                PlotType::TrailingMean | PlotType::TrailingCv => {
                    if self.config.trailing_runs >= runs {
                        messages.push(PanelMessage {
                            plot_type,
                            kind: PanelMessageKind::Error,
                            text: format!(
                                "{plot_type} - The number you entered is larger than the number of available runs. Only {runs} runs are used for calculation"
                            ),
                        });
                    } else if self.config.trailing_runs <= 2 {
                        messages.push(PanelMessage {
                            plot_type,
                            kind: PanelMessageKind::Error,
                            text: format!(
                                "{plot_type} - Please enter a positive integer (>2) that is less than or equal to total number of available runs - {runs}"
                            ),
                        });
                    } else if self.config.y_axis_scale.is_log() {
                        messages.push(PanelMessage {
                            plot_type,
                            kind: PanelMessageKind::Info,
                            text: log_epsilon_message(),
                        });
                    }
                }
                PlotType::MovingRange => {
                    if self.config.y_axis_scale.is_log() {
                        messages.push(PanelMessage {
                            plot_type,
                            kind: PanelMessageKind::Info,
                            text: log_epsilon_message(),
                        });
                    }
                }
                PlotType::LeveyJennings => {
                    if self.config.y_axis_scale.is_log() {
                        let any = |flag: fn(&FragmentSeries) -> bool| {
                            self.fragments.values().any(flag)
                        };
                        if any(|series| series.show_log_invalid) {
                            messages.push(PanelMessage {
                                plot_type,
                                kind: PanelMessageKind::Info,
                                text: log_invalid_message().to_string(),
                            });
                        } else if any(|series| series.show_log_warning) {
                            messages.push(PanelMessage {
                                plot_type,
                                kind: PanelMessageKind::Info,
                                text: log_warning_message().to_string(),
                            });
                        }
                    }
                }
                PlotType::CusumMean | PlotType::CusumVariable => {}
            }
        }
        messages
    }
}

fn fragment_legend_entry(
    name: String,
    text: String,
    fragment: &str,
    color: &str,
) -> LegendEntry {
    LegendEntry {
        name: Some(name),
        text,
        color: Some(color.to_string()),
        shape: None,
        separator: false,
        hover_text: Some(fragment.to_string()),
    }
}

/// Step 7a: widen a degenerate (flat) range so the y-scale has height.
fn widen_degenerate_range(extents: &mut SeriesExtents) {
    match (extents.min, extents.max) {
        (None, None) => {
            extents.min = Some(0.0);
            extents.max = Some(1.0);
        }
        (Some(min), Some(max)) if max - min < DEGENERATE_RANGE_EPSILON => {
            let factor = if max < 0.1 { 0.1 } else { 1.0 };
            extents.min = Some(min - factor);
            extents.max = Some(max + factor);
        }
        _ => {}
    }
}

/// Step 7b: insert a `missing` placeholder for every union date this
/// fragment lacks, keeping the series date-ascending. The merged vector is
/// built fresh rather than spliced in place.
fn gap_fill(series: &mut FragmentSeries, date_union: &[NaiveDateTime], grouped_x: bool) {
    let axis_key = |point: &ShapedPoint| -> Option<String> {
        if grouped_x {
            point.date.clone()
        } else {
            point.full_date.clone()
        }
    };

    let existing: FxHashSet<String> = series.data.iter().filter_map(|p| axis_key(p)).collect();

    let mut to_add: Vec<(String, ShapedPoint)> = Vec::new();
    let mut added: FxHashSet<String> = FxHashSet::default();
    for date in date_union {
        let key = format_axis_key(date, grouped_x);
        if existing.contains(&key) || added.contains(&key) {
            continue;
        }
        added.insert(key.clone());
        let point = ShapedPoint::missing(format_full_date(date), format_date(date), key.clone());
        to_add.push((key, point));
    }
    if to_add.is_empty() {
        return;
    }

    let old = std::mem::take(&mut series.data);
    let mut merged = Vec::with_capacity(old.len() + to_add.len());
    let mut pending = to_add.into_iter().peekable();
    for point in old {
        if let Some(point_key) = axis_key(&point) {
            while pending
                .peek()
                .is_some_and(|(missing_key, _)| *missing_key < point_key)
            {
                let (_, missing) = pending.next().expect("peeked");
                merged.push(missing);
            }
        }
        merged.push(point);
    }
    merged.extend(pending.map(|(_, missing)| missing));
    series.data = merged;
}

fn point_date(series: &FragmentSeries, index: usize) -> Option<String> {
    let full = series.data.get(index)?.full_date.as_deref()?;
    parse_datetime(full).ok().map(|date| format_date(&date))
}

/// Trailing panels zoom to the window the trailing statistics cover: points
/// before the oldest guide set's training start are dropped, or, with no
/// guide sets at all, points carrying no trailing value. Operates on a
/// clone; the source series is untouched.
pub fn zoom_date_range_for_trailing(
    series: &FragmentSeries,
    guide_sets: &GuideSetIndex,
) -> FragmentSeries {
    let mut zoomed = series.clone();
    if let Some(first_start) = guide_sets.earliest_training_start() {
        zoomed.data.retain(|point| {
            point
                .full_date
                .as_deref()
                .and_then(|full| parse_datetime(full).ok())
                .is_none_or(|date| date >= first_start)
        });
    } else {
        zoomed.data.retain(|point| {
            point.trailing_mean.is_some()
                || point.trailing_cv.is_some()
                || point.trailing_mean_series1.is_some()
                || point.trailing_mean_series2.is_some()
                || point.trailing_cv_series1.is_some()
                || point.trailing_cv_series2.is_some()
        });
    }
    zoomed
}
