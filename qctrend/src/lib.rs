//! Control-chart data shaping for instrument QC trend plots.
//!
//! This crate turns raw per-run metric rows, guide-set reference statistics,
//! and QC annotation events into renderer-ready series for a family of trend
//! plots: Levey-Jennings, moving range, CUSUM (mean and variability), and
//! trailing mean / trailing CV. It owns the data shaping only — running
//! queries and drawing charts belong to the surrounding platform.
//!
//! # Quick Start
//!
//! ```no_run
//! use qctrend::config::PlotConfig;
//! use qctrend::plot_type::PlotType;
//! use qctrend::{PlotDataPayload, process_plot_data};
//!
//! let payload: PlotDataPayload = serde_json::from_str(r#"{"plotDataRows": []}"#)?;
//! let config = PlotConfig::new()
//!     .plot_types(vec![PlotType::LeveyJennings, PlotType::MovingRange])
//!     .build()?;
//!
//! let plot_data = process_plot_data(&payload, &[], &config)?;
//! for fragment in &plot_data.fragments {
//!     println!("{}: {} points", fragment.series.fragment, fragment.series.data.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Pipeline
//!
//! Raw query rows + guide-set rows + annotation rows flow through:
//!
//! 1. [`guide_set::GuideSetIndex`] — per-guide-set reference statistics plus
//!    the default (un-scoped) fallback per series label.
//! 2. [`plot_type`] modules — one per plot type, each shaping rows and
//!    accumulating min/max extents.
//! 3. [`session::process_plot_data`] — the orchestrator: joins sample-file
//!    metadata, unions and gap-fills dates, truncates to the reference
//!    window, and computes per-fragment and combined y-axis domains.
//! 4. [`legend::UniquePrefixGenerator`] — compact unique abbreviations for
//!    legend labels.
//!
//! Everything is rebuilt from scratch per render pass; [`refresh`] holds the
//! debounce/supersede policy for rapid repeated requests.

pub mod annotations;
pub mod config;
pub mod dates;
pub mod error;
pub mod guide_set;
pub mod legend;
pub mod metrics;
pub mod payload;
pub mod plot_type;
pub mod refresh;
pub mod series;
pub mod session;

pub use annotations::{Annotation, AnnotationSet, process_annotations};
pub use config::{PlotConfig, SeriesArity, SeriesType, YAxisScale};
pub use error::{QcTrendError, Result};
pub use guide_set::GuideSetIndex;
pub use legend::UniquePrefixGenerator;
pub use payload::{AnnotationRow, MetricProps, PlotDataPayload, PlotDataRow, RawMetricRow};
pub use plot_type::{PlotDomain, PlotType};
pub use series::{FragmentSeries, ShapedPoint};
pub use session::{PlotData, process_plot_data, zoom_date_range_for_trailing};
