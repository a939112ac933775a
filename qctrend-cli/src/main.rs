use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use qctrend::config::{PlotConfig, SeriesArity, YAxisScale};
use qctrend::plot_type::PlotType;
use qctrend::{AnnotationRow, PlotDataPayload, process_plot_data};
use tracing::{debug, info};

/// Shape raw QC metric rows into renderer-ready trend plot series
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "qctrend")]
struct Cli {
    /// Path to the plot-data payload JSON (plotDataRows + metricProps + sampleFiles)
    #[arg(value_name = "PLOT_DATA")]
    plot_data: PathBuf,

    /// Path to the annotation rows JSON (optional)
    #[arg(short, long, value_name = "ANNOTATIONS")]
    annotations: Option<PathBuf>,

    /// Plot types to shape (comma-separated, e.g. "Levey-Jennings,Moving Range,CUSUMm")
    #[arg(
        short,
        long,
        value_delimiter = ',',
        value_parser = parse_plot_type,
        default_value = "Levey-Jennings"
    )]
    plot_types: Vec<PlotType>,

    /// Y-axis scale (linear, log, percentDeviation, standardDeviation)
    #[arg(long, value_parser = parse_scale, default_value = "linear")]
    y_scale: YAxisScale,

    /// Group x-axis values by date instead of one tick per acquisition
    #[arg(long)]
    grouped_x: bool,

    /// Overlay all fragments on a single combined plot
    #[arg(long)]
    single_plot: bool,

    /// Trailing window size for Trailing Mean / Trailing CV
    #[arg(long, default_value = "10")]
    trailing_runs: usize,

    /// Total number of runs available for the active filter
    /// (defaults to the sample file count in the payload)
    #[arg(long)]
    runs: Option<usize>,

    /// Visible range start date (e.g. "2024-03-01" or "2024-03-01 10:30")
    #[arg(long)]
    start_date: Option<String>,

    /// Visible range end date
    #[arg(long)]
    end_date: Option<String>,

    /// Paging window over the fragment blocks, as "start..end"
    #[arg(long, value_parser = parse_page_window)]
    page: Option<(usize, usize)>,

    /// Output path for the shaped plot JSON (stdout if omitted)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_plot_type(value: &str) -> Result<PlotType, String> {
    PlotType::from_str(value.trim()).map_err(|_| {
        format!(
            "unknown plot type '{value}' (expected one of: Levey-Jennings, Moving Range, CUSUMm, CUSUMv, Trailing Mean, Trailing CV)"
        )
    })
}

fn parse_scale(value: &str) -> Result<YAxisScale, String> {
    YAxisScale::from_str(value)
        .map_err(|_| format!("unknown y-axis scale '{value}'"))
}

fn parse_page_window(value: &str) -> Result<(usize, usize), String> {
    let (start, end) = value
        .split_once("..")
        .ok_or_else(|| format!("expected start..end, got '{value}'"))?;
    let start = start.parse().map_err(|_| format!("bad page start '{start}'"))?;
    let end = end.parse().map_err(|_| format!("bad page end '{end}'"))?;
    Ok((start, end))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let payload_text = fs::read_to_string(&cli.plot_data)
        .with_context(|| format!("reading plot data payload {}", cli.plot_data.display()))?;
    let payload: PlotDataPayload =
        serde_json::from_str(&payload_text).context("parsing plot data payload")?;
    debug!(
        fragments = payload.plot_data_rows.len(),
        sample_files = payload.sample_files.len(),
        "payload loaded"
    );

    let annotation_rows: Vec<AnnotationRow> = match &cli.annotations {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading annotations {}", path.display()))?;
            serde_json::from_str(&text).context("parsing annotation rows")?
        }
        None => Vec::new(),
    };

    let start_date = cli
        .start_date
        .as_deref()
        .map(qctrend::dates::parse_datetime)
        .transpose()
        .context("parsing --start-date")?;
    let end_date = cli
        .end_date
        .as_deref()
        .map(qctrend::dates::parse_datetime)
        .transpose()
        .context("parsing --end-date")?;

    let mut builder = PlotConfig::new();
    builder
        .plot_types(cli.plot_types.clone())
        .y_axis_scale(cli.y_scale)
        .grouped_x(cli.grouped_x)
        .single_plot(cli.single_plot)
        .series_arity(SeriesArity::from_metric(&payload.metric_props))
        .trailing_runs(cli.trailing_runs)
        .runs(cli.runs.unwrap_or(0));
    if let Some(start_date) = start_date {
        builder.start_date(start_date);
    }
    if let Some(end_date) = end_date {
        builder.end_date(end_date);
    }
    if let Some(page) = cli.page {
        builder.page_window(page);
    }
    let config = builder.build().context("building plot config")?;

    let plot_data = process_plot_data(&payload, &annotation_rows, &config)?;

    if let Some(message) = &plot_data.empty_message {
        info!("{message}");
    }
    for panel_message in &plot_data.panel_messages {
        info!(plot_type = %panel_message.plot_type, "{}", panel_message.text);
    }
    info!(
        fragments = plot_data.fragments.len(),
        show_data_points = plot_data.show_data_points,
        "shaped plot data"
    );

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&plot_data)?
    } else {
        serde_json::to_string(&plot_data)?
    };
    match &cli.output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("writing output {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
