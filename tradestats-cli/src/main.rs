//! TradeStats CLI: report, drawdown and chart export commands.
//!
//! Commands:
//! - `report`: load a trade journal (file or URL) and print its statistics
//! - `drawdown`: max drawdown from per-trade returns, a cumulative curve, or equity balances
//! - `charts`: write the chart datasets for a journal as JSON files

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Table};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tradestats_core::metrics::{max_drawdown_from_equity, max_drawdown_from_pct_returns};
use tradestats_core::report::format_value;
use tradestats_core::{
    clean_text, load_table, ChartData, CleanOptions, InvalidMarker, PercentPolicy, StatsConfig,
    StatsReport,
};

#[derive(Parser)]
#[command(
    name = "tradestats",
    about = "TradeStats CLI: performance statistics for a trade journal"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the statistics report for a trade journal.
    Report {
        /// CSV path or http(s) URL of the journal.
        #[arg(long)]
        input: String,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,

        /// Write the report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// What an unparseable cell becomes (overrides the config file).
        #[arg(long, value_enum)]
        invalid: Option<InvalidArg>,

        /// Reject bare numbers outside [-1, 1] in percentage columns.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Maximum drawdown of a returns or equity series.
    Drawdown {
        /// Comma-separated per-trade fractional returns, e.g. 0.02,-0.01.
        #[arg(long)]
        returns: Option<String>,

        /// Comma-separated cumulative growth curve (baseline 0.0).
        #[arg(long)]
        cumulative: Option<String>,

        /// Comma-separated absolute equity balances.
        #[arg(long, conflicts_with_all = ["returns", "cumulative"])]
        equity: Option<String>,
    },
    /// Export chart datasets as JSON files.
    Charts {
        /// CSV path or http(s) URL of the journal.
        #[arg(long)]
        input: String,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for the JSON files. Created if missing.
        #[arg(long, default_value = "charts")]
        output_dir: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Markdown,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InvalidArg {
    Zero,
    Null,
}

impl From<InvalidArg> for InvalidMarker {
    fn from(arg: InvalidArg) -> Self {
        match arg {
            InvalidArg::Zero => InvalidMarker::Zero,
            InvalidArg::Null => InvalidMarker::Null,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            input,
            config,
            format,
            output,
            invalid,
            strict,
        } => run_report(&input, config.as_deref(), format, output.as_deref(), invalid, strict),
        Commands::Drawdown {
            returns,
            cumulative,
            equity,
        } => run_drawdown(returns.as_deref(), cumulative.as_deref(), equity.as_deref()),
        Commands::Charts {
            input,
            config,
            output_dir,
        } => run_charts(&input, config.as_deref(), &output_dir),
    }
}

fn run_report(
    input: &str,
    config_path: Option<&Path>,
    format: Format,
    output: Option<&Path>,
    invalid: Option<InvalidArg>,
    strict: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(invalid) = invalid {
        config.cleaning.invalid = invalid.into();
    }
    if strict {
        config.cleaning.percent_policy = PercentPolicy::Strict;
    }

    let table = load_table(input).with_context(|| format!("loading {input}"))?;
    let report = StatsReport::from_table(&table, &config)?;

    let rendered = match format {
        Format::Table => render_table(&report),
        Format::Markdown => report.to_markdown(),
        Format::Json => report.to_json()?,
    };
    write_output(&rendered, output)
}

fn run_drawdown(
    returns: Option<&str>,
    cumulative: Option<&str>,
    equity: Option<&str>,
) -> Result<()> {
    let drawdown = if let Some(equity) = equity {
        max_drawdown_from_equity(&parse_list(equity)?)?
    } else {
        let returns = returns.map(parse_list).transpose()?;
        let cumulative = cumulative.map(parse_list).transpose()?;
        max_drawdown_from_pct_returns(returns.as_deref(), cumulative.as_deref())?
    };
    println!("Max Drawdown: {:.2}%", drawdown * 100.0);
    Ok(())
}

fn run_charts(input: &str, config_path: Option<&Path>, output_dir: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let table = load_table(input).with_context(|| format!("loading {input}"))?;
    let required = config.required_columns();
    let trades = table.validate(&required)?;
    let charts = ChartData::from_trades(&trades, config.cleaning);

    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    let datasets = [
        ("pl_curve", serde_json::to_string_pretty(&charts.pl_curve)?),
        (
            "outcome_by_weekday",
            serde_json::to_string_pretty(&charts.outcome_by_weekday)?,
        ),
        (
            "pl_by_weekday",
            serde_json::to_string_pretty(&charts.pl_by_weekday)?,
        ),
        (
            "pl_distribution",
            serde_json::to_string_pretty(&charts.pl_distribution)?,
        ),
        (
            "risk_vs_reward",
            serde_json::to_string_pretty(&charts.risk_vs_reward)?,
        ),
        ("rr_heatmap", serde_json::to_string_pretty(&charts.rr_heatmap)?),
    ];
    for (name, json) in datasets {
        let path = output_dir.join(format!("{name}.json"));
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    }
    println!("Chart data saved to: {}", output_dir.display());
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<StatsConfig> {
    match path {
        Some(path) => Ok(StatsConfig::from_file(path)?),
        None => Ok(StatsConfig::default()),
    }
}

/// Parse `"0.02, -0.01,3%"` into fractions, with the same rules as a
/// journal cell. Percent suffixes are honoured.
fn parse_list(raw: &str) -> Result<Vec<f64>> {
    let opts = CleanOptions::new(InvalidMarker::Null, PercentPolicy::Lenient);
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match clean_text(s, opts) {
            Some(value) => Ok(value),
            None => bail!("invalid number '{s}'"),
        })
        .collect()
}

fn render_table(report: &StatsReport) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Statistic", "Value"]);
    for (key, value) in report.entries() {
        table.add_row(vec![
            Cell::new(key.label()),
            Cell::new(format_value(key, value)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

fn write_output(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?;
            println!("Report saved to: {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
