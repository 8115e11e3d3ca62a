use cartera::cli::{self, ChartRequest, FilterArgs, SourceArgs};
use cartera::error::CarteraResult;
use cartera::logging;
use cartera::types::Metric;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cartera")]
#[command(about = "Loan portfolio delinquency dashboard: filter, aggregate, chart, export.")]
#[command(long_about = "Cartera - loan portfolio delinquency dashboard
Reads the portfolio summary workbook (TOTAL CARTERA, PRIMERA COMPRA, RECOMPRA)

COMMANDS:
  sheets   - Show the sheets found in the workbook
  options  - List business units, departments, tenors and metrics
  view     - Print the filtered rows (table or --json)
  scatter  - Scatter of two metrics, marker size by capital balance
  bars     - Bars per department with an optional line on a second axis
  export   - Write the filtered rows to .csv or .xlsx
  watch    - Re-render a chart whenever the workbook changes

FILTERS (view, scatter, bars, export, watch):
  -b/--business-unit  required; nothing selected shows an empty view
  -d/--department     omit for every department
  -t/--tenor          months, or 'all' for balance-weighted aggregation
  --min-balance N | --strict (550,000)     default 100,000
  --rate-flag TEXT | --any-rate            default 'CON TASA'

EXAMPLES:
  cartera options -w Resumen_Cartera_Morosidad.xlsx
  cartera scatter -b 'EL BODEGON' -t all -x rrr -y pct-usgaap-90 -o bodegon.svg
  cartera bars -b ELEKTRA --bar rrr --bar rrr-con-margen -o elektra.svg
  cartera export -b ELEKTRA -t 12 -o elektra.csv

Logging: set CARTERA_LOG (e.g. CARTERA_LOG=cartera=debug).")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the sheets found in the workbook and their row counts
    Sheets {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// List the values each filter accepts
    Options {
        #[command(flatten)]
        source: SourceArgs,

        /// Restrict the department list to these business units
        #[arg(short, long = "business-unit")]
        business_units: Vec<String>,
    },

    #[command(long_about = "Print the rows that survive the filters.

With --tenor all, rows sharing business unit, department, department id,
rate flag, category and margin are collapsed: balances and USGAAP amounts
are summed, rates, %USGAAP 90 and RRR are balance-weighted means.")]
    /// Print the filtered rows
    View {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Sort descending by this metric
        #[arg(long)]
        sort: Option<Metric>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Scatter of two metrics, one colour per business unit
    Scatter {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Metric on the x axis
        #[arg(short, long, default_value = "rrr")]
        x: Metric,

        /// Metric on the y axis
        #[arg(short, long, default_value = "pct-usgaap-90")]
        y: Metric,

        /// Output SVG file
        #[arg(short, long, default_value = "scatter.svg")]
        output: PathBuf,
    },

    /// Grouped bars per department with an optional line metric
    Bars {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        chart: BarArgs,

        /// Output SVG file
        #[arg(short, long, default_value = "bars.svg")]
        output: PathBuf,
    },

    /// Write the filtered rows to .csv or .xlsx ('-' for CSV on stdout)
    Export {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Re-render a chart whenever the workbook changes
    Watch {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Chart to render
        #[arg(long, value_enum, default_value_t = WatchChart::Bars)]
        chart: WatchChart,

        /// Scatter x metric
        #[arg(short, long, default_value = "rrr")]
        x: Metric,

        /// Scatter y metric
        #[arg(short, long, default_value = "pct-usgaap-90")]
        y: Metric,

        #[command(flatten)]
        bars: BarArgs,

        /// Output SVG file
        #[arg(short, long, default_value = "dashboard.svg")]
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct BarArgs {
    /// Bar metric; repeat for grouped bars
    #[arg(long = "bar", default_value = "rrr")]
    bars: Vec<Metric>,

    /// Line metric on the secondary axis
    #[arg(long, default_value = "pct-usgaap-90", conflicts_with = "no_line")]
    line: Metric,

    /// Draw bars only
    #[arg(long)]
    no_line: bool,
}

impl BarArgs {
    fn line(&self) -> Option<Metric> {
        (!self.no_line).then_some(self.line)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum WatchChart {
    Scatter,
    Bars,
}

fn main() {
    logging::init(logging::CLI_DEFAULT_FILTER);
    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        eprintln!("{} {}", "❌ Error:".bold().red(), e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> CarteraResult<()> {
    match command {
        Commands::Sheets { source } => cli::sheets(&source),

        Commands::Options {
            source,
            business_units,
        } => cli::options(&source, &business_units),

        Commands::View {
            source,
            filters,
            sort,
            json,
        } => cli::view(&source, &filters, sort, json),

        Commands::Scatter {
            source,
            filters,
            x,
            y,
            output,
        } => cli::scatter(&source, &filters, x, y, output),

        Commands::Bars {
            source,
            filters,
            chart,
            output,
        } => {
            let line = chart.line();
            cli::bars(&source, &filters, chart.bars, line, output)
        }

        Commands::Export {
            source,
            filters,
            output,
        } => cli::export(&source, &filters, output),

        Commands::Watch {
            source,
            filters,
            chart,
            x,
            y,
            bars,
            output,
        } => {
            let request = match chart {
                WatchChart::Scatter => ChartRequest::Scatter { x, y },
                WatchChart::Bars => ChartRequest::Bars {
                    line: bars.line(),
                    bars: bars.bars,
                },
            };
            cli::watch(&source, &filters, request, output)
        }
    }
}
