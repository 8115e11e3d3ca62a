use crate::chart::{BarLineChart, ScatterChart};
use crate::cli::args::{FilterArgs, SourceArgs};
use crate::config::ChartSettings;
use crate::core::{EmptyState, FilterParams, FilteredView};
use crate::error::{CarteraError, CarteraResult};
use crate::excel::ExcelExporter;
use crate::types::{Metric, Portfolio, PortfolioRecord, SheetKind};
use crate::writer;
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

/// Format a number for display, removing unnecessary decimal places
fn format_number(n: f64) -> String {
    let rounded = (n * 1e4).round() / 1e4;
    format!("{:.4}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Whole currency units with thousands separators
fn format_balance(n: f64) -> String {
    let whole = n.round() as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if whole < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

fn format_cell(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_else(|| "-".to_string())
}

fn warn_empty(view: &FilteredView) {
    if let Some(state) = view.empty_state() {
        println!("{} {}", "⚠️ ".yellow(), state.message().yellow());
    }
}

/// Execute the sheets command - list the sheets found and their row counts
pub fn sheets(source: &SourceArgs) -> CarteraResult<()> {
    let (config, portfolio) = source.load()?;

    println!("{}", "📒 Cartera - Workbook Sheets".bold().green());
    println!("   Workbook: {}\n", source.workbook_path(&config).display());

    for sheet in portfolio.sheets() {
        println!(
            "   {:<16} {:<28} {} rows",
            sheet.kind.slug().cyan(),
            sheet.name.bright_blue().bold(),
            sheet.records.len()
        );
    }
    println!("\n   Total: {} rows", portfolio.total_records());
    Ok(())
}

/// Execute the options command - show the values each filter accepts
pub fn options(source: &SourceArgs, business_units: &[String]) -> CarteraResult<()> {
    let (_, portfolio) = source.load()?;

    println!("{}", "🎛️  Cartera - Filter Options".bold().green());

    println!("\n{}", "Business units (--business-unit):".bold().cyan());
    for unit in portfolio.business_units() {
        println!("   {}", unit);
    }

    let scope = if business_units.is_empty() {
        portfolio.business_units()
    } else {
        business_units.to_vec()
    };
    println!("\n{}", "Departments (--department):".bold().cyan());
    for department in portfolio.departments(&scope) {
        println!("   {}", department);
    }

    let tenors: Vec<String> = portfolio.tenors().iter().map(|t| t.to_string()).collect();
    println!("\n{}", "Tenors (--tenor):".bold().cyan());
    println!("   {}, all", tenors.join(", "));

    println!("\n{}", "Sheets (--sheet):".bold().cyan());
    for kind in SheetKind::ALL {
        println!("   {}", kind.slug());
    }

    println!("\n{}", "Metrics:".bold().cyan());
    for metric in Metric::ALL {
        println!("   {:<18} {}", metric.slug().bright_blue(), metric.header());
    }
    Ok(())
}

/// Execute the view command - print the filtered rows
pub fn view(source: &SourceArgs, filters: &FilterArgs, sort: Option<Metric>, json: bool) -> CarteraResult<()> {
    let (config, portfolio) = source.load()?;
    let params = filters.to_params(&config)?;
    let mut view = FilteredView::derive(&portfolio, &params, &Default::default())?;
    if let Some(metric) = sort {
        view = view.sorted_desc(metric);
    }

    if json {
        let out = serde_json::to_string_pretty(&view)
            .map_err(|e| CarteraError::Export(format!("Failed to serialize view: {}", e)))?;
        println!("{}", out);
        return Ok(());
    }

    println!("{}", "📊 Cartera - Filtered View".bold().green());
    println!("   {}", view.caption());
    println!("   {} of {} rows\n", view.len(), view.source_rows);

    warn_empty(&view);
    if !view.is_empty() {
        print!("{}", format_table(&view.rows));
    }
    Ok(())
}

/// Plain-text table of the columns the dashboard shows
fn format_table(rows: &[PortfolioRecord]) -> String {
    let mut out = format!(
        "{:<14} {:<28} {:>6} {:>16} {:>8} {:>10} {:>8} {:>8}\n",
        "NEGOCIO", "DEPARTAMENTO", "PLAZO", "CARTERA", "TASA", "%USGAAP90", "RRR", "RRR+M"
    );
    out.push_str(&"─".repeat(104));
    out.push('\n');
    for r in rows {
        let tenor = r
            .tenor_months
            .map(|t| t.to_string())
            .unwrap_or_else(|| "all".to_string());
        out.push_str(&format!(
            "{:<14} {:<28} {:>6} {:>16} {:>8} {:>10} {:>8} {:>8}\n",
            truncate(&r.business_unit, 14),
            truncate(&r.department, 28),
            tenor,
            r.capital_balance.map(format_balance).unwrap_or_else(|| "-".to_string()),
            format_cell(r.weighted_rate),
            format_cell(r.usgaap90_pct),
            format_cell(r.rrr),
            format_cell(r.rrr_with_margin),
        ));
    }
    out
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(width - 1).collect();
        cut.push('…');
        cut
    }
}

//==============================================================================
// Charts
//==============================================================================

/// Which chart a render or watch produces
#[derive(Debug, Clone, PartialEq)]
pub enum ChartRequest {
    Scatter { x: Metric, y: Metric },
    Bars { bars: Vec<Metric>, line: Option<Metric> },
}

/// A drawn chart and what went into it
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub svg: String,
    pub plotted: usize,
    pub caption: String,
    pub empty_state: Option<EmptyState>,
}

impl ChartRequest {
    /// Derive the view this chart needs and draw it
    pub fn render(
        &self,
        portfolio: &Portfolio,
        params: &FilterParams,
        settings: &ChartSettings,
    ) -> CarteraResult<RenderedChart> {
        match self {
            ChartRequest::Scatter { x, y } => {
                let view = FilteredView::derive(portfolio, params, &ScatterChart::guard(*x, *y))?;
                let chart = ScatterChart::build(&view, *x, *y);
                Ok(RenderedChart {
                    svg: chart.render_svg(settings)?,
                    plotted: chart.points.len(),
                    caption: view.caption(),
                    empty_state: chart.empty_state,
                })
            }
            ChartRequest::Bars { bars, line } => {
                let view = FilteredView::derive(portfolio, params, &BarLineChart::guard(bars, *line))?;
                let chart = BarLineChart::build(&view, bars, *line)?;
                Ok(RenderedChart {
                    svg: chart.render_svg(settings)?,
                    plotted: chart.categories.len(),
                    caption: view.caption(),
                    empty_state: chart.empty_state,
                })
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ChartRequest::Scatter { .. } => "Scatter",
            ChartRequest::Bars { .. } => "Bar + line",
        }
    }
}

fn render_to_file(
    request: &ChartRequest,
    portfolio: &Portfolio,
    params: &FilterParams,
    settings: &ChartSettings,
    output: &Path,
) -> CarteraResult<RenderedChart> {
    let rendered = request.render(portfolio, params, settings)?;
    fs::write(output, &rendered.svg)?;
    Ok(rendered)
}

/// Execute the scatter command
pub fn scatter(source: &SourceArgs, filters: &FilterArgs, x: Metric, y: Metric, output: PathBuf) -> CarteraResult<()> {
    chart(source, filters, ChartRequest::Scatter { x, y }, output)
}

/// Execute the bars command
pub fn bars(
    source: &SourceArgs,
    filters: &FilterArgs,
    bars: Vec<Metric>,
    line: Option<Metric>,
    output: PathBuf,
) -> CarteraResult<()> {
    chart(source, filters, ChartRequest::Bars { bars, line }, output)
}

fn chart(source: &SourceArgs, filters: &FilterArgs, request: ChartRequest, output: PathBuf) -> CarteraResult<()> {
    let (config, portfolio) = source.load()?;
    let params = filters.to_params(&config)?;

    println!("{}", format!("📈 Cartera - {} Chart", request.name()).bold().green());

    let rendered = render_to_file(&request, &portfolio, &params, &config.chart, &output)?;
    println!("   Selection: {}", rendered.caption);
    if let Some(state) = rendered.empty_state {
        println!("{} {}", "⚠️ ".yellow(), state.message().yellow());
    }

    println!("{}", "✅ Chart written".bold().green());
    println!("   {} ({} rows plotted)\n", output.display(), rendered.plotted);
    Ok(())
}

//==============================================================================
// Export
//==============================================================================

/// Execute the export command - CSV or XLSX by extension, `-` for CSV on stdout
pub fn export(source: &SourceArgs, filters: &FilterArgs, output: PathBuf) -> CarteraResult<()> {
    let (config, portfolio) = source.load()?;
    let params = filters.to_params(&config)?;
    let view = FilteredView::derive(&portfolio, &params, &Default::default())?;

    if output.as_os_str() == "-" {
        return writer::write_csv(io::stdout().lock(), &view.rows);
    }

    println!("{}", "📤 Cartera - Export".bold().green());
    println!("   Selection: {}", view.caption());
    warn_empty(&view);

    export_rows(&view.rows, &output)?;

    println!("{}", "✅ Export Complete!".bold().green());
    println!("   {} rows → {}\n", view.len(), output.display());
    Ok(())
}

/// Write rows to `.csv` or `.xlsx` depending on the extension
pub fn export_rows(rows: &[PortfolioRecord], output: &Path) -> CarteraResult<()> {
    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => writer::write_csv_file(output, rows),
        Some("xlsx") => ExcelExporter::new().sheet("VISTA", rows).export(output),
        _ => Err(CarteraError::Validation(format!(
            "Unsupported export format for {}: use .csv or .xlsx",
            output.display()
        ))),
    }
}

//==============================================================================
// Watch
//==============================================================================

/// Execute the watch command - re-render whenever the workbook changes
pub fn watch(source: &SourceArgs, filters: &FilterArgs, request: ChartRequest, output: PathBuf) -> CarteraResult<()> {
    let config = source.load_config()?;
    let params = filters.to_params(&config)?;
    let workbook = source.workbook_path(&config);

    println!("{}", "👁️  Cartera - Watch Mode".bold().green());
    println!("   Watching: {}", workbook.display());
    println!("   Chart: {} → {}", request.name(), output.display());
    println!("   Press {} to stop\n", "Ctrl+C".bold().yellow());

    if !workbook.exists() {
        return Err(CarteraError::Validation(format!(
            "File not found: {}",
            workbook.display()
        )));
    }

    let canonical_path = workbook.canonicalize()?;
    let parent_dir = canonical_path
        .parent()
        .ok_or_else(|| CarteraError::Validation("Cannot determine parent directory".to_string()))?;

    let (tx, rx) = channel();
    let mut debouncer = new_debouncer(Duration::from_millis(300), tx)
        .map_err(|e| CarteraError::Validation(format!("Failed to create file watcher: {}", e)))?;
    debouncer
        .watcher()
        .watch(parent_dir, RecursiveMode::NonRecursive)
        .map_err(|e| CarteraError::Validation(format!("Failed to watch directory: {}", e)))?;

    println!("{}", "🔄 Initial render...".cyan());
    run_watch_action(source, &params, &request, &output);
    println!();

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant = events.iter().any(|event| {
                    event.kind == DebouncedEventKind::Any
                        && event.path.file_name() == canonical_path.file_name()
                });
                if relevant {
                    println!(
                        "\n{} {}",
                        "🔄 Change detected at".cyan(),
                        chrono::Local::now().format("%H:%M:%S").to_string().cyan()
                    );
                    run_watch_action(source, &params, &request, &output);
                }
            }
            Ok(Err(error)) => {
                eprintln!("{} Watch error: {}", "❌".red(), error);
            }
            Err(e) => {
                eprintln!("{} Channel error: {}", "❌".red(), e);
                break;
            }
        }
    }

    Ok(())
}

/// Reload and re-render; failures are reported and the watch continues
fn run_watch_action(source: &SourceArgs, params: &FilterParams, request: &ChartRequest, output: &Path) {
    let result = source
        .load()
        .and_then(|(config, portfolio)| render_to_file(request, &portfolio, params, &config.chart, output));
    match result {
        Ok(rendered) => println!(
            "{} {} rows plotted",
            "✅ Rendered".bold().green(),
            rendered.plotted
        ),
        Err(e) => {
            tracing::warn!(error = %e, "watch render failed");
            println!("{} {}", "❌ Render failed:".bold().red(), e);
        }
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
