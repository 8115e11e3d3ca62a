//! Cartera API Server binary
//!
//! Serves the dashboard's filters, charts and CSV export over HTTP.

use clap::Parser;
use cartera::api::{run_api_server, ApiConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cartera-server")]
#[command(version)]
#[command(about = "Cartera API Server - loan portfolio dashboard over HTTP")]
#[command(long_about = r#"
Cartera API Server

Loads the portfolio workbook once and serves:
  - GET  /api/v1/options       - Business units, departments, tenors, metrics
  - POST /api/v1/view          - Filtered rows as JSON
  - POST /api/v1/chart/scatter - Scatter chart (SVG)
  - POST /api/v1/chart/bars    - Bar + line chart (SVG)
  - POST /api/v1/export/csv    - Filtered rows as CSV

Additional endpoints:
  - GET  /health               - Health check
  - GET  /version              - Server version info
  - GET  /                     - API documentation

Example usage:
  cartera-server -w Resumen_Cartera_Morosidad.xlsx
  cartera-server --host 0.0.0.0 --port 3000 --config cartera.yaml

  curl -X POST http://localhost:8080/api/v1/chart/scatter \
    -H "Content-Type: application/json" \
    -d '{"business_units": ["EL BODEGON"], "tenor": "all", "x": "rrr", "y": "pct-usgaap-90"}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "CARTERA_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "CARTERA_PORT")]
    port: u16,

    /// Workbook to serve (defaults to the config's `workbook`)
    #[arg(short, long, env = "CARTERA_WORKBOOK")]
    workbook: Option<PathBuf>,

    /// YAML config file
    #[arg(short, long, env = "CARTERA_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ApiConfig {
        host: args.host,
        port: args.port,
        workbook: args.workbook,
        config: args.config,
    };

    run_api_server(config).await
}
