//! HTTP API
//!
//! The workbook is loaded once at startup and shared read-only; every
//! request derives its own view from it. Run with `cartera-server`.

pub mod handlers;
pub mod server;

pub use server::{app, run_api_server, ApiConfig, AppState};
