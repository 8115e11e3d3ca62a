//! Filtering and aggregation of portfolio records

pub mod aggregate;
pub mod filter;
pub mod view;

pub use aggregate::{aggregate_all_tenors, weighted_mean};
pub use filter::{ColumnGuard, FilterParams, TenorSelection};
pub use view::{EmptyState, FilteredView};
