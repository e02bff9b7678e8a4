pub mod charts;
pub mod config;
pub mod dashboard_server;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{build_dashboard, DashboardBundle, DashboardState};
