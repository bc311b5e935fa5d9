//! API layer
//!
//! HTTP handlers for:
//! - Dashboard (game analytics, admin only)
//! - Metrics (Prometheus)

mod dashboard;
pub mod metrics;

pub use dashboard::{HomeResponse, SessionDetail, UserDetail, dashboard_router, home};
pub use metrics::metrics_router;
