pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Dashboard, DateRange, Report, ReportError, ReportType};
pub use services::{DashboardService, ReportService};
