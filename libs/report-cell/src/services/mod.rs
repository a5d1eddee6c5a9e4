pub mod dashboard;
pub mod report;

pub use dashboard::DashboardService;
pub use report::ReportService;
