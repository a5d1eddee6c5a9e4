pub mod booking;
pub mod lifecycle;
pub mod review;

pub use booking::{ensure_can_view, AppointmentService};
pub use review::ReviewService;
