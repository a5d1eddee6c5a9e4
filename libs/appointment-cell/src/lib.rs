pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Appointment, AppointmentError, AppointmentPaymentStatus, AppointmentStatus, Participant};
pub use services::{AppointmentService, ReviewService};
