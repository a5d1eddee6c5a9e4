pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    DoctorAvailability, DoctorError, DoctorSummary, DoctorWithUser, Review, ReviewView, Specialization, TimeSlot,
};
pub use services::{AvailabilityService, DoctorService};
