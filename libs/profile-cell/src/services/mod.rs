pub mod account;
pub mod doctor;
pub mod overview;
pub mod patient;
pub mod profile;
pub mod user;
pub mod validation;

pub use account::{AccountProvisioner, NewAccount};
pub use doctor::DoctorProfileService;
pub use overview::ProfileOverviewService;
pub use patient::PatientService;
pub use profile::ProfileService;
pub use user::UserService;
