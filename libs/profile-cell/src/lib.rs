pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{ClinicUser, Doctor, Gender, Patient, Profile, ProfileError, UserName};
pub use services::{
    AccountProvisioner, DoctorProfileService, NewAccount, PatientService, ProfileOverviewService, ProfileService,
    UserService,
};
