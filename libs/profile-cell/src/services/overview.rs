use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::Role;

use crate::models::{
    ClinicUser, Doctor, PatientView, ProfileError, ProfileView, UpdateDoctorFields, UpdatePatientFields,
    UpdateProfileRequest,
};
use crate::services::validation::validate_profile_update;
use crate::services::{DoctorProfileService, PatientService, ProfileService, UserService};

#[derive(Debug, Serialize)]
pub struct ProfileOverview {
    pub user: ClinicUser,
    pub profile: ProfileView,
    pub patient: Option<PatientView>,
    pub doctor: Option<Doctor>,
}

/// The account page: user, profile and the role record together.
pub struct ProfileOverviewService {
    supabase: SupabaseClient,
    users: UserService,
    profiles: ProfileService,
    patients: PatientService,
    doctors: DoctorProfileService,
}

impl ProfileOverviewService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            users: UserService::new(config),
            profiles: ProfileService::new(config),
            patients: PatientService::new(config),
            doctors: DoctorProfileService::new(config),
        }
    }

    pub async fn load(&self, user_id: Uuid, auth_token: &str) -> Result<ProfileOverview, ProfileError> {
        let user = self.users.get(user_id, auth_token).await?;
        let profile = self.profiles.get_or_create(user_id, auth_token).await?;

        let (patient, doctor): (Option<PatientView>, Option<Doctor>) = match user.role {
            Role::Patient => (
                Some(self.patients.get_or_create_for_user(user_id, auth_token).await?.into()),
                None,
            ),
            Role::Doctor => (None, Some(self.doctors.get_or_create_for_user(user_id, auth_token).await?)),
            Role::Admin => (None, None),
        };

        Ok(ProfileOverview {
            user,
            profile: ProfileView::new(profile, today()),
            patient,
            doctor,
        })
    }

    /// Validate every section first, then write user, profile and role rows.
    pub async fn update(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
        auth_token: &str,
    ) -> Result<ProfileOverview, ProfileError> {
        let current = self.load(user_id, auth_token).await?;

        let mut errors = validate_profile_update(&request, today());
        if request.patient.is_some() && current.user.role != Role::Patient {
            errors.add("patient", "Patient details only apply to patient accounts.");
        }
        if request.doctor.is_some() && current.user.role != Role::Doctor {
            errors.add("doctor", "Doctor details only apply to doctor accounts.");
        }
        if let (Some(fields), Some(doctor)) = (&request.doctor, &current.doctor) {
            let from = fields.available_from.unwrap_or(doctor.available_from);
            let to = fields.available_to.unwrap_or(doctor.available_to);
            if from >= to && (fields.available_from.is_none() || fields.available_to.is_none()) {
                errors.add("available_from", "Available 'from' time must be before 'to' time.");
            }
        }
        let new_email = request
            .email
            .as_deref()
            .filter(|email| !email.eq_ignore_ascii_case(&current.user.email));
        if let Some(email) = new_email {
            if let Some(other) = self.users.find_by_email(email, Some(auth_token)).await? {
                if other.id != user_id {
                    errors.add("email", "A user with that email already exists.");
                }
            }
        }
        if !errors.is_empty() {
            return Err(ProfileError::Validation(errors.messages().join("; ")));
        }

        debug!("Applying profile update for user {}", user_id);

        // Sign-in goes through the auth user's email, so it moves first.
        if let Some(email) = new_email {
            self.supabase.update_email(auth_token, email).await?;
        }

        let user_changes = user_changes(&request);
        if !user_changes.is_empty() {
            self.users.update(user_id, user_changes, auth_token).await?;
        }

        let profile_changes = profile_changes(&request);
        if !profile_changes.is_empty() {
            self.profiles
                .update(current.profile.profile.id, profile_changes, auth_token)
                .await?;
        }

        if let (Some(fields), Some(patient)) = (&request.patient, &current.patient) {
            let changes = patient_changes(fields);
            if !changes.is_empty() {
                self.patients.update(patient.patient.id, changes, auth_token).await?;
            }
        }

        if let (Some(fields), Some(doctor)) = (&request.doctor, &current.doctor) {
            let changes = doctor_changes(fields);
            if !changes.is_empty() {
                self.doctors.update(doctor.id, changes, auth_token).await?;
            }
            if let Some(ids) = &fields.specialization_ids {
                self.doctors.set_specializations(doctor.id, ids, Some(auth_token)).await?;
            }
        }

        info!("Profile updated for user {}", user_id);
        self.load(user_id, auth_token).await
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn put<T: Serialize>(map: &mut Map<String, Value>, key: &str, value: &Option<T>) {
    if let Some(v) = value {
        map.insert(key.to_string(), json!(v));
    }
}

fn user_changes(request: &UpdateProfileRequest) -> Map<String, Value> {
    let mut map = Map::new();
    put(&mut map, "first_name", &request.first_name);
    put(&mut map, "last_name", &request.last_name);
    put(&mut map, "email", &request.email);
    put(&mut map, "phone", &request.phone);
    map
}

fn profile_changes(request: &UpdateProfileRequest) -> Map<String, Value> {
    let mut map = Map::new();
    put(&mut map, "bio", &request.bio);
    put(&mut map, "date_of_birth", &request.date_of_birth);
    put(&mut map, "gender", &request.gender);
    put(&mut map, "address", &request.address);
    put(&mut map, "profile_picture_url", &request.profile_picture_url);
    map
}

fn patient_changes(fields: &UpdatePatientFields) -> Map<String, Value> {
    let mut map = Map::new();
    put(&mut map, "blood_group", &fields.blood_group);
    put(&mut map, "height", &fields.height);
    put(&mut map, "weight", &fields.weight);
    put(&mut map, "allergies", &fields.allergies);
    put(&mut map, "chronic_conditions", &fields.chronic_conditions);
    put(&mut map, "emergency_contact_name", &fields.emergency_contact_name);
    put(&mut map, "emergency_contact_phone", &fields.emergency_contact_phone);
    put(&mut map, "emergency_contact_relation", &fields.emergency_contact_relation);
    map
}

fn doctor_changes(fields: &UpdateDoctorFields) -> Map<String, Value> {
    let mut map = Map::new();
    put(&mut map, "experience_years", &fields.experience_years);
    put(&mut map, "consultation_fee", &fields.consultation_fee);
    put(&mut map, "license_number", &fields.license_number);
    put(&mut map, "clinic_address", &fields.clinic_address);
    put(&mut map, "available_days", &fields.available_days.as_ref().map(|days| days.join(",")));
    put(&mut map, "available_from", &fields.available_from);
    put(&mut map, "available_to", &fields.available_to);
    put(&mut map, "education", &fields.education);
    put(&mut map, "languages", &fields.languages);
    put(&mut map, "awards", &fields.awards);
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    #[test]
    fn only_present_fields_are_written() {
        let request = UpdateProfileRequest {
            first_name: Some("Jane".into()),
            gender: Some(Gender::PreferNotToSay),
            ..Default::default()
        };
        let user = user_changes(&request);
        assert_eq!(user.len(), 1);
        assert_eq!(user["first_name"], "Jane");

        let profile = profile_changes(&request);
        assert_eq!(profile["gender"], "prefer_not_to_say");
        assert!(!profile.contains_key("bio"));
    }

    #[test]
    fn available_days_are_stored_comma_separated() {
        let fields = UpdateDoctorFields {
            available_days: Some(vec!["Mon".into(), "Wed".into()]),
            ..Default::default()
        };
        assert_eq!(doctor_changes(&fields)["available_days"], "Mon,Wed");
    }
}
