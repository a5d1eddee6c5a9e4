use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use profile_cell::models::UserName;
use profile_cell::services::{AccountProvisioner, DoctorProfileService, NewAccount};
use shared_config::AppConfig;
use shared_database::{in_list, SupabaseClient};
use shared_models::auth::Role;
use shared_models::pagination::{paginate, Page};
use shared_utils::validation::{password_issues, validate_email, validate_username, FieldErrors};

use crate::models::{
    slugify, AddDoctorRequest, CreateSpecializationRequest, DoctorAvailability, DoctorError, DoctorListQuery,
    DoctorSummary, DoctorUser, DoctorWithUser, Review, ReviewView, Specialization, DOCTORS_PER_PAGE,
};
use crate::services::AvailabilityService;

const DOCTOR_EMBED: &str = "*,user:users(username,first_name,last_name,email),specializations(*)";

#[derive(Debug, Deserialize)]
struct RatingRow {
    doctor_id: Uuid,
    rating: i32,
}

/// Everything the public doctor page shows.
#[derive(Debug, Serialize)]
pub struct DoctorDetail {
    pub doctor: DoctorSummary,
    pub availability: Vec<DoctorAvailability>,
    pub reviews: Vec<ReviewView>,
    pub review_count: usize,
}

pub struct DoctorService {
    supabase: SupabaseClient,
    availability: AvailabilityService,
    doctors: DoctorProfileService,
    accounts: AccountProvisioner,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            availability: AvailabilityService::new(config),
            doctors: DoctorProfileService::new(config),
            accounts: AccountProvisioner::new(config),
        }
    }

    // ==========================================================================
    // SPECIALIZATIONS
    // ==========================================================================

    pub async fn list_specializations(&self, auth_token: Option<&str>) -> Result<Vec<Specialization>, DoctorError> {
        Ok(self
            .supabase
            .select("/rest/v1/specializations?order=name.asc", auth_token)
            .await?)
    }

    pub async fn create_specialization(
        &self,
        request: CreateSpecializationRequest,
        auth_token: &str,
    ) -> Result<Specialization, DoctorError> {
        let name = request.name.trim().to_string();
        let slug = slugify(&name);
        if name.is_empty() || slug.is_empty() {
            return Err(DoctorError::Validation("Specialization name is required.".to_string()));
        }

        let path = format!(
            "/rest/v1/specializations?or=(name.ilike.{},slug.eq.{})",
            urlencoding::encode(&name),
            slug
        );
        let existing: Vec<Specialization> = self.supabase.select(&path, Some(auth_token)).await?;
        if !existing.is_empty() {
            return Err(DoctorError::Conflict(format!("Specialization '{}' already exists.", name)));
        }

        let row = json!({
            "name": name,
            "slug": slug,
            "description": request.description,
            "icon": request.icon,
        });
        let specialization: Specialization = self
            .supabase
            .insert("specializations", row, Some(auth_token))
            .await?;

        info!("Created specialization {} ({})", specialization.name, specialization.slug);
        Ok(specialization)
    }

    // ==========================================================================
    // LISTING
    // ==========================================================================

    /// Active doctors with user and specializations embedded.
    pub async fn active_doctors(&self, auth_token: Option<&str>) -> Result<Vec<DoctorWithUser>, DoctorError> {
        let path = format!("/rest/v1/doctors?is_active=eq.true&select={}", DOCTOR_EMBED);
        Ok(self.supabase.select(&path, auth_token).await?)
    }

    pub async fn list_doctors(
        &self,
        query: &DoctorListQuery,
        auth_token: Option<&str>,
    ) -> Result<Page<DoctorSummary>, DoctorError> {
        let mut path = format!("/rest/v1/doctors?is_active=eq.true&select={}", DOCTOR_EMBED);
        if let Some(min) = query.min_experience {
            path.push_str(&format!("&experience_years=gte.{}", min));
        }
        if let Some(max) = query.max_fee {
            path.push_str(&format!("&consultation_fee=lte.{}", max));
        }

        let doctors: Vec<DoctorWithUser> = self.supabase.select(&path, auth_token).await?;
        debug!("Fetched {} active doctors before filtering", doctors.len());

        let name = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let specialization = query.specialization.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let doctors: Vec<DoctorWithUser> = doctors
            .into_iter()
            .filter(|d| name.map_or(true, |n| d.user.name.matches_name(n)))
            .filter(|d| specialization.map_or(true, |s| d.has_specialization(s)))
            .collect();

        let ids: Vec<Uuid> = doctors.iter().map(|d| d.doctor.id).collect();
        let ratings = self.ratings_for(&ids, auth_token).await?;

        let summaries = doctors
            .into_iter()
            .map(|doctor| {
                let average_rating = ratings.get(&doctor.doctor.id).copied();
                summarize(doctor, average_rating)
            })
            .collect();

        Ok(paginate(summaries, query.page.as_deref(), DOCTORS_PER_PAGE))
    }

    async fn ratings_for(&self, doctor_ids: &[Uuid], auth_token: Option<&str>) -> Result<HashMap<Uuid, f64>, DoctorError> {
        if doctor_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let path = format!(
            "/rest/v1/reviews?doctor_id={}&select=doctor_id,rating",
            in_list(doctor_ids.iter().map(Uuid::to_string))
        );
        let rows: Vec<RatingRow> = self.supabase.select(&path, auth_token).await?;
        Ok(average_ratings(rows.into_iter().map(|r| (r.doctor_id, r.rating))))
    }

    // ==========================================================================
    // DETAIL
    // ==========================================================================

    pub async fn get_doctor_detail(&self, doctor_id: Uuid, auth_token: Option<&str>) -> Result<DoctorDetail, DoctorError> {
        let doctor_path = format!("/rest/v1/doctors?id=eq.{}&select={}", doctor_id, DOCTOR_EMBED);
        let reviews_path = format!(
            "/rest/v1/reviews?doctor_id=eq.{}&select=*,patient:patients(user:users(username,first_name,last_name))&order=created_at.desc",
            doctor_id
        );

        let (doctor, availability, reviews) = futures::try_join!(
            async {
                let doctor: Option<DoctorWithUser> = self.supabase.select_one(&doctor_path, auth_token).await?;
                Ok::<_, DoctorError>(doctor)
            },
            self.availability.list_available(doctor_id, auth_token),
            async {
                let reviews: Vec<Review> = self.supabase.select(&reviews_path, auth_token).await?;
                Ok::<_, DoctorError>(reviews)
            },
        )?;
        let doctor = doctor.ok_or(DoctorError::NotFound)?;

        let average_rating = average_ratings(reviews.iter().map(|r| (r.doctor_id, r.rating)))
            .get(&doctor_id)
            .copied();
        let reviews: Vec<ReviewView> = reviews.into_iter().map(ReviewView::from).collect();

        Ok(DoctorDetail {
            doctor: summarize(doctor, average_rating),
            availability,
            review_count: reviews.len(),
            reviews,
        })
    }

    // ==========================================================================
    // ADMIN
    // ==========================================================================

    /// Create the auth user, account, profile and doctor rows for a new
    /// doctor and link the chosen specialization.
    pub async fn add_doctor(&self, request: AddDoctorRequest, auth_token: &str) -> Result<DoctorWithUser, DoctorError> {
        let mut errors = validate_new_doctor(&request);
        self.accounts
            .check_unique(&request.username, &request.email, &mut errors, Some(auth_token))
            .await?;
        if !errors.is_empty() {
            return Err(DoctorError::Validation(errors.messages().join("; ")));
        }

        let path = format!("/rest/v1/specializations?id=eq.{}", request.specialization_id);
        let specialization: Specialization = self
            .supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(DoctorError::SpecializationNotFound)?;

        let auth_user = self
            .supabase
            .admin_create_user(
                &request.email,
                &request.password,
                json!({ "role": Role::Doctor, "username": request.username }),
            )
            .await?;
        let user_id = Uuid::parse_str(&auth_user.id)
            .map_err(|_| DoctorError::Validation("Auth service returned an invalid user id".to_string()))?;

        let account = NewAccount {
            username: request.username.trim().to_string(),
            email: request.email.trim().to_string(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            role: Role::Doctor,
            phone: None,
        };
        let user = self.accounts.provision(user_id, account, Some(auth_token)).await?;

        let row = json!({
            "user_id": user.id,
            "experience_years": request.experience_years,
            "consultation_fee": request.consultation_fee,
            "license_number": request.license_number.trim(),
            "clinic_address": request.clinic_address.trim(),
            "available_days": "",
            "available_from": "09:00:00",
            "available_to": "17:00:00",
            "is_active": true,
            "education": "",
            "languages": "English",
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });
        let doctor = self.doctors.create(row, Some(auth_token)).await?;
        self.doctors
            .set_specializations(doctor.id, &[specialization.id], Some(auth_token))
            .await?;

        info!("Admin added doctor {} ({})", user.username, doctor.id);

        Ok(DoctorWithUser {
            doctor,
            user: DoctorUser {
                name: UserName {
                    username: user.username,
                    first_name: user.first_name,
                    last_name: user.last_name,
                },
                email: user.email,
            },
            specializations: vec![specialization],
        })
    }
}

fn summarize(doctor: DoctorWithUser, average_rating: Option<f64>) -> DoctorSummary {
    DoctorSummary {
        full_name: doctor.full_name(),
        doctor,
        average_rating,
    }
}

/// Mean rating per doctor, unrounded.
pub fn average_ratings(ratings: impl IntoIterator<Item = (Uuid, i32)>) -> HashMap<Uuid, f64> {
    let mut totals: HashMap<Uuid, (i64, i64)> = HashMap::new();
    for (doctor_id, rating) in ratings {
        let entry = totals.entry(doctor_id).or_default();
        entry.0 += i64::from(rating);
        entry.1 += 1;
    }
    totals
        .into_iter()
        .map(|(id, (sum, count))| (id, sum as f64 / count as f64))
        .collect()
}

fn validate_new_doctor(request: &AddDoctorRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.check(validate_username(&request.username), "username", "Enter a valid username.");
    errors.check(validate_email(&request.email), "email", "Enter a valid email address.");
    for issue in password_issues(&request.password, &request.username, &request.email) {
        errors.add("password", issue);
    }
    errors.check(
        !request.license_number.trim().is_empty(),
        "license_number",
        "License number is required.",
    );
    errors.check(
        (0..=60).contains(&request.experience_years),
        "experience_years",
        "Experience must be between 0 and 60 years.",
    );
    errors.check(
        request.consultation_fee >= 0.0,
        "consultation_fee",
        "Consultation fee cannot be negative.",
    );
    errors.check(
        !request.clinic_address.trim().is_empty(),
        "clinic_address",
        "Clinic address is required.",
    );
    errors
}
