use chrono::NaiveDate;

use shared_utils::validation::{
    has_allowed_extension, validate_email, validate_phone, FieldErrors, PICTURE_EXTENSIONS,
};

use crate::models::{
    UpdateDoctorFields, UpdatePatientFields, UpdateProfileRequest, BLOOD_GROUPS, MAX_BIO_LEN, WEEK_DAYS,
};

/// Check every section of a profile update; nothing is written unless
/// this comes back empty.
pub fn validate_profile_update(request: &UpdateProfileRequest, today: NaiveDate) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if let Some(email) = &request.email {
        errors.check(validate_email(email), "email", "Enter a valid email address.");
    }
    if let Some(phone) = request.phone.as_deref().filter(|p| !p.is_empty()) {
        errors.check(
            validate_phone(phone),
            "phone",
            "Phone number must be entered in the format: '+999999999'. Up to 15 digits allowed.",
        );
    }
    if let Some(bio) = &request.bio {
        errors.check(
            bio.chars().count() <= MAX_BIO_LEN,
            "bio",
            "Ensure this value has at most 500 characters.",
        );
    }
    if let Some(dob) = request.date_of_birth {
        errors.check(dob <= today, "date_of_birth", "Date of birth cannot be in the future.");
    }
    if let Some(url) = request.profile_picture_url.as_deref().filter(|u| !u.is_empty()) {
        errors.check(
            has_allowed_extension(url, PICTURE_EXTENSIONS),
            "profile_picture_url",
            "File extension is not allowed. Allowed extensions are: jpg, jpeg, png.",
        );
    }

    if let Some(patient) = &request.patient {
        validate_patient_fields(patient, &mut errors);
    }
    if let Some(doctor) = &request.doctor {
        validate_doctor_fields(doctor, &mut errors);
    }

    errors
}

fn validate_patient_fields(fields: &UpdatePatientFields, errors: &mut FieldErrors) {
    if let Some(group) = fields.blood_group.as_deref().filter(|g| !g.is_empty()) {
        errors.check(BLOOD_GROUPS.contains(&group), "blood_group", "Select a valid blood group.");
    }
    if let Some(height) = fields.height {
        errors.check(height > 0.0, "height", "Height must be a positive number of centimetres.");
    }
    if let Some(weight) = fields.weight {
        errors.check(weight > 0.0, "weight", "Weight must be a positive number of kilograms.");
    }
    if let Some(phone) = fields.emergency_contact_phone.as_deref().filter(|p| !p.is_empty()) {
        errors.check(validate_phone(phone), "emergency_contact_phone", "Enter a valid phone number.");
    }
}

/// Shared with admin doctor provisioning.
pub fn validate_doctor_fields(fields: &UpdateDoctorFields, errors: &mut FieldErrors) {
    if let Some(years) = fields.experience_years {
        errors.check(
            (0..=60).contains(&years),
            "experience_years",
            "Experience must be between 0 and 60 years.",
        );
    }
    if let Some(fee) = fields.consultation_fee {
        errors.check(fee >= 0.0, "consultation_fee", "Consultation fee cannot be negative.");
    }
    if let Some(license) = &fields.license_number {
        errors.check(!license.trim().is_empty(), "license_number", "This field is required.");
    }
    if let Some(days) = &fields.available_days {
        errors.check(!days.is_empty(), "available_days", "This field is required.");
        for day in days {
            errors.check(
                WEEK_DAYS.contains(&day.as_str()),
                "available_days",
                &format!("Select a valid choice. {} is not one of the available choices.", day),
            );
        }
    }
    if let (Some(from), Some(to)) = (fields.available_from, fields.available_to) {
        errors.check(from < to, "available_from", "Available 'from' time must be before 'to' time.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn empty_update_is_valid() {
        assert!(validate_profile_update(&UpdateProfileRequest::default(), today()).is_empty());
    }

    #[test]
    fn bad_user_and_profile_fields_are_all_reported() {
        let request = UpdateProfileRequest {
            email: Some("nope".into()),
            phone: Some("12".into()),
            bio: Some("x".repeat(501)),
            date_of_birth: NaiveDate::from_ymd_opt(2030, 1, 1),
            profile_picture_url: Some("me.gif".into()),
            ..Default::default()
        };
        assert_eq!(validate_profile_update(&request, today()).messages().len(), 5);
    }

    #[test]
    fn patient_blood_group_must_be_known() {
        let request = UpdateProfileRequest {
            patient: Some(UpdatePatientFields { blood_group: Some("C+".into()), ..Default::default() }),
            ..Default::default()
        };
        let errors = validate_profile_update(&request, today());
        assert!(errors.messages()[0].starts_with("blood_group"));
    }

    #[test]
    fn doctor_hours_must_be_ordered() {
        let request = UpdateProfileRequest {
            doctor: Some(UpdateDoctorFields {
                available_from: NaiveTime::from_hms_opt(17, 0, 0),
                available_to: NaiveTime::from_hms_opt(9, 0, 0),
                experience_years: Some(61),
                available_days: Some(vec!["Mon".into(), "Funday".into()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(validate_profile_update(&request, today()).messages().len(), 3);
    }
}
