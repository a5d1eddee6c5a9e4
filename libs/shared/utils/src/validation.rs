use regex::Regex;

use shared_models::error::AppError;

pub const PICTURE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "doc", "docx"];

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "12345678", "123456789", "qwertyui", "iloveyou",
    "11111111", "abc12345", "letmein1", "welcome1", "admin123", "passw0rd",
];

fn matches(pattern: &str, input: &str) -> bool {
    Regex::new(pattern).map(|re| re.is_match(input)).unwrap_or(false)
}

pub fn validate_phone(phone: &str) -> bool {
    matches(r"^\+?1?\d{9,15}$", phone)
}

pub fn validate_email(email: &str) -> bool {
    email.len() <= 254 && matches(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$", email)
}

/// Letters, digits and `@ . + - _`, at most 150 characters.
pub fn validate_username(username: &str) -> bool {
    !username.is_empty() && username.chars().count() <= 150 && matches(r"^[\w.@+-]+$", username)
}

pub fn has_allowed_extension(file_name: &str, allowed: &[&str]) -> bool {
    let name = file_name.split(['?', '#']).next().unwrap_or(file_name);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            allowed.iter().any(|a| *a == ext)
        }
        _ => false,
    }
}

/// Password rules: minimum length, not purely numeric, not a common
/// password, not derived from the username or email.
pub fn password_issues(password: &str, username: &str, email: &str) -> Vec<String> {
    let mut issues = Vec::new();

    if password.chars().count() < 8 {
        issues.push("This password is too short. It must contain at least 8 characters.".to_string());
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        issues.push("This password is entirely numeric.".to_string());
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        issues.push("This password is too common.".to_string());
    }

    let email_local = email.split('@').next().unwrap_or_default();
    let similar = [username, email_local]
        .iter()
        .map(|attr| attr.to_lowercase())
        .filter(|attr| attr.len() >= 3)
        .any(|attr| lowered.contains(&attr) || attr.contains(&lowered));
    if similar {
        issues.push("The password is too similar to the username or email.".to_string());
    }

    issues
}

/// Accumulates per-field messages the way a form does before rejecting.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(format!("{}: {}", field, message.into()));
    }

    pub fn check(&mut self, condition: bool, field: &str, message: &str) {
        if !condition {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.errors
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(self.errors.join("; ")))
        }
    }
}
