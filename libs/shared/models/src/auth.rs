use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<Value>,
    pub user_metadata: Option<Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }

    /// Where a freshly logged-in user of this role lands.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Patient => "/dashboard/patient",
            Role::Doctor => "/dashboard/doctor",
            Role::Admin => "/dashboard/admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<Value>,
    #[serde(default)]
    pub app_metadata: Option<Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Clinic role of the caller. Supabase puts `authenticated` in the
    /// top-level claim, so the metadata blocks are consulted first.
    pub fn clinic_role(&self) -> Option<Role> {
        let from_metadata = |meta: &Option<Value>| {
            meta.as_ref()
                .and_then(|m| m.get("role"))
                .and_then(|r| r.as_str())
                .and_then(|r| r.parse::<Role>().ok())
        };

        from_metadata(&self.app_metadata)
            .or_else(|| from_metadata(&self.metadata))
            .or_else(|| self.role.as_deref().and_then(|r| r.parse().ok()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}
