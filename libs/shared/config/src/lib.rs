use std::env;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SLOT_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub port: u16,
    /// Length of one bookable slot; also the default appointment length.
    pub slot_minutes: i64,
    pub oauth_redirect_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, admin user creation disabled");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            port: parse_or_default("PORT", DEFAULT_PORT),
            slot_minutes: parse_or_default("APPOINTMENT_SLOT_MINUTES", DEFAULT_SLOT_MINUTES),
            oauth_redirect_url: env::var("OAUTH_REDIRECT_URL")
                .unwrap_or_else(|_| {
                    warn!("OAUTH_REDIRECT_URL not set, using default");
                    "http://localhost:3000/auth/oauth/callback".to_string()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_admin_api_configured(&self) -> bool {
        self.is_configured() && !self.supabase_service_role_key.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "anon".to_string(),
            supabase_service_role_key: String::new(),
            supabase_jwt_secret: "secret".to_string(),
            port: DEFAULT_PORT,
            slot_minutes: DEFAULT_SLOT_MINUTES,
            oauth_redirect_url: String::new(),
        }
    }

    #[test]
    fn configured_without_service_role_key() {
        let config = sample();
        assert!(config.is_configured());
        assert!(!config.is_admin_api_configured());
    }

    #[test]
    fn missing_url_is_not_configured() {
        let mut config = sample();
        config.supabase_url.clear();
        assert!(!config.is_configured());
    }

    #[test]
    fn parse_falls_back_on_garbage() {
        env::set_var("CLINIC_TEST_PORT_GARBAGE", "not-a-port");
        assert_eq!(parse_or_default("CLINIC_TEST_PORT_GARBAGE", 8080u16), 8080);
        env::set_var("CLINIC_TEST_PORT_OK", "9090");
        assert_eq!(parse_or_default("CLINIC_TEST_PORT_OK", 8080u16), 9090);
    }
}
