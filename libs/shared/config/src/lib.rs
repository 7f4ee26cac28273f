use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_api_url: String,
    pub backend_api_key: String,
    pub jwt_secret: String,
    pub server_port: u16,
    pub default_slot_duration_minutes: i64,
    pub cancellation_cutoff_minutes: i64,
    pub enforce_cancellation_cutoff: bool,
    pub clinic_utc_offset_minutes: i32,
    pub hide_past_slots: bool,
    pub max_reason_length: usize,
    pub local_view_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_api_url: String::new(),
            backend_api_key: String::new(),
            jwt_secret: String::new(),
            server_port: 3000,
            default_slot_duration_minutes: 30,
            cancellation_cutoff_minutes: 0,
            enforce_cancellation_cutoff: true,
            clinic_utc_offset_minutes: 0,
            hide_past_slots: true,
            max_reason_length: 500,
            local_view_capacity: 1000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            backend_api_url: env::var("BACKEND_API_URL")
                .unwrap_or_else(|_| {
                    warn!("BACKEND_API_URL not set, using empty value");
                    String::new()
                }),
            backend_api_key: env::var("BACKEND_API_KEY").unwrap_or_default(),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            server_port: parse_or("SERVER_PORT", defaults.server_port),
            default_slot_duration_minutes: parse_or(
                "SLOT_DURATION_MINUTES",
                defaults.default_slot_duration_minutes,
            ),
            cancellation_cutoff_minutes: parse_or(
                "CANCELLATION_CUTOFF_MINUTES",
                defaults.cancellation_cutoff_minutes,
            ),
            enforce_cancellation_cutoff: parse_or(
                "ENFORCE_CANCELLATION_CUTOFF",
                defaults.enforce_cancellation_cutoff,
            ),
            clinic_utc_offset_minutes: parse_or(
                "CLINIC_UTC_OFFSET_MINUTES",
                defaults.clinic_utc_offset_minutes,
            ),
            hide_past_slots: parse_or("HIDE_PAST_SLOTS", defaults.hide_past_slots),
            max_reason_length: parse_or("MAX_REASON_LENGTH", defaults.max_reason_length),
            local_view_capacity: parse_or("LOCAL_VIEW_CAPACITY", defaults.local_view_capacity),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.backend_api_url.is_empty() && !self.jwt_secret.is_empty()
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Debug>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {:?}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
