use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub backend_api_url: String,
    pub backend_api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            backend_api_url: "http://localhost:8080".to_string(),
            backend_api_key: "test-api-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_backend_url(url: &str) -> Self {
        Self {
            backend_api_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            backend_api_url: self.backend_api_url.clone(),
            backend_api_key: self.backend_api_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn pharmacist(email: &str) -> Self {
        Self::new(email, "pharmacist")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn uuid(&self) -> Uuid {
        Uuid::parse_str(&self.id).expect("test user ids are UUIDs")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned JSON bodies in the shape the scheduling backend returns.
pub struct MockBackendResponses;

impl MockBackendResponses {
    /// Monday-to-Friday 09:00-12:00, weekends off.
    pub fn weekday_schedule_response(slot_duration_minutes: i64) -> serde_json::Value {
        let day = json!({ "isWorking": true, "start": "09:00", "end": "12:00" });
        let off = json!({ "isWorking": false, "start": "00:00", "end": "00:00" });
        json!({
            "days": {
                "monday": day,
                "tuesday": day,
                "wednesday": day,
                "thursday": day,
                "friday": day,
                "saturday": off,
                "sunday": off
            },
            "slotDurationMinutes": slot_duration_minutes
        })
    }

    pub fn appointment_response(
        id: &str,
        patient_id: &str,
        provider_id: &str,
        date: &str,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patientId": patient_id,
            "providerId": provider_id,
            "date": date,
            "time": time,
            "type": "consultation",
            "reason": null,
            "status": status,
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": null
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
