use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::{
    AppointmentFilter, AppointmentStatus, AppointmentType, BookingRequest, FixedClock,
    RestSchedulingBackend, SchedulingBackend, SchedulingError, SchedulingService,
    SchedulingSettings,
};
use shared_models::auth::Actor;
use shared_utils::test_utils::{MockBackendResponses, TestConfig};

const TOKEN: &str = "patient-token";

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
}

fn backend_for(server: &MockServer) -> RestSchedulingBackend {
    RestSchedulingBackend::new(&TestConfig::with_backend_url(&server.uri()).to_app_config())
}

#[tokio::test]
async fn test_fetch_schedule_forwards_token() {
    let server = MockServer::start().await;
    let provider = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/providers/{}/schedule", provider)))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(MockBackendResponses::weekday_schedule_response(20)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let schedule = backend_for(&server).fetch_schedule(provider, TOKEN).await.unwrap();

    assert_eq!(schedule.slot_duration_minutes, 20);
    assert!(schedule.hours_for(monday()).unwrap().is_working);
    assert!(!schedule.hours_for(monday() + chrono::Duration::days(5)).unwrap().is_working);
}

#[tokio::test]
async fn test_schedule_without_duration_uses_configured_default() {
    let server = MockServer::start().await;
    let provider = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/providers/{}/schedule", provider)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "days": { "monday": { "isWorking": true, "start": "09:00", "end": "10:00" } }
        })))
        .mount(&server)
        .await;

    let config = shared_config::AppConfig {
        default_slot_duration_minutes: 15,
        ..TestConfig::with_backend_url(&server.uri()).to_app_config()
    };
    let schedule = RestSchedulingBackend::new(&config)
        .fetch_schedule(provider, TOKEN)
        .await
        .unwrap();
    assert_eq!(schedule.slot_duration_minutes, 15);
}

#[tokio::test]
async fn test_fetch_booked_slots_normalizes_times() {
    let server = MockServer::start().await;
    let provider = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/providers/{}/booked-slots", provider)))
        .and(query_param("date", "2026-01-05"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["9:00", "10:30:00"])))
        .mount(&server)
        .await;

    let booked = backend_for(&server)
        .fetch_booked_slots(provider, monday(), TOKEN)
        .await
        .unwrap();
    let times: Vec<String> = booked.iter().map(|t| t.to_string()).collect();
    assert_eq!(times, vec!["09:00", "10:30"]);
}

#[tokio::test]
async fn test_status_codes_map_to_scheduling_errors() {
    let server = MockServer::start().await;
    let missing = Uuid::new_v4();
    let terminal = Uuid::new_v4();
    let broken = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/appointments/{}", missing)))
        .respond_with(ResponseTemplate::new(404).set_body_json(
            MockBackendResponses::error_response("no such appointment", "not_found"),
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/appointments/{}/cancel", terminal)))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockBackendResponses::error_response("already cancelled", "already_terminal"),
        ))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("/appointments/{}/status", broken)))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let backend = backend_for(&server);

    assert_matches!(
        backend.fetch_appointment(missing, TOKEN).await,
        Err(SchedulingError::NotFound(_))
    );
    assert_matches!(
        backend.cancel_appointment(terminal, TOKEN).await,
        Err(SchedulingError::AlreadyTerminal(msg)) if msg == "already cancelled"
    );
    assert_matches!(
        backend
            .update_appointment_status(broken, AppointmentStatus::Confirmed, TOKEN)
            .await,
        Err(SchedulingError::Backend(_))
    );
}

#[tokio::test]
async fn test_unreachable_backend_is_backend_error() {
    let config = TestConfig::with_backend_url("http://127.0.0.1:9").to_app_config();
    let result = RestSchedulingBackend::new(&config)
        .fetch_schedule(Uuid::new_v4(), TOKEN)
        .await;
    assert_matches!(result, Err(SchedulingError::Backend(_)));
}

#[tokio::test]
async fn test_list_appointments_requires_a_side() {
    let server = MockServer::start().await;
    let result = backend_for(&server)
        .list_appointments(&AppointmentFilter::default(), TOKEN)
        .await;
    assert_matches!(result, Err(SchedulingError::ValidationError(_)));
}

#[tokio::test]
async fn test_update_status_sends_new_status() {
    let server = MockServer::start().await;
    let (id, patient, provider) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    Mock::given(method("PATCH"))
        .and(path(format!("/appointments/{}/status", id)))
        .and(body_partial_json(json!({ "status": "confirmed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::appointment_response(
            &id.to_string(),
            &patient.to_string(),
            &provider.to_string(),
            "2026-01-05",
            "09:00",
            "confirmed",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let updated = backend_for(&server)
        .update_appointment_status(id, AppointmentStatus::Confirmed, TOKEN)
        .await
        .unwrap();
    assert_eq!(updated.status, AppointmentStatus::Confirmed);
    assert_eq!(updated.id, id);
}

// ==============================================================================
// FACADE OVER REST
// ==============================================================================

fn rest_scheduler(server: &MockServer) -> SchedulingService {
    let now = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
    SchedulingService::new(
        Arc::new(backend_for(server)),
        Arc::new(FixedClock(now)),
        SchedulingSettings::default(),
    )
}

async fn mount_weekday_schedule(server: &MockServer, provider: Uuid) {
    Mock::given(method("GET"))
        .and(path(format!("/providers/{}/schedule", provider)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(MockBackendResponses::weekday_schedule_response(30)),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_booking_over_rest() {
    let server = MockServer::start().await;
    let (id, patient, provider) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    mount_weekday_schedule(&server, provider).await;
    Mock::given(method("GET"))
        .and(path(format!("/providers/{}/booked-slots", provider)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["09:00"])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/appointments"))
        .and(body_partial_json(json!({
            "patientId": patient,
            "providerId": provider,
            "date": "2026-01-05",
            "time": "09:30",
            "type": "consultation",
            "status": "pending"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(MockBackendResponses::appointment_response(
            &id.to_string(),
            &patient.to_string(),
            &provider.to_string(),
            "2026-01-05",
            "09:30",
            "pending",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let request = BookingRequest {
        patient_id: patient,
        provider_id: provider,
        date: monday(),
        time: "09:30".parse().unwrap(),
        appointment_type: AppointmentType::Consultation,
        reason: None,
    };

    let appointment = rest_scheduler(&server).book_appointment(request, TOKEN).await.unwrap();
    assert_eq!(appointment.id, id);
    assert_eq!(appointment.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn test_lost_race_surfaces_as_conflict() {
    let server = MockServer::start().await;
    let (patient, provider) = (Uuid::new_v4(), Uuid::new_v4());

    mount_weekday_schedule(&server, provider).await;
    Mock::given(method("GET"))
        .and(path(format!("/providers/{}/booked-slots", provider)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockBackendResponses::error_response("slot taken", "slot_conflict"),
        ))
        .mount(&server)
        .await;

    let request = BookingRequest {
        patient_id: patient,
        provider_id: provider,
        date: monday(),
        time: "09:00".parse().unwrap(),
        appointment_type: AppointmentType::Video,
        reason: None,
    };

    assert_matches!(
        rest_scheduler(&server).book_appointment(request, TOKEN).await,
        Err(SchedulingError::Conflict(_))
    );
}

#[tokio::test]
async fn test_failed_cancel_over_rest_keeps_previous_status() {
    let server = MockServer::start().await;
    let (id, patient, provider) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    Mock::given(method("GET"))
        .and(path(format!("/appointments/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::appointment_response(
            &id.to_string(),
            &patient.to_string(),
            &provider.to_string(),
            "2026-01-05",
            "09:00",
            "confirmed",
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/appointments/{}/cancel", id)))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let scheduler = rest_scheduler(&server);
    let result = scheduler
        .transition_appointment(id, &Actor::patient(patient), AppointmentStatus::Cancelled, TOKEN)
        .await;

    assert_matches!(result, Err(SchedulingError::Backend(_)));
    assert_eq!(
        scheduler.cached_appointment(id).await.unwrap().status,
        AppointmentStatus::Confirmed
    );
}

#[tokio::test]
async fn test_off_grid_booking_never_reaches_backend() {
    let server = MockServer::start().await;
    let (patient, provider) = (Uuid::new_v4(), Uuid::new_v4());

    mount_weekday_schedule(&server, provider).await;
    Mock::given(method("GET"))
        .and(path(format!("/providers/{}/booked-slots", provider)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let request = BookingRequest {
        patient_id: patient,
        provider_id: provider,
        date: monday(),
        time: "09:15".parse().unwrap(),
        appointment_type: AppointmentType::Consultation,
        reason: None,
    };

    assert_matches!(
        rest_scheduler(&server).book_appointment(request, TOKEN).await,
        Err(SchedulingError::ValidationError(_))
    );
}
