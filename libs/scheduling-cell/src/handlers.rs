// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::{debug, error};
use uuid::Uuid;

use shared_models::auth::{ActorRole, User};
use shared_models::error::AppError;

use crate::error::SchedulingError;
use crate::labels::{label_table, AppointmentView};
use crate::models::{BookAppointmentRequest, BookingRequest, SlotQuery, TransitionRequest};
use crate::services::scheduling::SchedulingService;

impl From<SchedulingError> for AppError {
    fn from(e: SchedulingError) -> Self {
        let message = e.user_message();
        match e {
            SchedulingError::NotFound(_) => AppError::NotFound(message),
            SchedulingError::Conflict(_) => AppError::Conflict(message),
            SchedulingError::InvalidTransition(_) | SchedulingError::AlreadyTerminal(_) => {
                AppError::InvalidTransition(message)
            }
            SchedulingError::ValidationError(_) => AppError::ValidationError(message),
            SchedulingError::Unauthorized(_) => AppError::Forbidden(message),
            SchedulingError::Backend(detail) => {
                error!("Scheduling backend failure: {}", detail);
                AppError::ExternalService(message)
            }
        }
    }
}

// ==============================================================================
// SLOT HANDLERS
// ==============================================================================

pub async fn list_provider_slots(
    State(scheduler): State<Arc<SchedulingService>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(provider_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let actor = user.actor()?;
    debug!("{} {} requested slots of {} on {}", actor.role, actor.id, provider_id, query.date);

    let slots = if query.include_unavailable {
        scheduler
            .list_slot_grid(provider_id, query.date, auth.token())
            .await?
    } else {
        scheduler
            .list_available_slots(provider_id, query.date, auth.token())
            .await?
    };

    Ok(Json(json!({
        "success": true,
        "providerId": provider_id,
        "date": query.date,
        "slots": slots,
        "total": slots.len()
    })))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

pub async fn book_appointment(
    State(scheduler): State<Arc<SchedulingService>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let actor = user.actor()?;
    if actor.role != ActorRole::Patient {
        return Err(AppError::Forbidden("Only patients can book appointments".to_string()));
    }

    let booking = BookingRequest {
        patient_id: actor.id,
        provider_id: request.provider_id,
        date: request.date,
        time: request.time,
        appointment_type: request.appointment_type,
        reason: request.reason,
    };

    let appointment = scheduler.book_appointment(booking, auth.token()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": AppointmentView::from(appointment),
            "message": "Appointment requested, waiting for confirmation"
        })),
    ))
}

pub async fn list_my_appointments(
    State(scheduler): State<Arc<SchedulingService>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = user.actor()?;
    let appointments: Vec<AppointmentView> = scheduler
        .list_appointments(&actor, auth.token())
        .await?
        .into_iter()
        .map(AppointmentView::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "total": appointments.len(),
        "appointments": appointments
    })))
}

pub async fn get_appointment(
    State(scheduler): State<Arc<SchedulingService>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let actor = user.actor()?;
    let appointment = scheduler
        .get_appointment(appointment_id, &actor, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": AppointmentView::from(appointment)
    })))
}

pub async fn transition_appointment(
    State(scheduler): State<Arc<SchedulingService>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = user.actor()?;
    let appointment = scheduler
        .transition_appointment(appointment_id, &actor, request.status, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": AppointmentView::from(appointment)
    })))
}

pub async fn get_labels() -> Json<Value> {
    Json(label_table())
}
