// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{Local, NaiveDate};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::session_from;

use crate::models::{AppointmentError, AppointmentStatus, AppointmentType, DurationTag};
use crate::services::duration::calculate_end_time;
use crate::services::form::{AppointmentFormController, FormError, SelectedPatient};
use crate::services::slots::slot_labels;
use crate::services::{
    AppointmentBackend, AppointmentFilters, AppointmentsViewController, HttpAppointmentBackend, ViewMode,
};

// ==============================================================================
// ERROR MAPPING
// ==============================================================================

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::InvalidStatusTransition { .. } => AppError::Conflict(e.to_string()),
            AppointmentError::ConfirmationRequired => AppError::BadRequest(e.to_string()),
            AppointmentError::MissingDoctor => {
                AppError::BadRequest("doctor_id is required unless signed in as a doctor".to_string())
            }
            AppointmentError::SessionInactive => AppError::Auth(e.to_string()),
            AppointmentError::Parse(e) => AppError::ExternalService(e.to_string()),
            AppointmentError::Backend(ref backend) => {
                let message = backend.backend_message().map(str::to_string).unwrap_or_else(|| e.to_string());
                match backend.status() {
                    Some(404) => AppError::NotFound(message),
                    Some(409) => AppError::Conflict(message),
                    _ => AppError::ExternalService(message),
                }
            }
            AppointmentError::Patient(e) => e.into(),
            AppointmentError::Department(e) => e.into(),
        }
    }
}

impl From<FormError> for AppError {
    fn from(e: FormError) -> Self {
        match e {
            FormError::Validation(ref fields) => AppError::validation(e.to_string(), fields.to_string_map()),
            FormError::MissingDepartment { .. } => AppError::PreconditionFailed(e.to_string()),
            FormError::MissingDoctor => {
                AppError::BadRequest("doctor_id is required unless signed in as a doctor".to_string())
            }
            FormError::SessionInactive => AppError::Auth(e.to_string()),
            FormError::Save { message, status } => match status {
                Some(404) => AppError::NotFound(message),
                Some(409) => AppError::Conflict(message),
                Some(400) | Some(422) => AppError::BadRequest(message),
                _ => AppError::ExternalService(message),
            },
        }
    }
}

fn ensure_staff(user: &User) -> Result<(), AppError> {
    if user.is_admin() || user.is_doctor() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only doctors and administrators manage appointments".to_string()))
    }
}

// ==============================================================================
// REQUEST STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub date: Option<NaiveDate>,
    pub doctor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentListQuery {
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub search: Option<String>,
    pub doctor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EndTimeQuery {
    pub start: String,
    pub duration: DurationTag,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub confirm: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: AppointmentStatus,
}

/// Form input for creating or editing an appointment. Fields left out keep
/// their current value (blank for a new appointment).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppointmentDraftRequest {
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub duration: Option<DurationTag>,
    pub end_time: Option<String>,
    #[serde(rename = "type")]
    pub appointment_type: Option<AppointmentType>,
    pub is_virtual: Option<bool>,
    pub notes: Option<String>,
    pub symptoms: Option<String>,
    pub department_id: Option<String>,
    pub doctor_id: Option<String>,
}

impl AppointmentDraftRequest {
    fn apply_to<B: AppointmentBackend + ?Sized>(self, form: &mut AppointmentFormController<'_, B>) {
        if let Some(id) = self.patient_id.filter(|id| !id.trim().is_empty()) {
            form.select_patient(SelectedPatient { id, name: self.patient_name });
        }
        if let Some(date) = self.date {
            form.set_date(Some(date));
        }
        if let Some(start_time) = self.start_time {
            form.set_start_time(&start_time);
        }
        if let Some(duration) = self.duration {
            form.set_duration_tag(duration);
        }
        if let Some(end_time) = self.end_time.filter(|end| !end.trim().is_empty()) {
            form.set_end_time(&end_time);
        }
        if let Some(appointment_type) = self.appointment_type {
            form.set_type(appointment_type);
        }
        if let Some(is_virtual) = self.is_virtual {
            form.set_virtual(is_virtual);
        }
        if let Some(notes) = self.notes {
            form.set_notes(&notes);
        }
        if let Some(symptoms) = self.symptoms {
            form.set_symptoms(&symptoms);
        }
        if self.department_id.is_some() {
            form.set_department(self.department_id);
        }
    }
}

// ==============================================================================
// VIEW HANDLERS
// ==============================================================================

/// Day grid for the acting doctor.
#[axum::debug_handler]
pub async fn get_schedule(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let session = session_from(user, auth.token());
    let backend = HttpAppointmentBackend::new(&config);
    let now = Local::now().naive_local();
    let date = query.date.unwrap_or_else(|| now.date());
    let doctor_id = session.acting_doctor_id(query.doctor_id.as_deref());

    let mut view = AppointmentsViewController::new(&backend, &session, &config, doctor_id, date);
    view.refresh().await?;
    let schedule = view.day_schedule(now);

    Ok(Json(json!({
        "doctor_id": view.doctor_id(),
        "date": date,
        "previous_date": date.pred_opt(),
        "next_date": date.succ_opt(),
        "total": view.rows().len(),
        "schedule": schedule
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let session = session_from(user, auth.token());
    let backend = HttpAppointmentBackend::new(&config);
    let doctor_id = session.acting_doctor_id(query.doctor_id.as_deref());
    let filters = AppointmentFilters {
        date: query.date,
        status: query.status,
        search: query.search.unwrap_or_default(),
    };

    let mut view = AppointmentsViewController::new(
        &backend,
        &session,
        &config,
        doctor_id,
        query.date.unwrap_or_else(|| Local::now().date_naive()),
    )
    .with_view_mode(ViewMode::List)
    .with_filters(filters);
    view.refresh().await?;

    let appointments = view.visible_list();

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len(),
        "filters": view.filters()
    })))
}

/// End time for a start time and duration choice; empty for `custom`.
#[axum::debug_handler]
pub async fn get_end_time(
    Extension(_user): Extension<User>,
    Query(query): Query<EndTimeQuery>,
) -> Result<Json<Value>, AppError> {
    let end_time = calculate_end_time(&query.start, query.duration);

    Ok(Json(json!({
        "start": query.start,
        "duration": query.duration,
        "end_time": end_time,
        "slots": slot_labels()
    })))
}

// ==============================================================================
// FORM HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AppointmentDraftRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let session = session_from(user, auth.token());
    let backend = HttpAppointmentBackend::new(&config);
    let doctor_id = session.acting_doctor_id(request.doctor_id.as_deref());

    let mut form = AppointmentFormController::new(&backend, &session, &config, doctor_id);
    request.apply_to(&mut form);
    let appointment = form.submit().await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment created successfully"
    })))
}

/// The edit form's seeded draft for an existing appointment.
#[axum::debug_handler]
pub async fn get_appointment_form(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let session = session_from(user, auth.token());
    let backend = HttpAppointmentBackend::new(&config);
    let view = AppointmentsViewController::new(&backend, &session, &config, None, Local::now().date_naive());

    let form = view.open_edit(&appointment_id).await?;

    Ok(Json(json!({
        "appointment_id": form.editing_id(),
        "draft": form.draft()
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Json(request): Json<AppointmentDraftRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let session = session_from(user, auth.token());
    let backend = HttpAppointmentBackend::new(&config);
    let view = AppointmentsViewController::new(&backend, &session, &config, None, Local::now().date_naive());

    let mut form = view.open_edit(&appointment_id).await?;
    request.apply_to(&mut form);
    let appointment = form.submit().await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment updated successfully"
    })))
}

// ==============================================================================
// STATUS AND DELETE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn change_status(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Json(request): Json<StatusChangeRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let session = session_from(user, auth.token());
    let backend = HttpAppointmentBackend::new(&config);
    let mut view = AppointmentsViewController::new(&backend, &session, &config, None, Local::now().date_naive());

    let appointment = view.change_status(&appointment_id, request.status).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": format!("Appointment marked as {}", request.status)
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let session = session_from(user, auth.token());
    let backend = HttpAppointmentBackend::new(&config);
    let mut view = AppointmentsViewController::new(&backend, &session, &config, None, Local::now().date_naive());

    view.delete(&appointment_id, query.confirm.unwrap_or(false)).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted"
    })))
}
