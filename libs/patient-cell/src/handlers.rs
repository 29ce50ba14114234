use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{PatientDisplay, PatientError, PatientSearchQuery};
use crate::services::PatientService;

impl From<PatientError> for AppError {
    fn from(e: PatientError) -> Self {
        match e {
            PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
            PatientError::Parse(e) => AppError::ExternalService(e.to_string()),
            PatientError::Backend(e) => AppError::ExternalService(
                e.backend_message().map(str::to_string).unwrap_or_else(|| e.to_string()),
            ),
        }
    }
}

fn ensure_staff(user: &User) -> Result<(), AppError> {
    if user.is_admin() || user.is_doctor() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only staff can browse patients".to_string()))
    }
}

#[axum::debug_handler]
pub async fn search_patients(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let service = PatientService::new(&config);
    let patients = service
        .search_patients(query.q.as_deref().unwrap_or_default(), query.limit, auth.token())
        .await?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    // Patients may read their own card.
    if user.id != patient_id {
        ensure_staff(&user)?;
    }

    let service = PatientService::new(&config);
    let patient = service.get_patient(&patient_id, auth.token()).await?;
    let display = PatientDisplay::of(&patient, chrono::Local::now().date_naive());

    Ok(Json(json!({
        "patient": patient,
        "display": display
    })))
}
