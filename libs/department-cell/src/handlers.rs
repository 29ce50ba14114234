use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::DepartmentError;
use crate::services::DepartmentService;

impl From<DepartmentError> for AppError {
    fn from(e: DepartmentError) -> Self {
        match e {
            DepartmentError::DoctorNotFound(id) => AppError::NotFound(format!("Doctor {} not found", id)),
            DepartmentError::Parse(e) => AppError::ExternalService(e.to_string()),
            DepartmentError::Backend(e) => AppError::ExternalService(
                e.backend_message().map(str::to_string).unwrap_or_else(|| e.to_string()),
            ),
        }
    }
}

#[axum::debug_handler]
pub async fn list_departments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = DepartmentService::new(&config);
    let departments = service.list_departments(auth.token()).await?;

    Ok(Json(json!({
        "departments": departments,
        "total": departments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_department(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = DepartmentService::new(&config);
    let department_id = service.doctor_department(&doctor_id, auth.token()).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "department_id": department_id
    })))
}
