// libs/appointment-cell/src/services/booking.rs
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::BackendClient;
use shared_models::parse::ParseMode;

use crate::models::{
    Appointment, AppointmentError, AppointmentPayload, AppointmentQuery, AppointmentRecord,
    AppointmentStatus,
};

/// Appointment calls against the hospital REST backend.
pub struct AppointmentService {
    backend: BackendClient,
    parse_mode: ParseMode,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            backend: BackendClient::new(config),
            parse_mode: ParseMode::from(config.environment),
        }
    }

    fn not_found_or(e: shared_database::BackendError) -> AppointmentError {
        if e.is_not_found() {
            AppointmentError::NotFound
        } else {
            e.into()
        }
    }

    pub async fn list_appointments(
        &self,
        query: &AppointmentQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Fetching appointments: {:?}", query);

        let records: Vec<Value> = self.backend
            .request(Method::GET, &query.to_path(), Some(auth_token), None)
            .await?;

        let appointments = self.parse_mode.parse_list("Appointment", records, |record: AppointmentRecord| {
            record.into_appointment(self.parse_mode).map_err(AppointmentError::from)
        })?;

        debug!("Fetched {} appointments for doctor {}", appointments.len(), query.doctor_id);
        Ok(appointments)
    }

    pub async fn get_appointment(&self, appointment_id: &str, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let path = format!("/appointments/{}", urlencoding::encode(appointment_id));
        let record: AppointmentRecord = self.backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(Self::not_found_or)?;

        Ok(record.into_appointment(self.parse_mode)?)
    }

    pub async fn create_appointment(
        &self,
        payload: &AppointmentPayload,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!("Creating appointment for patient {} with doctor {} at {}",
              payload.patient_id, payload.doctor_id, payload.date_time);

        let record: AppointmentRecord = self.backend
            .request(Method::POST, "/appointments", Some(auth_token), Some(json!(payload)))
            .await?;

        Ok(record.into_appointment(self.parse_mode)?)
    }

    pub async fn update_appointment(
        &self,
        appointment_id: &str,
        payload: &AppointmentPayload,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!("Updating appointment {}", appointment_id);

        let path = format!("/appointments/{}", urlencoding::encode(appointment_id));
        let record: AppointmentRecord = self.backend
            .request(Method::PUT, &path, Some(auth_token), Some(json!(payload)))
            .await
            .map_err(Self::not_found_or)?;

        Ok(record.into_appointment(self.parse_mode)?)
    }

    pub async fn update_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!("Setting appointment {} to {}", appointment_id, status);

        let path = format!("/appointments/{}/status", urlencoding::encode(appointment_id));
        let record: AppointmentRecord = self.backend
            .request(Method::PUT, &path, Some(auth_token), Some(json!({ "status": status })))
            .await
            .map_err(Self::not_found_or)?;

        Ok(record.into_appointment(self.parse_mode)?)
    }

    pub async fn delete_appointment(&self, appointment_id: &str, auth_token: &str) -> Result<(), AppointmentError> {
        info!("Deleting appointment {}", appointment_id);

        let path = format!("/appointments/{}", urlencoding::encode(appointment_id));
        self.backend
            .request_no_content(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(Self::not_found_or)
    }
}
