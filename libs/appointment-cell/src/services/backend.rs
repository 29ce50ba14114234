// libs/appointment-cell/src/services/backend.rs
use std::collections::HashMap;

use async_trait::async_trait;

use department_cell::services::DepartmentService;
use patient_cell::models::Patient;
use patient_cell::services::PatientService;
use shared_config::AppConfig;

use crate::models::{Appointment, AppointmentError, AppointmentPayload, AppointmentQuery, AppointmentStatus};
use crate::services::booking::AppointmentService;

/// Everything the appointment controllers need from the hospital backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentBackend: Send + Sync {
    async fn list_appointments(&self, query: &AppointmentQuery, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError>;

    async fn get_appointment(&self, appointment_id: &str, auth_token: &str) -> Result<Appointment, AppointmentError>;

    async fn create_appointment(&self, payload: &AppointmentPayload, auth_token: &str) -> Result<Appointment, AppointmentError>;

    async fn update_appointment(
        &self,
        appointment_id: &str,
        payload: &AppointmentPayload,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    async fn update_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    async fn delete_appointment(&self, appointment_id: &str, auth_token: &str) -> Result<(), AppointmentError>;

    async fn get_patient(&self, patient_id: &str, auth_token: &str) -> Result<Patient, AppointmentError>;

    /// Best-effort lookup; missing patients are left out.
    async fn get_patients(&self, patient_ids: &[String], auth_token: &str) -> HashMap<String, Patient>;

    async fn doctor_department(&self, doctor_id: &str, auth_token: &str) -> Result<Option<String>, AppointmentError>;
}

/// The REST-backed implementation used by the portal.
pub struct HttpAppointmentBackend {
    appointments: AppointmentService,
    patients: PatientService,
    departments: DepartmentService,
}

impl HttpAppointmentBackend {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            appointments: AppointmentService::new(config),
            patients: PatientService::new(config),
            departments: DepartmentService::new(config),
        }
    }
}

#[async_trait]
impl AppointmentBackend for HttpAppointmentBackend {
    async fn list_appointments(&self, query: &AppointmentQuery, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        self.appointments.list_appointments(query, auth_token).await
    }

    async fn get_appointment(&self, appointment_id: &str, auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.appointments.get_appointment(appointment_id, auth_token).await
    }

    async fn create_appointment(&self, payload: &AppointmentPayload, auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.appointments.create_appointment(payload, auth_token).await
    }

    async fn update_appointment(
        &self,
        appointment_id: &str,
        payload: &AppointmentPayload,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.appointments.update_appointment(appointment_id, payload, auth_token).await
    }

    async fn update_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.appointments.update_status(appointment_id, status, auth_token).await
    }

    async fn delete_appointment(&self, appointment_id: &str, auth_token: &str) -> Result<(), AppointmentError> {
        self.appointments.delete_appointment(appointment_id, auth_token).await
    }

    async fn get_patient(&self, patient_id: &str, auth_token: &str) -> Result<Patient, AppointmentError> {
        Ok(self.patients.get_patient(patient_id, auth_token).await?)
    }

    async fn get_patients(&self, patient_ids: &[String], auth_token: &str) -> HashMap<String, Patient> {
        self.patients.get_patients(patient_ids, auth_token).await
    }

    async fn doctor_department(&self, doctor_id: &str, auth_token: &str) -> Result<Option<String>, AppointmentError> {
        Ok(self.departments.doctor_department(doctor_id, auth_token).await?)
    }
}
