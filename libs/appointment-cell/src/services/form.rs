// libs/appointment-cell/src/services/form.rs
use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use patient_cell::models::Patient;
use shared_config::AppConfig;
use shared_models::auth::SessionContext;

use crate::models::{
    parse_clock, Appointment, AppointmentError, AppointmentKind, AppointmentPayload, AppointmentStatus,
    AppointmentType, DurationTag,
};
use crate::services::backend::AppointmentBackend;
use crate::services::duration::{calculate_end_time, tag_for_span};

pub const GENERIC_SAVE_FAILURE: &str = "Failed to save appointment. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Patient,
    Date,
    StartTime,
    EndTime,
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormField::Patient => write!(f, "patient"),
            FormField::Date => write!(f, "date"),
            FormField::StartTime => write!(f, "start_time"),
            FormField::EndTime => write!(f, "end_time"),
        }
    }
}

/// Validation messages keyed by the form field they belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<FormField, String>);

impl FieldErrors {
    pub fn insert(&mut self, field: FormField, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn remove(&mut self, field: FormField) {
        self.0.remove(&field);
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: FormField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_string_map(&self) -> BTreeMap<String, String> {
        self.0.iter().map(|(field, message)| (field.to_string(), message.clone())).collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("Please correct the highlighted fields")]
    Validation(FieldErrors),

    #[error("No department could be determined for doctor {doctor_id}; assign one before booking")]
    MissingDepartment { doctor_id: String },

    #[error("No doctor selected for this appointment")]
    MissingDoctor,

    #[error("Your session has ended; sign in again")]
    SessionInactive,

    #[error("{message}")]
    Save { message: String, status: Option<u16> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedPatient {
    pub id: String,
    pub name: Option<String>,
}

impl From<&Patient> for SelectedPatient {
    fn from(patient: &Patient) -> Self {
        Self {
            id: patient.id.clone(),
            name: Some(patient.full_name()),
        }
    }
}

/// The booking form's fields as the user has entered them so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppointmentDraft {
    pub patient: Option<SelectedPatient>,
    pub date: Option<NaiveDate>,
    pub start_time: String,
    pub duration: DurationTag,
    pub end_time: String,
    pub appointment_type: AppointmentType,
    pub is_virtual: bool,
    pub notes: String,
    pub symptoms: String,
    pub department_id: Option<String>,
}

/// Drives the create/edit appointment form.
pub struct AppointmentFormController<'a, B: AppointmentBackend + ?Sized> {
    backend: &'a B,
    session: &'a SessionContext,
    config: &'a AppConfig,
    doctor_id: Option<String>,
    editing: Option<String>,
    draft: AppointmentDraft,
    errors: FieldErrors,
    save_error: Option<String>,
}

impl<'a, B: AppointmentBackend + ?Sized> AppointmentFormController<'a, B> {
    pub fn new(
        backend: &'a B,
        session: &'a SessionContext,
        config: &'a AppConfig,
        doctor_id: Option<String>,
    ) -> Self {
        Self {
            backend,
            session,
            config,
            doctor_id,
            editing: None,
            draft: AppointmentDraft::default(),
            errors: FieldErrors::default(),
            save_error: None,
        }
    }

    /// Opens the form on an existing appointment with every field seeded.
    pub fn for_edit(
        backend: &'a B,
        session: &'a SessionContext,
        config: &'a AppConfig,
        appointment: &Appointment,
        patient: Option<&Patient>,
    ) -> Self {
        let mut controller = Self::new(backend, session, config, Some(appointment.doctor_id.clone()));
        controller.editing = Some(appointment.id.clone());

        let selected = match patient {
            Some(patient) => SelectedPatient::from(patient),
            None => SelectedPatient {
                id: appointment.patient_id.clone(),
                name: appointment.patient_name.clone(),
            },
        };

        controller.draft = AppointmentDraft {
            patient: Some(selected),
            date: Some(appointment.date()),
            start_time: appointment.start_label(),
            duration: tag_for_span(appointment.start, appointment.end),
            end_time: appointment.end_label(),
            appointment_type: appointment.kind.appointment_type,
            is_virtual: appointment.kind.is_virtual,
            notes: appointment.notes.clone().unwrap_or_default(),
            symptoms: appointment.symptoms.clone().unwrap_or_default(),
            department_id: appointment.department_id.clone(),
        };

        controller
    }

    pub fn draft(&self) -> &AppointmentDraft {
        &self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn save_error(&self) -> Option<&str> {
        self.save_error.as_deref()
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn select_patient(&mut self, patient: SelectedPatient) {
        debug!("Patient {} selected", patient.id);
        self.draft.patient = Some(patient);
        self.errors.remove(FormField::Patient);
    }

    pub fn set_date(&mut self, date: Option<NaiveDate>) {
        self.draft.date = date;
    }

    pub fn set_start_time(&mut self, start_time: &str) {
        self.draft.start_time = start_time.trim().to_string();
        self.recompute_end_time();
    }

    pub fn set_duration_tag(&mut self, duration: DurationTag) {
        self.draft.duration = duration;
        self.recompute_end_time();
    }

    /// Entering an end time that differs from the computed one switches the
    /// duration to `custom`.
    pub fn set_end_time(&mut self, end_time: &str) {
        let end_time = end_time.trim().to_string();
        if self.draft.duration != DurationTag::Custom
            && end_time != calculate_end_time(&self.draft.start_time, self.draft.duration)
        {
            self.draft.duration = DurationTag::Custom;
        }
        self.draft.end_time = end_time;
    }

    pub fn set_type(&mut self, appointment_type: AppointmentType) {
        self.draft.appointment_type = appointment_type;
    }

    pub fn set_virtual(&mut self, is_virtual: bool) {
        self.draft.is_virtual = is_virtual;
    }

    pub fn set_notes(&mut self, notes: &str) {
        self.draft.notes = notes.to_string();
    }

    pub fn set_symptoms(&mut self, symptoms: &str) {
        self.draft.symptoms = symptoms.to_string();
    }

    pub fn set_department(&mut self, department_id: Option<String>) {
        self.draft.department_id = department_id.filter(|id| !id.is_empty());
    }

    fn recompute_end_time(&mut self) {
        if self.draft.duration != DurationTag::Custom {
            self.draft.end_time = calculate_end_time(&self.draft.start_time, self.draft.duration);
        }
    }

    pub fn validate(&mut self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        if self.draft.patient.is_none() {
            errors.insert(FormField::Patient, "Please select a patient");
        }
        if self.draft.date.is_none() {
            errors.insert(FormField::Date, "Date is required");
        }

        let start = parse_clock(&self.draft.start_time);
        let end = parse_clock(&self.draft.end_time);

        if self.draft.start_time.is_empty() {
            errors.insert(FormField::StartTime, "Start time is required");
        } else if start.is_none() {
            errors.insert(FormField::StartTime, "Start time must be HH:MM");
        }

        match (start, end) {
            (_, None) if self.draft.end_time.is_empty() => {
                errors.insert(FormField::EndTime, "End time is required");
            }
            (_, None) => {
                errors.insert(FormField::EndTime, "End time must be HH:MM");
            }
            (Some(start), Some(end)) if end <= start => {
                errors.insert(FormField::EndTime, "End time must be after start time");
            }
            _ => {}
        }

        self.errors = errors.clone();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    async fn resolve_department(&self, doctor_id: &str, auth_token: &str) -> Result<String, FormError> {
        if let Some(department_id) = &self.draft.department_id {
            return Ok(department_id.clone());
        }

        let lookup = self.backend.doctor_department(doctor_id, auth_token).await;
        if let Ok(Some(department_id)) = lookup {
            return Ok(department_id);
        }

        if let Some(fallback) = self.config.development_fallback_department() {
            if let Err(e) = &lookup {
                warn!("Department lookup for doctor {} failed: {}", doctor_id, e);
            }
            warn!("Using configured development fallback department {} for doctor {}", fallback, doctor_id);
            return Ok(fallback.to_string());
        }

        match lookup {
            Err(e) => {
                warn!("Department lookup for doctor {} failed: {}", doctor_id, e);
                Err(save_failure(&e))
            }
            Ok(_) => Err(FormError::MissingDepartment { doctor_id: doctor_id.to_string() }),
        }
    }

    fn build_payload(&self, doctor_id: String, department_id: String) -> Result<AppointmentPayload, FormError> {
        let (Some(patient), Some(date), Some(start), Some(end)) = (
            self.draft.patient.as_ref(),
            self.draft.date,
            parse_clock(&self.draft.start_time),
            parse_clock(&self.draft.end_time),
        ) else {
            return Err(FormError::Validation(self.errors.clone()));
        };

        let start_at = date.and_time(start);

        Ok(AppointmentPayload {
            patient_id: patient.id.clone(),
            doctor_id,
            department_id,
            date_time: start_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            end_time: end.format("%H:%M").to_string(),
            duration: (end - start).num_minutes(),
            status: if self.editing.is_none() { Some(AppointmentStatus::Scheduled) } else { None },
            kind: AppointmentKind::new(self.draft.appointment_type, self.draft.is_virtual),
            notes: self.draft.notes.clone(),
            symptoms: self.draft.symptoms.clone(),
        })
    }

    /// Validates, then creates or updates the appointment.
    ///
    /// Nothing is sent when validation fails or no department is known. On a
    /// backend failure the draft is kept so the user can retry; on success it
    /// is reset.
    pub async fn submit(&mut self) -> Result<Appointment, FormError> {
        self.save_error = None;
        self.validate().map_err(FormError::Validation)?;

        let session = self.session;
        let auth_token = match session.token() {
            Some(token) if session.is_active() => token,
            _ => return Err(FormError::SessionInactive),
        };
        let doctor_id = self.doctor_id.clone().ok_or(FormError::MissingDoctor)?;

        let department_id = match self.resolve_department(&doctor_id, auth_token).await {
            Ok(department_id) => department_id,
            Err(e) => {
                self.save_error = Some(e.to_string());
                return Err(e);
            }
        };

        let payload = self.build_payload(doctor_id, department_id)?;

        let result = match &self.editing {
            Some(appointment_id) => self.backend.update_appointment(appointment_id, &payload, auth_token).await,
            None => self.backend.create_appointment(&payload, auth_token).await,
        };

        match result {
            Ok(appointment) => {
                info!("Appointment {} saved", appointment.id);
                self.draft = AppointmentDraft::default();
                self.errors = FieldErrors::default();
                self.editing = None;
                Ok(appointment)
            }
            Err(e) => {
                warn!("Saving appointment failed: {}", e);
                let err = save_failure(&e);
                self.save_error = Some(err.to_string());
                Err(err)
            }
        }
    }
}

/// Backend failure during submission, carrying the backend's own message when it sent one.
fn save_failure(e: &AppointmentError) -> FormError {
    let message = match e.backend_message() {
        Some(msg) => format!("Failed to save appointment: {}", msg),
        None => GENERIC_SAVE_FAILURE.to_string(),
    };
    FormError::Save { message, status: e.backend_status() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    use shared_config::AppEnvironment;
    use shared_database::BackendError;
    use shared_models::auth::User;

    use crate::services::backend::MockAppointmentBackend;

    fn config(environment: AppEnvironment, fallback: Option<&str>) -> AppConfig {
        AppConfig {
            backend_api_url: "http://backend.test".to_string(),
            jwt_secret: "secret".to_string(),
            environment,
            fallback_department_id: fallback.map(str::to_string),
            server_port: 3000,
            backend_timeout_secs: 5,
        }
    }

    fn session() -> SessionContext {
        SessionContext::begin(
            User {
                id: "doc-1".to_string(),
                email: None,
                role: Some("doctor".to_string()),
                name: None,
                metadata: None,
                created_at: None,
            },
            "token",
        )
    }

    fn patient() -> SelectedPatient {
        SelectedPatient { id: "p-1".to_string(), name: Some("Ada Lovelace".to_string()) }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()
    }

    fn saved(payload: &AppointmentPayload) -> Appointment {
        Appointment {
            id: "a-1".to_string(),
            patient_id: payload.patient_id.clone(),
            patient_name: None,
            doctor_id: payload.doctor_id.clone(),
            department_id: Some(payload.department_id.clone()),
            start: day().and_hms_opt(9, 0, 0).unwrap(),
            end: day().and_hms_opt(9, 30, 0).unwrap(),
            kind: payload.kind,
            status: AppointmentStatus::Scheduled,
            notes: None,
            symptoms: None,
        }
    }

    fn fill(form: &mut AppointmentFormController<'_, MockAppointmentBackend>) {
        form.select_patient(patient());
        form.set_date(Some(day()));
        form.set_start_time("09:00");
        form.set_duration_tag(DurationTag::Minutes30);
    }

    #[test]
    fn test_end_time_follows_start_and_duration() {
        let backend = MockAppointmentBackend::new();
        let session = session();
        let config = config(AppEnvironment::Production, None);
        let mut form = AppointmentFormController::new(&backend, &session, &config, Some("doc-1".to_string()));

        form.set_start_time("09:00");
        assert_eq!(form.draft().end_time, "09:30");

        form.set_duration_tag(DurationTag::Hour1);
        assert_eq!(form.draft().end_time, "10:00");

        form.set_end_time("10:10");
        assert_eq!(form.draft().duration, DurationTag::Custom);

        form.set_start_time("08:00");
        assert_eq!(form.draft().end_time, "10:10");
    }

    #[test]
    fn test_validate_reports_each_missing_field() {
        let backend = MockAppointmentBackend::new();
        let session = session();
        let config = config(AppEnvironment::Production, None);
        let mut form = AppointmentFormController::new(&backend, &session, &config, None);

        let errors = form.validate().unwrap_err();
        assert!(errors.contains(FormField::Patient));
        assert!(errors.contains(FormField::Date));
        assert!(errors.contains(FormField::StartTime));
        assert!(errors.contains(FormField::EndTime));

        form.select_patient(patient());
        assert!(!form.errors().contains(FormField::Patient));
    }

    #[test]
    fn test_validate_iff_complete_and_ordered() {
        let backend = MockAppointmentBackend::new();
        let session = session();
        let config = config(AppEnvironment::Production, None);
        let mut form = AppointmentFormController::new(&backend, &session, &config, None);
        fill(&mut form);
        assert!(form.validate().is_ok());

        form.set_duration_tag(DurationTag::Custom);
        form.set_end_time("09:00");
        assert_eq!(
            form.validate().unwrap_err().get(FormField::EndTime),
            Some("End time must be after start time")
        );

        form.set_end_time("08:45");
        assert!(form.validate().is_err());

        form.set_end_time("09:05");
        assert!(form.validate().is_ok());
    }

    #[tokio::test]
    async fn test_submit_without_patient_makes_no_call() {
        let mut backend = MockAppointmentBackend::new();
        backend.expect_create_appointment().times(0);
        backend.expect_doctor_department().times(0);

        let session = session();
        let config = config(AppEnvironment::Production, None);
        let mut form = AppointmentFormController::new(&backend, &session, &config, Some("doc-1".to_string()));
        form.set_date(Some(day()));
        form.set_start_time("09:00");

        let result = form.submit().await;
        assert_matches!(result, Err(FormError::Validation(errors)) if errors.contains(FormField::Patient));
    }

    #[tokio::test]
    async fn test_submit_creates_with_resolved_department() {
        let mut backend = MockAppointmentBackend::new();
        backend
            .expect_doctor_department()
            .withf(|doctor_id, token| doctor_id == "doc-1" && token == "token")
            .times(1)
            .returning(|_, _| Ok(Some("dep-7".to_string())));
        backend
            .expect_create_appointment()
            .withf(|payload, token| {
                token == "token"
                    && payload.patient_id == "p-1"
                    && payload.department_id == "dep-7"
                    && payload.date_time == "2024-04-02T09:00:00"
                    && payload.end_time == "09:30"
                    && payload.status == Some(AppointmentStatus::Scheduled)
                    && payload.kind.to_string() == "virtual-consultation"
            })
            .times(1)
            .returning(|payload, _| Ok(saved(payload)));

        let session = session();
        let config = config(AppEnvironment::Production, None);
        let mut form = AppointmentFormController::new(&backend, &session, &config, Some("doc-1".to_string()));
        fill(&mut form);
        form.set_type(AppointmentType::Consultation);
        form.set_virtual(true);

        let appointment = form.submit().await.unwrap();
        assert_eq!(appointment.id, "a-1");
        assert_eq!(form.draft(), &AppointmentDraft::default());
    }

    #[tokio::test]
    async fn test_backend_message_surfaced_and_draft_kept() {
        let mut backend = MockAppointmentBackend::new();
        backend.expect_doctor_department().returning(|_, _| Ok(Some("dep-1".to_string())));
        backend.expect_create_appointment().times(1).returning(|_, _| {
            Err(AppointmentError::Backend(BackendError::Status {
                status: 409,
                message: Some("slot taken".to_string()),
                detail: "slot taken".to_string(),
            }))
        });

        let session = session();
        let config = config(AppEnvironment::Production, None);
        let mut form = AppointmentFormController::new(&backend, &session, &config, Some("doc-1".to_string()));
        fill(&mut form);
        let before = form.draft().clone();

        let err = form.submit().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to save appointment: slot taken");
        assert_eq!(form.save_error(), Some("Failed to save appointment: slot taken"));
        assert_eq!(form.draft(), &before);
    }

    #[tokio::test]
    async fn test_generic_message_without_backend_detail() {
        let mut backend = MockAppointmentBackend::new();
        backend.expect_doctor_department().returning(|_, _| Ok(Some("dep-1".to_string())));
        backend
            .expect_create_appointment()
            .returning(|_, _| Err(AppointmentError::Backend(BackendError::Transport("connection refused".to_string()))));

        let session = session();
        let config = config(AppEnvironment::Production, None);
        let mut form = AppointmentFormController::new(&backend, &session, &config, Some("doc-1".to_string()));
        fill(&mut form);

        assert_eq!(form.submit().await.unwrap_err().to_string(), GENERIC_SAVE_FAILURE);
    }

    #[tokio::test]
    async fn test_missing_department_blocks_submission() {
        let mut backend = MockAppointmentBackend::new();
        backend.expect_doctor_department().returning(|_, _| Ok(None));
        backend.expect_create_appointment().times(0);

        let session = session();
        // A fallback is configured but production never uses it.
        let config = config(AppEnvironment::Production, Some("dep-dev"));
        let mut form = AppointmentFormController::new(&backend, &session, &config, Some("doc-1".to_string()));
        fill(&mut form);

        assert_matches!(form.submit().await, Err(FormError::MissingDepartment { doctor_id }) if doctor_id == "doc-1");
        assert_eq!(form.draft().start_time, "09:00");
    }

    #[tokio::test]
    async fn test_failed_department_lookup_is_a_save_error() {
        let mut backend = MockAppointmentBackend::new();
        backend
            .expect_doctor_department()
            .times(1)
            .returning(|_, _| Err(AppointmentError::Backend(BackendError::Transport("connection reset".to_string()))));
        backend.expect_create_appointment().times(0);

        let session = session();
        let config = config(AppEnvironment::Production, None);
        let mut form = AppointmentFormController::new(&backend, &session, &config, Some("doc-1".to_string()));
        fill(&mut form);

        let result = form.submit().await;
        assert_matches!(result, Err(FormError::Save { ref message, status: None }) if message == GENERIC_SAVE_FAILURE);
        assert_eq!(form.save_error(), Some(GENERIC_SAVE_FAILURE));
    }

    #[tokio::test]
    async fn test_department_lookup_rejection_keeps_backend_message() {
        let mut backend = MockAppointmentBackend::new();
        backend.expect_doctor_department().returning(|_, _| {
            Err(AppointmentError::Backend(BackendError::Status {
                status: 503,
                message: Some("directory unavailable".to_string()),
                detail: "directory unavailable".to_string(),
            }))
        });
        backend.expect_create_appointment().times(0);

        let session = session();
        let config = config(AppEnvironment::Production, None);
        let mut form = AppointmentFormController::new(&backend, &session, &config, Some("doc-1".to_string()));
        fill(&mut form);

        let err = form.submit().await.unwrap_err();
        assert_matches!(err, FormError::Save { status: Some(503), .. });
        assert_eq!(err.to_string(), "Failed to save appointment: directory unavailable");
    }

    #[tokio::test]
    async fn test_development_fallback_department() {
        let mut backend = MockAppointmentBackend::new();
        backend.expect_doctor_department().returning(|_, _| Ok(None));
        backend
            .expect_create_appointment()
            .withf(|payload, _| payload.department_id == "dep-dev")
            .times(1)
            .returning(|payload, _| Ok(saved(payload)));

        let session = session();
        let config = config(AppEnvironment::Development, Some("dep-dev"));
        let mut form = AppointmentFormController::new(&backend, &session, &config, Some("doc-1".to_string()));
        fill(&mut form);

        assert!(form.submit().await.is_ok());
    }

    #[tokio::test]
    async fn test_development_fallback_covers_failed_lookup() {
        let mut backend = MockAppointmentBackend::new();
        backend
            .expect_doctor_department()
            .returning(|_, _| Err(AppointmentError::Backend(BackendError::Transport("connection reset".to_string()))));
        backend
            .expect_create_appointment()
            .withf(|payload, _| payload.department_id == "dep-dev")
            .times(1)
            .returning(|payload, _| Ok(saved(payload)));

        let session = session();
        let config = config(AppEnvironment::Development, Some("dep-dev"));
        let mut form = AppointmentFormController::new(&backend, &session, &config, Some("doc-1".to_string()));
        fill(&mut form);

        assert!(form.submit().await.is_ok());
    }

    #[tokio::test]
    async fn test_edit_seeds_draft_and_updates() {
        let existing = Appointment {
            id: "a-9".to_string(),
            patient_id: "p-3".to_string(),
            patient_name: Some("Grace Hopper".to_string()),
            doctor_id: "doc-1".to_string(),
            department_id: Some("dep-2".to_string()),
            start: day().and_hms_opt(14, 0, 0).unwrap(),
            end: day().and_hms_opt(14, 20, 0).unwrap(),
            kind: AppointmentKind::new(AppointmentType::FollowUp, true),
            status: AppointmentStatus::Confirmed,
            notes: Some("bring results".to_string()),
            symptoms: None,
        };

        let mut backend = MockAppointmentBackend::new();
        backend.expect_doctor_department().times(0);
        backend
            .expect_update_appointment()
            .withf(|id, payload, _| {
                id == "a-9"
                    && payload.status.is_none()
                    && payload.department_id == "dep-2"
                    && payload.end_time == "14:20"
                    && payload.kind.to_string() == "virtual-follow-up"
            })
            .times(1)
            .returning(|_, payload, _| Ok(saved(payload)));

        let session = session();
        let config = config(AppEnvironment::Production, None);
        let mut form = AppointmentFormController::for_edit(&backend, &session, &config, &existing, None);

        assert!(form.is_editing());
        assert_eq!(form.draft().duration, DurationTag::Custom);
        assert_eq!(form.draft().start_time, "14:00");
        assert_eq!(form.draft().end_time, "14:20");
        assert_eq!(form.draft().patient.as_ref().and_then(|p| p.name.as_deref()), Some("Grace Hopper"));
        assert_eq!(form.draft().notes, "bring results");

        assert!(form.submit().await.is_ok());
        assert!(!form.is_editing());
    }

    #[tokio::test]
    async fn test_cleared_session_cannot_submit() {
        let mut backend = MockAppointmentBackend::new();
        backend.expect_create_appointment().times(0);

        let mut session = session();
        session.clear();
        let config = config(AppEnvironment::Production, None);
        let mut form = AppointmentFormController::new(&backend, &session, &config, Some("doc-1".to_string()));
        fill(&mut form);

        assert_matches!(form.submit().await, Err(FormError::SessionInactive));
    }
}
