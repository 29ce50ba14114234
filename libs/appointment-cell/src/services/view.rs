// libs/appointment-cell/src/services/view.rs
use std::collections::BTreeSet;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use patient_cell::models::{PatientDisplay, NOT_AVAILABLE};
use shared_config::AppConfig;
use shared_models::auth::SessionContext;

use crate::models::{
    Appointment, AppointmentError, AppointmentQuery, AppointmentRow, AppointmentStatus, DaySchedule,
};
use crate::services::backend::AppointmentBackend;
use crate::services::form::AppointmentFormController;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::slots::generate_day_slots;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// Narrowing applied to the list view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentFilters {
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub search: String,
}

impl AppointmentFilters {
    fn matches(&self, row: &AppointmentRow) -> bool {
        if let Some(status) = self.status {
            if row.appointment.status != status {
                return false;
            }
        }
        if let Some(date) = self.date {
            if row.appointment.date() != date {
                return false;
            }
        }

        let needle = self.search.trim().to_lowercase();
        needle.is_empty()
            || row.patient.name.to_lowercase().contains(&needle)
            || row.appointment.patient_id.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    Idle,
    Loaded,
    Failed { message: String, retryable: bool },
}

/// The doctor's appointments dashboard: a day grid or a filtered list.
pub struct AppointmentsViewController<'a, B: AppointmentBackend + ?Sized> {
    backend: &'a B,
    session: &'a SessionContext,
    config: &'a AppConfig,
    lifecycle: AppointmentLifecycleService,
    doctor_id: Option<String>,
    selected_date: NaiveDate,
    today: NaiveDate,
    view_mode: ViewMode,
    filters: AppointmentFilters,
    rows: Vec<AppointmentRow>,
    load_state: LoadState,
}

impl<'a, B: AppointmentBackend + ?Sized> AppointmentsViewController<'a, B> {
    pub fn new(
        backend: &'a B,
        session: &'a SessionContext,
        config: &'a AppConfig,
        doctor_id: Option<String>,
        selected_date: NaiveDate,
    ) -> Self {
        Self {
            backend,
            session,
            config,
            lifecycle: AppointmentLifecycleService::new(),
            doctor_id,
            selected_date,
            today: Local::now().date_naive(),
            view_mode: ViewMode::default(),
            filters: AppointmentFilters::default(),
            rows: Vec::new(),
            load_state: LoadState::Idle,
        }
    }

    pub fn with_view_mode(mut self, view_mode: ViewMode) -> Self {
        self.view_mode = view_mode;
        self
    }

    pub fn with_filters(mut self, filters: AppointmentFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn doctor_id(&self) -> Option<&str> {
        self.doctor_id.as_deref()
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        self.view_mode = view_mode;
    }

    pub fn filters(&self) -> &AppointmentFilters {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut AppointmentFilters {
        &mut self.filters
    }

    pub fn rows(&self) -> &[AppointmentRow] {
        &self.rows
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn next_day(&mut self) {
        self.selected_date += Duration::days(1);
    }

    pub fn previous_day(&mut self) {
        self.selected_date -= Duration::days(1);
    }

    pub fn go_to(&mut self, date: NaiveDate) {
        self.selected_date = date;
    }

    fn auth_token(&self) -> Result<&'a str, AppointmentError> {
        let session = self.session;
        match session.token() {
            Some(token) if session.is_active() => Ok(token),
            _ => Err(AppointmentError::SessionInactive),
        }
    }

    fn query(&self, doctor_id: &str) -> AppointmentQuery {
        let mut query = match (self.view_mode, self.filters.date) {
            (ViewMode::Grid, _) => AppointmentQuery::for_day(doctor_id, self.selected_date),
            (ViewMode::List, Some(date)) => AppointmentQuery::for_day(doctor_id, date),
            (ViewMode::List, None) => AppointmentQuery {
                doctor_id: doctor_id.to_string(),
                from: None,
                to: None,
                status: None,
            },
        };
        query.status = self.filters.status;
        query
    }

    /// Reloads the doctor's appointments and decorates them for display.
    ///
    /// On failure the previously loaded rows stay in place and the load
    /// state carries the message.
    pub async fn refresh(&mut self) -> Result<(), AppointmentError> {
        let auth_token = self.auth_token()?;
        let doctor_id = self.doctor_id.clone().ok_or(AppointmentError::MissingDoctor)?;
        let query = self.query(&doctor_id);

        let appointments = match self.backend.list_appointments(&query, auth_token).await {
            Ok(appointments) => appointments,
            Err(e) => {
                warn!("Loading appointments for doctor {} failed: {}", doctor_id, e);
                let retryable = !e.is_auth();
                self.load_state = LoadState::Failed {
                    message: format!("Failed to load appointments: {}", e),
                    retryable,
                };
                return Err(e);
            }
        };

        self.rows = self.decorate(appointments, auth_token).await;
        self.load_state = LoadState::Loaded;
        debug!("Loaded {} appointments for doctor {}", self.rows.len(), doctor_id);
        Ok(())
    }

    async fn decorate(&self, appointments: Vec<Appointment>, auth_token: &str) -> Vec<AppointmentRow> {
        let patient_ids: Vec<String> = appointments
            .iter()
            .map(|appointment| appointment.patient_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let patients = self.backend.get_patients(&patient_ids, auth_token).await;

        appointments
            .into_iter()
            .map(|appointment| {
                let patient = match (patients.get(&appointment.patient_id), appointment.patient_name.as_deref()) {
                    (Some(patient), _) => PatientDisplay::of(patient, self.today),
                    (None, Some(name)) => display_from_name(name),
                    (None, None) => PatientDisplay::unknown(),
                };
                let actions = self.lifecycle.available_actions(&appointment.status);
                AppointmentRow { appointment, patient, actions }
            })
            .collect()
    }

    pub fn day_schedule(&self, now: NaiveDateTime) -> DaySchedule<AppointmentRow> {
        generate_day_slots(self.selected_date, self.rows.iter().cloned(), now)
    }

    /// Rows matching the status, date and search filters, earliest first.
    pub fn visible_list(&self) -> Vec<&AppointmentRow> {
        let mut visible: Vec<&AppointmentRow> = self.rows.iter().filter(|row| self.filters.matches(row)).collect();
        visible.sort_by_key(|row| row.appointment.start);
        visible
    }

    async fn find_appointment(&self, appointment_id: &str, auth_token: &str) -> Result<Appointment, AppointmentError> {
        match self.rows.iter().find(|row| row.appointment.id == appointment_id) {
            Some(row) => Ok(row.appointment.clone()),
            None => self.backend.get_appointment(appointment_id, auth_token).await,
        }
    }

    pub async fn change_status(
        &mut self,
        appointment_id: &str,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let auth_token = self.auth_token()?;
        let current = self.find_appointment(appointment_id, auth_token).await?;
        self.lifecycle.validate_status_transition(&current.status, &new_status)?;

        let updated = match self.backend.update_status(appointment_id, new_status, auth_token).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!("Changing appointment {} to {} failed: {}", appointment_id, new_status, e);
                return Err(e);
            }
        };
        info!("Appointment {} moved from {} to {}", appointment_id, current.status, new_status);

        if self.doctor_id.is_some() {
            if let Err(e) = self.refresh().await {
                warn!("Refetch after status change failed: {}", e);
            }
        }
        Ok(updated)
    }

    pub async fn delete(&mut self, appointment_id: &str, confirmed: bool) -> Result<(), AppointmentError> {
        if !confirmed {
            return Err(AppointmentError::ConfirmationRequired);
        }
        let auth_token = self.auth_token()?;

        if let Err(e) = self.backend.delete_appointment(appointment_id, auth_token).await {
            warn!("Deleting appointment {} failed: {}", appointment_id, e);
            return Err(e);
        }
        info!("Appointment {} deleted", appointment_id);

        self.rows.retain(|row| row.appointment.id != appointment_id);
        if self.doctor_id.is_some() {
            if let Err(e) = self.refresh().await {
                warn!("Refetch after delete failed: {}", e);
            }
        }
        Ok(())
    }

    /// A blank form for the selected day, starting at `slot_label` when given.
    pub fn open_create(&self, slot_label: Option<&str>) -> AppointmentFormController<'a, B> {
        let mut form = AppointmentFormController::new(self.backend, self.session, self.config, self.doctor_id.clone());
        form.set_date(Some(self.selected_date));
        if let Some(label) = slot_label {
            form.set_start_time(label);
        }
        form
    }

    /// A form seeded from an existing appointment.
    pub async fn open_edit(&self, appointment_id: &str) -> Result<AppointmentFormController<'a, B>, AppointmentError> {
        let auth_token = self.auth_token()?;
        let appointment = self.find_appointment(appointment_id, auth_token).await?;

        let patient = match self.backend.get_patient(&appointment.patient_id, auth_token).await {
            Ok(patient) => Some(patient),
            Err(e) => {
                warn!("Patient {} unavailable for edit form: {}", appointment.patient_id, e);
                None
            }
        };

        Ok(AppointmentFormController::for_edit(
            self.backend,
            self.session,
            self.config,
            &appointment,
            patient.as_ref(),
        ))
    }
}

fn display_from_name(name: &str) -> PatientDisplay {
    let initials: String = name
        .split_whitespace()
        .filter_map(|part| part.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();

    PatientDisplay {
        name: name.to_string(),
        initials: if initials.is_empty() { "?".to_string() } else { initials },
        age: None,
        gender: NOT_AVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use assert_matches::assert_matches;
    use patient_cell::models::Patient;
    use shared_config::AppEnvironment;
    use shared_database::BackendError;
    use shared_models::auth::User;

    use crate::models::{AppointmentKind, DurationTag, StatusAction};
    use crate::services::backend::MockAppointmentBackend;

    fn config() -> AppConfig {
        AppConfig {
            backend_api_url: "http://backend.test".to_string(),
            jwt_secret: "secret".to_string(),
            environment: AppEnvironment::Production,
            fallback_department_id: None,
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

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()
    }

    fn appointment(id: &str, patient_id: &str, hour: u32, minute: u32, status: AppointmentStatus) -> Appointment {
        let start = day().and_hms_opt(hour, minute, 0).unwrap();
        Appointment {
            id: id.to_string(),
            patient_id: patient_id.to_string(),
            patient_name: None,
            doctor_id: "doc-1".to_string(),
            department_id: Some("dep-1".to_string()),
            start,
            end: start + Duration::minutes(30),
            kind: AppointmentKind::default(),
            status,
            notes: None,
            symptoms: None,
        }
    }

    fn ada() -> Patient {
        Patient {
            id: "p-1".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: None,
            phone: None,
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1),
            gender: Some("female".to_string()),
        }
    }

    fn day_of_appointments() -> Vec<Appointment> {
        let mut embedded = appointment("a-2", "p-2", 10, 15, AppointmentStatus::Confirmed);
        embedded.patient_name = Some("grace hopper".to_string());
        vec![
            appointment("a-1", "p-1", 9, 0, AppointmentStatus::Scheduled),
            embedded,
            appointment("a-3", "p-3", 11, 40, AppointmentStatus::Completed),
        ]
    }

    fn backend_with_day() -> MockAppointmentBackend {
        let mut backend = MockAppointmentBackend::new();
        backend
            .expect_list_appointments()
            .returning(|_, _| Ok(day_of_appointments()));
        backend
            .expect_get_patients()
            .returning(|_, _| HashMap::from([("p-1".to_string(), ada())]));
        backend
    }

    #[tokio::test]
    async fn test_refresh_decorates_rows() {
        let backend = backend_with_day();
        let session = session();
        let config = config();
        let mut view = AppointmentsViewController::new(&backend, &session, &config, Some("doc-1".to_string()), day());

        view.refresh().await.unwrap();

        assert_eq!(view.load_state(), &LoadState::Loaded);
        let rows = view.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].patient.name, "Ada Lovelace");
        assert_eq!(rows[0].patient.initials, "AL");
        assert_eq!(rows[1].patient.name, "grace hopper");
        assert_eq!(rows[1].patient.initials, "GH");
        assert_eq!(rows[2].patient, PatientDisplay::unknown());

        assert_eq!(rows[0].actions, vec![StatusAction::Complete, StatusAction::Cancel]);
        assert!(rows[2].actions.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_queries_selected_day_and_status() {
        let mut backend = MockAppointmentBackend::new();
        backend
            .expect_list_appointments()
            .withf(|query, token| {
                token == "token"
                    && query.doctor_id == "doc-1"
                    && query.from == NaiveDate::from_ymd_opt(2024, 4, 3)
                    && query.status == Some(AppointmentStatus::Confirmed)
            })
            .times(1)
            .returning(|_, _| Ok(vec![]));
        backend.expect_get_patients().returning(|_, _| HashMap::new());

        let session = session();
        let config = config();
        let mut view = AppointmentsViewController::new(&backend, &session, &config, Some("doc-1".to_string()), day());
        view.filters_mut().status = Some(AppointmentStatus::Confirmed);
        view.next_day();

        view.refresh().await.unwrap();
        assert!(view.rows().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_failure_is_retryable() {
        let mut backend = MockAppointmentBackend::new();
        backend
            .expect_list_appointments()
            .returning(|_, _| Err(AppointmentError::Backend(BackendError::Transport("timed out".to_string()))));
        backend.expect_get_patients().times(0);

        let session = session();
        let config = config();
        let mut view = AppointmentsViewController::new(&backend, &session, &config, Some("doc-1".to_string()), day());

        assert!(view.refresh().await.is_err());
        assert_matches!(view.load_state(), LoadState::Failed { retryable: true, .. });
        assert!(view.rows().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_rejected_credentials_are_not_retryable() {
        let mut backend = MockAppointmentBackend::new();
        backend.expect_list_appointments().returning(|_, _| {
            Err(AppointmentError::Backend(BackendError::Status {
                status: 401,
                message: Some("token expired".to_string()),
                detail: "token expired".to_string(),
            }))
        });
        backend.expect_get_patients().times(0);

        let session = session();
        let config = config();
        let mut view = AppointmentsViewController::new(&backend, &session, &config, Some("doc-1".to_string()), day());

        assert!(view.refresh().await.is_err());
        assert_matches!(view.load_state(), LoadState::Failed { retryable: false, .. });
    }

    #[tokio::test]
    async fn test_refresh_requires_doctor() {
        let backend = MockAppointmentBackend::new();
        let session = session();
        let config = config();
        let mut view = AppointmentsViewController::new(&backend, &session, &config, None, day());

        assert_matches!(view.refresh().await, Err(AppointmentError::MissingDoctor));
    }

    #[tokio::test]
    async fn test_day_schedule_and_visible_list() {
        let backend = backend_with_day();
        let session = session();
        let config = config();
        let mut view = AppointmentsViewController::new(&backend, &session, &config, Some("doc-1".to_string()), day());
        view.refresh().await.unwrap();

        let schedule = view.day_schedule(day().and_hms_opt(10, 20, 0).unwrap());
        let slot = |label: &str| schedule.slots.iter().find(|slot| slot.label == label).unwrap();
        assert_eq!(slot("09:00").appointments.len(), 1);
        assert_eq!(slot("10:00").appointments[0].appointment.id, "a-2");
        assert_eq!(slot("11:30").appointments[0].appointment.id, "a-3");
        assert!(slot("10:00").is_current);
        assert_eq!(schedule.slotted_count(), 3);

        view.filters_mut().search = "GRACE".to_string();
        let visible = view.visible_list();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].appointment.id, "a-2");

        view.filters_mut().search = "p-3".to_string();
        assert_eq!(view.visible_list()[0].appointment.id, "a-3");

        view.filters_mut().search.clear();
        view.filters_mut().status = Some(AppointmentStatus::Scheduled);
        assert_eq!(view.visible_list().len(), 1);

        view.filters_mut().status = None;
        view.filters_mut().date = NaiveDate::from_ymd_opt(2024, 4, 5);
        assert!(view.visible_list().is_empty());
    }

    #[tokio::test]
    async fn test_change_status_rejects_terminal_without_request() {
        let mut backend = backend_with_day();
        backend.expect_update_status().times(0);

        let session = session();
        let config = config();
        let mut view = AppointmentsViewController::new(&backend, &session, &config, Some("doc-1".to_string()), day());
        view.refresh().await.unwrap();

        let result = view.change_status("a-3", AppointmentStatus::Cancelled).await;
        assert_matches!(
            result,
            Err(AppointmentError::InvalidStatusTransition { from: AppointmentStatus::Completed, .. })
        );
    }

    #[tokio::test]
    async fn test_change_status_refetches_on_success() {
        let mut backend = MockAppointmentBackend::new();
        let mut fetches = 0;
        backend
            .expect_list_appointments()
            .times(2)
            .returning(move |_, _| {
                fetches += 1;
                let status = if fetches == 1 { AppointmentStatus::Scheduled } else { AppointmentStatus::Completed };
                Ok(vec![appointment("a-1", "p-1", 9, 0, status)])
            });
        backend.expect_get_patients().returning(|_, _| HashMap::new());
        backend
            .expect_update_status()
            .withf(|id, status, _| id == "a-1" && *status == AppointmentStatus::Completed)
            .times(1)
            .returning(|_, _, _| Ok(appointment("a-1", "p-1", 9, 0, AppointmentStatus::Completed)));

        let session = session();
        let config = config();
        let mut view = AppointmentsViewController::new(&backend, &session, &config, Some("doc-1".to_string()), day());
        view.refresh().await.unwrap();

        view.change_status("a-1", AppointmentStatus::Completed).await.unwrap();
        assert_eq!(view.rows()[0].appointment.status, AppointmentStatus::Completed);
        assert!(view.rows()[0].actions.is_empty());
    }

    #[tokio::test]
    async fn test_change_status_failure_leaves_rows() {
        let mut backend = backend_with_day();
        backend.expect_update_status().returning(|_, _, _| {
            Err(AppointmentError::Backend(BackendError::Status {
                status: 409,
                message: Some("already completed".to_string()),
                detail: "already completed".to_string(),
            }))
        });

        let session = session();
        let config = config();
        let mut view = AppointmentsViewController::new(&backend, &session, &config, Some("doc-1".to_string()), day());
        view.refresh().await.unwrap();
        let before = view.rows().to_vec();

        let err = view.change_status("a-1", AppointmentStatus::Completed).await.unwrap_err();
        assert_eq!(err.backend_message(), Some("already completed"));
        assert_eq!(view.rows(), before.as_slice());
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let mut backend = MockAppointmentBackend::new();
        backend.expect_delete_appointment().times(0);

        let session = session();
        let config = config();
        let mut view = AppointmentsViewController::new(&backend, &session, &config, Some("doc-1".to_string()), day());

        assert_matches!(view.delete("a-1", false).await, Err(AppointmentError::ConfirmationRequired));
    }

    #[tokio::test]
    async fn test_delete_confirmed() {
        let mut backend = MockAppointmentBackend::new();
        backend
            .expect_delete_appointment()
            .withf(|id, _| id == "a-1")
            .times(1)
            .returning(|_, _| Ok(()));
        backend.expect_list_appointments().returning(|_, _| Ok(vec![]));
        backend.expect_get_patients().returning(|_, _| HashMap::new());

        let session = session();
        let config = config();
        let mut view = AppointmentsViewController::new(&backend, &session, &config, Some("doc-1".to_string()), day());

        view.delete("a-1", true).await.unwrap();
        assert!(view.rows().is_empty());
    }

    #[test]
    fn test_navigation_and_open_create() {
        let backend = MockAppointmentBackend::new();
        let session = session();
        let config = config();
        let mut view = AppointmentsViewController::new(&backend, &session, &config, Some("doc-1".to_string()), day());

        view.next_day();
        view.next_day();
        view.previous_day();
        assert_eq!(view.selected_date(), NaiveDate::from_ymd_opt(2024, 4, 3).unwrap());
        view.go_to(day());

        let form = view.open_create(Some("17:45"));
        assert_eq!(form.draft().date, Some(day()));
        assert_eq!(form.draft().start_time, "17:45");
        assert_eq!(form.draft().duration, DurationTag::Minutes30);
        assert_eq!(form.draft().end_time, "18:15");
    }

    #[tokio::test]
    async fn test_open_edit_seeds_form() {
        let mut backend = MockAppointmentBackend::new();
        backend
            .expect_get_appointment()
            .withf(|id, _| id == "a-1")
            .returning(|_, _| Ok(appointment("a-1", "p-1", 9, 0, AppointmentStatus::Scheduled)));
        backend.expect_get_patient().returning(|_, _| Ok(ada()));

        let session = session();
        let config = config();
        let view = AppointmentsViewController::new(&backend, &session, &config, Some("doc-1".to_string()), day());

        let form = view.open_edit("a-1").await.unwrap();
        assert_eq!(form.editing_id(), Some("a-1"));
        assert_eq!(form.draft().patient.as_ref().and_then(|p| p.name.as_deref()), Some("Ada Lovelace"));
        assert_eq!(form.draft().end_time, "09:30");
    }
}
