// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use department_cell::models::DepartmentError;
use patient_cell::models::{PatientDisplay, PatientError};
use shared_database::BackendError;
use shared_models::parse::{ParseError, ParseMode};

/// Length assumed when the backend sends neither an end time nor a duration.
pub const DEFAULT_DURATION_MINUTES: i64 = 30;

// ==============================================================================
// STATUS AND TYPE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    #[serde(alias = "no_show", alias = "noshow")]
    NoShow,
}

impl AppointmentStatus {
    /// No user-triggered transition leaves these.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no-show"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            "no-show" | "no_show" | "noshow" => Ok(AppointmentStatus::NoShow),
            other => Err(format!("Unknown appointment status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentType {
    #[default]
    Regular,
    #[serde(alias = "follow_up", alias = "followup")]
    FollowUp,
    Consultation,
    Emergency,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Regular => write!(f, "regular"),
            AppointmentType::FollowUp => write!(f, "follow-up"),
            AppointmentType::Consultation => write!(f, "consultation"),
            AppointmentType::Emergency => write!(f, "emergency"),
        }
    }
}

impl FromStr for AppointmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" => Ok(AppointmentType::Regular),
            "follow-up" | "follow_up" | "followup" => Ok(AppointmentType::FollowUp),
            "consultation" => Ok(AppointmentType::Consultation),
            "emergency" => Ok(AppointmentType::Emergency),
            other => Err(format!("Unknown appointment type: {}", other)),
        }
    }
}

/// Appointment type plus the telehealth flag, carried on the wire as a single
/// string with a `virtual-` prefix (`virtual-follow-up`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppointmentKind {
    pub appointment_type: AppointmentType,
    pub is_virtual: bool,
}

const VIRTUAL_PREFIX: &str = "virtual-";

impl AppointmentKind {
    pub fn new(appointment_type: AppointmentType, is_virtual: bool) -> Self {
        Self { appointment_type, is_virtual }
    }
}

impl fmt::Display for AppointmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_virtual {
            write!(f, "{}{}", VIRTUAL_PREFIX, self.appointment_type)
        } else {
            write!(f, "{}", self.appointment_type)
        }
    }
}

impl FromStr for AppointmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.strip_prefix(VIRTUAL_PREFIX) {
            Some(base) => Ok(Self::new(base.parse()?, true)),
            None => Ok(Self::new(lowered.parse()?, false)),
        }
    }
}

impl TryFrom<String> for AppointmentKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AppointmentKind> for String {
    fn from(kind: AppointmentKind) -> Self {
        kind.to_string()
    }
}

// ==============================================================================
// DURATION TAG
// ==============================================================================

/// The duration choices the booking form offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DurationTag {
    #[serde(rename = "15min")]
    Minutes15,
    #[default]
    #[serde(rename = "30min")]
    Minutes30,
    #[serde(rename = "45min")]
    Minutes45,
    #[serde(rename = "1hour")]
    Hour1,
    #[serde(rename = "custom")]
    Custom,
}

impl DurationTag {
    pub fn minutes(&self) -> Option<i64> {
        match self {
            DurationTag::Minutes15 => Some(15),
            DurationTag::Minutes30 => Some(30),
            DurationTag::Minutes45 => Some(45),
            DurationTag::Hour1 => Some(60),
            DurationTag::Custom => None,
        }
    }

    pub fn from_minutes(minutes: i64) -> Self {
        match minutes {
            15 => DurationTag::Minutes15,
            30 => DurationTag::Minutes30,
            45 => DurationTag::Minutes45,
            60 => DurationTag::Hour1,
            _ => DurationTag::Custom,
        }
    }
}

impl fmt::Display for DurationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationTag::Minutes15 => write!(f, "15min"),
            DurationTag::Minutes30 => write!(f, "30min"),
            DurationTag::Minutes45 => write!(f, "45min"),
            DurationTag::Hour1 => write!(f, "1hour"),
            DurationTag::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for DurationTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "15min" => Ok(DurationTag::Minutes15),
            "30min" => Ok(DurationTag::Minutes30),
            "45min" => Ok(DurationTag::Minutes45),
            "1hour" => Ok(DurationTag::Hour1),
            "custom" => Ok(DurationTag::Custom),
            other => Err(format!("Unknown duration: {}", other)),
        }
    }
}

// ==============================================================================
// CORE APPOINTMENT MODEL
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    /// Name embedded by the backend when it populates the patient.
    pub patient_name: Option<String>,
    pub doctor_id: String,
    pub department_id: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub kind: AppointmentKind,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub symptoms: Option<String>,
}

impl Appointment {
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    /// "HH:MM" of the start, as shown in the grid.
    pub fn start_label(&self) -> String {
        self.start.format("%H:%M").to_string()
    }

    pub fn end_label(&self) -> String {
        self.end.format("%H:%M").to_string()
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Something placed on the day grid by its start time.
pub trait Scheduled {
    fn starts_at(&self) -> NaiveDateTime;
}

impl Scheduled for Appointment {
    fn starts_at(&self) -> NaiveDateTime {
        self.start
    }
}

/// An appointment decorated for display, with the actions it offers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentRow {
    pub appointment: Appointment,
    pub patient: PatientDisplay,
    pub actions: Vec<StatusAction>,
}

impl Scheduled for AppointmentRow {
    fn starts_at(&self) -> NaiveDateTime {
        self.appointment.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    Complete,
    Cancel,
}

impl StatusAction {
    pub fn target_status(&self) -> AppointmentStatus {
        match self {
            StatusAction::Complete => AppointmentStatus::Completed,
            StatusAction::Cancel => AppointmentStatus::Cancelled,
        }
    }
}

// ==============================================================================
// SLOT GRID
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSlot<T> {
    pub label: String,
    pub time: NaiveTime,
    pub appointments: Vec<T>,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySchedule<T> {
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot<T>>,
    /// Appointments of the day starting before or after the grid hours.
    pub outside_hours: Vec<T>,
}

impl<T> DaySchedule<T> {
    pub fn slotted_count(&self) -> usize {
        self.slots.iter().map(|slot| slot.appointments.len()).sum()
    }
}

// ==============================================================================
// BACKEND RECORDS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedPatient {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "first_name", rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(alias = "last_name", rename = "lastName")]
    pub last_name: Option<String>,
}

/// `patientId` arrives either as an id or as the populated patient.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PatientRef {
    Id(String),
    Embedded(EmbeddedPatient),
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedEntity {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
}

/// `doctorId` and `departmentId` arrive either as an id or as the populated document.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    Id(String),
    Embedded(EmbeddedEntity),
}

impl EntityRef {
    pub fn into_id(self) -> Option<String> {
        let id = match self {
            EntityRef::Id(id) => Some(id),
            EntityRef::Embedded(embedded) => embedded.id,
        };
        id.filter(|id| !id.is_empty())
    }
}

/// Appointment JSON as the backend sends it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRecord {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    #[serde(alias = "patient_id", alias = "patient")]
    pub patient_id: Option<PatientRef>,
    #[serde(alias = "doctor_id", alias = "doctor")]
    pub doctor_id: Option<EntityRef>,
    #[serde(alias = "department_id", alias = "department")]
    pub department_id: Option<EntityRef>,
    #[serde(alias = "date_time", alias = "appointmentDate", alias = "date")]
    pub date_time: Option<String>,
    #[serde(alias = "end_time")]
    pub end_time: Option<String>,
    #[serde(alias = "duration_minutes")]
    pub duration: Option<i64>,
    #[serde(rename = "type", alias = "appointmentType")]
    pub appointment_type: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub symptoms: Option<String>,
}

/// Parses an ISO timestamp into clinic wall-clock time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.naive_local());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Parses an "HH:MM" (or "HH:MM:SS") clock value.
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

impl AppointmentRecord {
    pub fn into_appointment(self, mode: ParseMode) -> Result<Appointment, ParseError> {
        const ENTITY: &str = "Appointment";

        let id = mode.require(ENTITY, "id", self.id)?;

        let (patient_id, patient_name) = match self.patient_id {
            Some(PatientRef::Id(id)) => (Some(id), None),
            Some(PatientRef::Embedded(embedded)) => {
                let name = embedded.name.or_else(|| match (embedded.first_name, embedded.last_name) {
                    (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
                    (first, last) => first.or(last),
                });
                (embedded.id, name)
            }
            None => (None, None),
        };
        let patient_id = mode.require(ENTITY, "patientId", patient_id)?;
        let doctor_id = mode.require(ENTITY, "doctorId", self.doctor_id.and_then(EntityRef::into_id))?;

        let raw_start = mode.require(ENTITY, "dateTime", self.date_time)?;
        let start = parse_timestamp(&raw_start).ok_or_else(|| ParseError::InvalidField {
            entity: ENTITY,
            field: "dateTime",
            value: raw_start.clone(),
        })?;

        let end = match self.end_time.as_deref().and_then(|raw| resolve_end(start, raw)) {
            Some(end) if end > start => end,
            Some(_) | None => {
                let minutes = match (self.duration, self.end_time) {
                    (Some(minutes), _) if minutes > 0 => minutes,
                    (_, Some(raw)) => mode.or_default_invalid(ENTITY, "endTime", &raw, || DEFAULT_DURATION_MINUTES)?,
                    (_, None) => mode.or_default(ENTITY, "duration", None, || DEFAULT_DURATION_MINUTES)?,
                };
                start + Duration::minutes(minutes)
            }
        };

        let kind = match self.appointment_type {
            Some(raw) => match raw.parse::<AppointmentKind>() {
                Ok(kind) => kind,
                Err(_) => mode.or_default_invalid(ENTITY, "type", &raw, AppointmentKind::default)?,
            },
            None => mode.or_default(ENTITY, "type", None, AppointmentKind::default)?,
        };

        let status = match self.status {
            Some(raw) => match raw.parse::<AppointmentStatus>() {
                Ok(status) => status,
                Err(_) => mode.or_default_invalid(ENTITY, "status", &raw, || AppointmentStatus::Scheduled)?,
            },
            None => mode.or_default(ENTITY, "status", None, || AppointmentStatus::Scheduled)?,
        };

        Ok(Appointment {
            id,
            patient_id,
            patient_name,
            doctor_id,
            department_id: self.department_id.and_then(EntityRef::into_id),
            start,
            end,
            kind,
            status,
            notes: self.notes.filter(|n| !n.is_empty()),
            symptoms: self.symptoms.filter(|s| !s.is_empty()),
        })
    }
}

/// `endTime` is either a full timestamp or a clock time on the start's day.
fn resolve_end(start: NaiveDateTime, raw: &str) -> Option<NaiveDateTime> {
    parse_timestamp(raw).or_else(|| parse_clock(raw).map(|time| start.date().and_time(time)))
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Body sent to `POST /appointments` and `PUT /appointments/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPayload {
    pub patient_id: String,
    pub doctor_id: String,
    pub department_id: String,
    pub date_time: String,
    pub end_time: String,
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(rename = "type")]
    pub kind: AppointmentKind,
    pub notes: String,
    pub symptoms: String,
}

/// Which appointments to fetch for a view.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentQuery {
    pub doctor_id: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentQuery {
    pub fn for_day(doctor_id: &str, day: NaiveDate) -> Self {
        Self {
            doctor_id: doctor_id.to_string(),
            from: Some(day),
            to: Some(day),
            status: None,
        }
    }

    pub fn to_path(&self) -> String {
        let mut path = format!("/appointments?doctorId={}", urlencoding::encode(&self.doctor_id));
        if let Some(from) = self.from {
            path.push_str(&format!("&startDate={}", from.format("%Y-%m-%d")));
        }
        if let Some(to) = self.to {
            path.push_str(&format!("&endDate={}", to.format("%Y-%m-%d")));
        }
        if let Some(status) = self.status {
            path.push_str(&format!("&status={}", status));
        }
        path
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Cannot change a {from} appointment to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Deleting an appointment must be confirmed")]
    ConfirmationRequired,

    #[error("No doctor selected for this view")]
    MissingDoctor,

    #[error("No active session")]
    SessionInactive,

    #[error("Invalid appointment data: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Patient(#[from] PatientError),

    #[error(transparent)]
    Department(#[from] DepartmentError),
}

impl AppointmentError {
    /// The backend's own wording for a rejection, when it gave one.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            AppointmentError::Backend(e) => e.backend_message(),
            AppointmentError::Patient(PatientError::Backend(e)) => e.backend_message(),
            AppointmentError::Department(DepartmentError::Backend(e)) => e.backend_message(),
            _ => None,
        }
    }

    pub fn backend_status(&self) -> Option<u16> {
        match self {
            AppointmentError::Backend(e) => e.status(),
            AppointmentError::Patient(PatientError::Backend(e)) => e.status(),
            AppointmentError::Department(DepartmentError::Backend(e)) => e.status(),
            _ => None,
        }
    }

    /// The backend refused the caller's credentials; retrying will not help.
    pub fn is_auth(&self) -> bool {
        match self {
            AppointmentError::Backend(e) => e.is_auth(),
            AppointmentError::Patient(PatientError::Backend(e)) => e.is_auth(),
            AppointmentError::Department(DepartmentError::Backend(e)) => e.is_auth(),
            _ => false,
        }
    }
}

/// Clock time rounded down to its half-hour grid line.
pub fn half_hour_floor(time: NaiveTime) -> NaiveTime {
    let minute = if time.minute() < 30 { 0 } else { 30 };
    NaiveTime::from_hms_opt(time.hour(), minute, 0).unwrap_or(time)
}
