use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use shared_database::BackendError;
use shared_models::parse::{ParseError, ParseMode};

pub const UNKNOWN: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "Not available";

/// A patient as the dashboards display it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Up to two letters for the avatar bubble.
    pub fn initials(&self) -> String {
        [&self.first_name, &self.last_name]
            .iter()
            .filter_map(|part| part.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }

    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let dob = self.date_of_birth?;
        let mut years = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }

    pub fn display_gender(&self) -> &str {
        self.gender.as_deref().filter(|g| !g.is_empty()).unwrap_or(NOT_AVAILABLE)
    }
}

/// What an appointment row or patient card shows about a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientDisplay {
    pub name: String,
    pub initials: String,
    pub age: Option<u32>,
    pub gender: String,
}

impl PatientDisplay {
    pub fn of(patient: &Patient, today: NaiveDate) -> Self {
        Self {
            name: patient.full_name(),
            initials: patient.initials(),
            age: patient.age_on(today),
            gender: patient.display_gender().to_string(),
        }
    }

    /// Shown when the patient could not be loaded.
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN.to_string(),
            initials: "?".to_string(),
            age: None,
            gender: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Patient JSON as the backend sends it; every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    #[serde(alias = "first_name")]
    pub first_name: Option<String>,
    #[serde(alias = "last_name")]
    pub last_name: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "phone_number", alias = "phoneNumber")]
    pub phone: Option<String>,
    #[serde(alias = "date_of_birth", alias = "dob")]
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
}

impl PatientRecord {
    pub fn into_patient(self, mode: ParseMode) -> Result<Patient, PatientError> {
        const ENTITY: &str = "Patient";

        let id = mode.require(ENTITY, "id", self.id)?;

        // Some endpoints only carry a combined `name`.
        let (first, last) = match (self.first_name, self.last_name, self.name) {
            (Some(first), last, _) => (Some(first), last.or_else(|| Some(String::new()))),
            (None, Some(last), _) => (Some(String::new()), Some(last)),
            (None, None, Some(name)) => {
                let mut parts = name.trim().splitn(2, ' ');
                let first = parts.next().unwrap_or_default().to_string();
                let last = parts.next().unwrap_or_default().trim().to_string();
                (Some(first), Some(last))
            }
            (None, None, None) => (None, None),
        };
        let first_name = mode.or_default(ENTITY, "firstName", first, || UNKNOWN.to_string())?;
        let last_name = last.unwrap_or_default();

        let date_of_birth = match self.date_of_birth {
            Some(raw) => match parse_birth_date(&raw) {
                Some(date) => Some(date),
                None => mode.or_default_invalid(ENTITY, "dateOfBirth", &raw, || None)?,
            },
            None => None,
        };

        Ok(Patient {
            id,
            first_name,
            last_name,
            email: self.email,
            phone: self.phone,
            date_of_birth,
            gender: self.gender,
        })
    }
}

fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    // Either a bare date or a full ISO timestamp.
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientSearchQuery {
    pub q: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Invalid patient data: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(first: &str, last: &str, dob: Option<NaiveDate>) -> Patient {
        Patient {
            id: "p1".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: None,
            phone: None,
            date_of_birth: dob,
            gender: None,
        }
    }

    #[test]
    fn test_initials_and_name() {
        let p = patient("ada", "lovelace", None);
        assert_eq!(p.initials(), "AL");
        assert_eq!(p.full_name(), "ada lovelace");
        assert_eq!(patient("Cher", "", None).initials(), "C");
        assert_eq!(patient("Cher", "", None).full_name(), "Cher");
    }

    #[test]
    fn test_age_respects_birthday() {
        let p = patient("A", "B", NaiveDate::from_ymd_opt(1990, 6, 15));
        assert_eq!(p.age_on(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()), Some(33));
        assert_eq!(p.age_on(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()), Some(34));
        assert_eq!(patient("A", "B", None).age_on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()), None);
    }

    #[test]
    fn test_display_gender_default() {
        assert_eq!(patient("A", "B", None).display_gender(), NOT_AVAILABLE);
    }

    #[test]
    fn test_record_with_combined_name() {
        let record = PatientRecord {
            id: Some("p9".to_string()),
            name: Some("Grace Brewster Hopper".to_string()),
            date_of_birth: Some("1906-12-09T00:00:00.000Z".to_string()),
            ..Default::default()
        };

        let p = record.into_patient(ParseMode::Strict).unwrap();
        assert_eq!(p.first_name, "Grace");
        assert_eq!(p.last_name, "Brewster Hopper");
        assert_eq!(p.date_of_birth, NaiveDate::from_ymd_opt(1906, 12, 9));
    }

    #[test]
    fn test_record_missing_name_by_mode() {
        let record = PatientRecord {
            id: Some("p2".to_string()),
            date_of_birth: Some("not-a-date".to_string()),
            ..Default::default()
        };

        assert!(record.clone().into_patient(ParseMode::Strict).is_err());

        let p = record.into_patient(ParseMode::Lenient).unwrap();
        assert_eq!(p.first_name, UNKNOWN);
        assert_eq!(p.date_of_birth, None);
    }
}
