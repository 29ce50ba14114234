use serde::{Deserialize, Serialize};

use shared_database::BackendError;
use shared_models::parse::{ParseError, ParseMode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub head_doctor_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRecord {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "head_doctor_id", alias = "headDoctor")]
    pub head_doctor_id: Option<String>,
}

impl DepartmentRecord {
    pub fn into_department(self, mode: ParseMode) -> Result<Department, ParseError> {
        Ok(Department {
            id: mode.require("Department", "id", self.id)?,
            name: mode.or_default("Department", "name", self.name, || "Unknown".to_string())?,
            description: self.description,
            head_doctor_id: self.head_doctor_id,
        })
    }
}

/// The slice of a `/users/{id}` record needed to place a doctor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffRecord {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub role: Option<String>,
    #[serde(alias = "department_id", alias = "department")]
    pub department_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DepartmentError {
    #[error("Doctor {0} not found")]
    DoctorNotFound(String),

    #[error("Invalid department data: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}
