use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::BackendClient;
use shared_models::parse::ParseMode;

use crate::models::{Department, DepartmentError, DepartmentRecord, StaffRecord};

pub struct DepartmentService {
    backend: BackendClient,
    parse_mode: ParseMode,
}

impl DepartmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            backend: BackendClient::new(config),
            parse_mode: ParseMode::from(config.environment),
        }
    }

    pub async fn list_departments(&self, auth_token: &str) -> Result<Vec<Department>, DepartmentError> {
        debug!("Listing departments");

        let records: Vec<Value> = self.backend
            .request(Method::GET, "/departments", Some(auth_token), None)
            .await?;

        self.parse_mode.parse_list("Department", records, |record: DepartmentRecord| {
            record.into_department(self.parse_mode).map_err(DepartmentError::from)
        })
    }

    /// Department recorded for a doctor, `None` when the doctor has none.
    pub async fn doctor_department(
        &self,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<Option<String>, DepartmentError> {
        debug!("Resolving department for doctor {}", doctor_id);

        let path = format!("/users/{}", urlencoding::encode(doctor_id));
        let staff: StaffRecord = self.backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    DepartmentError::DoctorNotFound(doctor_id.to_string())
                } else {
                    e.into()
                }
            })?;

        let department_id = staff.department_id.filter(|id| !id.is_empty());
        if department_id.is_none() {
            info!("Doctor {} has no department on record", doctor_id);
        }

        Ok(department_id)
    }
}
