use std::collections::HashMap;

use futures::future::join_all;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::BackendClient;
use shared_models::parse::ParseMode;

use crate::models::{Patient, PatientError, PatientRecord};

const DEFAULT_SEARCH_LIMIT: u32 = 20;

pub struct PatientService {
    backend: BackendClient,
    parse_mode: ParseMode,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            backend: BackendClient::new(config),
            parse_mode: ParseMode::from(config.environment),
        }
    }

    pub async fn get_patient(&self, patient_id: &str, auth_token: &str) -> Result<Patient, PatientError> {
        debug!("Fetching patient: {}", patient_id);

        let path = format!("/patients/{}", urlencoding::encode(patient_id));
        let record: PatientRecord = self.backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| if e.is_not_found() { PatientError::NotFound } else { e.into() })?;

        record.into_patient(self.parse_mode)
    }

    /// Name/id search backing the patient picker.
    pub async fn search_patients(
        &self,
        term: &str,
        limit: Option<u32>,
        auth_token: &str,
    ) -> Result<Vec<Patient>, PatientError> {
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        debug!("Searching patients for '{}' (limit {})", term, limit);

        let path = format!(
            "/patients?search={}&limit={}",
            urlencoding::encode(term.trim()),
            limit
        );
        let records: Vec<Value> = self.backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        self.parse_mode.parse_list("Patient", records, |record: PatientRecord| {
            record.into_patient(self.parse_mode)
        })
    }

    /// Looks up several patients at once for decorating appointment rows.
    /// Patients that cannot be loaded are simply absent from the map.
    pub async fn get_patients(&self, patient_ids: &[String], auth_token: &str) -> HashMap<String, Patient> {
        let lookups = patient_ids.iter().map(|id| self.get_patient(id, auth_token));

        join_all(lookups)
            .await
            .into_iter()
            .zip(patient_ids)
            .filter_map(|(result, id)| match result {
                Ok(patient) => Some((id.clone(), patient)),
                Err(e) => {
                    warn!("Could not load patient {} for display: {}", id, e);
                    None
                }
            })
            .collect()
    }
}
