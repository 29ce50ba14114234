use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppEnvironment {
    Development,
    Production,
}

impl AppEnvironment {
    pub fn is_development(&self) -> bool {
        matches!(self, AppEnvironment::Development)
    }
}

impl FromStr for AppEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(AppEnvironment::Development),
            "production" | "prod" => Ok(AppEnvironment::Production),
            other => Err(format!("Unknown APP_ENV value: {}", other)),
        }
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppEnvironment::Development => write!(f, "development"),
            AppEnvironment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_api_url: String,
    pub jwt_secret: String,
    pub environment: AppEnvironment,
    /// Department used when a doctor has none on record. Development only.
    pub fallback_department_id: Option<String>,
    pub server_port: u16,
    pub backend_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = env::var("APP_ENV")
            .ok()
            .and_then(|value| {
                value.parse::<AppEnvironment>()
                    .map_err(|e| warn!("{}, using production", e))
                    .ok()
            })
            .unwrap_or(AppEnvironment::Production);

        let fallback_department_id = env::var("FALLBACK_DEPARTMENT_ID")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        if fallback_department_id.is_some() && !environment.is_development() {
            warn!("FALLBACK_DEPARTMENT_ID is set but ignored outside development");
        }

        let config = Self {
            backend_api_url: env::var("BACKEND_API_URL")
                .unwrap_or_else(|_| {
                    warn!("BACKEND_API_URL not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            environment,
            fallback_department_id,
            server_port: env::var("PORTAL_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(3000),
            backend_timeout_secs: env::var("BACKEND_TIMEOUT_SECS")
                .ok()
                .and_then(|secs| secs.parse().ok())
                .unwrap_or(15),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.backend_api_url.is_empty() && !self.jwt_secret.is_empty()
    }

    /// The configured fallback department, only ever returned in development.
    pub fn development_fallback_department(&self) -> Option<&str> {
        if self.environment.is_development() {
            self.fallback_department_id.as_deref()
        } else {
            None
        }
    }
}
