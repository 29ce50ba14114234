use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use shared_config::AppEnvironment;

/// How strictly backend records are turned into domain types.
///
/// `Strict` fails on the first missing required field so contract drift is
/// caught during development. `Lenient` substitutes the documented default
/// and logs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Strict,
    Lenient,
}

impl From<AppEnvironment> for ParseMode {
    fn from(environment: AppEnvironment) -> Self {
        match environment {
            AppEnvironment::Development => ParseMode::Strict,
            AppEnvironment::Production => ParseMode::Lenient,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("{entity} record is missing required field `{field}`")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("{entity} record has invalid `{field}`: {value}")]
    InvalidField {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{entity} record could not be read: {reason}")]
    Malformed {
        entity: &'static str,
        reason: String,
    },
}

impl ParseMode {
    /// Fields without which a record is meaningless (ids). Never defaulted.
    pub fn require<T>(
        self,
        entity: &'static str,
        field: &'static str,
        value: Option<T>,
    ) -> Result<T, ParseError> {
        value.ok_or(ParseError::MissingField { entity, field })
    }

    /// Fields with a documented display default.
    pub fn or_default<T>(
        self,
        entity: &'static str,
        field: &'static str,
        value: Option<T>,
        default: impl FnOnce() -> T,
    ) -> Result<T, ParseError> {
        match (value, self) {
            (Some(v), _) => Ok(v),
            (None, ParseMode::Strict) => Err(ParseError::MissingField { entity, field }),
            (None, ParseMode::Lenient) => {
                warn!("{} record missing `{}`, using default", entity, field);
                Ok(default())
            }
        }
    }

    /// Like `or_default` but for a value present in an unusable form.
    pub fn or_default_invalid<T>(
        self,
        entity: &'static str,
        field: &'static str,
        raw: &str,
        default: impl FnOnce() -> T,
    ) -> Result<T, ParseError> {
        match self {
            ParseMode::Strict => Err(ParseError::InvalidField {
                entity,
                field,
                value: raw.to_string(),
            }),
            ParseMode::Lenient => {
                warn!("{} record has invalid `{}` ({}), using default", entity, field, raw);
                Ok(default())
            }
        }
    }

    /// Turns a backend list into domain values one record at a time.
    ///
    /// `Strict` stops at the first record that fails to decode or convert.
    /// `Lenient` drops that record with a warning and keeps the rest.
    pub fn parse_list<R, T, E>(
        self,
        entity: &'static str,
        values: Vec<Value>,
        convert: impl Fn(R) -> Result<T, E>,
    ) -> Result<Vec<T>, E>
    where
        R: DeserializeOwned,
        E: From<ParseError> + Display,
    {
        let mut parsed = Vec::with_capacity(values.len());

        for value in values {
            let result = serde_json::from_value::<R>(value)
                .map_err(|e| E::from(ParseError::Malformed { entity, reason: e.to_string() }))
                .and_then(&convert);

            match (result, self) {
                (Ok(item), _) => parsed.push(item),
                (Err(e), ParseMode::Strict) => return Err(e),
                (Err(e), ParseMode::Lenient) => warn!("Skipping unreadable {} record: {}", entity, e),
            }
        }

        Ok(parsed)
    }
}
