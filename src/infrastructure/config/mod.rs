//! Pipeline configuration.
//!
//! Values come from the process environment (seeded from `.env` when one is
//! present) through a figment `Env` provider. Each pipeline gets its own
//! struct; required variables that are missing or blank fail fast with the
//! variable's name in the error.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::error::{EtlError, Result};
use crate::domain::survey::DEFAULT_PAGE_SIZE;
use crate::infrastructure::security::keyring::KeyringManager;

pub const CREDENTIALS_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const PROPERTY_ID_VAR: &str = "GA_PROPERTY_ID";
pub const GA_BASE_URL_VAR: &str = "GA_API_BASE_URL";
pub const TYPEFORM_TOKEN_VAR: &str = "TYPEFORM_API_TOKEN";
pub const TYPEFORM_FORM_VAR: &str = "TYPEFORM_FORM_ID";
pub const TYPEFORM_BASE_URL_VAR: &str = "TYPEFORM_API_BASE_URL";
pub const TYPEFORM_PAGE_SIZE_VAR: &str = "TYPEFORM_PAGE_SIZE";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

pub const DEFAULT_GA_BASE_URL: &str = "https://analyticsdata.googleapis.com";
pub const DEFAULT_TYPEFORM_BASE_URL: &str = "https://api.typeform.com";
const MAX_PAGE_SIZE: u32 = 1000;

const KEYCHAIN_SERVICE: &str = "marketing-etl";

const KNOWN_VARS: [&str; 8] = [
    CREDENTIALS_VAR,
    PROPERTY_ID_VAR,
    GA_BASE_URL_VAR,
    TYPEFORM_TOKEN_VAR,
    TYPEFORM_FORM_VAR,
    TYPEFORM_BASE_URL_VAR,
    TYPEFORM_PAGE_SIZE_VAR,
    DATABASE_URL_VAR,
];

/// Loads `.env` into the process environment if the file exists.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "Loaded environment file"),
        Err(err) if err.not_found() => debug!("No .env file found, using process environment"),
        Err(err) => debug!(error = %err, "Ignoring unreadable .env file"),
    }
}

/// Figment over the variables this crate knows about, holding each value
/// as the exact string from the environment (`01234567` stays `01234567`).
pub fn env_figment() -> Figment {
    let values: BTreeMap<String, String> = Env::raw()
        .only(&KNOWN_VARS)
        .iter()
        .map(|(key, value)| (key.as_str().to_lowercase(), value))
        .collect();
    Figment::from(Serialized::defaults(values))
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    google_application_credentials: Option<String>,
    ga_property_id: Option<String>,
    ga_api_base_url: Option<String>,
    typeform_api_token: Option<String>,
    typeform_form_id: Option<String>,
    typeform_api_base_url: Option<String>,
    typeform_page_size: Option<String>,
    database_url: Option<String>,
}

impl RawSettings {
    fn extract(figment: &Figment) -> Result<Self> {
        figment
            .extract()
            .map_err(|e| EtlError::Config(format!("Failed to read configuration: {}", e)))
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn required(value: Option<String>, variable: &str) -> Result<String> {
    optional(value).ok_or_else(|| {
        EtlError::Config(format!(
            "{} is not set; add it to the environment or .env file",
            variable
        ))
    })
}

fn base_url(value: Option<String>, variable: &str, default: &str) -> Result<String> {
    let raw = optional(value).unwrap_or_else(|| default.to_string());
    url::Url::parse(&raw)
        .map_err(|e| EtlError::Config(format!("{} is not a valid URL ({}): {}", variable, raw, e)))?;
    Ok(raw.trim_end_matches('/').to_string())
}

fn page_size(value: Option<String>) -> Result<u32> {
    let Some(raw) = optional(value) else {
        return Ok(DEFAULT_PAGE_SIZE);
    };
    match raw.parse::<u32>() {
        Ok(size) if (1..=MAX_PAGE_SIZE).contains(&size) => Ok(size),
        _ => Err(EtlError::Config(format!(
            "{} must be an integer between 1 and {}, got '{}'",
            TYPEFORM_PAGE_SIZE_VAR, MAX_PAGE_SIZE, raw
        ))),
    }
}

fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}

#[derive(Clone)]
pub struct AnalyticsConfig {
    pub credentials_path: PathBuf,
    pub property_id: String,
    pub database_url: String,
    pub api_base_url: String,
}

impl AnalyticsConfig {
    pub fn from_env() -> Result<Self> {
        load_dotenv();
        Self::from_figment(&env_figment())
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let raw = RawSettings::extract(figment)?;
        let credentials_path = required(raw.google_application_credentials, CREDENTIALS_VAR)?;
        let property_id = required(raw.ga_property_id, PROPERTY_ID_VAR)?;
        let database_url = required(raw.database_url, DATABASE_URL_VAR)?;
        let api_base_url = base_url(raw.ga_api_base_url, GA_BASE_URL_VAR, DEFAULT_GA_BASE_URL)?;

        let keyring = KeyringManager::new(KEYCHAIN_SERVICE);
        Ok(Self {
            credentials_path: PathBuf::from(credentials_path),
            property_id,
            database_url: keyring.resolve(DATABASE_URL_VAR, &database_url)?,
            api_base_url,
        })
    }
}

impl fmt::Debug for AnalyticsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsConfig")
            .field("credentials_path", &self.credentials_path)
            .field("property_id", &self.property_id)
            .field("database_url", &redact_url(&self.database_url))
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

#[derive(Clone)]
pub struct SurveyConfig {
    pub api_token: String,
    pub form_id: String,
    pub database_url: String,
    pub api_base_url: String,
    pub page_size: u32,
}

impl SurveyConfig {
    pub fn from_env() -> Result<Self> {
        load_dotenv();
        Self::from_figment(&env_figment())
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let raw = RawSettings::extract(figment)?;
        let api_token = required(raw.typeform_api_token, TYPEFORM_TOKEN_VAR)?;
        let form_id = required(raw.typeform_form_id, TYPEFORM_FORM_VAR)?;
        let database_url = required(raw.database_url, DATABASE_URL_VAR)?;
        let api_base_url = base_url(
            raw.typeform_api_base_url,
            TYPEFORM_BASE_URL_VAR,
            DEFAULT_TYPEFORM_BASE_URL,
        )?;
        let page_size = page_size(raw.typeform_page_size)?;

        let keyring = KeyringManager::new(KEYCHAIN_SERVICE);
        Ok(Self {
            api_token: keyring.resolve(TYPEFORM_TOKEN_VAR, &api_token)?,
            form_id,
            database_url: keyring.resolve(DATABASE_URL_VAR, &database_url)?,
            api_base_url,
            page_size,
        })
    }
}

impl fmt::Debug for SurveyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurveyConfig")
            .field("api_token", &"***")
            .field("form_id", &self.form_id)
            .field("database_url", &redact_url(&self.database_url))
            .field("api_base_url", &self.api_base_url)
            .field("page_size", &self.page_size)
            .finish()
    }
}
