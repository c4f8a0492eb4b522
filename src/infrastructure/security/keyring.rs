use crate::domain::error::{EtlError, Result};
use keyring::Entry;

const KEYCHAIN_PREFIX: &str = "keychain:";
const ENV_PREFIX: &str = "env:";

pub struct KeyringManager {
    service: String,
}

impl KeyringManager {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    pub fn get_secret(&self, key: &str) -> Result<String> {
        let entry = Entry::new(&self.service, key)
            .map_err(|e| EtlError::Config(format!("Failed to create keychain entry: {}", e)))?;

        entry.get_password().map_err(|e| {
            EtlError::Config(format!(
                "Failed to read '{}' from keychain service '{}': {}",
                key, self.service, e
            ))
        })
    }

    /// Resolves a configured secret value.
    ///
    /// - `keychain:name` reads `name` from the OS keychain
    /// - `env:VAR` reads another environment variable
    /// - anything else is returned as-is
    pub fn resolve(&self, variable: &str, value: &str) -> Result<String> {
        let resolved = if let Some(key) = value.strip_prefix(KEYCHAIN_PREFIX) {
            self.get_secret(key)?
        } else if let Some(env_key) = value.strip_prefix(ENV_PREFIX) {
            std::env::var(env_key).map_err(|_| {
                EtlError::Config(format!(
                    "{} refers to environment variable '{}', which is not set",
                    variable, env_key
                ))
            })?
        } else {
            value.to_string()
        };

        if resolved.trim().is_empty() {
            return Err(EtlError::Config(format!("{} resolved to an empty value", variable)));
        }
        Ok(resolved)
    }
}
