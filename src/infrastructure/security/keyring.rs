use crate::domain::error::{AppError, Result};
use keyring::Entry;

/// Secrets stored in the OS credential store under one service name
pub struct KeyringManager {
    service: String,
}

impl KeyringManager {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key)
            .map_err(|e| AppError::SecurityError(format!("Failed to create entry: {}", e)))
    }

    pub fn set_secret(&self, key: &str, secret: &str) -> Result<()> {
        self.entry(key)?
            .set_password(secret)
            .map_err(|e| AppError::SecurityError(format!("Failed to set password: {}", e)))
    }

    pub fn get_secret(&self, key: &str) -> Result<String> {
        self.entry(key)?
            .get_password()
            .map_err(|e| AppError::SecurityError(format!("Failed to get password: {}", e)))
    }

    /// `None` when no secret is stored or the store is unavailable
    pub fn find_secret(&self, key: &str) -> Option<String> {
        match self.get_secret(key) {
            Ok(secret) if !secret.trim().is_empty() => Some(secret),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(service = %self.service, key, error = %e, "No keyring secret");
                None
            }
        }
    }
}
