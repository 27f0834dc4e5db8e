use std::fmt;

use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "c4connect";

/// Account login and password for one authentication attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub struct CredentialStore;

impl CredentialStore {
    /// Store login and password in the OS keychain
    pub fn store(login: &str, password: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, login).context("Failed to create keyring entry")?;
        entry
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    /// Retrieve password for a login from the OS keychain
    pub fn get_password(login: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, login).context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    /// Delete stored credentials for a login
    pub fn delete(login: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, login).context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }

    /// Check if credentials exist for a login
    pub fn has_credentials(login: &str) -> bool {
        if let Ok(entry) = Entry::new(SERVICE_NAME, login) {
            entry.get_password().is_ok()
        } else {
            false
        }
    }
}
