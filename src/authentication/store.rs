use std::collections::HashMap;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, Secret};

use super::password::{check_password_hash_format, PasswordHashFormatError};
use crate::error_handling::error_chain_fmt;

/// The users allowed to log in, together with the settings of the session cookie.
///
/// Loaded once at startup from the YAML credentials file and never written back.
#[derive(serde::Deserialize, Debug)]
pub struct CredentialStore {
    credentials: UserCredentials,
    cookie: CookieSettings,
}

#[derive(serde::Deserialize, Debug)]
struct UserCredentials {
    usernames: HashMap<String, UserRecord>,
}

#[derive(serde::Deserialize, Debug)]
struct UserRecord {
    email: String,
    name: String,
    /// Argon2 PHC string, or a bcrypt hash from an older credentials file.
    password: Secret<String>,
}

#[derive(serde::Deserialize, Debug)]
pub struct CookieSettings {
    pub name: String,
    pub key: Secret<String>,
    pub expiry_days: u32,
}

/// The authenticated user, as stored in the credentials file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub display_name: String,
    pub email: String,
}

impl CredentialStore {
    /// Reads the credentials file at `path`.
    ///
    /// A missing file yields `Ok(None)`; a file that exists but cannot be used is an error.
    #[tracing::instrument(name = "Load the credential store")]
    pub fn load(path: &Path) -> Result<Option<Self>, CredentialStoreError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    "Credentials file {} not found, authentication is not configured.",
                    path.display()
                );
                return Ok(None);
            }
            Err(e) => return Err(CredentialStoreError::Read(path.to_owned(), e)),
        };
        let store = Self::from_yaml(&contents)?;
        tracing::info!(users = store.credentials.usernames.len(), "Credential store loaded");
        Ok(Some(store))
    }

    pub fn from_yaml(contents: &str) -> Result<Self, CredentialStoreError> {
        let store: CredentialStore = serde_yaml::from_str(contents)?;
        for (username, record) in &store.credentials.usernames {
            check_password_hash_format(record.password.expose_secret()).map_err(|e| {
                CredentialStoreError::InvalidPasswordHash {
                    username: username.clone(),
                    source: e,
                }
            })?;
        }
        Ok(store)
    }

    pub fn identity(&self, username: &str) -> Option<Identity> {
        self.credentials
            .usernames
            .get(username)
            .map(|record| Identity {
                username: username.to_owned(),
                display_name: record.name.clone(),
                email: record.email.clone(),
            })
    }

    pub fn password_hash(&self, username: &str) -> Option<&Secret<String>> {
        self.credentials
            .usernames
            .get(username)
            .map(|record| &record.password)
    }

    pub fn cookie(&self) -> &CookieSettings {
        &self.cookie
    }
}

#[derive(thiserror::Error)]
pub enum CredentialStoreError {
    #[error("Failed to read the credentials file {}.", .0.display())]
    Read(PathBuf, #[source] std::io::Error),
    #[error("The credentials file is not valid YAML for a credential store.")]
    Parse(#[from] serde_yaml::Error),
    #[error("The password of user `{username}` is neither an Argon2 nor a bcrypt hash.")]
    InvalidPasswordHash {
        username: String,
        #[source]
        source: PasswordHashFormatError,
    },
}

impl std::fmt::Debug for CredentialStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
