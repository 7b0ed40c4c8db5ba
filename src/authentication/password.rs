use anyhow::Context;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use secrecy::{ExposeSecret, Secret};

use crate::async_helpers::spawn_blocking_with_tracing;
use crate::authentication::{CredentialStore, Identity};

/// Verified against when the username is unknown, so that unknown users and wrong passwords take
/// the same amount of time to reject.
const FALLBACK_PASSWORD_HASH: &str = "$argon2id$v=19$m=15000,t=2,p=1$\
    gZiV/M1gPc22ElAH/Jh1Hw$\
    CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials.")]
    InvalidCredentials(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

pub struct Credentials {
    pub username: String,
    pub password: Secret<String>,
}

#[tracing::instrument(name = "Validate credentials", skip(credentials, store))]
pub async fn validate_credentials(
    credentials: Credentials,
    store: &CredentialStore,
) -> Result<Identity, AuthError> {
    let mut identity = None;
    let mut expected_password_hash = Secret::new(FALLBACK_PASSWORD_HASH.to_string());
    if let Some(stored_hash) = store.password_hash(&credentials.username) {
        expected_password_hash = Secret::new(stored_hash.expose_secret().clone());
        identity = store.identity(&credentials.username);
    }

    spawn_blocking_with_tracing(move || {
        verify_password_hash(expected_password_hash, credentials.password)
    })
    .await
    .context("Failed to spawn blocking task.")??;

    // only reachable with a matching password, which the fallback hash never yields
    identity
        .ok_or_else(|| anyhow::anyhow!("Unknown username."))
        .map_err(AuthError::InvalidCredentials)
}

#[tracing::instrument(
    name = "Verify password hash",
    skip(expected_password_hash, password_candidate)
)]
fn verify_password_hash(
    expected_password_hash: Secret<String>,
    password_candidate: Secret<String>,
) -> Result<(), AuthError> {
    if is_bcrypt_hash(expected_password_hash.expose_secret()) {
        let matches = bcrypt::verify(
            password_candidate.expose_secret(),
            expected_password_hash.expose_secret(),
        )
        .context("Failed to verify a bcrypt hash.")?;
        return if matches {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials(anyhow::anyhow!(
                "Invalid password."
            )))
        };
    }
    let expected_password_hash = PasswordHash::new(expected_password_hash.expose_secret())
        .context("Failed to parse hash in PHC string format.")?;
    Argon2::default()
        .verify_password(
            password_candidate.expose_secret().as_bytes(),
            &expected_password_hash,
        )
        .context("Invalid password.")
        .map_err(AuthError::InvalidCredentials)
}

/// Hashes written by bcrypt-based tools, e.g. `$2b$12$...`.
fn is_bcrypt_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}

/// Checks that `hash` is either an Argon2 PHC string or a bcrypt hash, without verifying anything.
pub fn check_password_hash_format(hash: &str) -> Result<(), PasswordHashFormatError> {
    if is_bcrypt_hash(hash) {
        hash.parse::<bcrypt::HashParts>()?;
    } else {
        PasswordHash::new(hash)?;
    }
    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum PasswordHashFormatError {
    #[error("Not a bcrypt hash.")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("Not an Argon2 hash in PHC string format.")]
    Phc(#[from] argon2::password_hash::Error),
}

/// Hashes a password into a PHC string suitable for the credentials file.
pub fn compute_password_hash(password: Secret<String>) -> Result<Secret<String>, anyhow::Error> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let params = Params::new(15000, 2, 1, None).context("Invalid Argon2 parameters.")?;
    let password_hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.expose_secret().as_bytes(), &salt)?
        .to_string();
    Ok(Secret::new(password_hash))
}
