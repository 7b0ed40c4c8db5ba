use actix_session::{Session, SessionExt, SessionGetError, SessionInsertError};
use actix_web::cookie::Key;
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use anyhow::Context;
use argon2::Argon2;
use secrecy::{ExposeSecret, Secret};
use std::future::{ready, Ready};

pub struct TypedSession(Session);

impl TypedSession {
    const USERNAME_KEY: &'static str = "username";

    pub fn renew(&self) {
        self.0.renew();
    }

    pub fn insert_username(&self, username: &str) -> Result<(), SessionInsertError> {
        self.0.insert(Self::USERNAME_KEY, username)
    }

    pub fn get_username(&self) -> Result<Option<String>, SessionGetError> {
        self.0.get(Self::USERNAME_KEY)
    }

    pub fn log_out(self) {
        self.0.purge()
    }
}

/// Allows us to use `TypedSession` as an actix_web extractor.
impl FromRequest for TypedSession {
    // same error as the `FromRequest` implementation of `Session`
    type Error = <Session as FromRequest>::Error;
    // nothing to await here, so we hand back a future that is already resolved
    type Future = Ready<Result<TypedSession, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(TypedSession(req.get_session())))
    }
}

/// Stretches the cookie key from the credentials file into the 64 bytes needed to sign cookies.
///
/// The derivation is deterministic so that sessions survive a restart with the same file.
pub fn derive_session_key(secret: &Secret<String>) -> Result<Key, anyhow::Error> {
    const SALT: &[u8] = b"email-sender/session-cookie";
    let mut key_material = [0u8; 64];
    Argon2::default()
        .hash_password_into(secret.expose_secret().as_bytes(), SALT, &mut key_material)
        .context("Failed to derive the session signing key.")?;
    Ok(Key::from(&key_material))
}
