use std::collections::BTreeMap;

use actix_web::http::header::ContentType;
use actix_web::{web, HttpResponse};
use actix_web_flash_messages::Level;
use anyhow::Context;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use secrecy::{ExposeSecret, Secret};

use super::get::{INSTRUCTIONS, SETUP_FORM};
use crate::async_helpers::spawn_blocking_with_tracing;
use crate::authentication::compute_password_hash;
use crate::domain::EmailAddress;
use crate::routing_helpers::e500;
use crate::views::{definition_list, escape_html, notice, page};

#[derive(serde::Deserialize)]
pub struct FormData {
    #[serde(default)]
    username: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    email: String,
    password: Secret<String>,
}

#[derive(serde::Serialize)]
struct CredentialsDocument {
    cookie: CookieSection,
    credentials: CredentialsSection,
}

#[derive(serde::Serialize)]
struct CookieSection {
    expiry_days: u32,
    key: String,
    name: &'static str,
}

#[derive(serde::Serialize)]
struct CredentialsSection {
    usernames: BTreeMap<String, UserSection>,
}

#[derive(serde::Serialize)]
struct UserSection {
    email: String,
    name: String,
    password: String,
}

/// Hashes the submitted password and renders a credentials file holding that single user.
#[tracing::instrument(
    name = "Generate a credentials file entry",
    skip(form),
    fields(username = %form.username)
)]
pub async fn generate_credentials(
    form: web::Form<FormData>,
) -> Result<HttpResponse, actix_web::Error> {
    let FormData {
        username,
        display_name,
        email,
        password,
    } = form.0;
    if [&username, &display_name, &email]
        .iter()
        .any(|field| field.trim().is_empty())
        || password.expose_secret().is_empty()
    {
        return Ok(setup_page_with_error("All fields are required."));
    }
    let email = match EmailAddress::parse(email) {
        Ok(email) => email,
        Err(e) => return Ok(setup_page_with_error(&e)),
    };

    let password_hash = spawn_blocking_with_tracing(move || compute_password_hash(password))
        .await
        .context("Failed to spawn blocking task.")
        .map_err(e500)?
        .map_err(e500)?;

    let document = CredentialsDocument {
        cookie: CookieSection {
            expiry_days: 30,
            key: generate_cookie_key(),
            name: "email_sender_session",
        },
        credentials: CredentialsSection {
            usernames: BTreeMap::from([(
                username.clone(),
                UserSection {
                    email: email.as_ref().to_owned(),
                    name: display_name,
                    password: password_hash.expose_secret().clone(),
                },
            )]),
        },
    };
    let yaml = serde_yaml::to_string(&document)
        .context("Failed to serialize the credentials document.")
        .map_err(e500)?;

    let body = format!(
        r#"<h2>Credentials for {user}</h2>
    {hash}
    <p>Example <code>credentials.yaml</code> (merge the <code>usernames</code> entries when adding more users):</p>
    <pre>{yaml}</pre>
    {SETUP_FORM}
    {INSTRUCTIONS}"#,
        user = escape_html(&username),
        hash = definition_list(&[(username.as_str(), password_hash.expose_secret().as_str())]),
        yaml = escape_html(&yaml),
    );
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page("Setup", &body)))
}

fn setup_page_with_error(message: &str) -> HttpResponse {
    HttpResponse::Ok().content_type(ContentType::html()).body(page(
        "Setup",
        &format!(
            "{}\n    {SETUP_FORM}\n    {INSTRUCTIONS}",
            notice(Level::Error, message)
        ),
    ))
}

/// A random 32-character alphanumeric signing key for the session cookie.
fn generate_cookie_key() -> String {
    let mut rng = thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(32)
        .collect()
}
