use std::net::TcpListener;

use actix_session::config::PersistentSession;
use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::cookie::time::Duration;
use actix_web::cookie::Key;
use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use actix_web_flash_messages::storage::CookieMessageStore;
use actix_web_flash_messages::FlashMessagesFramework;
use actix_web_lab::middleware::from_fn;
use anyhow::Context;
use tracing_actix_web::TracingLogger;

use crate::authentication::{reject_anonymous_users, CredentialStore};
use crate::configuration::Settings;
use crate::email_client::EmailClient;
use crate::routes::{
    generate_credentials, health_check, home, log_out, login, send_email, setup_form,
};
use crate::session_state::derive_session_key;

/// Cookie settings used while no credentials file is present.
const DEFAULT_COOKIE_NAME: &str = "email_sender_session";
const DEFAULT_COOKIE_EXPIRY_DAYS: u32 = 30;

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    /// Loads the credential store, binds the listener and builds the server without starting it.
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let credential_store = CredentialStore::load(&configuration.application.credentials_file)
            .context("Failed to load the credential store.")?;
        let email_client = configuration.email_client.client();

        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let listener = TcpListener::bind(&address)
            .with_context(|| format!("Failed to bind {}", address))?;
        let port = listener.local_addr()?.port();
        let session = SessionSettings::new(
            credential_store.as_ref(),
            configuration.application.cookie_secure,
        )?;
        let server = run(listener, credential_store, email_client, session)?;
        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Only returns when the application is stopped.
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/// How the signed session cookie is issued.
#[derive(Clone)]
pub struct SessionSettings {
    key: Key,
    cookie_name: String,
    expiry_days: u32,
    cookie_secure: bool,
}

impl SessionSettings {
    /// Takes name, key and expiry from the credentials file. Without one nobody can log in, so a
    /// random key is good enough for the flash messages.
    pub fn new(
        credential_store: Option<&CredentialStore>,
        cookie_secure: bool,
    ) -> Result<Self, anyhow::Error> {
        let settings = match credential_store.map(CredentialStore::cookie) {
            Some(cookie) => Self {
                key: derive_session_key(&cookie.key)?,
                cookie_name: cookie.name.clone(),
                expiry_days: cookie.expiry_days,
                cookie_secure,
            },
            None => Self {
                key: Key::generate(),
                cookie_name: DEFAULT_COOKIE_NAME.to_string(),
                expiry_days: DEFAULT_COOKIE_EXPIRY_DAYS,
                cookie_secure,
            },
        };
        Ok(settings)
    }

    fn middleware(&self) -> SessionMiddleware<CookieSessionStore> {
        SessionMiddleware::builder(CookieSessionStore::default(), self.key.clone())
            .cookie_name(self.cookie_name.clone())
            .cookie_secure(self.cookie_secure)
            .session_lifecycle(
                PersistentSession::default().session_ttl(Duration::days(self.expiry_days.into())),
            )
            .build()
    }
}

pub fn run(
    listener: TcpListener,
    credential_store: Option<CredentialStore>,
    email_client: EmailClient,
    session: SessionSettings,
) -> Result<Server, anyhow::Error> {
    // wrap shared state in web::Data (an Arc) so every worker gets a pointer instead of a copy
    let credential_store = web::Data::new(credential_store);
    let email_client = web::Data::new(email_client);
    let message_store = CookieMessageStore::builder(session.key.clone()).build();
    let message_framework = FlashMessagesFramework::builder(message_store).build();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(message_framework.clone())
            .wrap(session.middleware())
            .wrap(TracingLogger::default())
            .route("/", web::get().to(home))
            .route("/health_check", web::get().to(health_check))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(log_out))
            .service(
                web::resource("/send-email")
                    .wrap(from_fn(reject_anonymous_users))
                    .route(web::post().to(send_email)),
            )
            .route("/setup", web::get().to(setup_form))
            .route("/setup", web::post().to(generate_credentials))
            .app_data(credential_store.clone())
            .app_data(email_client.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}
