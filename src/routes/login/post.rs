use actix_web::{web, HttpResponse};
use actix_web_flash_messages::IncomingFlashMessages;
use secrecy::Secret;

use crate::authentication::{validate_credentials, AuthError, CredentialStore, Credentials};
use crate::routing_helpers::{e500, see_other};
use crate::session_state::TypedSession;
use crate::views::ViewState;

#[derive(serde::Deserialize)]
pub struct FormData {
    username: String,
    password: Secret<String>,
}

#[tracing::instrument(
    skip(form, credential_store, session, flash_messages),
    fields(username = tracing::field::Empty)
)]
pub async fn login(
    form: web::Form<FormData>,
    credential_store: web::Data<Option<CredentialStore>>,
    session: TypedSession,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let Some(store) = credential_store.get_ref().as_ref() else {
        return Ok(ViewState::Unconfigured.render(&flash_messages));
    };
    let credentials = Credentials {
        username: form.0.username,
        password: form.0.password,
    };
    tracing::Span::current().record("username", &tracing::field::display(&credentials.username));

    match validate_credentials(credentials, store).await {
        Ok(identity) => {
            // rotate the session id on login
            session.renew();
            session
                .insert_username(&identity.username)
                .map_err(e500)?;
            tracing::info!("User logged in");
            Ok(see_other("/"))
        }
        Err(AuthError::InvalidCredentials(e)) => {
            tracing::warn!(error = %e, "Login rejected");
            Ok(ViewState::LoginFailed.render(&flash_messages))
        }
        Err(e @ AuthError::UnexpectedError(_)) => Err(e500(e)),
    }
}
