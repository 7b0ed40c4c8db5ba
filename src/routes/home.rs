use actix_web::{web, HttpResponse};
use actix_web_flash_messages::IncomingFlashMessages;

use crate::authentication::CredentialStore;
use crate::routing_helpers::e500;
use crate::session_state::TypedSession;
use crate::views::ViewState;

/// The single page of the app: login form, send-email form or setup warning depending on the
/// resolved `ViewState`.
pub async fn home(
    credential_store: web::Data<Option<CredentialStore>>,
    session: TypedSession,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let username = session.get_username().map_err(e500)?;
    let view = ViewState::resolve(credential_store.get_ref().as_ref(), username.as_deref());
    Ok(view.render(&flash_messages))
}
