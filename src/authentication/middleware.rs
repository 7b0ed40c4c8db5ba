use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::error::InternalError;
use actix_web::{web, FromRequest, HttpMessage};
use actix_web_lab::middleware::Next;

use crate::authentication::CredentialStore;
use crate::routing_helpers::{e500, see_other};
use crate::session_state::TypedSession;

/// Lets the request through only if its session belongs to a user of the credential store, making
/// that user's `Identity` available to the handler as `web::ReqData<Identity>`.
pub async fn reject_anonymous_users(
    mut req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let session = {
        let (http_request, payload) = req.parts_mut();
        TypedSession::from_request(http_request, payload).await
    }?;
    let username = session.get_username().map_err(e500)?;
    let identity = req
        .app_data::<web::Data<Option<CredentialStore>>>()
        .and_then(|store| store.get_ref().as_ref())
        .zip(username)
        .and_then(|(store, username)| store.identity(&username));

    match identity {
        Some(identity) => {
            req.extensions_mut().insert(identity);
            next.call(req).await
        }
        None => {
            let response = see_other("/");
            let e = anyhow::anyhow!("The user has not logged in");
            Err(InternalError::from_response(e, response).into())
        }
    }
}
