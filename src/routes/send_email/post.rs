use actix_web::{web, HttpResponse};
use actix_web_flash_messages::FlashMessage;

use crate::authentication::Identity;
use crate::domain::{NewEmail, SendEmailFormData};
use crate::email_client::EmailClient;
use crate::routing_helpers::see_other;

/// Sends the submitted email, once, and reports the outcome as a flash message on the home page.
#[tracing::instrument(
    name = "Send an email on behalf of a user",
    skip(form, email_client, identity),
    fields(username = %identity.username, recipient = %form.recipient)
)]
pub async fn send_email(
    form: web::Form<SendEmailFormData>,
    email_client: web::Data<EmailClient>,
    identity: web::ReqData<Identity>,
) -> HttpResponse {
    let new_email: NewEmail = match form.0.try_into() {
        Ok(new_email) => new_email,
        Err(e) => {
            FlashMessage::error(e).send();
            return see_other("/");
        }
    };

    match email_client
        .send_email(
            &new_email.recipient,
            &new_email.subject,
            &new_email.html_content,
        )
        .await
    {
        Ok(()) => {
            FlashMessage::success(format!(
                "Email sent successfully to {}",
                new_email.recipient
            ))
            .send();
        }
        Err(e) => {
            tracing::error!(error.cause_chain = ?e, "Failed to send email");
            FlashMessage::error(format!("Failed to send email: {}", e)).send();
        }
    }
    see_other("/")
}
