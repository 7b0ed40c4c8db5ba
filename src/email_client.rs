use std::time::Duration;

use lettre::address::AddressError;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, Secret};

use crate::domain::{EmailAddress, EmailSubject, HtmlContent};
use crate::error_handling::error_chain_fmt;

/// Sends HTML emails through an SMTP relay, authenticating as the configured sender.
///
/// A new connection is opened for every email and closed once it has been handed over: there is no
/// pooling, no queue and no retry.
pub struct EmailClient {
    smtp_server: String,
    smtp_port: u16,
    sender: Option<String>,
    sender_password: Option<Secret<String>>,
    starttls: bool,
    timeout: Option<Duration>,
}

impl EmailClient {
    pub fn new(
        smtp_server: String,
        smtp_port: u16,
        sender: Option<String>,
        sender_password: Option<Secret<String>>,
        starttls: bool,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            smtp_server,
            smtp_port,
            sender,
            sender_password,
            starttls,
            timeout,
        }
    }

    #[tracing::instrument(
        name = "Send an email over SMTP",
        skip(self, subject, html_content),
        fields(
            recipient = %recipient,
            smtp_server = %self.smtp_server,
            smtp_port = self.smtp_port
        )
    )]
    pub async fn send_email(
        &self,
        recipient: &EmailAddress,
        subject: &EmailSubject,
        html_content: &HtmlContent,
    ) -> Result<(), SendEmailError> {
        // checked before anything touches the network
        let (sender, password) = match (&self.sender, &self.sender_password) {
            (Some(sender), Some(password)) => (sender, password),
            _ => return Err(SendEmailError::MissingSenderConfiguration),
        };

        let from: Mailbox = sender.parse().map_err(SendEmailError::InvalidSender)?;
        let to: Mailbox = recipient
            .as_ref()
            .parse()
            .map_err(SendEmailError::InvalidRecipient)?;
        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject.as_ref())
            .multipart(MultiPart::mixed().singlepart(SinglePart::html(
                html_content.as_ref().to_string(),
            )))
            .map_err(SendEmailError::InvalidMessage)?;

        let credentials = Credentials::new(sender.clone(), password.expose_secret().clone());
        let transport: AsyncSmtpTransport<Tokio1Executor> = self
            .transport()?
            .port(self.smtp_port)
            .credentials(credentials)
            .timeout(self.timeout)
            .build();
        transport
            .send(message)
            .await
            .map_err(SendEmailError::Transport)?;
        Ok(())
    }

    fn transport(
        &self,
    ) -> Result<lettre::transport::smtp::AsyncSmtpTransportBuilder, SendEmailError> {
        if self.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp_server)
                .map_err(SendEmailError::Transport)
        } else {
            Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                &self.smtp_server,
            ))
        }
    }
}

#[derive(thiserror::Error)]
pub enum SendEmailError {
    #[error("Sender email or password is not configured.")]
    MissingSenderConfiguration,
    #[error("The configured sender is not a valid address: {0}")]
    InvalidSender(#[source] AddressError),
    #[error("The recipient is not a valid address: {0}")]
    InvalidRecipient(#[source] AddressError),
    #[error("The message could not be built: {0}")]
    InvalidMessage(#[source] lettre::error::Error),
    #[error("{0}")]
    Transport(#[source] lettre::transport::smtp::Error),
}

impl std::fmt::Debug for SendEmailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
