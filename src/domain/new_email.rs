use crate::domain::{EmailAddress, EmailSubject, HtmlContent};

/// The send-email form. Missing fields deserialize as empty strings so that they get the same
/// validation message as fields left blank.
#[derive(serde::Deserialize, Debug, Default)]
pub struct SendEmailFormData {
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub html_content: String,
}

pub struct NewEmail {
    pub recipient: EmailAddress,
    pub subject: EmailSubject,
    pub html_content: HtmlContent,
}

impl TryFrom<SendEmailFormData> for NewEmail {
    type Error = String;

    fn try_from(form: SendEmailFormData) -> Result<Self, Self::Error> {
        let is_blank = |field: &str| field.trim().is_empty();
        if is_blank(&form.recipient) || is_blank(&form.subject) || is_blank(&form.html_content) {
            return Err("All fields are required.".to_string());
        }
        let recipient = EmailAddress::parse(form.recipient)?;
        let subject = EmailSubject::parse(form.subject)?;
        let html_content = HtmlContent::parse(form.html_content)?;
        Ok(NewEmail {
            recipient,
            subject,
            html_content,
        })
    }
}
