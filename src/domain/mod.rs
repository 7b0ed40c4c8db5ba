mod email_address;
mod email_subject;
mod html_content;
mod new_email;

pub use email_address::EmailAddress;
pub use email_subject::EmailSubject;
pub use html_content::HtmlContent;
pub use new_email::{NewEmail, SendEmailFormData};
