use actix_web::http::header::ContentType;
use actix_web::HttpResponse;
use actix_web_flash_messages::{IncomingFlashMessages, Level};

use crate::authentication::{CredentialStore, Identity};

/// Which page the visitor gets to see.
#[derive(Debug, PartialEq, Eq)]
pub enum ViewState {
    /// No credentials file: nobody can log in until an operator provides one.
    Unconfigured,
    Unauthenticated,
    LoginFailed,
    Authenticated(Identity),
}

impl ViewState {
    /// Picks the view for a request carrying `username` in its session.
    ///
    /// A session naming a user that is not in the store is treated as anonymous.
    pub fn resolve(credential_store: Option<&CredentialStore>, username: Option<&str>) -> Self {
        match (credential_store, username) {
            (None, _) => Self::Unconfigured,
            (Some(store), Some(username)) => store
                .identity(username)
                .map(Self::Authenticated)
                .unwrap_or(Self::Unauthenticated),
            (Some(_), None) => Self::Unauthenticated,
        }
    }

    pub fn render(&self, flash_messages: &IncomingFlashMessages) -> HttpResponse {
        let notices = flash_messages
            .iter()
            .map(|m| notice(m.level(), m.content()))
            .collect::<String>();
        HttpResponse::Ok()
            .content_type(ContentType::html())
            .body(self.html(&notices))
    }

    /// The full page; `notices` is pre-rendered HTML shown above the view.
    pub fn html(&self, notices: &str) -> String {
        let body = match self {
            Self::Unconfigured => r#"<p class="warning">Authentication is not configured: the credentials file was not found.</p>
    <p>Generate password hashes on the <a href="/setup">setup page</a> and create the file.</p>"#
                .to_string(),
            Self::Unauthenticated => format!(
                r#"<p class="warning">Please enter your username and password</p>
    {LOGIN_FORM}"#
            ),
            Self::LoginFailed => format!(
                r#"<p class="error">Username/password is incorrect</p>
    {LOGIN_FORM}"#
            ),
            Self::Authenticated(identity) => format!(
                r#"<form action="/logout" method="post">
        <button type="submit">Logout</button>
    </form>
    <p>Welcome <em>{name}</em></p>
    <h1>Email Sending App</h1>
    {SEND_EMAIL_FORM}"#,
                name = escape_html(&identity.display_name),
            ),
        };
        page("Email Sending App", &format!("{notices}\n    {body}"))
    }
}

const LOGIN_FORM: &str = r#"<form action="/login" method="post">
        <label>Username
            <input type="text" placeholder="Enter Username" name="username">
        </label>
        <label>Password
            <input type="password" placeholder="Enter Password" name="password">
        </label>
        <button type="submit">Login</button>
    </form>"#;

const SEND_EMAIL_FORM: &str = r#"<form action="/send-email" method="post">
        <label>Recipient Email
            <input type="text" placeholder="recipient@example.com" name="recipient">
        </label>
        <label>Subject
            <input type="text" placeholder="Enter email subject" name="subject">
        </label>
        <label>HTML Content
            <textarea placeholder="Enter HTML content for the email" name="html_content" rows="12" cols="60"></textarea>
        </label>
        <button type="submit">Send Email</button>
    </form>"#;

pub fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta http-equiv="content-type" content="text/html; charset=utf-8">
    <title>{title}</title>
</head>
<body>
    {body}
</body>
</html>"#
    )
}

pub fn notice(level: Level, content: &str) -> String {
    let class = match level {
        Level::Error => "error",
        Level::Warning => "warning",
        Level::Success => "success",
        Level::Info | Level::Debug => "info",
    };
    format!(r#"<p class="{class}"><i>{}</i></p>"#, escape_html(content))
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Renders `(label, value)` pairs as a definition list.
pub fn definition_list(entries: &[(&str, &str)]) -> String {
    let mut html = String::from("<dl>");
    for (label, value) in entries {
        html.push_str(&format!(
            "<dt>{}</dt><dd><code>{}</code></dd>",
            escape_html(label),
            escape_html(value)
        ));
    }
    html.push_str("</dl>");
    html
}
