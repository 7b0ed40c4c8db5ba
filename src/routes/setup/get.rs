use actix_web::http::header::ContentType;
use actix_web::HttpResponse;

use crate::views::page;

pub const SETUP_FORM: &str = r#"<h2>Generate a credentials file entry</h2>
    <form action="/setup" method="post">
        <label>Username
            <input type="text" placeholder="admin" name="username">
        </label>
        <label>Display name
            <input type="text" placeholder="Admin User" name="display_name">
        </label>
        <label>Email
            <input type="text" placeholder="admin@example.com" name="email">
        </label>
        <label>Password
            <input type="password" name="password">
        </label>
        <button type="submit">Generate Hashed Password</button>
    </form>"#;

pub const INSTRUCTIONS: &str = r#"<h2>How to run the app</h2>
    <ol>
        <li>Create a <code>.env</code> file next to the binary:
<pre>
SMTP_SERVER=smtp.gmail.com
SMTP_PORT=587
SENDER_EMAIL=your_email@gmail.com
SENDER_PASSWORD=your_app_specific_password
</pre>
        For Gmail, use an app-specific password generated in your Google Account settings.</li>
        <li>Generate an entry for every user with the form above and save them in
        <code>credentials.yaml</code>.</li>
        <li>Restart the app: the credentials file is only read at startup.</li>
    </ol>"#;

/// Operator utility to produce password hashes for the credentials file.
pub async fn setup_form() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page(
            "Setup",
            &format!("{SETUP_FORM}\n    {INSTRUCTIONS}"),
        ))
}
