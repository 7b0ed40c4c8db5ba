use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use email_sender::authentication::compute_password_hash;
use email_sender::configuration::get_configuration;
use email_sender::startup::Application;
use email_sender::telemetry::{get_tracing_subscriber, init_subscriber};
use once_cell::sync::Lazy;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use secrecy::{ExposeSecret, Secret};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

// ensure that the tracing stack is only initialized once
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_tracing_subscriber("test", "debug", std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_tracing_subscriber("test", "debug", std::io::sink);
        init_subscriber(subscriber);
    }
});

pub const SENDER_EMAIL: &str = "sender@example.com";

pub struct TestUser {
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub email: String,
}

impl TestUser {
    pub fn generate() -> Self {
        let username = format!("user-{}", random_string(8).to_lowercase());
        Self {
            email: format!("{}@example.com", username),
            username,
            password: random_string(16),
            display_name: "Test User".into(),
        }
    }

    /// A credentials file granting access to this user only.
    fn credentials_yaml(&self, bcrypt_password_hash: bool) -> String {
        let password_hash = if bcrypt_password_hash {
            bcrypt::hash(&self.password, 4).expect("Failed to hash the test password.")
        } else {
            compute_password_hash(Secret::new(self.password.clone()))
                .expect("Failed to hash the test password.")
                .expose_secret()
                .clone()
        };
        format!(
            r#"cookie:
  expiry_days: 1
  key: "{key}"
  name: test_session
credentials:
  usernames:
    {username}:
      email: {email}
      name: {name}
      password: "{hash}"
"#,
            key = random_string(32),
            username = self.username,
            email = self.email,
            name = self.display_name,
            hash = password_hash,
        )
    }
}

/// What the SMTP test server recorded for one delivered message.
#[derive(Clone, Debug, Default)]
pub struct ReceivedEmail {
    pub authenticated: bool,
    pub mail_from: String,
    pub rcpt_to: Vec<String>,
    pub data: String,
}

/// A plain-text SMTP server that accepts (or rejects, see `rejecting_logins`) every login and
/// records every message handed to it.
pub struct SmtpServer {
    pub port: u16,
    received: Arc<Mutex<Vec<ReceivedEmail>>>,
    connections: Arc<AtomicUsize>,
}

impl SmtpServer {
    pub async fn start() -> Self {
        Self::start_with(true).await
    }

    pub async fn rejecting_logins() -> Self {
        Self::start_with(false).await
    }

    async fn start_with(accept_logins: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind the SMTP test server.");
        let port = listener.local_addr().unwrap().port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let (store, counter) = (received.clone(), connections.clone());
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let store = store.clone();
                tokio::spawn(async move {
                    let _ = serve_session(stream, store, accept_logins).await;
                });
            }
        });
        Self {
            port,
            received,
            connections,
        }
    }

    pub fn received_emails(&self) -> Vec<ReceivedEmail> {
        self.received.lock().unwrap().clone()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

async fn serve_session(
    stream: TcpStream,
    store: Arc<Mutex<Vec<ReceivedEmail>>>,
    accept_logins: bool,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    writer.write_all(b"220 localhost ESMTP test server\r\n").await?;

    let mut current = ReceivedEmail::default();
    while let Some(line) = lines.next_line().await? {
        let command = line.to_ascii_uppercase();
        let reply: &[u8] = if command.starts_with("EHLO") {
            b"250-localhost\r\n250 AUTH PLAIN\r\n"
        } else if command.starts_with("AUTH") {
            if accept_logins {
                current.authenticated = true;
                b"235 2.7.0 Authentication successful\r\n"
            } else {
                b"535 5.7.8 Authentication credentials invalid\r\n"
            }
        } else if command.starts_with("MAIL FROM:") {
            // keep the address, drop any ESMTP parameters
            current.mail_from = line["MAIL FROM:".len()..]
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string();
            b"250 2.1.0 OK\r\n"
        } else if command.starts_with("RCPT TO:") {
            current.rcpt_to.push(
                line["RCPT TO:".len()..]
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string(),
            );
            b"250 2.1.5 OK\r\n"
        } else if command == "DATA" {
            writer.write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n").await?;
            let mut data = Vec::new();
            while let Some(data_line) = lines.next_line().await? {
                if data_line == "." {
                    break;
                }
                // undo dot-stuffing
                let data_line = data_line.strip_prefix('.').unwrap_or(&data_line).to_string();
                data.push(data_line);
            }
            current.data = data.join("\r\n");
            store.lock().unwrap().push(std::mem::take(&mut current));
            b"250 2.0.0 OK: queued\r\n"
        } else if command == "QUIT" {
            writer.write_all(b"221 2.0.0 Bye\r\n").await?;
            break;
        } else if command == "RSET" || command == "NOOP" {
            b"250 2.0.0 OK\r\n"
        } else {
            b"502 5.5.2 Command not implemented\r\n"
        };
        writer.write_all(reply).await?;
    }
    Ok(())
}

// A struct holding data needed to access a test version of our application
pub struct TestApp {
    pub address: String,
    pub smtp_server: SmtpServer,
    pub test_user: TestUser,
    pub api_client: reqwest::Client,
}

/// How the application under test is set up.
pub struct TestSetup {
    pub write_credentials_file: bool,
    pub sender_configured: bool,
    pub smtp_accepts_logins: bool,
    /// Store the test user's password the way bcrypt-based hashers do.
    pub bcrypt_password_hash: bool,
}

impl Default for TestSetup {
    fn default() -> Self {
        Self {
            write_credentials_file: true,
            sender_configured: true,
            smtp_accepts_logins: true,
            bcrypt_password_hash: false,
        }
    }
}

// Spawns an app with a credentials file and a working SMTP relay.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(TestSetup::default()).await
}

pub async fn spawn_app_with(setup: TestSetup) -> TestApp {
    Lazy::force(&TRACING);

    let smtp_server = if setup.smtp_accepts_logins {
        SmtpServer::start().await
    } else {
        SmtpServer::rejecting_logins().await
    };
    let test_user = TestUser::generate();
    let credentials_file = credentials_file_path();
    if setup.write_credentials_file {
        std::fs::write(&credentials_file, test_user.credentials_yaml(setup.bcrypt_password_hash))
            .expect("Failed to write the credentials file.");
    }

    // randomize the configuration to ensure test isolation
    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        // port 0 means the OS picks a random available port
        c.application.port = 0;
        c.application.credentials_file = credentials_file;
        c.application.cookie_secure = false;
        c.email_client.smtp_server = "127.0.0.1".into();
        c.email_client.smtp_port = smtp_server.port;
        c.email_client.starttls = false;
        c.email_client.timeout_milliseconds = Some(2000);
        if setup.sender_configured {
            c.email_client.sender_email = Some(SENDER_EMAIL.into());
            c.email_client.sender_password = Some(Secret::new("sender-password".into()));
        } else {
            c.email_client.sender_email = None;
            c.email_client.sender_password = None;
        }
        c
    };

    let application = Application::build(configuration)
        .await
        .expect("Failed to build application.");
    let port = application.port();
    let _ = tokio::spawn(application.run_until_stopped());

    let api_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .cookie_store(true)
        .build()
        .unwrap();

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        smtp_server,
        test_user,
        api_client,
    }
}

impl TestApp {
    pub async fn get_home(&self) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_home_html(&self) -> String {
        self.get_home().await.text().await.unwrap()
    }

    pub async fn post_login<Body>(&self, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(&format!("{}/login", &self.address))
            .form(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn login_as_test_user(&self) {
        let response = self
            .post_login(&[
                ("username", self.test_user.username.as_str()),
                ("password", self.test_user.password.as_str()),
            ])
            .await;
        assert_is_redirect_to(&response, "/");
    }

    pub async fn post_logout(&self) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/logout", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_send_email<Body>(&self, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(&format!("{}/send-email", &self.address))
            .form(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_setup_html(&self) -> String {
        self.api_client
            .get(&format!("{}/setup", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
            .text()
            .await
            .unwrap()
    }

    pub async fn post_setup<Body>(&self, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(&format!("{}/setup", &self.address))
            .form(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

pub fn assert_is_redirect_to(response: &reqwest::Response, location: &str) {
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(response.headers().get("Location").unwrap(), location);
}

fn credentials_file_path() -> PathBuf {
    std::env::temp_dir().join(format!("email-sender-credentials-{}.yaml", random_string(12)))
}

fn random_string(length: usize) -> String {
    let mut rng = thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(length)
        .collect()
}
