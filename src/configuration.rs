use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;
use secrecy::Secret;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::email_client::EmailClient;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub email_client: EmailClientSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    // env vars are always strings, so the port needs to be parsed from one
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    /// Location of the YAML credentials file. A missing file is not an error: the app starts in
    /// the "not configured" state until an operator creates it.
    pub credentials_file: PathBuf,
    pub cookie_secure: bool,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct EmailClientSettings {
    pub smtp_server: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub smtp_port: u16,
    pub sender_email: Option<String>,
    pub sender_password: Option<Secret<String>>,
    #[serde(default = "default_starttls")]
    pub starttls: bool,
    pub timeout_milliseconds: Option<u64>,
}

fn default_starttls() -> bool {
    true
}

impl EmailClientSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_milliseconds.map(Duration::from_millis)
    }

    pub fn client(self) -> EmailClient {
        let timeout = self.timeout();
        EmailClient::new(
            self.smtp_server,
            self.smtp_port,
            self.sender_email,
            self.sender_password,
            self.starttls,
            timeout,
        )
    }
}

/// Builds the settings from, in increasing order of precedence: `configuration/base.yaml`, the
/// environment specific file selected by `APP_ENVIRONMENT`, `APP_`-prefixed environment variables
/// and finally the plain SMTP variables (`SMTP_SERVER`, `SMTP_PORT`, `SENDER_EMAIL`,
/// `SENDER_PASSWORD`).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| ConfigError::Foreign(Box::new(e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // e.g. `APP_APPLICATION__PORT=5001` sets `Settings.application.port`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("email_client.smtp_server", non_empty_var("SMTP_SERVER"))?
        .set_override_option("email_client.smtp_port", non_empty_var("SMTP_PORT"))?
        .set_override_option("email_client.sender_email", non_empty_var("SENDER_EMAIL"))?
        .set_override_option(
            "email_client.sender_password",
            non_empty_var("SENDER_PASSWORD"),
        )?
        .build()?;
    settings.try_deserialize::<Settings>()
}

/// An empty variable counts as unset.
fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// The possible runtime environments for our application.
#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}
