use email_sender::configuration::get_configuration;
use email_sender::startup::Application;
use email_sender::telemetry::{get_tracing_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // SMTP settings usually live in a `.env` file next to the binary
    dotenvy::dotenv().ok();

    let subscriber = get_tracing_subscriber("email-sender", "info", std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration()?;
    let application = Application::build(configuration).await?;
    application.run_until_stopped().await?;
    Ok(())
}
