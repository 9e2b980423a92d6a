use app::Components;
use database::Database;
use identity::Directory;
use secrets::Secrets;
use static_toml::static_toml;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use transfer::{MediaTransfer, S3Store, TwilioSource};
use twilio::Client as TwilioClient;

static_toml! { static CONFIG = include_toml!("Config.toml"); }

mod api;
mod app;
mod database;
mod identity;
mod secrets;
mod transfer;
mod webhook;

#[tokio::main]
async fn main() {
    // Intitialize environment and logger
    dotenv::dotenv().ok();
    env_logger::init();

    // Load the secrets
    let secrets = Secrets::from_env();

    // Initialize the database
    log::info!("Connecting to the database");
    let database = Database::connect(&secrets.database_url)
        .await
        .expect("Failed to connect to the database");

    // Initialize the twilio client
    log::info!("Initializing the Twilio client");
    let twilio = TwilioClient::new(
        secrets.twilio_account_sid.as_deref().unwrap_or_default(),
        secrets.twilio_auth_token.as_deref().unwrap_or_default(),
    )
    .with_signature_validation(secrets.twilio_validate_signatures);
    if !twilio.has_credentials() {
        log::warn!("Twilio credentials are not set, calls will be answered as unavailable");
    }

    // Initialize the object store and the media transfer client
    log::info!("Initializing the object store for bucket {}", secrets.aws_bucket_name);
    let store = S3Store::from_secrets(&secrets).await;
    let source = TwilioSource::new(
        twilio.clone(),
        Duration::from_secs(CONFIG.settings.download_timeout as u64),
    );
    let transfer = MediaTransfer::new(Arc::new(source), Arc::new(store));

    // Load the sender directory
    let directory = Directory::from_config(secrets.sender_directory.as_deref());
    log::info!("Loaded {} known senders", directory.len());

    // Initialize the TCP listener
    log::info!(
        "Connecting to the server at {}",
        CONFIG.settings.local_address
    );
    let tcp = TcpListener::bind(CONFIG.settings.local_address)
        .await
        .expect("Failed to connect to the server");

    // Initialize the webserver routes
    log::info!("Initializing the webserver routes");
    let router = app::router(Components {
        secrets,
        database,
        twilio,
        transfer,
        directory,
    });

    // Start the webserver
    log::info!("Starting the webserver");
    axum::serve(tcp, router.into_make_service())
        .await
        .expect("Failed to start the server");
}
