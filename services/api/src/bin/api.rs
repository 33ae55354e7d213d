//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{CloudinaryAdapter, DbAdapter, GoogleIdentityAdapter, TelegramAdapter},
    bot::ChatBot,
    config::Config,
    error::ApiError,
    web::{build_router, state::AppState},
};
use meal_builder_core::ports::{DatabaseService, ImageStorageService};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");
    let db: Arc<dyn DatabaseService> = db_adapter;

    // --- 3. Initialize Service Adapters ---
    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| ApiError::Internal(format!("failed to build HTTP client: {e}")))?;

    let identity = Arc::new(GoogleIdentityAdapter::new(
        http.clone(),
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        config.oauth_redirect_url(),
    ));

    let image_storage = config.cloudinary.clone().map(|c| {
        info!("Image uploads go to Cloudinary cloud '{}'", c.cloud_name);
        Arc::new(CloudinaryAdapter::new(http.clone(), c)) as Arc<dyn ImageStorageService>
    });
    if image_storage.is_none() {
        info!("Cloudinary is not configured; recipe image uploads are disabled.");
    }

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db.clone(),
        config: config.clone(),
        identity,
        image_storage,
    });

    // --- 5. Start the Chat Bot ---
    let cancel = CancellationToken::new();
    let bot_task = match &config.telegram_bot_token {
        Some(token) => {
            let chat = Arc::new(TelegramAdapter::new(http.clone(), token));
            let bot = ChatBot::new(db.clone(), chat, config.week_start);
            Some(tokio::spawn(bot.run(cancel.clone())))
        }
        None => {
            info!("TELEGRAM_BOT_TOKEN is not set; the chat bot is disabled.");
            None
        }
    };

    // --- 6. Create the Web Router ---
    let app = build_router(app_state);

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    if let Some(task) = bot_task {
        if let Err(e) = task.await {
            error!("Chat bot task ended abnormally: {}", e);
        }
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
