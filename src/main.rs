use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pairup::config::{LoggingSettings, Settings};
use pairup::routes::{self, matches::AppState};
use pairup::services::{
    HttpNotifier, InMemoryStore, LogNotifier, LogPublisher, MatchStore, Notifier, PostgresStore,
    RedisPublisher, ResultPublisher,
};
use pairup::{Collaborators, Matchmaker};

/// JSON error response for rejected payloads and paths
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

/// Handle JSON payload errors
fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle malformed path parameters such as non-UUID request ids
fn handle_path_error(err: error::PathError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("Path error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path parameter: {}", err),
        status_code: 400,
    }
    .into()
}

/// LOG_LEVEL and LOG_FORMAT win over the logging section
fn init_tracing(logging: &LoggingSettings) {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

async fn build_store(settings: &Settings) -> std::io::Result<Arc<dyn MatchStore>> {
    let Some(url) = settings.database.url.as_deref() else {
        warn!("No database configured, keeping request records in memory");
        return Ok(Arc::new(InMemoryStore::new()));
    };

    let store = PostgresStore::from_settings(
        url,
        settings.database.max_connections,
        settings.database.min_connections,
    )
    .await
    .map_err(|e| {
        error!("Failed to connect to PostgreSQL: {}", e);
        std::io::Error::other(e)
    })?;

    info!("PostgreSQL store initialized");
    Ok(Arc::new(store))
}

async fn build_publisher(settings: &Settings) -> std::io::Result<Arc<dyn ResultPublisher>> {
    let Some(url) = settings.publisher.redis_url.as_deref() else {
        warn!("No Redis configured, matches will only be logged");
        return Ok(Arc::new(LogPublisher));
    };

    let publisher = RedisPublisher::new(url, settings.publisher.channel.clone())
        .await
        .map_err(|e| {
            error!("Failed to connect to Redis: {}", e);
            std::io::Error::other(e)
        })?;

    info!("Publishing matches to channel {}", publisher.channel());
    Ok(Arc::new(publisher))
}

fn build_notifier(settings: &Settings) -> std::io::Result<Arc<dyn Notifier>> {
    let Some(endpoint) = settings.notifier.endpoint.clone() else {
        warn!("No notifier endpoint configured, notifications will only be logged");
        return Ok(Arc::new(LogNotifier));
    };

    info!("Notifying realtime transport at {}", endpoint);
    let notifier = HttpNotifier::new(endpoint, Duration::from_secs(settings.notifier.timeout_secs))
        .map_err(|e| {
            error!("Failed to build notifier client: {}", e);
            std::io::Error::other(e)
        })?;

    Ok(Arc::new(notifier))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();
    init_tracing(
        &settings
            .as_ref()
            .map(|s| s.logging.clone())
            .unwrap_or_default(),
    );

    info!("Starting PairUp matchmaking service...");

    let settings = settings.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        std::io::Error::other(e)
    })?;

    info!("Configuration loaded successfully");

    let collaborators = Collaborators {
        store: build_store(&settings).await?,
        publisher: build_publisher(&settings).await?,
        notifier: build_notifier(&settings)?,
    };

    let matchmaker_config = settings.matching.matchmaker_config();
    info!(
        "Matchmaker initialized (timeout: {:?}, policy: {:?})",
        matchmaker_config.timeout, matchmaker_config.policy
    );

    let app_state = AppState {
        matchmaker: Matchmaker::new(matchmaker_config, collaborators),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
