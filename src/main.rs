use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};

use burrow::web::WebServer;
use burrow::{BlobStore, Config, Database};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // Load configuration
    let config_found = Path::new(&config_path).exists();
    let mut config = if config_found {
        match Config::load(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {config_path}: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        Config::default()
    };

    // Initialize logging
    if let Err(e) = burrow::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        burrow::logging::init_console_only(&config.logging.level);
    }

    info!("Burrow - per-user file storage service");
    if !config_found {
        warn!("{} not found, using default configuration", config_path);
    }

    // After logging init: invalid overrides are reported through tracing
    config.apply_env_overrides();

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database {}: {}", config.database.path, e);
            return ExitCode::FAILURE;
        }
    };
    info!("Database ready at {}", config.database.path);

    let blobs = match BlobStore::new(&config.files.storage_path).await {
        Ok(blobs) => blobs,
        Err(e) => {
            error!(
                "Failed to initialize blob store {}: {}",
                config.files.storage_path, e
            );
            return ExitCode::FAILURE;
        }
    };
    info!(
        "Blob store ready at {} (max file size {} bytes)",
        config.files.storage_path, config.files.max_file_size_bytes
    );

    let server = match WebServer::new(
        &config.web,
        Arc::new(db),
        blobs,
        config.files.max_file_size_bytes,
    ) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to configure web server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run().await {
        error!("Web server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
