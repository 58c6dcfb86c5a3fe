use std::process::ExitCode;

use tracing::{error, info};

use filevault::web::WebServer;
use filevault::{Config, Database, FileService, FileStorage};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = filevault::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        filevault::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    info!("filevault starting");

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("filevault stopped with an error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(&config.database.path).await?;

    let storage = FileStorage::new(&config.files.storage_path)?;
    info!("File storage initialized at: {}", config.files.storage_path);

    let files = FileService::with_database(&db, storage)
        .with_max_file_size(config.files.max_upload_size_bytes());

    let server = WebServer::new(&config.web, db, files)?;
    server.run().await?;

    Ok(())
}
