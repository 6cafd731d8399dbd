//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use dotenv::dotenv;
use plenario::adapters::camara::CamaraClient;
use plenario::adapters::crypto::ShaPasswordEncoder;
use plenario::adapters::persistence::SqliteRepo;
use plenario::adapters::ui::tui::TuiInputPort;
use plenario::ports::{ActivityRepo, BillFeed, BillRepo, InputPort, MediaRepo, UserRepo};
use plenario::shared::config::AppConfig;
use plenario::usecases::{BillService, SiteSettings, UserService};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    plenario::adapters::ui::init_ui();

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config not loaded; using defaults");
        AppConfig::default()
    });

    let data_path = PathBuf::from(cfg.data_dir_or_default());
    tokio::fs::create_dir_all(&data_path)
        .await
        .map_err(|e| anyhow::anyhow!("create data dir: {}", e))?;
    let data_dir_abs = data_path
        .canonicalize()
        .unwrap_or_else(|_| data_path.clone());
    info!(path = %data_dir_abs.display(), "data directory");

    let sqlite_repo = Arc::new(
        SqliteRepo::connect(&data_path)
            .await
            .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?,
    );

    let camara_url = cfg.camara_api_url_or_default();
    let timeout = Duration::from_secs(cfg.http_timeout_secs_or_default());
    info!(url = %camara_url, timeout_secs = timeout.as_secs(), "Câmara web service");
    let feed: Arc<dyn BillFeed> = Arc::new(
        CamaraClient::new(camara_url, timeout).map_err(|e| anyhow::anyhow!("{}", e))?,
    );

    // --- Services ---
    let user_service = Arc::new(UserService::new(
        Arc::clone(&sqlite_repo) as Arc<dyn UserRepo>,
        Arc::clone(&sqlite_repo) as Arc<dyn ActivityRepo>,
        Arc::clone(&sqlite_repo) as Arc<dyn MediaRepo>,
        Arc::new(ShaPasswordEncoder::new(cfg.encode_code_word_or_default())),
        SiteSettings {
            base_url: cfg.base_url_or_default(),
            default_avatar: cfg.default_avatar_or_default(),
        },
    ));
    let bill_service = Arc::new(BillService::new(
        Arc::clone(&sqlite_repo) as Arc<dyn BillRepo>,
        feed,
    ));

    let input_port: Arc<dyn InputPort> =
        Arc::new(TuiInputPort::new(user_service, bill_service, data_path));

    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
