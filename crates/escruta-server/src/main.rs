//! Escruta server - research notebooks with retrieval-augmented chat

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use escruta_core::api::{self, AppState};
use escruta_core::config::{Config, redact};
use escruta_core::llm::LlmClient;
use escruta_core::retrieval::PgVectorStore;
use escruta_core::storage::{Database, DatabaseConfig};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "escruta")]
#[command(author, version, about = "Research notebooks with retrieval-augmented chat", long_about = None)]
struct Cli {
    /// Configuration file (defaults to escruta.toml)
    #[arg(short, long, env = "ESCRUTA_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration
    #[arg(short, long)]
    bind: Option<String>,

    /// Apply pending migrations and exit
    #[arg(long, conflicts_with = "no_migrate")]
    migrate_only: bool,

    /// Skip migrations on startup
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("escruta=info,escruta_core=info,tower_http=info")
            }),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    let mut db_config = DatabaseConfig::from(&config.database);
    if cli.no_migrate {
        db_config = db_config.no_migrate();
    }
    if cli.migrate_only {
        db_config.auto_migrate = true;
    }

    let db = Database::connect(&db_config).await?;
    let status = db.migration_status().await?;
    info!(
        version = status.current_version,
        target = status.target_version,
        "Database ready"
    );
    if status.needs_migration {
        warn!("Database schema is behind; run with --migrate-only or enable auto_migrate");
    }

    if cli.migrate_only {
        db.close().await;
        return Ok(());
    }

    let api_key = config
        .llm
        .resolved_api_key()?
        .context("No model provider key configured. Set OPENAI_API_KEY or ESCRUTA_LLM_API_KEY")?;
    info!(
        chat_model = %config.llm.chat_model,
        embedding_model = %config.llm.embedding_model,
        key = %redact(&api_key),
        "Using model provider at {}",
        config.llm.base_url
    );
    let llm = Arc::new(LlmClient::new(config.llm.clone(), api_key)?);
    let store = Arc::new(PgVectorStore::new(db.clone()));

    let state = AppState::new(&config, db.clone(), llm.clone(), llm, store)?;
    state.tools.recover_interrupted().await?;

    let app = api::router(state, &config.cors);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("Escruta v{} listening on {}", env!("CARGO_PKG_VERSION"), listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down");
    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
