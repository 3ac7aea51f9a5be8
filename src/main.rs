use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use comm_assist::config::{self, AppConfig};
use comm_assist::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Shell-exported variables win over `.env`.
    let env_file = config::load_env_file(None);

    let config = AppConfig::from_env().context("failed to load configuration")?;

    // Dropping the guard flushes the file writer, so it lives until exit.
    let _log_guard = init_tracing(config.log_dir.as_deref());
    if let Some(path) = env_file {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }

    eprintln!("📬 Comm Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://{}:{}/", config.host, config.port);
    eprintln!("   Model backend: {:?}", config.model.backend);

    let state = AppState::build(&config).context("failed to create model backend")?;
    let token_store = state.token_store.clone();

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Comm Assist API listening");

    axum::serve(listener, routes::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // Credentials do not outlive the process.
    match token_store.delete() {
        Ok(true) => tracing::info!("token.json has been removed."),
        Ok(false) => {}
        Err(e) => tracing::warn!("Failed to remove token file on exit: {e}"),
    }

    Ok(())
}

/// Stderr logging filtered by `RUST_LOG` (default `info`), plus a
/// daily-rolling file under `log_dir` when configured.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "comm-assist.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    guard
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
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
    tracing::info!("Shutdown signal received");
}
