use std::sync::Arc;

use tower_http::cors::CorsLayer;

use ielts_review::config::ServerConfig;
use ielts_review::error::{ConfigError, Result};
use ielts_review::review::{ScoringClient, review_routes};
use ielts_review::store::{KeyValueStore, LibSqlStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;

    eprintln!("📝 IELTS Review v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Review WS: ws://0.0.0.0:{}/ws?browser=<id>", config.port);
    eprintln!("   Tutorial API: http://0.0.0.0:{}/api/tutorial/status", config.port);
    eprintln!("   Scoring API: {}", config.scoring_url);

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn KeyValueStore> = Arc::new(LibSqlStore::new_local(&config.db_path).await?);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!(
        "   Tutorial: start after {}ms, advance after {}ms\n",
        config.tutorial.start_fallback.as_millis(),
        config.tutorial.details_fallback.as_millis()
    );

    let scoring = Arc::new(ScoringClient::new(config.scoring_url.clone()));
    let app = review_routes(store, config.tutorial.clone(), scoring)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .map_err(ConfigError::from)?;
    tracing::info!(port = config.port, "Review server started");

    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    tokio::select! {
        result = server => {
            match result {
                Ok(Err(e)) => tracing::error!(error = %e, "Review server stopped"),
                Err(e) => tracing::error!(error = %e, "Review server task failed"),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
