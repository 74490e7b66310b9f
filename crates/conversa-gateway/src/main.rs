use std::net::SocketAddr;

use tracing::info;

mod app;
mod credentials;
mod http;
mod ingest;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conversa_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("CONVERSA_CONFIG").ok();
    let config = conversa_core::config::AppConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({}), using defaults", e);
        conversa_core::config::AppConfig::default()
    });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let (state, shutdown_tx) = app::AppState::new(config)?;
    let router = app::build_router(state.clone());

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("conversa gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received, draining background workers");
        let _ = shutdown_tx.send(true);
    });

    server.await?;
    Ok(())
}
