use anyhow::{Context, Result};
use axum::http::Method;
use clap::Parser;
use incidents_mock::{cli, config, routes, state, time};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,incidents_mock=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

async fn bind_listener(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::AddrInUse {
            anyhow::anyhow!("{addr} is already in use; pass --bind or set INCIDENTS_MOCK_HTTP_BIND")
        } else {
            anyhow::Error::new(err).context(format!("binding incidents-mock to {addr}"))
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    init_tracing()?;

    let config = config::MockConfig::from_env(&args)?;
    let clock = time::Clock::new(config.timezone.as_deref(), config.fixed_now)?;
    let state = state::AppState::new(config.clone(), clock, reqwest::Client::new());

    if let Some(path) = &config.fixture_path {
        let summary = routes::mock::install_fixture_path(&state, path)
            .await
            .with_context(|| format!("failed to install fixture {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            incidents = summary.installed,
            "startup fixture installed"
        );
    }

    let mut app = routes::router(state);
    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers(Any),
        );
    }

    let listener = bind_listener(&config.http_bind).await?;
    tracing::info!(
        bind = %config.http_bind,
        timezone = %config.timezone.as_deref().unwrap_or("UTC"),
        upstream = config.upstream_url.as_ref().map(|url| url.as_str()).unwrap_or("none"),
        "incidents-mock listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
        })
        .await?;
    Ok(())
}
