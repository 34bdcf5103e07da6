use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coinpilot::{config, routes, services, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coinpilot=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = config::load();

    if settings.telegram_token.is_empty() {
        tracing::warn!("TELEGRAM_TOKEN is not set; the webhook will answer 500");
    }

    let store = match settings.redis_url.as_deref() {
        Some(url) => match services::kv_store::connect(url).await {
            Ok(store) => {
                tracing::info!("key-value store connected");
                Some(store)
            }
            Err(e) => {
                tracing::warn!(error = %e, "key-value store unavailable, storage features disabled");
                None
            }
        },
        None => {
            tracing::warn!("REDIS_URL is not set, storage features disabled");
            None
        }
    };

    let state = AppState::new(settings.clone(), store);

    if let Some(secs) = settings.local_scheduler_secs {
        tracing::info!(every_secs = secs, "starting local scheduler");
        services::reminder_monitor::spawn_local_scheduler(state.clone(), secs);
    }

    let app = routes::app(state);

    let ip = match settings.host.parse::<std::net::IpAddr>() {
        Ok(ip) => ip,
        Err(e) => {
            tracing::error!(host = %settings.host, error = %e, "invalid HOST");
            return;
        }
    };
    let addr = SocketAddr::from((ip, settings.port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, error = %e, "bind failed");
            return;
        }
    };
    tracing::info!("listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
    }
}
