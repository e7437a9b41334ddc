use bff_gateway::config::Config;
use bff_gateway::router::{create_router, AppState};
use bff_gateway::session::create_session_layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().json();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(fmt_layer)
        .init()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::from_env()?;
    let state = AppState::from_config(config)?;

    let session_layer = create_session_layer(&state.config, None, state.session_store.clone());
    let router = create_router(state.clone(), session_layer);

    let listener = tokio::net::TcpListener::bind(&state.config.listen_addr).await?;
    tracing::info!(addr = %state.config.listen_addr, "gateway listening");

    axum::serve(listener, router).await?;

    Ok(())
}
