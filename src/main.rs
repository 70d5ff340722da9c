use std::path::PathBuf;
use std::sync::Arc;

use ghostwriter::config::{load_properties, ProviderSet, Settings};
use ghostwriter::router::ProviderRouter;
use ghostwriter::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    dotenvy::dotenv().ok();

    tracing::info!("ghostwriter backend starting");

    let properties_path = PathBuf::from(
        std::env::var("GHOSTWRITER_PROPERTIES").unwrap_or_else(|_| "app.properties".to_string()),
    );
    let props = load_properties(&properties_path);
    let settings = Settings::from_properties(&props);
    let providers = ProviderSet::from_properties(&props);
    tracing::info!(
        default_mode = %providers.default_mode,
        "providers configured: {}",
        providers.mode_names().join(", ")
    );

    let bind_addr = settings.bind_addr.clone();
    let state = Arc::new(AppState {
        router: ProviderRouter::new(providers, settings),
        properties_path,
    });

    server::serve(state, &bind_addr).await
}
