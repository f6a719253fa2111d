use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use wanderlog::config::AppConfig;
use wanderlog::error::AppError;
use wanderlog::routes::create_router;
use wanderlog::services::{
    api::{HttpResourceApi, ResourceApi},
    memory::InMemoryResourceApi,
    places::{HttpPlaceLookup, PlaceLookup, PlacesService},
    session::{HttpSessionProvider, InMemorySessionProvider, SessionProvider},
};
use wanderlog::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;

    let api: Arc<dyn ResourceApi> = match config.api_base_url.clone() {
        Some(url) => {
            info!(%url, "using resource API");
            Arc::new(HttpResourceApi::new(url))
        }
        None => {
            warn!("API_BASE_URL not set, trips are kept in memory only");
            Arc::new(InMemoryResourceApi::new())
        }
    };

    let auth: Arc<dyn SessionProvider> = match config.auth_base_url.clone() {
        Some(url) => {
            info!(%url, "using session provider");
            Arc::new(HttpSessionProvider::new(url))
        }
        None => {
            warn!("AUTH_BASE_URL not set, accounts are kept in memory only");
            Arc::new(InMemorySessionProvider::new())
        }
    };

    let lookup = config
        .places_base_url
        .clone()
        .map(|url| Arc::new(HttpPlaceLookup::new(url)) as Arc<dyn PlaceLookup>);
    let places = PlacesService::start(lookup);

    let state = AppState::new(config.clone(), api, auth, places);
    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,wanderlog=debug,tower_http=info".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
