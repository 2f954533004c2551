use leadflow_api::{build_router, state::AppState};
use leadflow_config::{Settings, StorageBackend};
use leadflow_db::{connect, indexes::ensure_indexes};
use leadflow_services::{Repositories, notification::push_sender_from_settings};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "leadflow_api=debug,leadflow_services=debug,leadflow_db=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    info!("Starting Leadflow API on {}:{}", settings.app.host, settings.app.port);

    let repos = match settings.database.backend {
        StorageBackend::Mongo => {
            let db = connect(&settings).await?;
            ensure_indexes(&db).await?;
            Repositories::mongo(&db)
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory store; data is lost on exit");
            Repositories::in_memory()
        }
    };
    let push = push_sender_from_settings(&settings.push)?;
    if !settings.push.enabled {
        info!("Push delivery disabled");
    }

    let app_state = AppState::new(settings.clone(), repos, push);
    let app = build_router(app_state);

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
