use std::time::Duration;

use leadflow_config::{DatabaseSettings, Settings};
use mongodb::{Client, Database, options::ClientOptions};
use tracing::info;

const APP_NAME: &str = "leadflow";

async fn client_options(db: &DatabaseSettings) -> Result<ClientOptions, mongodb::error::Error> {
    let mut options = ClientOptions::parse(&db.url).await?;
    options.app_name = Some(APP_NAME.to_string());
    options.server_selection_timeout = Some(Duration::from_secs(10));
    options.max_pool_size = db.max_pool_size.or(options.max_pool_size);
    options.min_pool_size = db.min_pool_size.or(options.min_pool_size);
    Ok(options)
}

/// Opens the configured database and fails fast when the server is unreachable.
pub async fn connect(settings: &Settings) -> Result<Database, mongodb::error::Error> {
    let db_settings = &settings.database;
    let client = Client::with_options(client_options(db_settings).await?)?;
    let db = client.database(&db_settings.name);

    db.run_command(bson::doc! { "ping": 1 }).await?;

    info!(
        db = %db_settings.name,
        max_pool = ?db_settings.max_pool_size,
        "Connected to MongoDB"
    );
    Ok(db)
}
