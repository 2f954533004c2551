//! Creates the first super admin and prints a bearer token for it.

use bson::DateTime;
use clap::Parser;
use leadflow_config::{Settings, StorageBackend};
use leadflow_db::models::{Privilege, SecondPrivilege, User};
use leadflow_db::{connect, indexes::ensure_indexes};
use leadflow_services::{AuthService, Repositories};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "seed-admin", about = "Bootstrap the super admin account")]
struct Args {
    #[arg(long, default_value = "admin")]
    username: String,
    #[arg(long, default_value = "Administrator")]
    display_name: String,
    #[arg(long, env = "LEADFLOW_SEED_PASSWORD")]
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed_admin=info,leadflow_db=info".into()),
        )
        .init();

    let args = Args::parse();
    if args.password.chars().count() < 8 {
        anyhow::bail!("password must be at least 8 characters");
    }

    let settings = Settings::load()?;
    if settings.database.backend == StorageBackend::Memory {
        anyhow::bail!("seeding the in-memory backend has no effect; use the mongo backend");
    }
    let db = connect(&settings).await?;
    ensure_indexes(&db).await?;
    let repos = Repositories::mongo(&db);
    let auth = AuthService::new(settings.jwt.clone());

    let user = match repos.users.find_by_username(&args.username).await? {
        Some(existing) => {
            info!(username = %existing.username, "User already exists, issuing token");
            existing
        }
        None => {
            let now = DateTime::now();
            let user = repos
                .users
                .insert(User {
                    id: None,
                    username: args.username.clone(),
                    display_name: args.display_name.clone(),
                    phone: None,
                    email: None,
                    password_hash: Some(auth.hash_password(&args.password)?),
                    privilege: Privilege::Admin,
                    second_privilege: SecondPrivilege::Super,
                    manager: None,
                    created_by: None,
                    is_active: true,
                    fcm_token: None,
                    dob: None,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
            info!(username = %user.username, "Super admin created");
            user
        }
    };

    let user_id = user
        .id
        .ok_or_else(|| anyhow::anyhow!("stored user has no id"))?;
    let token = auth.issue_access_token(user_id)?;
    println!("{}", token.access_token);
    Ok(())
}
