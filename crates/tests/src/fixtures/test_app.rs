use std::net::SocketAddr;
use std::sync::Arc;

use leadflow_api::{build_router, state::AppState};
use leadflow_config::{
    AppSettings, DatabaseSettings, JwtSettings, PushSettings, Settings, StorageBackend,
};
use leadflow_services::{RecordingPushSender, Repositories};
use tokio::net::TcpListener;

/// A running API server over a fresh in-memory store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub state: AppState,
    pub repos: Repositories,
    pub push: Arc<RecordingPushSender>,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Each call gets its own store, so tests never share records.
    pub async fn spawn() -> Self {
        let settings = test_settings();
        let repos = Repositories::in_memory();
        let push = Arc::new(RecordingPushSender::default());

        let state = AppState::new(settings, repos.clone(), push.clone());
        let app = build_router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            base_url: format!("http://{}", addr),
            state,
            repos,
            push,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn auth_get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_post(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_put(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .put(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }
}

fn test_settings() -> Settings {
    Settings {
        app: AppSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec![],
        },
        database: DatabaseSettings {
            url: "mongodb://localhost:27017".to_string(),
            name: "leadflow_test".to_string(),
            max_pool_size: None,
            min_pool_size: None,
            backend: StorageBackend::Memory,
        },
        jwt: JwtSettings {
            secret: "test-secret-key-for-jwt-signing-minimum-32-chars".to_string(),
            access_token_ttl_secs: 3600,
            issuer: "leadflow".to_string(),
        },
        push: PushSettings {
            enabled: false,
            endpoint: "http://localhost:9".to_string(),
            server_key: None,
            timeout_secs: 1,
        },
    }
}
