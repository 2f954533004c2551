use std::sync::Arc;

use leadflow_config::Settings;
use leadflow_services::{AuthService, Engine, PushSender, Repositories};

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub engine: Engine,
}

impl AppState {
    pub fn new(settings: Settings, repos: Repositories, push: Arc<dyn PushSender>) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let engine = Engine::new(repos, push, auth.clone());
        Self {
            settings,
            auth,
            engine,
        }
    }
}
