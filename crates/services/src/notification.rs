use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bson::{oid::ObjectId, DateTime};
use leadflow_config::PushSettings;
use leadflow_db::models::Notification;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::dao::base::{PaginatedResult, PaginationParams};
use crate::error::ServiceResult;
use crate::hierarchy::{HierarchyResolver, RequesterContext};
use crate::repo::NotificationRepo;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
}

/// Delivers a push message to one device.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, message: &PushMessage) -> anyhow::Result<()>;
}

/// FCM legacy HTTP endpoint.
pub struct HttpPushSender {
    client: reqwest::Client,
    endpoint: String,
    server_key: String,
}

#[derive(Serialize)]
struct FcmRequest<'a> {
    to: &'a str,
    data: FcmData<'a>,
}

#[derive(Serialize)]
struct FcmData<'a> {
    title: &'a str,
    body: &'a str,
}

impl HttpPushSender {
    pub fn new(endpoint: String, server_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            server_key,
        })
    }
}

#[async_trait]
impl PushSender for HttpPushSender {
    async fn send(&self, message: &PushMessage) -> anyhow::Result<()> {
        self.client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&FcmRequest {
                to: &message.token,
                data: FcmData {
                    title: &message.title,
                    body: &message.body,
                },
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Logs instead of delivering.
pub struct NoopPushSender;

#[async_trait]
impl PushSender for NoopPushSender {
    async fn send(&self, message: &PushMessage) -> anyhow::Result<()> {
        info!(title = %message.title, "Push delivery disabled, dropping message");
        Ok(())
    }
}

/// Keeps every message in memory.
#[derive(Default)]
pub struct RecordingPushSender {
    sent: Mutex<Vec<PushMessage>>,
}

impl RecordingPushSender {
    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl PushSender for RecordingPushSender {
    async fn send(&self, message: &PushMessage) -> anyhow::Result<()> {
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

/// Picks the push sender for the configured settings.
pub fn push_sender_from_settings(settings: &PushSettings) -> anyhow::Result<Arc<dyn PushSender>> {
    match (&settings.server_key, settings.enabled) {
        (Some(key), true) => Ok(Arc::new(HttpPushSender::new(
            settings.endpoint.clone(),
            key.clone(),
            Duration::from_secs(settings.timeout_secs),
        )?)),
        _ => Ok(Arc::new(NoopPushSender)),
    }
}

#[derive(Clone)]
pub struct Notifier {
    notifications: Arc<dyn NotificationRepo>,
    hierarchy: HierarchyResolver,
    push: Arc<dyn PushSender>,
}

impl Notifier {
    pub fn new(
        notifications: Arc<dyn NotificationRepo>,
        hierarchy: HierarchyResolver,
        push: Arc<dyn PushSender>,
    ) -> Self {
        Self {
            notifications,
            hierarchy,
            push,
        }
    }

    /// Stores a notification for `assigned` and pushes it to their device.
    /// Never fails: every error is logged and swallowed.
    pub async fn notify(&self, assigned: ObjectId, lead: ObjectId, title: String, description: String) {
        let notification = Notification {
            id: None,
            assigned,
            lead,
            title: title.clone(),
            description,
            created_at: DateTime::now(),
        };
        if let Err(e) = self.notifications.insert(notification).await {
            warn!(user = %assigned, error = %e, "Failed to store notification");
        }
        self.push_to(assigned, title).await;
    }

    async fn push_to(&self, user_id: ObjectId, body: String) {
        let token = match self.hierarchy.user(user_id).await {
            Ok(user) => user.fcm_token,
            Err(e) => {
                warn!(user = %user_id, error = %e, "Push recipient lookup failed");
                return;
            }
        };
        let Some(token) = token else {
            info!(user = %user_id, "User has no device token, skipping push");
            return;
        };
        let message = PushMessage {
            token,
            title: "You have new lead".to_string(),
            body,
        };
        if let Err(e) = self.push.send(&message).await {
            warn!(user = %user_id, error = %e, "Push delivery failed");
        }
    }

    pub async fn list(
        &self,
        ctx: &RequesterContext,
        params: &PaginationParams,
    ) -> ServiceResult<PaginatedResult<Notification>> {
        Ok(self.notifications.find_page(ctx.user_id, params).await?)
    }
}
