use axum::{
    Json,
    extract::{Query, State},
};
use leadflow_db::models::Notification;
use leadflow_services::dao::base::PaginatedResult;
use serde::Serialize;

use super::ListParams;
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub lead: String,
    pub title: String,
    pub description: String,
    pub created_at: i64,
}

fn to_response(notification: Notification) -> NotificationResponse {
    NotificationResponse {
        id: notification.id.map(|id| id.to_hex()).unwrap_or_default(),
        lead: notification.lead.to_hex(),
        title: notification.title,
        description: notification.description,
        created_at: notification.created_at.timestamp_millis(),
    }
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResult<NotificationResponse>>, ApiError> {
    let page = state
        .engine
        .notifier
        .list(&ctx, &params.pagination())
        .await?;
    Ok(Json(page.map(to_response)))
}
