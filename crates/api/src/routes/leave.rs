use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use leadflow_db::models::{Leave, LeaveStatus};
use leadflow_services::dao::base::PaginatedResult;
use leadflow_services::leave::LeaveFilter;
use leadflow_services::time::ist_to_utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{ListParams, parse_id, parse_opt_id};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyLeaveRequest {
    #[validate(length(min = 4, message = "Minimum 4 characters required"))]
    pub reason: String,
    /// IST millis.
    pub date: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLeaveRequest {
    pub status: LeaveStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaveListQuery {
    pub user: Option<String>,
    pub status: Option<LeaveStatus>,
}

#[derive(Debug, Serialize)]
pub struct LeaveResponse {
    pub id: String,
    pub requester: String,
    pub reason: String,
    pub date: i64,
    pub status: LeaveStatus,
    pub reviewed_by: Option<String>,
    pub created_at: i64,
}

fn to_response(leave: Leave) -> LeaveResponse {
    LeaveResponse {
        id: leave.id.map(|id| id.to_hex()).unwrap_or_default(),
        requester: leave.requester.to_hex(),
        reason: leave.reason,
        date: leave.date.timestamp_millis(),
        status: leave.status,
        reviewed_by: leave.reviewed_by.map(|id| id.to_hex()),
        created_at: leave.created_at.timestamp_millis(),
    }
}

pub async fn apply(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Json(body): Json<ApplyLeaveRequest>,
) -> Result<(StatusCode, Json<LeaveResponse>), ApiError> {
    body.validate()?;
    let leave = state
        .engine
        .leaves
        .apply(&ctx, body.reason, ist_to_utc("date", body.date)?)
        .await?;
    Ok((StatusCode::CREATED, Json(to_response(leave))))
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Query(params): Query<ListParams>,
    Query(query): Query<LeaveListQuery>,
) -> Result<Json<PaginatedResult<LeaveResponse>>, ApiError> {
    let filter = LeaveFilter {
        user: parse_opt_id("user", query.user.as_deref())?,
        status: query.status,
        date: params.range()?,
    };
    let page = state
        .engine
        .leaves
        .list(&ctx, &filter, &params.pagination())
        .await?;
    Ok(Json(page.map(to_response)))
}

pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(leave_id): Path<String>,
    Json(body): Json<UpdateLeaveRequest>,
) -> Result<Json<LeaveResponse>, ApiError> {
    let leave = state
        .engine
        .leaves
        .update_status(&ctx, parse_id("leave_id", &leave_id)?, body.status)
        .await?;
    Ok(Json(to_response(leave)))
}
