use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use leadflow_db::models::{Privilege, SecondPrivilege, User};
use leadflow_services::users::CreateUserInput;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{ist_millis, parse_id, parse_opt_id};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub display_name: String,
    #[validate(length(min = 8, message = "Minimum 8 characters required"))]
    pub password: String,
    #[validate(length(min = 10, message = "Minimum 10 characters required"))]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    pub privilege: Privilege,
    #[serde(default)]
    pub second_privilege: SecondPrivilege,
    pub manager: Option<String>,
    /// IST millis.
    pub dob: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeviceRequest {
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StaffQuery {
    pub manager: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub privilege: Privilege,
    pub second_privilege: SecondPrivilege,
    pub manager: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
}

pub fn to_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
        username: user.username,
        display_name: user.display_name,
        phone: user.phone,
        email: user.email,
        privilege: user.privilege,
        second_privilege: user.second_privilege,
        manager: user.manager.map(|id| id.to_hex()),
        is_active: user.is_active,
        created_at: user.created_at.timestamp_millis(),
    }
}

fn to_responses(users: Vec<User>) -> Vec<UserResponse> {
    users.into_iter().map(to_response).collect()
}

pub async fn me(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(to_response(state.engine.users.me(&ctx).await?)))
}

pub async fn register_device(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Json(body): Json<DeviceRequest>,
) -> Result<StatusCode, ApiError> {
    state.engine.users.register_device(&ctx, body.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    body.validate()?;
    let input = CreateUserInput {
        username: body.username,
        display_name: body.display_name,
        password: body.password,
        phone: body.phone,
        email: body.email,
        privilege: body.privilege,
        second_privilege: body.second_privilege,
        manager: parse_opt_id("manager", body.manager.as_deref())?,
        dob: ist_millis("dob", body.dob)?,
    };
    let user = state.engine.users.create_user(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(to_response(user))))
}

pub async fn staff(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Query(query): Query<StaffQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let manager = parse_opt_id("manager", query.manager.as_deref())?;
    let users = state.engine.users.list_staff(&ctx, manager).await?;
    Ok(Json(to_responses(users)))
}

pub async fn managers(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    Ok(Json(to_responses(state.engine.users.list_managers(&ctx).await?)))
}

pub async fn transfer_targets(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.engine.users.list_transfer_targets(&ctx).await?;
    Ok(Json(to_responses(users)))
}

pub async fn set_active(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(user_id): Path<String>,
    Json(body): Json<SetActiveRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .engine
        .users
        .set_active(&ctx, parse_id("user_id", &user_id)?, body.active)
        .await?;
    Ok(Json(to_response(user)))
}
