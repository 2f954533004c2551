use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use leadflow_db::models::{CallStatus, EnquireSource, EnquireStatus, LeadType, Purpose};
use leadflow_services::activity::ActivityFilter;
use leadflow_services::customer::CustomerData;
use leadflow_services::dao::base::PaginatedResult;
use leadflow_services::lead::{CreateLeadInput, CreationCounts, LeadFilter, StatusUpdate};
use leadflow_services::views::{ActivityView, LeadView};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{ListParams, ist_millis, parse_id, parse_list, parse_opt_id, replace_items};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLeadRequest {
    #[validate(length(min = 10, message = "Minimum 10 digits required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    pub address: Option<String>,
    /// IST millis.
    pub dob: Option<i64>,
    pub source: EnquireSource,
    pub enquire_status: Option<EnquireStatus>,
    pub purpose: Purpose,
    pub call_status: Option<CallStatus>,
    #[serde(rename = "type")]
    pub lead_type: LeadType,
    #[validate(length(min = 1, message = "Product is required"))]
    pub product: String,
    pub manager: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub enquire_status: Option<EnquireStatus>,
    pub source: Option<EnquireSource>,
    pub purpose: Option<Purpose>,
    pub call_status: Option<CallStatus>,
    pub transfer_to: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransferRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NoteRequest {
    #[validate(length(min = 1, message = "Note must not be empty"))]
    pub note: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeadListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub purpose: Option<String>,
    #[serde(rename = "type")]
    pub lead_type: Option<String>,
    #[serde(default)]
    pub spotlight: bool,
}

#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    #[serde(flatten)]
    pub page: PaginatedResult<LeadView>,
    pub counts: CreationCounts,
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Json(body): Json<CreateLeadRequest>,
) -> Result<(StatusCode, Json<LeadView>), ApiError> {
    body.validate()?;
    let input = CreateLeadInput {
        phone: body.phone,
        customer: CustomerData {
            name: body.name,
            email: body.email,
            address: body.address,
            dob: ist_millis("dob", body.dob)?,
        },
        source: body.source,
        enquire_status: body.enquire_status,
        purpose: body.purpose,
        call_status: body.call_status,
        lead_type: body.lead_type,
        product: body.product,
        manager: parse_opt_id("manager", body.manager.as_deref())?,
    };
    let lead = state.engine.leads.create(&ctx, input).await?;
    let view = state.engine.views.lead(&lead).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Query(params): Query<ListParams>,
    Query(query): Query<LeadListQuery>,
) -> Result<Json<LeadListResponse>, ApiError> {
    let filter = LeadFilter {
        scope: params.scope()?,
        search: query.search,
        statuses: parse_list("status", query.status.as_deref())?,
        sources: parse_list("source", query.source.as_deref())?,
        purposes: parse_list("purpose", query.purpose.as_deref())?,
        types: parse_list("type", query.lead_type.as_deref())?,
        created: params.range()?,
        spotlight: query.spotlight,
    };
    let result = state
        .engine
        .leads
        .list(&ctx, &filter, &params.pagination())
        .await?;
    let views = state.engine.views.leads(&result.leads.items).await?;
    Ok(Json(LeadListResponse {
        page: replace_items(result.leads, views),
        counts: result.counts,
    }))
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(lead_id): Path<String>,
) -> Result<Json<LeadView>, ApiError> {
    let lead_id = parse_id("lead_id", &lead_id)?;
    let lead = state.engine.leads.get(&ctx, lead_id).await?;
    Ok(Json(state.engine.views.lead(&lead).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(lead_id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<LeadView>, ApiError> {
    let lead_id = parse_id("lead_id", &lead_id)?;
    let update = StatusUpdate {
        enquire_status: body.enquire_status,
        source: body.source,
        purpose: body.purpose,
        call_status: body.call_status,
        transfer_to: body
            .transfer_to
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty()),
    };
    let lead = state.engine.leads.update_status(&ctx, lead_id, update).await?;
    Ok(Json(state.engine.views.lead(&lead).await?))
}

pub async fn transfer(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(lead_id): Path<String>,
    Json(body): Json<TransferRequest>,
) -> Result<Json<LeadView>, ApiError> {
    body.validate()?;
    let lead_id = parse_id("lead_id", &lead_id)?;
    let lead = state
        .engine
        .leads
        .transfer(&ctx, lead_id, body.username.trim())
        .await?;
    Ok(Json(state.engine.views.lead(&lead).await?))
}

pub async fn add_note(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(lead_id): Path<String>,
    Json(body): Json<NoteRequest>,
) -> Result<(StatusCode, Json<ActivityView>), ApiError> {
    body.validate()?;
    let lead_id = parse_id("lead_id", &lead_id)?;
    let activity = state.engine.leads.add_note(&ctx, lead_id, body.note).await?;
    let mut views = state.engine.views.activities(&[activity]).await?;
    let view = views
        .pop()
        .ok_or_else(|| ApiError::Internal("activity view missing".to_string()))?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn activity(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(lead_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResult<ActivityView>>, ApiError> {
    let filter = ActivityFilter {
        lead: Some(parse_id("lead_id", &lead_id)?),
        ..Default::default()
    };
    let page = state
        .engine
        .activity
        .query(&ctx, &filter, &params.pagination())
        .await?;
    let views = state.engine.views.activities(&page.items).await?;
    Ok(Json(replace_items(page, views)))
}
