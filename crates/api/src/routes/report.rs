use axum::{
    Json,
    extract::{Query, State},
};
use leadflow_services::reporting::{CallReport, LeadStatistics, ReportFilter, StaffReport};

use super::ListParams;
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

fn filter(params: &ListParams) -> Result<ReportFilter, ApiError> {
    Ok(ReportFilter {
        scope: params.scope()?,
        range: params.range()?,
    })
}

pub async fn staff(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<StaffReport>, ApiError> {
    let report = state
        .engine
        .reports
        .staff_report(&ctx, &filter(&params)?)
        .await?;
    Ok(Json(report))
}

pub async fn calls(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<CallReport>, ApiError> {
    let report = state
        .engine
        .reports
        .call_report(&ctx, &filter(&params)?)
        .await?;
    Ok(Json(report))
}

pub async fn leads(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<LeadStatistics>, ApiError> {
    let stats = state
        .engine
        .reports
        .lead_statistics(&ctx, &filter(&params)?)
        .await?;
    Ok(Json(stats))
}
