use axum::{
    Json,
    extract::{Query, State},
};
use leadflow_services::target::{SetTargetInput, TargetStats, TargetStatsFilter};
use leadflow_services::time::month_key_from_ist;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{parse_id, parse_opt_id};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct SetTargetRequest {
    pub assigned: String,
    /// Any IST millis inside the target month.
    pub month: i64,
    #[validate(range(min = 0, message = "Target must not be negative"))]
    pub total: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub month: Option<i64>,
    pub manager: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TargetResponse {
    pub id: String,
    pub assigned: String,
    pub month: i64,
    pub total: i64,
    pub achieved: i64,
}

pub async fn set(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Json(body): Json<SetTargetRequest>,
) -> Result<Json<TargetResponse>, ApiError> {
    body.validate()?;
    let input = SetTargetInput {
        assigned: parse_id("assigned", &body.assigned)?,
        month: month_key_from_ist("month", body.month)?,
        total: body.total,
    };
    let target = state.engine.targets.set_target(&ctx, input).await?;
    Ok(Json(TargetResponse {
        id: target.id.map(|id| id.to_hex()).unwrap_or_default(),
        assigned: target.assigned.to_hex(),
        month: target.month.timestamp_millis(),
        total: target.total,
        achieved: target.achieved,
    }))
}

pub async fn stats(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<TargetStats>, ApiError> {
    let filter = TargetStatsFilter {
        month: query
            .month
            .map(|m| month_key_from_ist("month", m))
            .transpose()?,
        manager: parse_opt_id("manager", query.manager.as_deref())?,
    };
    Ok(Json(state.engine.targets.stats(&ctx, filter).await?))
}
