use axum::{
    Json,
    extract::{Query, State},
};
use leadflow_services::activity::ActivityFilter;
use leadflow_services::dao::base::PaginatedResult;
use leadflow_services::views::ActivityView;
use serde::Deserialize;

use super::{ListParams, parse_list, parse_opt_id, replace_items};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ActivityListQuery {
    pub lead: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Query(params): Query<ListParams>,
    Query(query): Query<ActivityListQuery>,
) -> Result<Json<PaginatedResult<ActivityView>>, ApiError> {
    let filter = ActivityFilter {
        lead: parse_opt_id("lead", query.lead.as_deref())?,
        scope: params.scope()?,
        kinds: parse_list("type", query.kind.as_deref())?,
        created: params.range()?,
    };
    let page = state
        .engine
        .activity
        .query(&ctx, &filter, &params.pagination())
        .await?;
    let views = state.engine.views.activities(&page.items).await?;
    Ok(Json(replace_items(page, views)))
}
