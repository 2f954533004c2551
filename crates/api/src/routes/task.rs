use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use leadflow_db::models::{CallStatus, EnquireSource, EnquireStatus, Purpose, TaskCategory};
use leadflow_services::dao::base::PaginatedResult;
use leadflow_services::task::{CompleteTaskInput, CreateTaskInput, TaskFilter, TodayTaskStats};
use leadflow_services::time::ist_to_utc;
use leadflow_services::views::{LeadView, TaskView};
use serde::{Deserialize, Serialize};

use super::{ListParams, ist_millis, parse_id, parse_opt_id, replace_items};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub lead: String,
    pub assigned: Option<String>,
    pub category: TaskCategory,
    /// IST millis.
    pub due: i64,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteTaskRequest {
    pub enquire_status: Option<EnquireStatus>,
    pub source: Option<EnquireSource>,
    pub purpose: Option<Purpose>,
    pub call_status: Option<CallStatus>,
    pub note: Option<String>,
    /// IST millis of the follow-up task's due time.
    pub follow_up: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub lead: Option<String>,
    pub assigned: Option<String>,
    pub category: Option<TaskCategory>,
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub task: TaskView,
    pub lead: Option<LeadView>,
    pub follow_up: Option<TaskView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

async fn task_view(state: &AppState, task: &leadflow_db::models::Task) -> Result<TaskView, ApiError> {
    state
        .engine
        .views
        .tasks(std::slice::from_ref(task))
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal("task view missing".to_string()))
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Json(body): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskView>), ApiError> {
    let input = CreateTaskInput {
        lead: parse_id("lead", &body.lead)?,
        assigned: parse_opt_id("assigned", body.assigned.as_deref())?,
        category: body.category,
        due: ist_to_utc("due", body.due)?,
        title: body.title,
        description: body.description,
    };
    let task = state.engine.tasks.create_task(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(task_view(&state, &task).await?)))
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Query(params): Query<ListParams>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<PaginatedResult<TaskView>>, ApiError> {
    let filter = TaskFilter {
        scope: params.scope()?,
        lead: parse_opt_id("lead", query.lead.as_deref())?,
        assigned: parse_opt_id("assigned", query.assigned.as_deref())?,
        category: query.category,
        completed: query.completed,
        due: params.range()?,
    };
    let page = state
        .engine
        .tasks
        .list(&ctx, &filter, &params.pagination())
        .await?;
    let views = state.engine.views.tasks(&page.items).await?;
    Ok(Json(replace_items(page, views)))
}

pub async fn today(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<TodayTaskStats>, ApiError> {
    Ok(Json(state.engine.tasks.today_stats(&ctx).await?))
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<TaskView>, ApiError> {
    let task = state
        .engine
        .tasks
        .get(&ctx, parse_id("task_id", &task_id)?)
        .await?;
    Ok(Json(task_view(&state, &task).await?))
}

pub async fn complete(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(task_id): Path<String>,
    Json(body): Json<CompleteTaskRequest>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let input = CompleteTaskInput {
        enquire_status: body.enquire_status,
        source: body.source,
        purpose: body.purpose,
        call_status: body.call_status,
        note: body.note,
        follow_up: ist_millis("follow_up", body.follow_up)?,
    };
    let outcome = state
        .engine
        .complete_task(&ctx, parse_id("task_id", &task_id)?, input)
        .await?;

    let lead = match &outcome.lead {
        Some(lead) => Some(state.engine.views.lead(lead).await?),
        None => None,
    };
    let follow_up = match &outcome.follow_up {
        Some(task) => Some(task_view(&state, task).await?),
        None => None,
    };
    Ok(Json(CompletionResponse {
        task: task_view(&state, &outcome.task).await?,
        lead,
        follow_up,
        warning: outcome.warning,
    }))
}
