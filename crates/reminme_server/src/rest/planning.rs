//! Habits and project tasks.

use crate::auth::AuthUser;
use crate::error::{done, envelope, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::rest::today;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::{get, patch, post, put};
use axum::{Extension, Json, Router};
use reminme_ai::breakdown_task;
use reminme_core::model::planning::{HabitDraft, SubtaskDraft, TaskDraft, TaskPatch, TaskStatus};
use reminme_core::{PlanningService, RecordId, SqlitePlanningRepository, TaskQuery};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/habits", get(list_habits).post(create_habit))
        .route("/api/habits/:id", put(update_habit).delete(delete_habit))
        .route(
            "/api/habits/:id/checks",
            get(list_habit_checks).post(toggle_habit_check),
        )
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/projects", get(list_projects))
        .route("/api/tasks/:id", patch(patch_task).delete(delete_task))
        .route("/api/tasks/:id/breakdown", post(breakdown))
}

fn service(conn: &Connection) -> ApiResult<PlanningService<SqlitePlanningRepository<'_>>> {
    Ok(PlanningService::new(SqlitePlanningRepository::try_new(conn)?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HabitParams {
    pub include_archived: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckToggleRequest {
    /// `YYYY-MM-DD`; today when absent.
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckRangeParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TaskParams {
    pub project: Option<String>,
    pub status: Option<TaskStatus>,
    pub parent_task_id: Option<RecordId>,
}

/// GET /api/habits
async fn list_habits(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<HabitParams>,
) -> ApiResult<Json<Value>> {
    let today = today();
    let habits = state.with_conn(|conn| {
        Ok(service(conn)?.list_habit_progress(owner, today, params.include_archived)?)
    })?;
    envelope("habits", habits)
}

/// POST /api/habits
async fn create_habit(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiJson(draft): ApiJson<HabitDraft>,
) -> ApiResult<Json<Value>> {
    let habit = state.with_conn(|conn| Ok(service(conn)?.create_habit(owner, draft)?))?;
    envelope("habit", habit)
}

/// PUT /api/habits/:id
///
/// Also carries the archive flag.
async fn update_habit(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<HabitDraft>,
) -> ApiResult<Json<Value>> {
    let habit = state.with_conn(|conn| Ok(service(conn)?.update_habit(owner, id, draft)?))?;
    envelope("habit", habit)
}

/// DELETE /api/habits/:id
async fn delete_habit(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_habit(owner, id)?))?;
    Ok(done())
}

/// POST /api/habits/:id/checks
async fn toggle_habit_check(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    request: Option<ApiJson<CheckToggleRequest>>,
) -> ApiResult<Json<Value>> {
    let date = request.and_then(|ApiJson(request)| request.date);
    let today = today();
    let check = state.with_conn(|conn| {
        Ok(service(conn)?.toggle_check(owner, id, date.as_deref(), today)?)
    })?;
    envelope("check", check)
}

/// GET /api/habits/:id/checks?from=&to=
async fn list_habit_checks(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiQuery(params): ApiQuery<CheckRangeParams>,
) -> ApiResult<Json<Value>> {
    let checks = state.with_conn(|conn| {
        Ok(service(conn)?.list_checks(owner, id, params.from.as_deref(), params.to.as_deref())?)
    })?;
    envelope("checks", checks)
}

/// GET /api/tasks
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<TaskParams>,
) -> ApiResult<Json<Value>> {
    let query = TaskQuery {
        project: params.project.filter(|value| !value.trim().is_empty()),
        status: params.status,
        parent_task_id: params.parent_task_id,
    };
    let tasks = state.with_conn(|conn| Ok(service(conn)?.list_tasks(owner, &query)?))?;
    envelope("tasks", tasks)
}

/// GET /api/tasks/projects
async fn list_projects(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
) -> ApiResult<Json<Value>> {
    let projects = state.with_conn(|conn| Ok(service(conn)?.list_projects(owner)?))?;
    envelope("projects", projects)
}

/// POST /api/tasks
async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiJson(draft): ApiJson<TaskDraft>,
) -> ApiResult<Json<Value>> {
    let task = state.with_conn(|conn| Ok(service(conn)?.create_task(owner, draft)?))?;
    envelope("task", task)
}

/// PATCH /api/tasks/:id
async fn patch_task(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> ApiResult<Json<Value>> {
    let task = state.with_conn(|conn| Ok(service(conn)?.patch_task(owner, id, patch)?))?;
    envelope("task", task)
}

/// DELETE /api/tasks/:id
///
/// Removes subtasks recursively; `deleted` counts every removed row.
async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    let deleted = state.with_conn(|conn| Ok(service(conn)?.delete_task(owner, id)?))?;
    envelope("deleted", deleted)
}

/// POST /api/tasks/:id/breakdown
async fn breakdown(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    let task = state.with_conn(|conn| Ok(service(conn)?.get_task(owner, id)?))?;
    let generated = breakdown_task(
        state.chat(),
        &task.project,
        &task.title,
        task.description.as_deref(),
    )
    .await?;

    let subtasks = generated
        .into_iter()
        .map(|subtask| SubtaskDraft {
            title: subtask.title,
            description: subtask.description,
        })
        .collect();
    let tasks = state.with_conn(|conn| Ok(service(conn)?.add_subtasks(owner, id, subtasks)?))?;
    envelope("tasks", tasks)
}
