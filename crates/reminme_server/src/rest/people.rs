//! People, memories, follow-ups and events.

use crate::auth::AuthUser;
use crate::error::{done, envelope, ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::rest::{index_memory, retag_person, tags_for, today, unindex_memories};
use crate::state::AppState;
use axum::extract::State;
use axum::routing::{get, patch, put};
use axum::{Extension, Json, Router};
use reminme_core::model::person::{EventDraft, FollowUpDraft, FollowUpPatch, PersonDraft};
use reminme_core::{
    ContentDraft, EventQuery, FollowUpQuery, PeopleQuery, PeopleService, RecordId,
    SqlitePeopleRepository,
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_SEARCH_LIMIT: u32 = 10;
const MAX_SEARCH_LIMIT: u32 = 50;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/people", get(list_people).post(create_person))
        .route(
            "/api/people/:id",
            get(get_person).put(update_person).delete(delete_person),
        )
        .route(
            "/api/people/:id/memories",
            get(list_person_memories).post(create_person_memory),
        )
        .route("/api/memories", get(list_memories))
        .route("/api/memories/search", get(search_memories))
        .route("/api/memories/:id", put(update_memory).delete(delete_memory))
        .route("/api/follow-ups", get(list_follow_ups).post(create_follow_up))
        .route(
            "/api/follow-ups/:id",
            patch(patch_follow_up).delete(delete_follow_up),
        )
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/upcoming", get(upcoming_events))
        .route("/api/events/:id", put(update_event).delete(delete_event))
}

fn service(conn: &Connection) -> ApiResult<PeopleService<SqlitePeopleRepository<'_>>> {
    Ok(PeopleService::new(SqlitePeopleRepository::try_new(conn)?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListPeopleParams {
    pub q: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LimitParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub q: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FollowUpParams {
    pub person_id: Option<RecordId>,
    pub completed: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EventParams {
    pub person_id: Option<RecordId>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpcomingParams {
    pub days: Option<u32>,
}

/// GET /api/people
async fn list_people(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<ListPeopleParams>,
) -> ApiResult<Json<Value>> {
    let query = PeopleQuery {
        name_contains: params.q.filter(|value| !value.trim().is_empty()),
        limit: params.limit,
    };
    let people = state.with_conn(|conn| Ok(service(conn)?.list_people(owner, &query)?))?;
    envelope("people", people)
}

/// POST /api/people
async fn create_person(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiJson(draft): ApiJson<PersonDraft>,
) -> ApiResult<Json<Value>> {
    let mut person = state.with_conn(|conn| Ok(service(conn)?.create_person(owner, draft)?))?;
    retag_person(&state, owner, &mut person).await;
    envelope("person", person)
}

/// GET /api/people/:id
async fn get_person(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    let detail = state.with_conn(|conn| Ok(service(conn)?.get_person_detail(owner, id)?))?;
    envelope("person", detail)
}

/// PUT /api/people/:id
async fn update_person(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<PersonDraft>,
) -> ApiResult<Json<Value>> {
    let mut person =
        state.with_conn(|conn| Ok(service(conn)?.update_person(owner, id, draft)?))?;
    retag_person(&state, owner, &mut person).await;
    envelope("person", person)
}

/// DELETE /api/people/:id
async fn delete_person(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    let memory_ids = state.with_conn(|conn| Ok(service(conn)?.delete_person(owner, id)?))?;
    unindex_memories(&state, owner, &memory_ids).await;
    Ok(done())
}

/// GET /api/people/:id/memories
async fn list_person_memories(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiQuery(params): ApiQuery<LimitParams>,
) -> ApiResult<Json<Value>> {
    let memories = state.with_conn(|conn| {
        Ok(service(conn)?.list_memories(owner, Some(id), params.limit)?)
    })?;
    envelope("memories", memories)
}

/// POST /api/people/:id/memories
async fn create_person_memory(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(person_id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<ContentDraft>,
) -> ApiResult<Json<Value>> {
    let draft = draft.cleaned()?;
    let person = state.with_conn(|conn| Ok(service(conn)?.get_person(owner, person_id)?))?;
    let tags = tags_for(&state, &draft.content, Some(&person.name)).await;

    let memory = state.with_conn(|conn| {
        Ok(service(conn)?.create_memory(owner, Some(person_id), draft, tags)?)
    })?;
    index_memory(&state, owner, &memory).await;
    envelope("memory", memory)
}

/// GET /api/memories
async fn list_memories(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<LimitParams>,
) -> ApiResult<Json<Value>> {
    let memories =
        state.with_conn(|conn| Ok(service(conn)?.list_memories(owner, None, params.limit)?))?;
    envelope("memories", memories)
}

/// GET /api/memories/search?q=&limit=
///
/// Results keep the index's match order. Ids the index returns for deleted
/// or foreign rows are skipped.
async fn search_memories(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<Json<Value>> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("`q` is required"));
    }
    let top_k = match params.limit {
        None | Some(0) => DEFAULT_SEARCH_LIMIT,
        Some(value) => value.min(MAX_SEARCH_LIMIT),
    };

    let matches = state
        .vector()
        .query(&owner.to_string(), query, top_k)
        .await
        .map_err(|err| ApiError::Upstream(err.to_string()))?;
    let ids: Vec<RecordId> = matches
        .iter()
        .filter_map(|hit| Uuid::parse_str(&hit.id).ok())
        .collect();

    let memories = state.with_conn(|conn| Ok(service(conn)?.get_memories_by_ids(owner, &ids)?))?;
    envelope("memories", memories)
}

/// PUT /api/memories/:id
async fn update_memory(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<ContentDraft>,
) -> ApiResult<Json<Value>> {
    let draft = draft.cleaned()?;
    let subject = state.with_conn(|conn| {
        let service = service(conn)?;
        let memory = service.get_memory(owner, id)?;
        Ok(match memory.person_id {
            Some(person_id) => service.get_person(owner, person_id).ok().map(|p| p.name),
            None => None,
        })
    })?;
    let tags = tags_for(&state, &draft.content, subject.as_deref()).await;

    let memory =
        state.with_conn(|conn| Ok(service(conn)?.update_memory(owner, id, draft, tags)?))?;
    index_memory(&state, owner, &memory).await;
    envelope("memory", memory)
}

/// DELETE /api/memories/:id
async fn delete_memory(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_memory(owner, id)?))?;
    unindex_memories(&state, owner, &[id]).await;
    Ok(done())
}

/// GET /api/follow-ups
async fn list_follow_ups(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<FollowUpParams>,
) -> ApiResult<Json<Value>> {
    let query = FollowUpQuery {
        person_id: params.person_id,
        completed: params.completed,
    };
    let follow_ups = state.with_conn(|conn| Ok(service(conn)?.list_follow_ups(owner, &query)?))?;
    envelope("follow_ups", follow_ups)
}

/// POST /api/follow-ups
async fn create_follow_up(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiJson(draft): ApiJson<FollowUpDraft>,
) -> ApiResult<Json<Value>> {
    let follow_up = state.with_conn(|conn| Ok(service(conn)?.create_follow_up(owner, draft)?))?;
    envelope("follow_up", follow_up)
}

/// PATCH /api/follow-ups/:id
async fn patch_follow_up(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(patch): ApiJson<FollowUpPatch>,
) -> ApiResult<Json<Value>> {
    let follow_up =
        state.with_conn(|conn| Ok(service(conn)?.patch_follow_up(owner, id, patch)?))?;
    envelope("follow_up", follow_up)
}

/// DELETE /api/follow-ups/:id
async fn delete_follow_up(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_follow_up(owner, id)?))?;
    Ok(done())
}

/// GET /api/events
async fn list_events(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<EventParams>,
) -> ApiResult<Json<Value>> {
    let query = EventQuery {
        person_id: params.person_id,
        from: params.from,
        to: params.to,
    };
    let events = state.with_conn(|conn| Ok(service(conn)?.list_events(owner, &query)?))?;
    envelope("events", events)
}

/// GET /api/events/upcoming?days=
async fn upcoming_events(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<UpcomingParams>,
) -> ApiResult<Json<Value>> {
    let today = today();
    let events =
        state.with_conn(|conn| Ok(service(conn)?.upcoming_events(owner, today, params.days)?))?;
    envelope("events", events)
}

/// POST /api/events
async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiJson(draft): ApiJson<EventDraft>,
) -> ApiResult<Json<Value>> {
    let event = state.with_conn(|conn| Ok(service(conn)?.create_event(owner, draft)?))?;
    envelope("event", event)
}

/// PUT /api/events/:id
async fn update_event(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<EventDraft>,
) -> ApiResult<Json<Value>> {
    let event = state.with_conn(|conn| Ok(service(conn)?.update_event(owner, id, draft)?))?;
    envelope("event", event)
}

/// DELETE /api/events/:id
async fn delete_event(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_event(owner, id)?))?;
    Ok(done())
}
