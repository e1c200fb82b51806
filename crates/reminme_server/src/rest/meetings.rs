//! Meetings, their child records and context cards.
//!
//! Child routes are nested under the meeting so ownership is checked through
//! the parent on every call.

use crate::auth::AuthUser;
use crate::error::{done, envelope, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::rest::tags_for;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::{get, patch, post, put};
use axum::{Extension, Json, Router};
use log::info;
use reminme_ai::generate_questions;
use reminme_core::model::meeting::{
    AgendaItemPatch, AttendeeDraft, AttendeePatch, ContextCardDraft, MeetingDraft,
    MeetingFollowUpDraft, MeetingFollowUpPatch, MeetingStatus, QuestionDraft, QuestionPatch,
};
use reminme_core::service::meeting_service::meeting_brief;
use reminme_core::{
    ContentDraft, ContextCardQuery, MeetingQuery, MeetingService, RecordId,
    SqliteMeetingRepository,
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/meetings", get(list_meetings).post(create_meeting))
        .route(
            "/api/meetings/:id",
            get(get_meeting).put(update_meeting).delete(delete_meeting),
        )
        .route("/api/meetings/:id/attendees", post(add_attendee))
        .route(
            "/api/meetings/:id/attendees/:child_id",
            patch(patch_attendee).delete(delete_attendee),
        )
        .route("/api/meetings/:id/agenda", post(add_agenda_item))
        .route(
            "/api/meetings/:id/agenda/:child_id",
            patch(patch_agenda_item).delete(delete_agenda_item),
        )
        .route("/api/meetings/:id/notes", post(add_note))
        .route(
            "/api/meetings/:id/notes/:child_id",
            patch(update_note).delete(delete_note),
        )
        .route("/api/meetings/:id/questions", post(add_question))
        .route(
            "/api/meetings/:id/questions/generate",
            post(generate_meeting_questions),
        )
        .route(
            "/api/meetings/:id/questions/:child_id",
            patch(patch_question).delete(delete_question),
        )
        .route("/api/meetings/:id/followups", post(add_follow_up))
        .route(
            "/api/meetings/:id/followups/:child_id",
            patch(patch_follow_up).delete(delete_follow_up),
        )
        .route(
            "/api/context-cards",
            get(list_context_cards).post(create_context_card),
        )
        .route(
            "/api/context-cards/:id",
            put(update_context_card).delete(delete_context_card),
        )
}

fn service(conn: &Connection) -> ApiResult<MeetingService<SqliteMeetingRepository<'_>>> {
    Ok(MeetingService::new(SqliteMeetingRepository::try_new(conn)?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MeetingParams {
    pub business_id: Option<RecordId>,
    pub status: Option<MeetingStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContextCardParams {
    pub meeting_id: Option<RecordId>,
    pub person_id: Option<RecordId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AgendaItemRequest {
    pub item: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateQuestionsRequest {
    pub count: Option<u32>,
}

/// GET /api/meetings
async fn list_meetings(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<MeetingParams>,
) -> ApiResult<Json<Value>> {
    let query = MeetingQuery {
        business_id: params.business_id,
        status: params.status,
    };
    let meetings = state.with_conn(|conn| Ok(service(conn)?.list_meetings(owner, &query)?))?;
    envelope("meetings", meetings)
}

/// POST /api/meetings
async fn create_meeting(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiJson(draft): ApiJson<MeetingDraft>,
) -> ApiResult<Json<Value>> {
    let detail = state.with_conn(|conn| {
        let service = service(conn)?;
        let meeting = service.create_meeting(owner, draft)?;
        Ok(service.get_meeting(owner, meeting.id)?)
    })?;
    envelope("meeting", detail)
}

/// GET /api/meetings/:id
async fn get_meeting(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    let detail = state.with_conn(|conn| Ok(service(conn)?.get_meeting(owner, id)?))?;
    envelope("meeting", detail)
}

/// PUT /api/meetings/:id
async fn update_meeting(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<MeetingDraft>,
) -> ApiResult<Json<Value>> {
    let meeting = state.with_conn(|conn| Ok(service(conn)?.update_meeting(owner, id, draft)?))?;
    envelope("meeting", meeting)
}

/// DELETE /api/meetings/:id
async fn delete_meeting(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_meeting(owner, id)?))?;
    Ok(done())
}

/// POST /api/meetings/:id/attendees
async fn add_attendee(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<AttendeeDraft>,
) -> ApiResult<Json<Value>> {
    let attendee = state.with_conn(|conn| Ok(service(conn)?.add_attendee(owner, id, draft)?))?;
    envelope("attendee", attendee)
}

/// PATCH /api/meetings/:id/attendees/:child_id
async fn patch_attendee(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath((id, child_id)): ApiPath<(RecordId, RecordId)>,
    ApiJson(patch): ApiJson<AttendeePatch>,
) -> ApiResult<Json<Value>> {
    let attendee = state.with_conn(|conn| {
        Ok(service(conn)?.patch_attendee(owner, id, child_id, patch)?)
    })?;
    envelope("attendee", attendee)
}

/// DELETE /api/meetings/:id/attendees/:child_id
async fn delete_attendee(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath((id, child_id)): ApiPath<(RecordId, RecordId)>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_attendee(owner, id, child_id)?))?;
    Ok(done())
}

/// POST /api/meetings/:id/agenda
async fn add_agenda_item(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(request): ApiJson<AgendaItemRequest>,
) -> ApiResult<Json<Value>> {
    let item =
        state.with_conn(|conn| Ok(service(conn)?.add_agenda_item(owner, id, &request.item)?))?;
    envelope("agenda_item", item)
}

/// PATCH /api/meetings/:id/agenda/:child_id
async fn patch_agenda_item(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath((id, child_id)): ApiPath<(RecordId, RecordId)>,
    ApiJson(patch): ApiJson<AgendaItemPatch>,
) -> ApiResult<Json<Value>> {
    let item = state.with_conn(|conn| {
        Ok(service(conn)?.patch_agenda_item(owner, id, child_id, patch)?)
    })?;
    envelope("agenda_item", item)
}

/// DELETE /api/meetings/:id/agenda/:child_id
async fn delete_agenda_item(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath((id, child_id)): ApiPath<(RecordId, RecordId)>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_agenda_item(owner, id, child_id)?))?;
    Ok(done())
}

/// POST /api/meetings/:id/notes
async fn add_note(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<ContentDraft>,
) -> ApiResult<Json<Value>> {
    let draft = draft.cleaned()?;
    let detail = state.with_conn(|conn| Ok(service(conn)?.get_meeting(owner, id)?))?;
    let tags = tags_for(&state, &draft.content, Some(&detail.meeting.title)).await;

    let note = state.with_conn(|conn| Ok(service(conn)?.add_note(owner, id, draft, tags)?))?;
    envelope("note", note)
}

/// PATCH /api/meetings/:id/notes/:child_id
async fn update_note(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath((id, child_id)): ApiPath<(RecordId, RecordId)>,
    ApiJson(draft): ApiJson<ContentDraft>,
) -> ApiResult<Json<Value>> {
    let draft = draft.cleaned()?;
    let detail = state.with_conn(|conn| Ok(service(conn)?.get_meeting(owner, id)?))?;
    let tags = tags_for(&state, &draft.content, Some(&detail.meeting.title)).await;

    let note = state.with_conn(|conn| {
        Ok(service(conn)?.update_note(owner, id, child_id, draft, tags)?)
    })?;
    envelope("note", note)
}

/// DELETE /api/meetings/:id/notes/:child_id
async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath((id, child_id)): ApiPath<(RecordId, RecordId)>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_note(owner, id, child_id)?))?;
    Ok(done())
}

/// POST /api/meetings/:id/questions
async fn add_question(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<QuestionDraft>,
) -> ApiResult<Json<Value>> {
    let question = state.with_conn(|conn| Ok(service(conn)?.add_question(owner, id, draft)?))?;
    envelope("question", question)
}

/// POST /api/meetings/:id/questions/generate
///
/// The body is optional; `{"count": n}` overrides the default count.
async fn generate_meeting_questions(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    request: Option<ApiJson<GenerateQuestionsRequest>>,
) -> ApiResult<Json<Value>> {
    let count = request.and_then(|ApiJson(request)| request.count);
    let brief = state.with_conn(|conn| {
        let detail = service(conn)?.get_meeting(owner, id)?;
        Ok(meeting_brief(&detail))
    })?;

    let generated = generate_questions(state.chat(), &brief, count).await?;
    let drafts = generated
        .into_iter()
        .map(|question| QuestionDraft {
            question: question.question,
            category: question.category,
        })
        .collect();

    let questions = state.with_conn(|conn| {
        Ok(service(conn)?.append_generated_questions(owner, id, drafts)?)
    })?;
    info!(
        "event=questions_generated module=server status=ok count={}",
        questions.len()
    );
    envelope("questions", questions)
}

/// PATCH /api/meetings/:id/questions/:child_id
async fn patch_question(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath((id, child_id)): ApiPath<(RecordId, RecordId)>,
    ApiJson(patch): ApiJson<QuestionPatch>,
) -> ApiResult<Json<Value>> {
    let question = state.with_conn(|conn| {
        Ok(service(conn)?.patch_question(owner, id, child_id, patch)?)
    })?;
    envelope("question", question)
}

/// DELETE /api/meetings/:id/questions/:child_id
async fn delete_question(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath((id, child_id)): ApiPath<(RecordId, RecordId)>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_question(owner, id, child_id)?))?;
    Ok(done())
}

/// POST /api/meetings/:id/followups
async fn add_follow_up(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<MeetingFollowUpDraft>,
) -> ApiResult<Json<Value>> {
    let follow_up =
        state.with_conn(|conn| Ok(service(conn)?.add_follow_up(owner, id, draft)?))?;
    envelope("follow_up", follow_up)
}

/// PATCH /api/meetings/:id/followups/:child_id
async fn patch_follow_up(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath((id, child_id)): ApiPath<(RecordId, RecordId)>,
    ApiJson(patch): ApiJson<MeetingFollowUpPatch>,
) -> ApiResult<Json<Value>> {
    let follow_up = state.with_conn(|conn| {
        Ok(service(conn)?.patch_follow_up(owner, id, child_id, patch)?)
    })?;
    envelope("follow_up", follow_up)
}

/// DELETE /api/meetings/:id/followups/:child_id
async fn delete_follow_up(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath((id, child_id)): ApiPath<(RecordId, RecordId)>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_follow_up(owner, id, child_id)?))?;
    Ok(done())
}

/// GET /api/context-cards
async fn list_context_cards(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<ContextCardParams>,
) -> ApiResult<Json<Value>> {
    let query = ContextCardQuery {
        meeting_id: params.meeting_id,
        person_id: params.person_id,
    };
    let cards = state.with_conn(|conn| Ok(service(conn)?.list_context_cards(owner, &query)?))?;
    envelope("cards", cards)
}

/// POST /api/context-cards
async fn create_context_card(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiJson(draft): ApiJson<ContextCardDraft>,
) -> ApiResult<Json<Value>> {
    let card = state.with_conn(|conn| Ok(service(conn)?.create_context_card(owner, draft)?))?;
    envelope("card", card)
}

/// PUT /api/context-cards/:id
async fn update_context_card(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<ContextCardDraft>,
) -> ApiResult<Json<Value>> {
    let card =
        state.with_conn(|conn| Ok(service(conn)?.update_context_card(owner, id, draft)?))?;
    envelope("card", card)
}

/// DELETE /api/context-cards/:id
async fn delete_context_card(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_context_card(owner, id)?))?;
    Ok(done())
}
