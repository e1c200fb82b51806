//! Generated research results and conversation strategies.
//!
//! # Responsibility
//! - Gather owner context under the connection lock, release it, run the
//!   generation chain, then persist the outcome in one transaction.
//!
//! # Invariants
//! - A chat or search provider failure aborts before anything is stored.
//! - Context is limited to 5 meetings, 10 memories and 10 people.

use crate::auth::AuthUser;
use crate::error::{done, envelope, ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::state::AppState;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use reminme_ai::{generate_research, generate_strategy, Citation, ResearchRequest, StrategyRequest};
use reminme_core::model::meeting::MeetingDetail;
use reminme_core::model::strategy::{
    Citation as StoredCitation, NewConversationStep, NewConversationStrategy, NewResearchResult,
    ResearchKind, ResearchSuggestion,
};
use reminme_core::service::strategy_service::{describe_memory, describe_person, StrategyContext};
use reminme_core::{
    BusinessService, MeetingQuery, MeetingService, PeopleQuery, PeopleService, RecordId,
    ResearchQuery, SqliteBusinessRepository, SqliteMeetingRepository, SqlitePeopleRepository,
    SqliteStrategyRepository, StrategyService, UserId,
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const CONTEXT_MEETINGS: usize = 5;
const CONTEXT_MEMORIES: u32 = 10;
const CONTEXT_PEOPLE: u32 = 10;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/research", get(list_research).post(create_research))
        .route("/api/research/:id", get(get_research).delete(delete_research))
        .route("/api/strategies", get(list_strategies))
        .route("/api/strategies/generate", post(create_strategy))
        .route(
            "/api/strategies/:id",
            get(get_strategy).delete(delete_strategy),
        )
}

fn service(conn: &Connection) -> ApiResult<StrategyService<SqliteStrategyRepository<'_>>> {
    Ok(StrategyService::new(SqliteStrategyRepository::try_new(conn)?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResearchParams {
    pub business_id: Option<RecordId>,
    pub kind: Option<ResearchKind>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResearchRequestBody {
    pub subject: String,
    pub kind: ResearchKind,
    pub business_id: Option<RecordId>,
    pub context: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StrategyRequestBody {
    pub situation: String,
    pub goal: String,
    pub person_id: Option<RecordId>,
    pub include_meetings: bool,
    pub include_notes: bool,
    pub include_people: bool,
}

fn stored_citations(citations: Vec<Citation>) -> Vec<StoredCitation> {
    citations
        .into_iter()
        .map(|citation| StoredCitation {
            title: citation.title,
            url: citation.url,
        })
        .collect()
}

/// GET /api/research
async fn list_research(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<ResearchParams>,
) -> ApiResult<Json<Value>> {
    let query = ResearchQuery {
        business_id: params.business_id,
        kind: params.kind,
    };
    let results = state.with_conn(|conn| Ok(service(conn)?.list_research(owner, &query)?))?;
    envelope("results", results)
}

/// POST /api/research
async fn create_research(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiJson(body): ApiJson<ResearchRequestBody>,
) -> ApiResult<Json<Value>> {
    let subject = body.subject.trim().to_string();
    if subject.is_empty() {
        return Err(ApiError::bad_request("`subject` is required"));
    }
    if let Some(business_id) = body.business_id {
        state.with_conn(|conn| {
            let businesses = BusinessService::new(SqliteBusinessRepository::try_new(conn)?);
            businesses.get_business(owner, business_id)?;
            Ok(())
        })?;
    }

    let request = ResearchRequest {
        subject: &subject,
        kind: body.kind.as_str(),
        context: body.context.as_deref(),
    };
    let outcome = generate_research(state.chat(), state.search(), &request).await?;

    let record = NewResearchResult {
        business_id: body.business_id,
        kind: body.kind,
        subject: subject.clone(),
        query: outcome.query,
        summary: outcome.summary,
        suggestions: outcome
            .suggestions
            .into_iter()
            .map(|suggestion| ResearchSuggestion {
                name: suggestion.name,
                category: suggestion.category,
                rationale: suggestion.rationale,
            })
            .collect(),
        citations: stored_citations(outcome.citations),
    };
    let result = state.with_conn(|conn| Ok(service(conn)?.record_research(owner, record)?))?;
    envelope("result", result)
}

/// GET /api/research/:id
async fn get_research(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    let result = state.with_conn(|conn| Ok(service(conn)?.get_research(owner, id)?))?;
    envelope("result", result)
}

/// DELETE /api/research/:id
async fn delete_research(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_research(owner, id)?))?;
    Ok(done())
}

/// GET /api/strategies
async fn list_strategies(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
) -> ApiResult<Json<Value>> {
    let strategies = state.with_conn(|conn| Ok(service(conn)?.list_strategies(owner)?))?;
    envelope("strategies", strategies)
}

/// POST /api/strategies/generate
async fn create_strategy(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiJson(body): ApiJson<StrategyRequestBody>,
) -> ApiResult<Json<Value>> {
    if body.situation.trim().is_empty() {
        return Err(ApiError::bad_request("`situation` is required"));
    }
    if body.goal.trim().is_empty() {
        return Err(ApiError::bad_request("`goal` is required"));
    }

    let (person, context) = state.with_conn(|conn| collect_context(conn, owner, &body))?;
    let request = StrategyRequest {
        situation: body.situation.trim(),
        goal: body.goal.trim(),
        person: person.as_deref(),
        meetings: &context.meetings,
        memories: &context.memories,
        people: &context.people,
    };
    let generated = generate_strategy(state.chat(), state.search(), &request).await?;

    let record = NewConversationStrategy {
        person_id: body.person_id,
        situation: body.situation.trim().to_string(),
        goal: body.goal.trim().to_string(),
        summary: generated.summary,
        citations: stored_citations(generated.citations),
        steps: generated
            .steps
            .into_iter()
            .map(|step| NewConversationStep {
                title: step.title.trim().to_string(),
                description: step.description,
                sample_phrase: step.sample_phrase,
            })
            .collect(),
    };
    let strategy = state.with_conn(|conn| Ok(service(conn)?.record_strategy(owner, record)?))?;
    envelope("strategy", strategy)
}

/// Reads the counterpart description and the enabled context sources.
fn collect_context(
    conn: &Connection,
    owner: UserId,
    body: &StrategyRequestBody,
) -> ApiResult<(Option<String>, StrategyContext)> {
    let people = PeopleService::new(SqlitePeopleRepository::try_new(conn)?);
    let person = match body.person_id {
        Some(id) => Some(describe_person(&people.get_person(owner, id)?)),
        None => None,
    };

    let mut context = StrategyContext::default();
    if body.include_meetings {
        let meetings = MeetingService::new(SqliteMeetingRepository::try_new(conn)?);
        for meeting in meetings
            .list_meetings(owner, &MeetingQuery::default())?
            .into_iter()
            .take(CONTEXT_MEETINGS)
        {
            let detail = meetings.get_meeting(owner, meeting.id)?;
            context.meetings.push(describe_meeting(&detail));
        }
    }
    if body.include_notes {
        context.memories = people
            .list_memories(owner, body.person_id, Some(CONTEXT_MEMORIES))?
            .iter()
            .map(describe_memory)
            .collect();
    }
    if body.include_people {
        let query = PeopleQuery {
            name_contains: None,
            limit: Some(CONTEXT_PEOPLE),
        };
        context.people = people
            .list_people(owner, &query)?
            .iter()
            .map(describe_person)
            .collect();
    }
    Ok((person, context))
}

fn describe_meeting(detail: &MeetingDetail) -> String {
    let mut line = detail.meeting.title.clone();
    if let Some(purpose) = detail.meeting.purpose.as_deref() {
        line.push_str(&format!(": {purpose}"));
    }
    if !detail.notes.is_empty() {
        let notes: Vec<&str> = detail.notes.iter().map(|note| note.content.as_str()).collect();
        line.push_str(&format!(" (notes: {})", notes.join("; ")));
    }
    line
}

/// GET /api/strategies/:id
async fn get_strategy(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    let strategy = state.with_conn(|conn| Ok(service(conn)?.get_strategy(owner, id)?))?;
    envelope("strategy", strategy)
}

/// DELETE /api/strategies/:id
async fn delete_strategy(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_strategy(owner, id)?))?;
    Ok(done())
}
