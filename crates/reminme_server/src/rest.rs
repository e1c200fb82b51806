//! HTTP router and cross-route helpers.
//!
//! # Responsibility
//! - Assemble every `/api/...` route with auth, request logging and CORS.
//! - Host the best-effort side effects shared by several resources
//!   (AI tagging and vector index maintenance).
//!
//! # Invariants
//! - Best-effort side effects log failures at `warn` and never fail the
//!   request that triggered them.

pub mod ai;
pub mod businesses;
pub mod meetings;
pub mod people;
pub mod planning;
pub mod strategy;

use crate::auth::auth_middleware_with_state;
use crate::error::{envelope, ApiResult};
use crate::state::AppState;
use axum::extract::Request;
use axum::http::{HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use log::{info, warn};
use reminme_ai::{tag_text, AiTags};
use reminme_core::model::person::{Memory, Person};
use reminme_core::{PeopleService, RecordId, SqlitePeopleRepository, Tags, UserId};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;

pub fn create_router(state: Arc<AppState>) -> Router {
    create_router_with_cors(state, &[])
}

pub fn create_router_with_cors(state: Arc<AppState>, cors_allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .merge(people::routes())
        .merge(businesses::routes())
        .merge(meetings::routes())
        .merge(strategy::routes())
        .merge(planning::routes())
        .merge(ai::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware_with_state,
        ))
        .layer(middleware::from_fn(request_log_middleware))
        .layer(build_cors_layer(cors_allowed_origins))
        .with_state(state)
}

/// GET /api/health
async fn health() -> ApiResult<Json<Value>> {
    envelope("status", "ok")
}

async fn request_log_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    info!(
        "event=http_request module=server method={} path={} status={} duration_ms={}",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

fn build_cors_layer(cors_allowed_origins: &[String]) -> CorsLayer {
    let mut parsed = Vec::new();
    for origin in cors_allowed_origins {
        match HeaderValue::from_str(origin) {
            Ok(value) => parsed.push(value),
            Err(err) => warn!(
                "event=cors_origin_ignored module=server status=error origin={origin} error={err}"
            ),
        }
    }

    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_origin(parsed)
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Tags `text` with the chat provider. Empty when unconfigured or failing.
pub(crate) async fn tags_for(state: &AppState, text: &str, subject: Option<&str>) -> Tags {
    let AiTags {
        keywords,
        entities,
        industries,
    } = tag_text(state.chat(), text, subject).await;
    Tags {
        keywords,
        entities,
        industries,
    }
}

/// Re-derives a person's tags from their notes and stores them when changed.
///
/// Notes that were cleared clear the tags. A failed write keeps the stored
/// tags and leaves `person` untouched.
pub(crate) async fn retag_person(state: &AppState, owner: UserId, person: &mut Person) {
    let tags = match person.notes.as_deref() {
        Some(notes) => tags_for(state, notes, Some(&person.name)).await,
        None => Tags::default(),
    };
    if tags == person.tags {
        return;
    }

    let stored = tags.clone();
    let result = state.with_conn(|conn| {
        let service = PeopleService::new(SqlitePeopleRepository::try_new(conn)?);
        Ok(service.set_person_tags(owner, person.id, stored)?)
    });
    match result {
        Ok(()) => person.tags = tags.normalized(),
        Err(err) => warn!("event=person_tags module=server status=error error={err:?}"),
    }
}

/// Upserts a memory into the owner's vector namespace.
pub(crate) async fn index_memory(state: &AppState, owner: UserId, memory: &Memory) {
    let metadata = serde_json::json!({
        "user_id": owner.to_string(),
        "person_id": memory.person_id.map(|id| id.to_string()),
    });
    if let Err(err) = state
        .vector()
        .upsert(
            &owner.to_string(),
            &memory.id.to_string(),
            &memory.content,
            metadata,
        )
        .await
    {
        warn!(
            "event=vector_upsert module=server status=error index={} error={err}",
            state.vector().name()
        );
    }
}

/// Removes memories from the owner's vector namespace.
pub(crate) async fn unindex_memories(state: &AppState, owner: UserId, ids: &[RecordId]) {
    if ids.is_empty() {
        return;
    }
    let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
    if let Err(err) = state.vector().delete(&owner.to_string(), &ids).await {
        warn!(
            "event=vector_delete module=server status=error index={} count={} error={err}",
            state.vector().name(),
            ids.len()
        );
    }
}
