//! Businesses, their contacts, notes and org chart.

use crate::auth::AuthUser;
use crate::error::{done, envelope, ApiJson, ApiPath, ApiResult};
use crate::rest::tags_for;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::{delete, get, put};
use axum::{Extension, Json, Router};
use reminme_core::model::business::{BusinessDraft, BusinessPersonDraft, OrgChartDraft};
use reminme_core::{BusinessService, ContentDraft, RecordId, SqliteBusinessRepository};
use rusqlite::Connection;
use serde_json::Value;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/businesses", get(list_businesses).post(create_business))
        .route(
            "/api/businesses/:id",
            get(get_business)
                .put(update_business)
                .delete(delete_business),
        )
        .route(
            "/api/businesses/:id/people",
            get(list_business_people).post(create_business_person),
        )
        .route(
            "/api/business-people/:id",
            put(update_business_person).delete(delete_business_person),
        )
        .route(
            "/api/businesses/:id/notes",
            get(list_business_notes).post(create_business_note),
        )
        .route("/api/business-notes/:id", delete(delete_business_note))
        .route(
            "/api/businesses/:id/org-chart",
            get(get_org_chart).put(save_org_chart),
        )
}

fn service(conn: &Connection) -> ApiResult<BusinessService<SqliteBusinessRepository<'_>>> {
    Ok(BusinessService::new(SqliteBusinessRepository::try_new(conn)?))
}

/// GET /api/businesses
async fn list_businesses(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
) -> ApiResult<Json<Value>> {
    let businesses = state.with_conn(|conn| Ok(service(conn)?.list_businesses(owner)?))?;
    envelope("businesses", businesses)
}

/// POST /api/businesses
async fn create_business(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiJson(draft): ApiJson<BusinessDraft>,
) -> ApiResult<Json<Value>> {
    let business = state.with_conn(|conn| Ok(service(conn)?.create_business(owner, draft)?))?;
    envelope("business", business)
}

/// GET /api/businesses/:id
async fn get_business(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    let business = state.with_conn(|conn| Ok(service(conn)?.get_business(owner, id)?))?;
    envelope("business", business)
}

/// PUT /api/businesses/:id
async fn update_business(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<BusinessDraft>,
) -> ApiResult<Json<Value>> {
    let business =
        state.with_conn(|conn| Ok(service(conn)?.update_business(owner, id, draft)?))?;
    envelope("business", business)
}

/// DELETE /api/businesses/:id
async fn delete_business(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_business(owner, id)?))?;
    Ok(done())
}

/// GET /api/businesses/:id/people
async fn list_business_people(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    let people = state.with_conn(|conn| Ok(service(conn)?.list_people(owner, id)?))?;
    envelope("people", people)
}

/// POST /api/businesses/:id/people
async fn create_business_person(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<BusinessPersonDraft>,
) -> ApiResult<Json<Value>> {
    let person = state.with_conn(|conn| Ok(service(conn)?.add_person(owner, id, draft)?))?;
    envelope("person", person)
}

/// PUT /api/business-people/:id
async fn update_business_person(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<BusinessPersonDraft>,
) -> ApiResult<Json<Value>> {
    let person = state.with_conn(|conn| Ok(service(conn)?.update_person(owner, id, draft)?))?;
    envelope("person", person)
}

/// DELETE /api/business-people/:id
async fn delete_business_person(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_person(owner, id)?))?;
    Ok(done())
}

/// GET /api/businesses/:id/notes
async fn list_business_notes(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    let notes = state.with_conn(|conn| Ok(service(conn)?.list_notes(owner, id)?))?;
    envelope("notes", notes)
}

/// POST /api/businesses/:id/notes
async fn create_business_note(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<ContentDraft>,
) -> ApiResult<Json<Value>> {
    let draft = draft.cleaned()?;
    let business = state.with_conn(|conn| Ok(service(conn)?.get_business(owner, id)?))?;
    let tags = tags_for(&state, &draft.content, Some(&business.name)).await;

    let note = state.with_conn(|conn| Ok(service(conn)?.add_note(owner, id, draft, tags)?))?;
    envelope("note", note)
}

/// DELETE /api/business-notes/:id
async fn delete_business_note(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    state.with_conn(|conn| Ok(service(conn)?.delete_note(owner, id)?))?;
    Ok(done())
}

/// GET /api/businesses/:id/org-chart
async fn get_org_chart(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    let chart = state.with_conn(|conn| Ok(service(conn)?.get_org_chart(owner, id)?))?;
    envelope("org_chart", chart)
}

/// PUT /api/businesses/:id/org-chart
///
/// Replaces the whole chart; an empty payload clears it.
async fn save_org_chart(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(draft): ApiJson<OrgChartDraft>,
) -> ApiResult<Json<Value>> {
    let chart = state.with_conn(|conn| Ok(service(conn)?.save_org_chart(owner, id, draft)?))?;
    envelope("org_chart", chart)
}
