//! Direct AI endpoints: tagging, note organization and LinkedIn import.
//!
//! # Invariants
//! - Tagging never fails; an unavailable provider yields empty arrays.
//! - Organizer results are persisted in one transaction or not at all.
//! - Organized memories and imported profile notes are tagged like their
//!   direct-create counterparts.

use crate::auth::AuthUser;
use crate::error::{envelope, ApiError, ApiJson, ApiResult};
use crate::rest::{index_memory, retag_person, tags_for, today};
use crate::state::AppState;
use axum::extract::State;
use axum::routing::post;
use axum::{Extension, Json, Router};
use log::info;
use reminme_ai::{organize_text, parse_linkedin_profile, LinkedInProfile, OrganizedNote};
use reminme_core::model::person::{
    CaptureDraft, EventDraft, FollowUpDraft, MemoryDraft, PersonDraft,
};
use reminme_core::{PeopleService, SqlitePeopleRepository, Tags};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/ai/tag", post(tag))
        .route("/api/ai/organize", post(organize))
        .route("/api/ai/linkedin", post(import_linkedin))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TagRequest {
    pub text: String,
    pub subject_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrganizeRequest {
    pub text: String,
    pub person_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LinkedInRequest {
    pub text: String,
}

fn require_text(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("`{field}` is required")));
    }
    Ok(())
}

/// POST /api/ai/tag
async fn tag(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(_owner)): Extension<AuthUser>,
    ApiJson(request): ApiJson<TagRequest>,
) -> ApiResult<Json<Value>> {
    require_text("text", &request.text)?;
    let tags: Tags = tags_for(&state, &request.text, request.subject_name.as_deref()).await;
    envelope("tags", tags)
}

/// POST /api/ai/organize
async fn organize(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiJson(request): ApiJson<OrganizeRequest>,
) -> ApiResult<Json<Value>> {
    require_text("text", &request.text)?;
    let note = organize_text(
        state.chat(),
        &request.text,
        request.person_name.as_deref(),
        today(),
    )
    .await?;

    let mut capture = capture_from(note);
    let subject = capture.person.as_ref().map(|person| person.name.clone());
    for memory in &mut capture.memories {
        memory.tags = tags_for(&state, &memory.content, subject.as_deref()).await;
    }
    let result = state.with_conn(|conn| {
        let service = PeopleService::new(SqlitePeopleRepository::try_new(conn)?);
        Ok(service.save_capture(owner, capture)?)
    })?;
    for memory in &result.memories {
        index_memory(&state, owner, memory).await;
    }
    info!(
        "event=note_organized module=server status=ok person_created={} memories={} follow_ups={} events={}",
        result.person_created,
        result.memories.len(),
        result.follow_ups.len(),
        result.events.len()
    );
    envelope("organized", result)
}

/// POST /api/ai/linkedin
async fn import_linkedin(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner)): Extension<AuthUser>,
    ApiJson(request): ApiJson<LinkedInRequest>,
) -> ApiResult<Json<Value>> {
    require_text("text", &request.text)?;
    let profile = parse_linkedin_profile(state.chat(), &request.text).await?;

    let draft = person_from_profile(profile);
    let mut person = state.with_conn(|conn| {
        let service = PeopleService::new(SqlitePeopleRepository::try_new(conn)?);
        Ok(service.create_person(owner, draft)?)
    })?;
    retag_person(&state, owner, &mut person).await;
    envelope("person", person)
}

fn capture_from(note: OrganizedNote) -> CaptureDraft {
    CaptureDraft {
        person: note
            .person
            .filter(|person| !person.name.trim().is_empty())
            .map(|person| PersonDraft {
                relationship: person.relationship,
                company: person.company,
                role: person.role,
                ..PersonDraft::named(person.name)
            }),
        memories: note
            .memories
            .into_iter()
            .map(|content| MemoryDraft {
                content,
                tags: Tags::default(),
            })
            .collect(),
        follow_ups: note
            .follow_ups
            .into_iter()
            .map(|follow_up| FollowUpDraft {
                person_id: None,
                description: follow_up.description,
                due_date: follow_up.due_date,
            })
            .collect(),
        events: note
            .events
            .into_iter()
            .map(|event| EventDraft {
                person_id: None,
                title: event.title,
                event_date: event.event_date.unwrap_or_default(),
                description: event.description,
                recurring_yearly: false,
            })
            .collect(),
    }
}

fn person_from_profile(profile: LinkedInProfile) -> PersonDraft {
    let notes = match (profile.summary, profile.location) {
        (Some(summary), Some(location)) => Some(format!("{summary}\nLocation: {location}")),
        (Some(summary), None) => Some(summary),
        (None, Some(location)) => Some(format!("Location: {location}")),
        (None, None) => None,
    };
    PersonDraft {
        role: profile.headline,
        company: profile.company,
        notes,
        linkedin_url: profile.linkedin_url,
        ..PersonDraft::named(profile.name)
    }
}

#[cfg(test)]
mod tests {
    use super::{capture_from, person_from_profile};
    use reminme_ai::{LinkedInProfile, OrganizedEvent, OrganizedNote, OrganizedPerson};

    #[test]
    fn capture_drops_nameless_person_and_keeps_undated_events_for_filtering() {
        let note = OrganizedNote {
            person: Some(OrganizedPerson {
                name: "  ".to_string(),
                ..OrganizedPerson::default()
            }),
            memories: vec!["Likes sailing".to_string()],
            follow_ups: Vec::new(),
            events: vec![OrganizedEvent {
                title: "Birthday".to_string(),
                event_date: None,
                description: None,
            }],
        };
        let capture = capture_from(note);
        assert!(capture.person.is_none());
        assert_eq!(capture.memories[0].content, "Likes sailing");
        assert_eq!(capture.events[0].event_date, "");
    }

    #[test]
    fn profile_location_is_kept_in_notes() {
        let profile = LinkedInProfile {
            name: "Grace Hopper".to_string(),
            headline: Some("Rear Admiral".to_string()),
            location: Some("Arlington".to_string()),
            ..LinkedInProfile::default()
        };
        let draft = person_from_profile(profile);
        assert_eq!(draft.name, "Grace Hopper");
        assert_eq!(draft.role.as_deref(), Some("Rear Admiral"));
        assert_eq!(draft.notes.as_deref(), Some("Location: Arlington"));
    }
}
