//! People use-case service.
//!
//! # Responsibility
//! - Validate person, memory, follow-up and event payloads before persistence.
//! - Project events onto their next occurrence for the upcoming view.
//! - Sanitize organizer captures before the batch insert.
//!
//! # Invariants
//! - Repositories only ever receive cleaned drafts.
//! - Tags are normalized before they are stored.
//! - A capture never fails on a bad date: follow-ups lose the date, events
//!   with unparseable dates are skipped.

use crate::model::person::{
    CaptureDraft, CaptureResult, Event, EventDraft, FollowUp, FollowUpDraft, FollowUpPatch,
    Memory, MemoryDraft, Person, PersonDetail, PersonDraft, UpcomingEvent,
};
use crate::model::{
    clean_optional, parse_date, validate_optional_date, ContentDraft, RecordId, Tags, UserId,
};
use crate::repo::people_repo::{EventQuery, FollowUpQuery, PeopleQuery, PeopleRepository};
use crate::repo::{RepoError, RepoResult};
use chrono::{Datelike, Duration, NaiveDate};

/// Default window for the upcoming events view.
pub const DEFAULT_UPCOMING_DAYS: u32 = 30;
/// Largest accepted upcoming window.
pub const MAX_UPCOMING_DAYS: u32 = 366;

/// Use-case service for people and their attached records.
pub struct PeopleService<R: PeopleRepository> {
    repo: R,
}

impl<R: PeopleRepository> PeopleService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_person(&self, owner: UserId, draft: PersonDraft) -> RepoResult<Person> {
        let draft = draft.cleaned()?;
        self.repo.create_person(owner, &draft)
    }

    /// Full replace of the editable person fields.
    pub fn update_person(
        &self,
        owner: UserId,
        id: RecordId,
        draft: PersonDraft,
    ) -> RepoResult<Person> {
        let draft = draft.cleaned()?;
        self.repo.update_person(owner, id, &draft)
    }

    pub fn list_people(&self, owner: UserId, query: &PeopleQuery) -> RepoResult<Vec<Person>> {
        self.repo.list_people(owner, query)
    }

    pub fn get_person(&self, owner: UserId, id: RecordId) -> RepoResult<Person> {
        self.repo
            .get_person(owner, id)?
            .ok_or(RepoError::not_found("person", id))
    }

    /// Loads a person with all memories, follow-ups and events.
    pub fn get_person_detail(&self, owner: UserId, id: RecordId) -> RepoResult<PersonDetail> {
        let person = self.get_person(owner, id)?;
        let memories = self.repo.list_memories(owner, Some(id), None)?;
        let follow_ups = self.repo.list_follow_ups(
            owner,
            &FollowUpQuery {
                person_id: Some(id),
                completed: None,
            },
        )?;
        let events = self.repo.list_events(
            owner,
            &EventQuery {
                person_id: Some(id),
                ..EventQuery::default()
            },
        )?;
        Ok(PersonDetail {
            person,
            memories,
            follow_ups,
            events,
        })
    }

    pub fn set_person_tags(&self, owner: UserId, id: RecordId, tags: Tags) -> RepoResult<()> {
        self.repo.set_person_tags(owner, id, &tags.normalized())
    }

    /// Deletes a person and its records. Returns deleted memory ids so callers
    /// can clean up external indexes.
    pub fn delete_person(&self, owner: UserId, id: RecordId) -> RepoResult<Vec<RecordId>> {
        self.repo.delete_person(owner, id)
    }

    pub fn create_memory(
        &self,
        owner: UserId,
        person_id: Option<RecordId>,
        draft: ContentDraft,
        tags: Tags,
    ) -> RepoResult<Memory> {
        let draft = draft.cleaned()?;
        self.repo
            .create_memory(owner, person_id, &draft.content, &tags.normalized())
    }

    pub fn update_memory(
        &self,
        owner: UserId,
        id: RecordId,
        draft: ContentDraft,
        tags: Tags,
    ) -> RepoResult<Memory> {
        let draft = draft.cleaned()?;
        self.repo
            .update_memory(owner, id, &draft.content, &tags.normalized())
    }

    pub fn get_memory(&self, owner: UserId, id: RecordId) -> RepoResult<Memory> {
        self.repo
            .get_memory(owner, id)?
            .ok_or(RepoError::not_found("memory", id))
    }

    /// Lists memories. A `person_id` filter requires an owned person.
    pub fn list_memories(
        &self,
        owner: UserId,
        person_id: Option<RecordId>,
        limit: Option<u32>,
    ) -> RepoResult<Vec<Memory>> {
        if let Some(person_id) = person_id {
            self.get_person(owner, person_id)?;
        }
        self.repo.list_memories(owner, person_id, limit)
    }

    pub fn get_memories_by_ids(&self, owner: UserId, ids: &[RecordId]) -> RepoResult<Vec<Memory>> {
        self.repo.get_memories_by_ids(owner, ids)
    }

    pub fn delete_memory(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        self.repo.delete_memory(owner, id)
    }

    pub fn create_follow_up(&self, owner: UserId, draft: FollowUpDraft) -> RepoResult<FollowUp> {
        let draft = draft.cleaned()?;
        self.repo.create_follow_up(owner, &draft)
    }

    pub fn patch_follow_up(
        &self,
        owner: UserId,
        id: RecordId,
        patch: FollowUpPatch,
    ) -> RepoResult<FollowUp> {
        patch.validate()?;
        self.repo.patch_follow_up(owner, id, &patch)
    }

    pub fn list_follow_ups(
        &self,
        owner: UserId,
        query: &FollowUpQuery,
    ) -> RepoResult<Vec<FollowUp>> {
        self.repo.list_follow_ups(owner, query)
    }

    pub fn delete_follow_up(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        self.repo.delete_follow_up(owner, id)
    }

    pub fn create_event(&self, owner: UserId, draft: EventDraft) -> RepoResult<Event> {
        let draft = draft.cleaned()?;
        self.repo.create_event(owner, &draft)
    }

    pub fn update_event(
        &self,
        owner: UserId,
        id: RecordId,
        draft: EventDraft,
    ) -> RepoResult<Event> {
        let draft = draft.cleaned()?;
        self.repo.update_event(owner, id, &draft)
    }

    pub fn list_events(&self, owner: UserId, query: &EventQuery) -> RepoResult<Vec<Event>> {
        validate_optional_date("from", query.from.as_deref())?;
        validate_optional_date("to", query.to.as_deref())?;
        self.repo.list_events(owner, query)
    }

    pub fn delete_event(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        self.repo.delete_event(owner, id)
    }

    /// Events whose next occurrence falls within `days` of `today`, soonest first.
    pub fn upcoming_events(
        &self,
        owner: UserId,
        today: NaiveDate,
        days: Option<u32>,
    ) -> RepoResult<Vec<UpcomingEvent>> {
        let days = match days {
            None | Some(0) => DEFAULT_UPCOMING_DAYS,
            Some(value) => value.min(MAX_UPCOMING_DAYS),
        };
        let events = self.repo.list_events(owner, &EventQuery::default())?;
        Ok(project_upcoming(events, today, days))
    }

    /// Sanitizes and persists an organizer capture in one transaction.
    pub fn save_capture(&self, owner: UserId, capture: CaptureDraft) -> RepoResult<CaptureResult> {
        self.repo.save_capture(owner, &sanitize_capture(capture))
    }
}

/// Returns the next date (on or after `today`) an event happens, if any.
///
/// Yearly events dated Feb 29 fall on Feb 28 in non-leap years.
pub fn next_occurrence(event: &Event, today: NaiveDate) -> Option<NaiveDate> {
    let date = parse_date(&event.event_date)?;
    if !event.recurring_yearly {
        return (date >= today).then_some(date);
    }
    let this_year = anniversary_in_year(date, today.year())?;
    if this_year >= today {
        return Some(this_year);
    }
    anniversary_in_year(date, today.year() + 1)
}

fn anniversary_in_year(date: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), date.day() - 1))
}

fn project_upcoming(events: Vec<Event>, today: NaiveDate, days: u32) -> Vec<UpcomingEvent> {
    let horizon = today + Duration::days(i64::from(days));
    let mut upcoming: Vec<UpcomingEvent> = events
        .into_iter()
        .filter_map(|event| {
            let next = next_occurrence(&event, today)?;
            if next > horizon {
                return None;
            }
            Some(UpcomingEvent {
                next_occurrence: next.format("%Y-%m-%d").to_string(),
                days_until: (next - today).num_days(),
                event,
            })
        })
        .collect();
    upcoming.sort_by(|left, right| {
        left.days_until
            .cmp(&right.days_until)
            .then_with(|| left.event.title.cmp(&right.event.title))
    });
    upcoming
}

fn sanitize_capture(capture: CaptureDraft) -> CaptureDraft {
    let person = capture.person.and_then(|draft| draft.cleaned().ok());

    let memories = capture
        .memories
        .into_iter()
        .filter_map(|memory| {
            let content = memory.content.trim();
            (!content.is_empty()).then(|| MemoryDraft {
                content: content.to_string(),
                tags: memory.tags.normalized(),
            })
        })
        .collect();

    let follow_ups = capture
        .follow_ups
        .into_iter()
        .filter_map(|draft| {
            let due_date = clean_optional(draft.due_date)
                .filter(|value| parse_date(value).is_some());
            FollowUpDraft {
                person_id: None,
                description: draft.description,
                due_date,
            }
            .cleaned()
            .ok()
        })
        .collect();

    let events = capture
        .events
        .into_iter()
        .filter_map(|draft| {
            EventDraft {
                person_id: None,
                ..draft
            }
            .cleaned()
            .ok()
        })
        .collect();

    CaptureDraft {
        person,
        memories,
        follow_ups,
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::{next_occurrence, project_upcoming, sanitize_capture};
    use crate::model::person::{CaptureDraft, Event, EventDraft, FollowUpDraft, PersonDraft};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn event(date: &str, recurring: bool) -> Event {
        Event {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            person_id: None,
            title: format!("event {date}"),
            event_date: date.to_string(),
            description: None,
            recurring_yearly: recurring,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date should be valid")
    }

    #[test]
    fn yearly_event_rolls_to_next_year_once_passed() {
        let today = day("2026-06-15");
        assert_eq!(
            next_occurrence(&event("1990-03-01", true), today),
            Some(day("2027-03-01"))
        );
        assert_eq!(
            next_occurrence(&event("1990-06-15", true), today),
            Some(day("2026-06-15"))
        );
    }

    #[test]
    fn leap_day_anniversary_falls_back_to_feb_28() {
        let today = day("2026-01-10");
        assert_eq!(
            next_occurrence(&event("2000-02-29", true), today),
            Some(day("2026-02-28"))
        );
    }

    #[test]
    fn one_off_past_events_are_not_upcoming() {
        let today = day("2026-06-15");
        assert_eq!(next_occurrence(&event("2026-06-01", false), today), None);
    }

    #[test]
    fn upcoming_projection_respects_window_and_orders_by_distance() {
        let today = day("2026-06-15");
        let projected = project_upcoming(
            vec![
                event("2026-07-10", false),
                event("1980-06-20", true),
                event("2026-12-01", false),
            ],
            today,
            30,
        );
        let days: Vec<i64> = projected.iter().map(|item| item.days_until).collect();
        assert_eq!(days, vec![5, 25]);
        assert_eq!(projected[0].next_occurrence, "2026-06-20");
    }

    #[test]
    fn capture_sanitizing_drops_bad_dates() {
        let capture = sanitize_capture(CaptureDraft {
            person: Some(PersonDraft::named("  ")),
            memories: Vec::new(),
            follow_ups: vec![FollowUpDraft {
                person_id: None,
                description: "Send deck".to_string(),
                due_date: Some("next week".to_string()),
            }],
            events: vec![EventDraft {
                title: "Launch".to_string(),
                event_date: "soon".to_string(),
                ..EventDraft::default()
            }],
        });

        assert!(capture.person.is_none());
        assert_eq!(capture.follow_ups.len(), 1);
        assert_eq!(capture.follow_ups[0].due_date, None);
        assert!(capture.events.is_empty());
    }
}
