//! People, memories, follow-ups and events persistence.
//!
//! # Responsibility
//! - Provide owner-scoped CRUD over `people` and the records attached to them.
//! - Own the person cascade delete and the batch capture insert.
//!
//! # Invariants
//! - Every statement binds the owner id.
//! - A `person_id` on a child record must reference a person of the same owner.
//! - Deleting a person removes its memories, follow-ups and events and detaches
//!   meeting attendees, context cards and strategies, all in one transaction.

use crate::model::person::{
    CaptureDraft, CaptureResult, Event, EventDraft, FollowUp, FollowUpDraft, FollowUpPatch,
    Memory, Person, PersonDraft,
};
use crate::model::{RecordId, Tags, UserId};
use crate::repo::{
    begin_immediate, bool_to_int, ensure_connection_ready, new_id, normalize_limit, opt_id,
    row_bool, row_optional_uuid, row_tags, row_uuid, to_json, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const PEOPLE_DEFAULT_LIMIT: u32 = 100;
const PEOPLE_LIMIT_MAX: u32 = 500;
const MEMORIES_DEFAULT_LIMIT: u32 = 50;
const MEMORIES_LIMIT_MAX: u32 = 200;

const PERSON_SELECT_SQL: &str = "SELECT
    id, user_id, name, relationship, company, role, email, phone, notes, linkedin_url,
    keywords, entities, industries, created_at, updated_at
FROM people";

const MEMORY_SELECT_SQL: &str = "SELECT
    id, user_id, person_id, content, keywords, entities, industries, created_at, updated_at
FROM memories";

const FOLLOW_UP_SELECT_SQL: &str = "SELECT
    id, user_id, person_id, description, due_date, completed, created_at, updated_at
FROM follow_ups";

const EVENT_SELECT_SQL: &str = "SELECT
    id, user_id, person_id, title, event_date, description, recurring_yearly,
    created_at, updated_at
FROM events";

/// Filter options for listing people.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeopleQuery {
    /// Case-insensitive substring match on name.
    pub name_contains: Option<String>,
    pub limit: Option<u32>,
}

/// Filter options for listing follow-ups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowUpQuery {
    pub person_id: Option<RecordId>,
    pub completed: Option<bool>,
}

/// Filter options for listing events. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    pub person_id: Option<RecordId>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Repository interface for people and their attached records.
pub trait PeopleRepository {
    fn create_person(&self, owner: UserId, draft: &PersonDraft) -> RepoResult<Person>;
    fn update_person(&self, owner: UserId, id: RecordId, draft: &PersonDraft)
        -> RepoResult<Person>;
    fn get_person(&self, owner: UserId, id: RecordId) -> RepoResult<Option<Person>>;
    fn list_people(&self, owner: UserId, query: &PeopleQuery) -> RepoResult<Vec<Person>>;
    /// Exact, case-insensitive name lookup.
    fn find_person_by_name(&self, owner: UserId, name: &str) -> RepoResult<Option<Person>>;
    fn set_person_tags(&self, owner: UserId, id: RecordId, tags: &Tags) -> RepoResult<()>;
    /// Deletes a person with its cascade. Returns the ids of deleted memories.
    fn delete_person(&self, owner: UserId, id: RecordId) -> RepoResult<Vec<RecordId>>;

    fn create_memory(
        &self,
        owner: UserId,
        person_id: Option<RecordId>,
        content: &str,
        tags: &Tags,
    ) -> RepoResult<Memory>;
    fn update_memory(
        &self,
        owner: UserId,
        id: RecordId,
        content: &str,
        tags: &Tags,
    ) -> RepoResult<Memory>;
    fn get_memory(&self, owner: UserId, id: RecordId) -> RepoResult<Option<Memory>>;
    fn list_memories(
        &self,
        owner: UserId,
        person_id: Option<RecordId>,
        limit: Option<u32>,
    ) -> RepoResult<Vec<Memory>>;
    /// Loads memories by id, preserving the order of `ids` and skipping misses.
    fn get_memories_by_ids(&self, owner: UserId, ids: &[RecordId]) -> RepoResult<Vec<Memory>>;
    fn delete_memory(&self, owner: UserId, id: RecordId) -> RepoResult<()>;

    fn create_follow_up(&self, owner: UserId, draft: &FollowUpDraft) -> RepoResult<FollowUp>;
    fn patch_follow_up(
        &self,
        owner: UserId,
        id: RecordId,
        patch: &FollowUpPatch,
    ) -> RepoResult<FollowUp>;
    fn list_follow_ups(&self, owner: UserId, query: &FollowUpQuery) -> RepoResult<Vec<FollowUp>>;
    fn delete_follow_up(&self, owner: UserId, id: RecordId) -> RepoResult<()>;

    fn create_event(&self, owner: UserId, draft: &EventDraft) -> RepoResult<Event>;
    fn update_event(&self, owner: UserId, id: RecordId, draft: &EventDraft) -> RepoResult<Event>;
    fn list_events(&self, owner: UserId, query: &EventQuery) -> RepoResult<Vec<Event>>;
    fn delete_event(&self, owner: UserId, id: RecordId) -> RepoResult<()>;

    /// Writes every record of one capture in a single transaction.
    fn save_capture(&self, owner: UserId, capture: &CaptureDraft) -> RepoResult<CaptureResult>;
}

/// SQLite-backed people repository.
pub struct SqlitePeopleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePeopleRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PeopleRepository for SqlitePeopleRepository<'_> {
    fn create_person(&self, owner: UserId, draft: &PersonDraft) -> RepoResult<Person> {
        insert_person(self.conn, owner, draft)
    }

    fn update_person(
        &self,
        owner: UserId,
        id: RecordId,
        draft: &PersonDraft,
    ) -> RepoResult<Person> {
        let changed = self.conn.execute(
            "UPDATE people
             SET
                name = ?3,
                relationship = ?4,
                company = ?5,
                role = ?6,
                email = ?7,
                phone = ?8,
                notes = ?9,
                linkedin_url = ?10,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND user_id = ?2;",
            params![
                id.to_string(),
                owner.to_string(),
                draft.name.as_str(),
                draft.relationship.as_deref(),
                draft.company.as_deref(),
                draft.role.as_deref(),
                draft.email.as_deref(),
                draft.phone.as_deref(),
                draft.notes.as_deref(),
                draft.linkedin_url.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("person", id));
        }
        load_person(self.conn, owner, id)?.ok_or(RepoError::not_found("person", id))
    }

    fn get_person(&self, owner: UserId, id: RecordId) -> RepoResult<Option<Person>> {
        load_person(self.conn, owner, id)
    }

    fn list_people(&self, owner: UserId, query: &PeopleQuery) -> RepoResult<Vec<Person>> {
        let mut sql = format!("{PERSON_SELECT_SQL} WHERE user_id = ?");
        let mut bind_values = vec![Value::Text(owner.to_string())];

        if let Some(needle) = query.name_contains.as_deref() {
            sql.push_str(" AND instr(lower(name), lower(?)) > 0");
            bind_values.push(Value::Text(needle.to_string()));
        }

        sql.push_str(" ORDER BY name COLLATE NOCASE ASC, id ASC LIMIT ?");
        let limit = normalize_limit(query.limit, PEOPLE_DEFAULT_LIMIT, PEOPLE_LIMIT_MAX);
        bind_values.push(Value::Integer(i64::from(limit)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut people = Vec::new();
        while let Some(row) = rows.next()? {
            people.push(parse_person_row(row)?);
        }
        Ok(people)
    }

    fn find_person_by_name(&self, owner: UserId, name: &str) -> RepoResult<Option<Person>> {
        find_person_by_name(self.conn, owner, name)
    }

    fn set_person_tags(&self, owner: UserId, id: RecordId, tags: &Tags) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE people
             SET keywords = ?3, entities = ?4, industries = ?5,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND user_id = ?2;",
            params![
                id.to_string(),
                owner.to_string(),
                to_json(&tags.keywords)?,
                to_json(&tags.entities)?,
                to_json(&tags.industries)?,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("person", id));
        }
        Ok(())
    }

    fn delete_person(&self, owner: UserId, id: RecordId) -> RepoResult<Vec<RecordId>> {
        let tx = begin_immediate(self.conn)?;
        ensure_person_owned(&tx, owner, id)?;

        let person_id = id.to_string();
        let owner_id = owner.to_string();
        let memory_ids = {
            let mut stmt =
                tx.prepare("SELECT id FROM memories WHERE person_id = ?1 AND user_id = ?2;")?;
            let mut rows = stmt.query(params![person_id, owner_id])?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                ids.push(row_uuid(row, "id")?);
            }
            ids
        };

        tx.execute(
            "DELETE FROM memories WHERE person_id = ?1 AND user_id = ?2;",
            params![person_id, owner_id],
        )?;
        tx.execute(
            "DELETE FROM follow_ups WHERE person_id = ?1 AND user_id = ?2;",
            params![person_id, owner_id],
        )?;
        tx.execute(
            "DELETE FROM events WHERE person_id = ?1 AND user_id = ?2;",
            params![person_id, owner_id],
        )?;
        tx.execute(
            "UPDATE meeting_attendees SET person_id = NULL
             WHERE person_id = ?1
               AND meeting_id IN (SELECT id FROM meetings WHERE user_id = ?2);",
            params![person_id, owner_id],
        )?;
        tx.execute(
            "UPDATE meeting_context_cards SET person_id = NULL
             WHERE person_id = ?1 AND user_id = ?2;",
            params![person_id, owner_id],
        )?;
        tx.execute(
            "UPDATE conversation_strategies SET person_id = NULL
             WHERE person_id = ?1 AND user_id = ?2;",
            params![person_id, owner_id],
        )?;
        tx.execute(
            "DELETE FROM people WHERE id = ?1 AND user_id = ?2;",
            params![person_id, owner_id],
        )?;

        tx.commit()?;
        Ok(memory_ids)
    }

    fn create_memory(
        &self,
        owner: UserId,
        person_id: Option<RecordId>,
        content: &str,
        tags: &Tags,
    ) -> RepoResult<Memory> {
        if let Some(person_id) = person_id {
            ensure_person_owned(self.conn, owner, person_id)?;
        }
        insert_memory(self.conn, owner, person_id, content, tags)
    }

    fn update_memory(
        &self,
        owner: UserId,
        id: RecordId,
        content: &str,
        tags: &Tags,
    ) -> RepoResult<Memory> {
        let changed = self.conn.execute(
            "UPDATE memories
             SET content = ?3, keywords = ?4, entities = ?5, industries = ?6,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND user_id = ?2;",
            params![
                id.to_string(),
                owner.to_string(),
                content,
                to_json(&tags.keywords)?,
                to_json(&tags.entities)?,
                to_json(&tags.industries)?,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("memory", id));
        }
        load_memory(self.conn, owner, id)?.ok_or(RepoError::not_found("memory", id))
    }

    fn get_memory(&self, owner: UserId, id: RecordId) -> RepoResult<Option<Memory>> {
        load_memory(self.conn, owner, id)
    }

    fn list_memories(
        &self,
        owner: UserId,
        person_id: Option<RecordId>,
        limit: Option<u32>,
    ) -> RepoResult<Vec<Memory>> {
        let mut sql = format!("{MEMORY_SELECT_SQL} WHERE user_id = ?");
        let mut bind_values = vec![Value::Text(owner.to_string())];
        if let Some(person_id) = person_id {
            sql.push_str(" AND person_id = ?");
            bind_values.push(Value::Text(person_id.to_string()));
        }
        sql.push_str(" ORDER BY created_at DESC, id ASC LIMIT ?");
        let limit = normalize_limit(limit, MEMORIES_DEFAULT_LIMIT, MEMORIES_LIMIT_MAX);
        bind_values.push(Value::Integer(i64::from(limit)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut memories = Vec::new();
        while let Some(row) = rows.next()? {
            memories.push(parse_memory_row(row)?);
        }
        Ok(memories)
    }

    fn get_memories_by_ids(&self, owner: UserId, ids: &[RecordId]) -> RepoResult<Vec<Memory>> {
        let mut memories = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(memory) = load_memory(self.conn, owner, *id)? {
                memories.push(memory);
            }
        }
        Ok(memories)
    }

    fn delete_memory(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM memories WHERE id = ?1 AND user_id = ?2;",
            params![id.to_string(), owner.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("memory", id));
        }
        Ok(())
    }

    fn create_follow_up(&self, owner: UserId, draft: &FollowUpDraft) -> RepoResult<FollowUp> {
        if let Some(person_id) = draft.person_id {
            ensure_person_owned(self.conn, owner, person_id)?;
        }
        insert_follow_up(self.conn, owner, draft.person_id, draft)
    }

    fn patch_follow_up(
        &self,
        owner: UserId,
        id: RecordId,
        patch: &FollowUpPatch,
    ) -> RepoResult<FollowUp> {
        let tx = begin_immediate(self.conn)?;
        let mut current =
            load_follow_up(&tx, owner, id)?.ok_or(RepoError::not_found("follow_up", id))?;

        if let Some(description) = patch.description.as_deref() {
            current.description = description.trim().to_string();
        }
        if let Some(due_date) = patch.due_date.as_deref() {
            let trimmed = due_date.trim();
            current.due_date = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
        if let Some(completed) = patch.completed {
            current.completed = completed;
        }

        tx.execute(
            "UPDATE follow_ups
             SET description = ?3, due_date = ?4, completed = ?5,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND user_id = ?2;",
            params![
                id.to_string(),
                owner.to_string(),
                current.description.as_str(),
                current.due_date.as_deref(),
                bool_to_int(current.completed),
            ],
        )?;
        let updated = load_follow_up(&tx, owner, id)?.ok_or(RepoError::not_found("follow_up", id))?;
        tx.commit()?;
        Ok(updated)
    }

    fn list_follow_ups(&self, owner: UserId, query: &FollowUpQuery) -> RepoResult<Vec<FollowUp>> {
        let mut sql = format!("{FOLLOW_UP_SELECT_SQL} WHERE user_id = ?");
        let mut bind_values = vec![Value::Text(owner.to_string())];
        if let Some(person_id) = query.person_id {
            sql.push_str(" AND person_id = ?");
            bind_values.push(Value::Text(person_id.to_string()));
        }
        if let Some(completed) = query.completed {
            sql.push_str(" AND completed = ?");
            bind_values.push(Value::Integer(bool_to_int(completed)));
        }
        sql.push_str(
            " ORDER BY completed ASC, due_date IS NULL ASC, due_date ASC, created_at DESC, id ASC",
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_follow_up_row(row)?);
        }
        Ok(items)
    }

    fn delete_follow_up(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM follow_ups WHERE id = ?1 AND user_id = ?2;",
            params![id.to_string(), owner.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("follow_up", id));
        }
        Ok(())
    }

    fn create_event(&self, owner: UserId, draft: &EventDraft) -> RepoResult<Event> {
        if let Some(person_id) = draft.person_id {
            ensure_person_owned(self.conn, owner, person_id)?;
        }
        insert_event(self.conn, owner, draft.person_id, draft)
    }

    fn update_event(&self, owner: UserId, id: RecordId, draft: &EventDraft) -> RepoResult<Event> {
        if let Some(person_id) = draft.person_id {
            ensure_person_owned(self.conn, owner, person_id)?;
        }
        let changed = self.conn.execute(
            "UPDATE events
             SET person_id = ?3, title = ?4, event_date = ?5, description = ?6,
                 recurring_yearly = ?7, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND user_id = ?2;",
            params![
                id.to_string(),
                owner.to_string(),
                opt_id(draft.person_id),
                draft.title.as_str(),
                draft.event_date.as_str(),
                draft.description.as_deref(),
                bool_to_int(draft.recurring_yearly),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("event", id));
        }
        load_event(self.conn, owner, id)?.ok_or(RepoError::not_found("event", id))
    }

    fn list_events(&self, owner: UserId, query: &EventQuery) -> RepoResult<Vec<Event>> {
        let mut sql = format!("{EVENT_SELECT_SQL} WHERE user_id = ?");
        let mut bind_values = vec![Value::Text(owner.to_string())];
        if let Some(person_id) = query.person_id {
            sql.push_str(" AND person_id = ?");
            bind_values.push(Value::Text(person_id.to_string()));
        }
        if let Some(from) = query.from.as_deref() {
            sql.push_str(" AND event_date >= ?");
            bind_values.push(Value::Text(from.to_string()));
        }
        if let Some(to) = query.to.as_deref() {
            sql.push_str(" AND event_date <= ?");
            bind_values.push(Value::Text(to.to_string()));
        }
        sql.push_str(" ORDER BY event_date ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }

    fn delete_event(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM events WHERE id = ?1 AND user_id = ?2;",
            params![id.to_string(), owner.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("event", id));
        }
        Ok(())
    }

    fn save_capture(&self, owner: UserId, capture: &CaptureDraft) -> RepoResult<CaptureResult> {
        let tx = begin_immediate(self.conn)?;

        let (person, person_created) = match capture.person.as_ref() {
            Some(draft) => match find_person_by_name(&tx, owner, &draft.name)? {
                Some(existing) => (Some(existing), false),
                None => (Some(insert_person(&tx, owner, draft)?), true),
            },
            None => (None, false),
        };
        let person_id = person.as_ref().map(|value| value.id);

        let mut memories = Vec::with_capacity(capture.memories.len());
        for memory in &capture.memories {
            memories.push(insert_memory(
                &tx,
                owner,
                person_id,
                &memory.content,
                &memory.tags,
            )?);
        }

        let mut follow_ups = Vec::with_capacity(capture.follow_ups.len());
        for draft in &capture.follow_ups {
            follow_ups.push(insert_follow_up(&tx, owner, person_id, draft)?);
        }

        let mut events = Vec::with_capacity(capture.events.len());
        for draft in &capture.events {
            events.push(insert_event(&tx, owner, person_id, draft)?);
        }

        tx.commit()?;
        Ok(CaptureResult {
            person,
            person_created,
            memories,
            follow_ups,
            events,
        })
    }
}

/// Fails with `NotFound("person")` unless the person exists for this owner.
pub(crate) fn ensure_person_owned(
    conn: &Connection,
    owner: UserId,
    person_id: RecordId,
) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM people WHERE id = ?1 AND user_id = ?2);",
        params![person_id.to_string(), owner.to_string()],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::not_found("person", person_id));
    }
    Ok(())
}

fn insert_person(conn: &Connection, owner: UserId, draft: &PersonDraft) -> RepoResult<Person> {
    let id = new_id();
    conn.execute(
        "INSERT INTO people (
            id, user_id, name, relationship, company, role, email, phone, notes, linkedin_url
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            id.to_string(),
            owner.to_string(),
            draft.name.as_str(),
            draft.relationship.as_deref(),
            draft.company.as_deref(),
            draft.role.as_deref(),
            draft.email.as_deref(),
            draft.phone.as_deref(),
            draft.notes.as_deref(),
            draft.linkedin_url.as_deref(),
        ],
    )?;
    load_person(conn, owner, id)?.ok_or(RepoError::not_found("person", id))
}

fn insert_memory(
    conn: &Connection,
    owner: UserId,
    person_id: Option<RecordId>,
    content: &str,
    tags: &Tags,
) -> RepoResult<Memory> {
    let id = new_id();
    conn.execute(
        "INSERT INTO memories (id, user_id, person_id, content, keywords, entities, industries)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            id.to_string(),
            owner.to_string(),
            opt_id(person_id),
            content,
            to_json(&tags.keywords)?,
            to_json(&tags.entities)?,
            to_json(&tags.industries)?,
        ],
    )?;
    load_memory(conn, owner, id)?.ok_or(RepoError::not_found("memory", id))
}

fn insert_follow_up(
    conn: &Connection,
    owner: UserId,
    person_id: Option<RecordId>,
    draft: &FollowUpDraft,
) -> RepoResult<FollowUp> {
    let id = new_id();
    conn.execute(
        "INSERT INTO follow_ups (id, user_id, person_id, description, due_date)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            id.to_string(),
            owner.to_string(),
            opt_id(person_id),
            draft.description.as_str(),
            draft.due_date.as_deref(),
        ],
    )?;
    load_follow_up(conn, owner, id)?.ok_or(RepoError::not_found("follow_up", id))
}

fn insert_event(
    conn: &Connection,
    owner: UserId,
    person_id: Option<RecordId>,
    draft: &EventDraft,
) -> RepoResult<Event> {
    let id = new_id();
    conn.execute(
        "INSERT INTO events (id, user_id, person_id, title, event_date, description, recurring_yearly)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            id.to_string(),
            owner.to_string(),
            opt_id(person_id),
            draft.title.as_str(),
            draft.event_date.as_str(),
            draft.description.as_deref(),
            bool_to_int(draft.recurring_yearly),
        ],
    )?;
    load_event(conn, owner, id)?.ok_or(RepoError::not_found("event", id))
}

fn find_person_by_name(conn: &Connection, owner: UserId, name: &str) -> RepoResult<Option<Person>> {
    let mut stmt = conn.prepare(&format!(
        "{PERSON_SELECT_SQL}
         WHERE user_id = ?1 AND name = ?2 COLLATE NOCASE
         ORDER BY created_at ASC
         LIMIT 1;"
    ))?;
    let mut rows = stmt.query(params![owner.to_string(), name.trim()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_person_row(row)?));
    }
    Ok(None)
}

fn load_person(conn: &Connection, owner: UserId, id: RecordId) -> RepoResult<Option<Person>> {
    let mut stmt = conn.prepare(&format!("{PERSON_SELECT_SQL} WHERE id = ?1 AND user_id = ?2;"))?;
    let mut rows = stmt.query(params![id.to_string(), owner.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_person_row(row)?));
    }
    Ok(None)
}

fn load_memory(conn: &Connection, owner: UserId, id: RecordId) -> RepoResult<Option<Memory>> {
    let mut stmt = conn.prepare(&format!("{MEMORY_SELECT_SQL} WHERE id = ?1 AND user_id = ?2;"))?;
    let mut rows = stmt.query(params![id.to_string(), owner.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_memory_row(row)?));
    }
    Ok(None)
}

fn load_follow_up(conn: &Connection, owner: UserId, id: RecordId) -> RepoResult<Option<FollowUp>> {
    conn.query_row(
        &format!("{FOLLOW_UP_SELECT_SQL} WHERE id = ?1 AND user_id = ?2;"),
        params![id.to_string(), owner.to_string()],
        |row| Ok(parse_follow_up_row(row)),
    )
    .optional()?
    .transpose()
}

fn load_event(conn: &Connection, owner: UserId, id: RecordId) -> RepoResult<Option<Event>> {
    conn.query_row(
        &format!("{EVENT_SELECT_SQL} WHERE id = ?1 AND user_id = ?2;"),
        params![id.to_string(), owner.to_string()],
        |row| Ok(parse_event_row(row)),
    )
    .optional()?
    .transpose()
}

fn parse_person_row(row: &Row<'_>) -> RepoResult<Person> {
    Ok(Person {
        id: row_uuid(row, "id")?,
        user_id: row_uuid(row, "user_id")?,
        name: row.get("name")?,
        relationship: row.get("relationship")?,
        company: row.get("company")?,
        role: row.get("role")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        notes: row.get("notes")?,
        linkedin_url: row.get("linkedin_url")?,
        tags: row_tags(row)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_memory_row(row: &Row<'_>) -> RepoResult<Memory> {
    Ok(Memory {
        id: row_uuid(row, "id")?,
        user_id: row_uuid(row, "user_id")?,
        person_id: row_optional_uuid(row, "person_id")?,
        content: row.get("content")?,
        tags: row_tags(row)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_follow_up_row(row: &Row<'_>) -> RepoResult<FollowUp> {
    Ok(FollowUp {
        id: row_uuid(row, "id")?,
        user_id: row_uuid(row, "user_id")?,
        person_id: row_optional_uuid(row, "person_id")?,
        description: row.get("description")?,
        due_date: row.get("due_date")?,
        completed: row_bool(row, "completed")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    Ok(Event {
        id: row_uuid(row, "id")?,
        user_id: row_uuid(row, "user_id")?,
        person_id: row_optional_uuid(row, "person_id")?,
        title: row.get("title")?,
        event_date: row.get("event_date")?,
        description: row.get("description")?,
        recurring_yearly: row_bool(row, "recurring_yearly")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
