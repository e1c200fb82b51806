//! Meeting, meeting child record and context card persistence.
//!
//! # Responsibility
//! - Provide owner-scoped CRUD for meetings and their child collections.
//! - Own the meeting cascade delete and batch question append.
//!
//! # Invariants
//! - Child rows are reachable only through a meeting owned by the caller.
//! - Deleting a meeting removes every child row and detaches context cards in
//!   one transaction; any failure rolls the whole delete back.
//! - New agenda items and questions are appended after the current max position.

use crate::model::meeting::{
    AgendaItem, AgendaItemPatch, Attendee, AttendeeDraft, AttendeePatch, ContextCard,
    ContextCardDraft, Meeting, MeetingDetail, MeetingDraft, MeetingFollowUp,
    MeetingFollowUpDraft, MeetingFollowUpPatch, MeetingNote, MeetingQuestion, MeetingStatus,
    QuestionDraft, QuestionPatch,
};
use crate::model::{RecordId, Tags, UserId};
use crate::repo::business_repo::ensure_business_owned;
use crate::repo::people_repo::ensure_person_owned;
use crate::repo::{
    begin_immediate, bool_to_int, ensure_connection_ready, new_id, opt_id, row_bool,
    row_optional_uuid, row_tags, row_uuid, to_json, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const MEETING_SELECT_SQL: &str = "SELECT
    id, user_id, business_id, title, scheduled_at, location, purpose, status,
    created_at, updated_at
FROM meetings";

const CONTEXT_CARD_SELECT_SQL: &str = "SELECT
    id, user_id, meeting_id, person_id, title, content, card_type, position,
    created_at, updated_at
FROM meeting_context_cards";

/// Filter options for listing meetings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingQuery {
    pub business_id: Option<RecordId>,
    pub status: Option<MeetingStatus>,
}

/// Filter options for listing context cards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextCardQuery {
    pub meeting_id: Option<RecordId>,
    pub person_id: Option<RecordId>,
}

/// Repository interface for meetings and their child records.
pub trait MeetingRepository {
    /// Inserts the meeting with its inline attendees and agenda.
    fn create_meeting(&self, owner: UserId, draft: &MeetingDraft) -> RepoResult<Meeting>;
    /// Replaces meeting attributes. Inline attendees and agenda are ignored.
    fn update_meeting(&self, owner: UserId, id: RecordId, draft: &MeetingDraft)
        -> RepoResult<Meeting>;
    fn get_meeting(&self, owner: UserId, id: RecordId) -> RepoResult<Option<Meeting>>;
    fn get_meeting_detail(&self, owner: UserId, id: RecordId)
        -> RepoResult<Option<MeetingDetail>>;
    fn list_meetings(&self, owner: UserId, query: &MeetingQuery) -> RepoResult<Vec<Meeting>>;
    fn delete_meeting(&self, owner: UserId, id: RecordId) -> RepoResult<()>;

    fn add_attendee(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        draft: &AttendeeDraft,
    ) -> RepoResult<Attendee>;
    fn patch_attendee(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
        patch: &AttendeePatch,
    ) -> RepoResult<Attendee>;
    fn delete_attendee(&self, owner: UserId, meeting_id: RecordId, id: RecordId)
        -> RepoResult<()>;

    fn add_agenda_item(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        item: &str,
    ) -> RepoResult<AgendaItem>;
    fn patch_agenda_item(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
        patch: &AgendaItemPatch,
    ) -> RepoResult<AgendaItem>;
    fn delete_agenda_item(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
    ) -> RepoResult<()>;

    fn add_note(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        content: &str,
        tags: &Tags,
    ) -> RepoResult<MeetingNote>;
    fn update_note(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
        content: &str,
        tags: &Tags,
    ) -> RepoResult<MeetingNote>;
    fn delete_note(&self, owner: UserId, meeting_id: RecordId, id: RecordId) -> RepoResult<()>;

    fn add_question(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        draft: &QuestionDraft,
    ) -> RepoResult<MeetingQuestion>;
    /// Appends generated questions after the existing ones in one transaction.
    fn append_questions(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        drafts: &[QuestionDraft],
    ) -> RepoResult<Vec<MeetingQuestion>>;
    fn patch_question(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
        patch: &QuestionPatch,
    ) -> RepoResult<MeetingQuestion>;
    fn delete_question(&self, owner: UserId, meeting_id: RecordId, id: RecordId)
        -> RepoResult<()>;

    fn add_follow_up(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        draft: &MeetingFollowUpDraft,
    ) -> RepoResult<MeetingFollowUp>;
    fn patch_follow_up(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
        patch: &MeetingFollowUpPatch,
    ) -> RepoResult<MeetingFollowUp>;
    fn delete_follow_up(&self, owner: UserId, meeting_id: RecordId, id: RecordId)
        -> RepoResult<()>;

    fn create_context_card(&self, owner: UserId, draft: &ContextCardDraft)
        -> RepoResult<ContextCard>;
    fn update_context_card(
        &self,
        owner: UserId,
        id: RecordId,
        draft: &ContextCardDraft,
    ) -> RepoResult<ContextCard>;
    fn list_context_cards(
        &self,
        owner: UserId,
        query: &ContextCardQuery,
    ) -> RepoResult<Vec<ContextCard>>;
    fn delete_context_card(&self, owner: UserId, id: RecordId) -> RepoResult<()>;
}

/// SQLite-backed meeting repository.
pub struct SqliteMeetingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMeetingRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl MeetingRepository for SqliteMeetingRepository<'_> {
    fn create_meeting(&self, owner: UserId, draft: &MeetingDraft) -> RepoResult<Meeting> {
        let tx = begin_immediate(self.conn)?;
        if let Some(business_id) = draft.business_id {
            ensure_business_owned(&tx, owner, business_id)?;
        }

        let id = new_id();
        tx.execute(
            "INSERT INTO meetings (
                id, user_id, business_id, title, scheduled_at, location, purpose, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                id.to_string(),
                owner.to_string(),
                opt_id(draft.business_id),
                draft.title.as_str(),
                draft.scheduled_at.as_deref(),
                draft.location.as_deref(),
                draft.purpose.as_deref(),
                draft.status.as_str(),
            ],
        )?;
        for attendee in &draft.attendees {
            insert_attendee(&tx, owner, id, attendee)?;
        }
        for item in &draft.agenda {
            insert_agenda_item(&tx, id, item)?;
        }

        let meeting = load_meeting(&tx, owner, id)?.ok_or(RepoError::not_found("meeting", id))?;
        tx.commit()?;
        Ok(meeting)
    }

    fn update_meeting(
        &self,
        owner: UserId,
        id: RecordId,
        draft: &MeetingDraft,
    ) -> RepoResult<Meeting> {
        ensure_meeting_owned(self.conn, owner, id)?;
        if let Some(business_id) = draft.business_id {
            ensure_business_owned(self.conn, owner, business_id)?;
        }
        self.conn.execute(
            "UPDATE meetings
             SET
                business_id = ?3,
                title = ?4,
                scheduled_at = ?5,
                location = ?6,
                purpose = ?7,
                status = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND user_id = ?2;",
            params![
                id.to_string(),
                owner.to_string(),
                opt_id(draft.business_id),
                draft.title.as_str(),
                draft.scheduled_at.as_deref(),
                draft.location.as_deref(),
                draft.purpose.as_deref(),
                draft.status.as_str(),
            ],
        )?;
        load_meeting(self.conn, owner, id)?.ok_or(RepoError::not_found("meeting", id))
    }

    fn get_meeting(&self, owner: UserId, id: RecordId) -> RepoResult<Option<Meeting>> {
        load_meeting(self.conn, owner, id)
    }

    fn get_meeting_detail(
        &self,
        owner: UserId,
        id: RecordId,
    ) -> RepoResult<Option<MeetingDetail>> {
        let Some(meeting) = load_meeting(self.conn, owner, id)? else {
            return Ok(None);
        };
        let context_cards = self.list_context_cards(
            owner,
            &ContextCardQuery {
                meeting_id: Some(id),
                person_id: None,
            },
        )?;
        Ok(Some(MeetingDetail {
            attendees: list_attendees(self.conn, id)?,
            agenda: list_agenda(self.conn, id)?,
            notes: list_notes(self.conn, id)?,
            questions: list_questions(self.conn, id)?,
            follow_ups: list_follow_ups(self.conn, id)?,
            context_cards,
            meeting,
        }))
    }

    fn list_meetings(&self, owner: UserId, query: &MeetingQuery) -> RepoResult<Vec<Meeting>> {
        let mut sql = format!("{MEETING_SELECT_SQL} WHERE user_id = ?");
        let mut bind_values = vec![Value::Text(owner.to_string())];
        if let Some(business_id) = query.business_id {
            sql.push_str(" AND business_id = ?");
            bind_values.push(Value::Text(business_id.to_string()));
        }
        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        sql.push_str(" ORDER BY scheduled_at IS NULL ASC, scheduled_at DESC, created_at DESC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut meetings = Vec::new();
        while let Some(row) = rows.next()? {
            meetings.push(parse_meeting_row(row)?);
        }
        Ok(meetings)
    }

    fn delete_meeting(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        let tx = begin_immediate(self.conn)?;
        ensure_meeting_owned(&tx, owner, id)?;

        let meeting_id = id.to_string();
        for table in [
            "meeting_attendees",
            "meeting_agenda",
            "meeting_notes",
            "meeting_questions",
            "meeting_followups",
        ] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE meeting_id = ?1;"),
                params![meeting_id],
            )?;
        }
        tx.execute(
            "UPDATE meeting_context_cards
             SET meeting_id = NULL, updated_at = (strftime('%s', 'now') * 1000)
             WHERE meeting_id = ?1 AND user_id = ?2;",
            params![meeting_id, owner.to_string()],
        )?;
        tx.execute(
            "DELETE FROM meetings WHERE id = ?1 AND user_id = ?2;",
            params![meeting_id, owner.to_string()],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn add_attendee(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        draft: &AttendeeDraft,
    ) -> RepoResult<Attendee> {
        ensure_meeting_owned(self.conn, owner, meeting_id)?;
        insert_attendee(self.conn, owner, meeting_id, draft)
    }

    fn patch_attendee(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
        patch: &AttendeePatch,
    ) -> RepoResult<Attendee> {
        ensure_meeting_owned(self.conn, owner, meeting_id)?;
        if let Some(person_id) = patch.person_id {
            ensure_person_owned(self.conn, owner, person_id)?;
        }
        let changed = self.conn.execute(
            "UPDATE meeting_attendees
             SET
                person_id = COALESCE(?3, person_id),
                name = COALESCE(?4, name),
                role = COALESCE(?5, role)
             WHERE id = ?1 AND meeting_id = ?2;",
            params![
                id.to_string(),
                meeting_id.to_string(),
                opt_id(patch.person_id),
                patch.name.as_deref().map(str::trim),
                patch.role.as_deref().map(str::trim),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("attendee", id));
        }
        self.conn
            .query_row(
                "SELECT id, meeting_id, person_id, name, role
                 FROM meeting_attendees WHERE id = ?1;",
                params![id.to_string()],
                |row| Ok(parse_attendee_row(row)),
            )?
    }

    fn delete_attendee(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
    ) -> RepoResult<()> {
        delete_child(self.conn, owner, meeting_id, "meeting_attendees", "attendee", id)
    }

    fn add_agenda_item(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        item: &str,
    ) -> RepoResult<AgendaItem> {
        ensure_meeting_owned(self.conn, owner, meeting_id)?;
        insert_agenda_item(self.conn, meeting_id, item)
    }

    fn patch_agenda_item(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
        patch: &AgendaItemPatch,
    ) -> RepoResult<AgendaItem> {
        ensure_meeting_owned(self.conn, owner, meeting_id)?;
        let changed = self.conn.execute(
            "UPDATE meeting_agenda
             SET item = COALESCE(?3, item), completed = COALESCE(?4, completed)
             WHERE id = ?1 AND meeting_id = ?2;",
            params![
                id.to_string(),
                meeting_id.to_string(),
                patch.item.as_deref().map(str::trim),
                patch.completed.map(bool_to_int),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("agenda_item", id));
        }
        load_agenda_item(self.conn, id)
    }

    fn delete_agenda_item(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
    ) -> RepoResult<()> {
        delete_child(self.conn, owner, meeting_id, "meeting_agenda", "agenda_item", id)
    }

    fn add_note(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        content: &str,
        tags: &Tags,
    ) -> RepoResult<MeetingNote> {
        ensure_meeting_owned(self.conn, owner, meeting_id)?;
        let id = new_id();
        self.conn.execute(
            "INSERT INTO meeting_notes (id, meeting_id, content, keywords, entities, industries)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id.to_string(),
                meeting_id.to_string(),
                content,
                to_json(&tags.keywords)?,
                to_json(&tags.entities)?,
                to_json(&tags.industries)?,
            ],
        )?;
        load_note(self.conn, id)
    }

    fn update_note(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
        content: &str,
        tags: &Tags,
    ) -> RepoResult<MeetingNote> {
        ensure_meeting_owned(self.conn, owner, meeting_id)?;
        let changed = self.conn.execute(
            "UPDATE meeting_notes
             SET content = ?3, keywords = ?4, entities = ?5, industries = ?6
             WHERE id = ?1 AND meeting_id = ?2;",
            params![
                id.to_string(),
                meeting_id.to_string(),
                content,
                to_json(&tags.keywords)?,
                to_json(&tags.entities)?,
                to_json(&tags.industries)?,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("meeting_note", id));
        }
        load_note(self.conn, id)
    }

    fn delete_note(&self, owner: UserId, meeting_id: RecordId, id: RecordId) -> RepoResult<()> {
        delete_child(self.conn, owner, meeting_id, "meeting_notes", "meeting_note", id)
    }

    fn add_question(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        draft: &QuestionDraft,
    ) -> RepoResult<MeetingQuestion> {
        ensure_meeting_owned(self.conn, owner, meeting_id)?;
        insert_question(self.conn, meeting_id, draft)
    }

    fn append_questions(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        drafts: &[QuestionDraft],
    ) -> RepoResult<Vec<MeetingQuestion>> {
        let tx = begin_immediate(self.conn)?;
        ensure_meeting_owned(&tx, owner, meeting_id)?;
        let mut questions = Vec::with_capacity(drafts.len());
        for draft in drafts {
            questions.push(insert_question(&tx, meeting_id, draft)?);
        }
        tx.commit()?;
        Ok(questions)
    }

    fn patch_question(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
        patch: &QuestionPatch,
    ) -> RepoResult<MeetingQuestion> {
        ensure_meeting_owned(self.conn, owner, meeting_id)?;
        let answer = patch.answer.as_deref().map(str::trim);
        // Supplying a non-empty answer marks the question answered unless the
        // caller says otherwise.
        let answered = patch
            .answered
            .or_else(|| answer.map(|text| !text.is_empty()));
        let changed = self.conn.execute(
            "UPDATE meeting_questions
             SET answer = COALESCE(?3, answer), answered = COALESCE(?4, answered)
             WHERE id = ?1 AND meeting_id = ?2;",
            params![
                id.to_string(),
                meeting_id.to_string(),
                answer,
                answered.map(bool_to_int),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("question", id));
        }
        load_question(self.conn, id)
    }

    fn delete_question(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
    ) -> RepoResult<()> {
        delete_child(self.conn, owner, meeting_id, "meeting_questions", "question", id)
    }

    fn add_follow_up(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        draft: &MeetingFollowUpDraft,
    ) -> RepoResult<MeetingFollowUp> {
        ensure_meeting_owned(self.conn, owner, meeting_id)?;
        let id = new_id();
        self.conn.execute(
            "INSERT INTO meeting_followups (id, meeting_id, description, owner, due_date)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                meeting_id.to_string(),
                draft.description.as_str(),
                draft.owner.as_deref(),
                draft.due_date.as_deref(),
            ],
        )?;
        load_follow_up(self.conn, id)
    }

    fn patch_follow_up(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
        patch: &MeetingFollowUpPatch,
    ) -> RepoResult<MeetingFollowUp> {
        ensure_meeting_owned(self.conn, owner, meeting_id)?;
        let changed = self.conn.execute(
            "UPDATE meeting_followups
             SET
                description = COALESCE(?3, description),
                owner = COALESCE(?4, owner),
                completed = COALESCE(?5, completed)
             WHERE id = ?1 AND meeting_id = ?2;",
            params![
                id.to_string(),
                meeting_id.to_string(),
                patch.description.as_deref().map(str::trim),
                patch.owner.as_deref().map(str::trim),
                patch.completed.map(bool_to_int),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("meeting_follow_up", id));
        }
        load_follow_up(self.conn, id)
    }

    fn delete_follow_up(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
    ) -> RepoResult<()> {
        delete_child(
            self.conn,
            owner,
            meeting_id,
            "meeting_followups",
            "meeting_follow_up",
            id,
        )
    }

    fn create_context_card(
        &self,
        owner: UserId,
        draft: &ContextCardDraft,
    ) -> RepoResult<ContextCard> {
        ensure_card_links_owned(self.conn, owner, draft)?;
        let id = new_id();
        let position = match draft.position {
            Some(position) => position,
            None => self.conn.query_row(
                "SELECT COALESCE(MAX(position), -1) + 1
                 FROM meeting_context_cards WHERE user_id = ?1;",
                params![owner.to_string()],
                |row| row.get(0),
            )?,
        };
        self.conn.execute(
            "INSERT INTO meeting_context_cards (
                id, user_id, meeting_id, person_id, title, content, card_type, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                id.to_string(),
                owner.to_string(),
                opt_id(draft.meeting_id),
                opt_id(draft.person_id),
                draft.title.as_str(),
                draft.content.as_deref(),
                draft.card_type.as_deref(),
                position,
            ],
        )?;
        load_context_card(self.conn, owner, id)?.ok_or(RepoError::not_found("context_card", id))
    }

    fn update_context_card(
        &self,
        owner: UserId,
        id: RecordId,
        draft: &ContextCardDraft,
    ) -> RepoResult<ContextCard> {
        ensure_card_links_owned(self.conn, owner, draft)?;
        let changed = self.conn.execute(
            "UPDATE meeting_context_cards
             SET
                meeting_id = ?3,
                person_id = ?4,
                title = ?5,
                content = ?6,
                card_type = ?7,
                position = COALESCE(?8, position),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND user_id = ?2;",
            params![
                id.to_string(),
                owner.to_string(),
                opt_id(draft.meeting_id),
                opt_id(draft.person_id),
                draft.title.as_str(),
                draft.content.as_deref(),
                draft.card_type.as_deref(),
                draft.position,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("context_card", id));
        }
        load_context_card(self.conn, owner, id)?.ok_or(RepoError::not_found("context_card", id))
    }

    fn list_context_cards(
        &self,
        owner: UserId,
        query: &ContextCardQuery,
    ) -> RepoResult<Vec<ContextCard>> {
        let mut sql = format!("{CONTEXT_CARD_SELECT_SQL} WHERE user_id = ?");
        let mut bind_values = vec![Value::Text(owner.to_string())];
        if let Some(meeting_id) = query.meeting_id {
            sql.push_str(" AND meeting_id = ?");
            bind_values.push(Value::Text(meeting_id.to_string()));
        }
        if let Some(person_id) = query.person_id {
            sql.push_str(" AND person_id = ?");
            bind_values.push(Value::Text(person_id.to_string()));
        }
        sql.push_str(" ORDER BY position ASC, created_at ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut cards = Vec::new();
        while let Some(row) = rows.next()? {
            cards.push(parse_context_card_row(row)?);
        }
        Ok(cards)
    }

    fn delete_context_card(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM meeting_context_cards WHERE id = ?1 AND user_id = ?2;",
            params![id.to_string(), owner.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("context_card", id));
        }
        Ok(())
    }
}

/// Fails with `NotFound("meeting")` unless the meeting exists for this owner.
pub(crate) fn ensure_meeting_owned(
    conn: &Connection,
    owner: UserId,
    meeting_id: RecordId,
) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM meetings WHERE id = ?1 AND user_id = ?2);",
        params![meeting_id.to_string(), owner.to_string()],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::not_found("meeting", meeting_id));
    }
    Ok(())
}

fn ensure_card_links_owned(
    conn: &Connection,
    owner: UserId,
    draft: &ContextCardDraft,
) -> RepoResult<()> {
    if let Some(meeting_id) = draft.meeting_id {
        ensure_meeting_owned(conn, owner, meeting_id)?;
    }
    if let Some(person_id) = draft.person_id {
        ensure_person_owned(conn, owner, person_id)?;
    }
    Ok(())
}

fn delete_child(
    conn: &Connection,
    owner: UserId,
    meeting_id: RecordId,
    table: &'static str,
    entity: &'static str,
    id: RecordId,
) -> RepoResult<()> {
    ensure_meeting_owned(conn, owner, meeting_id)?;
    let changed = conn.execute(
        &format!("DELETE FROM {table} WHERE id = ?1 AND meeting_id = ?2;"),
        params![id.to_string(), meeting_id.to_string()],
    )?;
    if changed == 0 {
        return Err(RepoError::not_found(entity, id));
    }
    Ok(())
}

fn next_position(conn: &Connection, table: &'static str, meeting_id: RecordId) -> RepoResult<i64> {
    Ok(conn.query_row(
        &format!("SELECT COALESCE(MAX(position), -1) + 1 FROM {table} WHERE meeting_id = ?1;"),
        params![meeting_id.to_string()],
        |row| row.get(0),
    )?)
}

fn insert_attendee(
    conn: &Connection,
    owner: UserId,
    meeting_id: RecordId,
    draft: &AttendeeDraft,
) -> RepoResult<Attendee> {
    if let Some(person_id) = draft.person_id {
        ensure_person_owned(conn, owner, person_id)?;
    }
    let id = new_id();
    conn.execute(
        "INSERT INTO meeting_attendees (id, meeting_id, person_id, name, role)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            id.to_string(),
            meeting_id.to_string(),
            opt_id(draft.person_id),
            draft.name.as_str(),
            draft.role.as_deref(),
        ],
    )?;
    Ok(Attendee {
        id,
        meeting_id,
        person_id: draft.person_id,
        name: draft.name.clone(),
        role: draft.role.clone(),
    })
}

fn insert_agenda_item(
    conn: &Connection,
    meeting_id: RecordId,
    item: &str,
) -> RepoResult<AgendaItem> {
    let id = new_id();
    let position = next_position(conn, "meeting_agenda", meeting_id)?;
    conn.execute(
        "INSERT INTO meeting_agenda (id, meeting_id, item, position) VALUES (?1, ?2, ?3, ?4);",
        params![id.to_string(), meeting_id.to_string(), item, position],
    )?;
    load_agenda_item(conn, id)
}

fn insert_question(
    conn: &Connection,
    meeting_id: RecordId,
    draft: &QuestionDraft,
) -> RepoResult<MeetingQuestion> {
    let id = new_id();
    let position = next_position(conn, "meeting_questions", meeting_id)?;
    conn.execute(
        "INSERT INTO meeting_questions (id, meeting_id, question, category, position)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            id.to_string(),
            meeting_id.to_string(),
            draft.question.as_str(),
            draft.category.as_deref(),
            position,
        ],
    )?;
    load_question(conn, id)
}

fn load_meeting(conn: &Connection, owner: UserId, id: RecordId) -> RepoResult<Option<Meeting>> {
    let mut stmt = conn.prepare(&format!(
        "{MEETING_SELECT_SQL} WHERE id = ?1 AND user_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), owner.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_meeting_row(row)?));
    }
    Ok(None)
}

fn load_context_card(
    conn: &Connection,
    owner: UserId,
    id: RecordId,
) -> RepoResult<Option<ContextCard>> {
    let mut stmt = conn.prepare(&format!(
        "{CONTEXT_CARD_SELECT_SQL} WHERE id = ?1 AND user_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), owner.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_context_card_row(row)?));
    }
    Ok(None)
}

fn load_agenda_item(conn: &Connection, id: RecordId) -> RepoResult<AgendaItem> {
    conn.query_row(
        "SELECT id, meeting_id, item, position, completed FROM meeting_agenda WHERE id = ?1;",
        params![id.to_string()],
        |row| Ok(parse_agenda_row(row)),
    )?
}

fn load_note(conn: &Connection, id: RecordId) -> RepoResult<MeetingNote> {
    conn.query_row(
        "SELECT id, meeting_id, content, keywords, entities, industries, created_at
         FROM meeting_notes WHERE id = ?1;",
        params![id.to_string()],
        |row| Ok(parse_note_row(row)),
    )?
}

fn load_question(conn: &Connection, id: RecordId) -> RepoResult<MeetingQuestion> {
    conn.query_row(
        "SELECT id, meeting_id, question, category, answer, answered, position
         FROM meeting_questions WHERE id = ?1;",
        params![id.to_string()],
        |row| Ok(parse_question_row(row)),
    )?
}

fn load_follow_up(conn: &Connection, id: RecordId) -> RepoResult<MeetingFollowUp> {
    conn.query_row(
        "SELECT id, meeting_id, description, owner, due_date, completed
         FROM meeting_followups WHERE id = ?1;",
        params![id.to_string()],
        |row| Ok(parse_follow_up_row(row)),
    )?
}

fn list_attendees(conn: &Connection, meeting_id: RecordId) -> RepoResult<Vec<Attendee>> {
    let mut stmt = conn.prepare(
        "SELECT id, meeting_id, person_id, name, role
         FROM meeting_attendees WHERE meeting_id = ?1
         ORDER BY rowid ASC;",
    )?;
    let mut rows = stmt.query(params![meeting_id.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_attendee_row(row)?);
    }
    Ok(items)
}

fn list_agenda(conn: &Connection, meeting_id: RecordId) -> RepoResult<Vec<AgendaItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, meeting_id, item, position, completed
         FROM meeting_agenda WHERE meeting_id = ?1
         ORDER BY position ASC, id ASC;",
    )?;
    let mut rows = stmt.query(params![meeting_id.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_agenda_row(row)?);
    }
    Ok(items)
}

fn list_notes(conn: &Connection, meeting_id: RecordId) -> RepoResult<Vec<MeetingNote>> {
    let mut stmt = conn.prepare(
        "SELECT id, meeting_id, content, keywords, entities, industries, created_at
         FROM meeting_notes WHERE meeting_id = ?1
         ORDER BY created_at ASC, rowid ASC;",
    )?;
    let mut rows = stmt.query(params![meeting_id.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_note_row(row)?);
    }
    Ok(items)
}

fn list_questions(conn: &Connection, meeting_id: RecordId) -> RepoResult<Vec<MeetingQuestion>> {
    let mut stmt = conn.prepare(
        "SELECT id, meeting_id, question, category, answer, answered, position
         FROM meeting_questions WHERE meeting_id = ?1
         ORDER BY position ASC, id ASC;",
    )?;
    let mut rows = stmt.query(params![meeting_id.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_question_row(row)?);
    }
    Ok(items)
}

fn list_follow_ups(conn: &Connection, meeting_id: RecordId) -> RepoResult<Vec<MeetingFollowUp>> {
    let mut stmt = conn.prepare(
        "SELECT id, meeting_id, description, owner, due_date, completed
         FROM meeting_followups WHERE meeting_id = ?1
         ORDER BY completed ASC, rowid ASC;",
    )?;
    let mut rows = stmt.query(params![meeting_id.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_follow_up_row(row)?);
    }
    Ok(items)
}

fn parse_meeting_row(row: &Row<'_>) -> RepoResult<Meeting> {
    let status_raw: String = row.get("status")?;
    let status = MeetingStatus::parse(&status_raw).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid meeting status `{status_raw}`"))
    })?;
    Ok(Meeting {
        id: row_uuid(row, "id")?,
        user_id: row_uuid(row, "user_id")?,
        business_id: row_optional_uuid(row, "business_id")?,
        title: row.get("title")?,
        scheduled_at: row.get("scheduled_at")?,
        location: row.get("location")?,
        purpose: row.get("purpose")?,
        status,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_attendee_row(row: &Row<'_>) -> RepoResult<Attendee> {
    Ok(Attendee {
        id: row_uuid(row, "id")?,
        meeting_id: row_uuid(row, "meeting_id")?,
        person_id: row_optional_uuid(row, "person_id")?,
        name: row.get("name")?,
        role: row.get("role")?,
    })
}

fn parse_agenda_row(row: &Row<'_>) -> RepoResult<AgendaItem> {
    Ok(AgendaItem {
        id: row_uuid(row, "id")?,
        meeting_id: row_uuid(row, "meeting_id")?,
        item: row.get("item")?,
        position: row.get("position")?,
        completed: row_bool(row, "completed")?,
    })
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<MeetingNote> {
    Ok(MeetingNote {
        id: row_uuid(row, "id")?,
        meeting_id: row_uuid(row, "meeting_id")?,
        content: row.get("content")?,
        tags: row_tags(row)?,
        created_at: row.get("created_at")?,
    })
}

fn parse_question_row(row: &Row<'_>) -> RepoResult<MeetingQuestion> {
    Ok(MeetingQuestion {
        id: row_uuid(row, "id")?,
        meeting_id: row_uuid(row, "meeting_id")?,
        question: row.get("question")?,
        category: row.get("category")?,
        answer: row.get("answer")?,
        answered: row_bool(row, "answered")?,
        position: row.get("position")?,
    })
}

fn parse_follow_up_row(row: &Row<'_>) -> RepoResult<MeetingFollowUp> {
    Ok(MeetingFollowUp {
        id: row_uuid(row, "id")?,
        meeting_id: row_uuid(row, "meeting_id")?,
        description: row.get("description")?,
        owner: row.get("owner")?,
        due_date: row.get("due_date")?,
        completed: row_bool(row, "completed")?,
    })
}

fn parse_context_card_row(row: &Row<'_>) -> RepoResult<ContextCard> {
    Ok(ContextCard {
        id: row_uuid(row, "id")?,
        user_id: row_uuid(row, "user_id")?,
        meeting_id: row_optional_uuid(row, "meeting_id")?,
        person_id: row_optional_uuid(row, "person_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        card_type: row.get("card_type")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
