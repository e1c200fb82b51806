//! Business, business contact, note and org chart persistence.
//!
//! # Responsibility
//! - Provide owner-scoped CRUD for businesses and their child rows.
//! - Persist org charts with whole-set replace semantics.
//!
//! # Invariants
//! - Child rows carry no owner column; access is scoped by joining the parent
//!   business on `user_id`.
//! - Org chart replace deletes and re-inserts in one transaction, so a failed
//!   save leaves the previous chart intact.

use crate::model::business::{
    Business, BusinessDraft, BusinessNote, BusinessPerson, BusinessPersonDraft, OrgChart,
    OrgChartDraft, OrgChartMeeting, OrgChartPerson, OrgChartTeam,
};
use crate::model::{RecordId, Tags, UserId};
use crate::repo::{
    begin_immediate, ensure_connection_ready, new_id, opt_id, row_optional_uuid, row_tags,
    row_uuid, to_json, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;

const BUSINESS_SELECT_SQL: &str = "SELECT
    id, user_id, name, industry, stage, website, description, notes, created_at, updated_at
FROM businesses";

const BUSINESS_PERSON_SELECT_SQL: &str = "SELECT
    bp.id, bp.business_id, bp.name, bp.role, bp.email, bp.notes, bp.created_at, bp.updated_at
FROM business_people bp
JOIN businesses b ON b.id = bp.business_id";

const BUSINESS_NOTE_SELECT_SQL: &str = "SELECT
    n.id, n.business_id, n.content, n.keywords, n.entities, n.industries, n.created_at
FROM business_notes n
JOIN businesses b ON b.id = n.business_id";

/// Repository interface for businesses and their child records.
pub trait BusinessRepository {
    fn create_business(&self, owner: UserId, draft: &BusinessDraft) -> RepoResult<Business>;
    fn update_business(
        &self,
        owner: UserId,
        id: RecordId,
        draft: &BusinessDraft,
    ) -> RepoResult<Business>;
    fn get_business(&self, owner: UserId, id: RecordId) -> RepoResult<Option<Business>>;
    fn list_businesses(&self, owner: UserId) -> RepoResult<Vec<Business>>;
    /// Deletes the business with its contacts, notes and org chart. Meetings
    /// and research results referencing it are detached.
    fn delete_business(&self, owner: UserId, id: RecordId) -> RepoResult<()>;

    fn add_business_person(
        &self,
        owner: UserId,
        business_id: RecordId,
        draft: &BusinessPersonDraft,
    ) -> RepoResult<BusinessPerson>;
    fn update_business_person(
        &self,
        owner: UserId,
        id: RecordId,
        draft: &BusinessPersonDraft,
    ) -> RepoResult<BusinessPerson>;
    fn list_business_people(
        &self,
        owner: UserId,
        business_id: RecordId,
    ) -> RepoResult<Vec<BusinessPerson>>;
    fn delete_business_person(&self, owner: UserId, id: RecordId) -> RepoResult<()>;

    fn add_business_note(
        &self,
        owner: UserId,
        business_id: RecordId,
        content: &str,
        tags: &Tags,
    ) -> RepoResult<BusinessNote>;
    fn list_business_notes(
        &self,
        owner: UserId,
        business_id: RecordId,
    ) -> RepoResult<Vec<BusinessNote>>;
    fn delete_business_note(&self, owner: UserId, id: RecordId) -> RepoResult<()>;

    fn get_org_chart(&self, owner: UserId, business_id: RecordId) -> RepoResult<OrgChart>;
    /// Replaces the whole org chart. An empty draft clears it.
    fn replace_org_chart(
        &self,
        owner: UserId,
        business_id: RecordId,
        draft: &OrgChartDraft,
    ) -> RepoResult<OrgChart>;
}

/// SQLite-backed business repository.
pub struct SqliteBusinessRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBusinessRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl BusinessRepository for SqliteBusinessRepository<'_> {
    fn create_business(&self, owner: UserId, draft: &BusinessDraft) -> RepoResult<Business> {
        let id = new_id();
        self.conn.execute(
            "INSERT INTO businesses (id, user_id, name, industry, stage, website, description, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                id.to_string(),
                owner.to_string(),
                draft.name.as_str(),
                draft.industry.as_deref(),
                draft.stage.as_deref(),
                draft.website.as_deref(),
                draft.description.as_deref(),
                draft.notes.as_deref(),
            ],
        )?;
        load_business(self.conn, owner, id)?.ok_or(RepoError::not_found("business", id))
    }

    fn update_business(
        &self,
        owner: UserId,
        id: RecordId,
        draft: &BusinessDraft,
    ) -> RepoResult<Business> {
        let changed = self.conn.execute(
            "UPDATE businesses
             SET
                name = ?3,
                industry = ?4,
                stage = ?5,
                website = ?6,
                description = ?7,
                notes = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND user_id = ?2;",
            params![
                id.to_string(),
                owner.to_string(),
                draft.name.as_str(),
                draft.industry.as_deref(),
                draft.stage.as_deref(),
                draft.website.as_deref(),
                draft.description.as_deref(),
                draft.notes.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("business", id));
        }
        load_business(self.conn, owner, id)?.ok_or(RepoError::not_found("business", id))
    }

    fn get_business(&self, owner: UserId, id: RecordId) -> RepoResult<Option<Business>> {
        load_business(self.conn, owner, id)
    }

    fn list_businesses(&self, owner: UserId) -> RepoResult<Vec<Business>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BUSINESS_SELECT_SQL} WHERE user_id = ?1 ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![owner.to_string()])?;
        let mut businesses = Vec::new();
        while let Some(row) = rows.next()? {
            businesses.push(parse_business_row(row)?);
        }
        Ok(businesses)
    }

    fn delete_business(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        let tx = begin_immediate(self.conn)?;
        ensure_business_owned(&tx, owner, id)?;

        let business_id = id.to_string();
        clear_org_chart(&tx, &business_id)?;
        tx.execute(
            "DELETE FROM business_people WHERE business_id = ?1;",
            params![business_id],
        )?;
        tx.execute(
            "DELETE FROM business_notes WHERE business_id = ?1;",
            params![business_id],
        )?;
        tx.execute(
            "UPDATE meetings SET business_id = NULL WHERE business_id = ?1 AND user_id = ?2;",
            params![business_id, owner.to_string()],
        )?;
        tx.execute(
            "UPDATE research_results SET business_id = NULL
             WHERE business_id = ?1 AND user_id = ?2;",
            params![business_id, owner.to_string()],
        )?;
        tx.execute(
            "DELETE FROM businesses WHERE id = ?1 AND user_id = ?2;",
            params![business_id, owner.to_string()],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn add_business_person(
        &self,
        owner: UserId,
        business_id: RecordId,
        draft: &BusinessPersonDraft,
    ) -> RepoResult<BusinessPerson> {
        ensure_business_owned(self.conn, owner, business_id)?;
        let id = new_id();
        self.conn.execute(
            "INSERT INTO business_people (id, business_id, name, role, email, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id.to_string(),
                business_id.to_string(),
                draft.name.as_str(),
                draft.role.as_deref(),
                draft.email.as_deref(),
                draft.notes.as_deref(),
            ],
        )?;
        load_business_person(self.conn, owner, id)?
            .ok_or(RepoError::not_found("business_person", id))
    }

    fn update_business_person(
        &self,
        owner: UserId,
        id: RecordId,
        draft: &BusinessPersonDraft,
    ) -> RepoResult<BusinessPerson> {
        let changed = self.conn.execute(
            "UPDATE business_people
             SET name = ?3, role = ?4, email = ?5, notes = ?6,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND business_id IN (SELECT id FROM businesses WHERE user_id = ?2);",
            params![
                id.to_string(),
                owner.to_string(),
                draft.name.as_str(),
                draft.role.as_deref(),
                draft.email.as_deref(),
                draft.notes.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("business_person", id));
        }
        load_business_person(self.conn, owner, id)?
            .ok_or(RepoError::not_found("business_person", id))
    }

    fn list_business_people(
        &self,
        owner: UserId,
        business_id: RecordId,
    ) -> RepoResult<Vec<BusinessPerson>> {
        ensure_business_owned(self.conn, owner, business_id)?;
        let mut stmt = self.conn.prepare(&format!(
            "{BUSINESS_PERSON_SELECT_SQL}
             WHERE bp.business_id = ?1 AND b.user_id = ?2
             ORDER BY bp.name COLLATE NOCASE ASC, bp.id ASC;"
        ))?;
        let mut rows = stmt.query(params![business_id.to_string(), owner.to_string()])?;
        let mut people = Vec::new();
        while let Some(row) = rows.next()? {
            people.push(parse_business_person_row(row)?);
        }
        Ok(people)
    }

    fn delete_business_person(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM business_people
             WHERE id = ?1
               AND business_id IN (SELECT id FROM businesses WHERE user_id = ?2);",
            params![id.to_string(), owner.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("business_person", id));
        }
        Ok(())
    }

    fn add_business_note(
        &self,
        owner: UserId,
        business_id: RecordId,
        content: &str,
        tags: &Tags,
    ) -> RepoResult<BusinessNote> {
        ensure_business_owned(self.conn, owner, business_id)?;
        let id = new_id();
        self.conn.execute(
            "INSERT INTO business_notes (id, business_id, content, keywords, entities, industries)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id.to_string(),
                business_id.to_string(),
                content,
                to_json(&tags.keywords)?,
                to_json(&tags.entities)?,
                to_json(&tags.industries)?,
            ],
        )?;
        let mut stmt = self.conn.prepare(&format!(
            "{BUSINESS_NOTE_SELECT_SQL} WHERE n.id = ?1 AND b.user_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), owner.to_string()])?;
        match rows.next()? {
            Some(row) => parse_business_note_row(row),
            None => Err(RepoError::not_found("business_note", id)),
        }
    }

    fn list_business_notes(
        &self,
        owner: UserId,
        business_id: RecordId,
    ) -> RepoResult<Vec<BusinessNote>> {
        ensure_business_owned(self.conn, owner, business_id)?;
        let mut stmt = self.conn.prepare(&format!(
            "{BUSINESS_NOTE_SELECT_SQL}
             WHERE n.business_id = ?1 AND b.user_id = ?2
             ORDER BY n.created_at DESC, n.id ASC;"
        ))?;
        let mut rows = stmt.query(params![business_id.to_string(), owner.to_string()])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_business_note_row(row)?);
        }
        Ok(notes)
    }

    fn delete_business_note(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM business_notes
             WHERE id = ?1
               AND business_id IN (SELECT id FROM businesses WHERE user_id = ?2);",
            params![id.to_string(), owner.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("business_note", id));
        }
        Ok(())
    }

    fn get_org_chart(&self, owner: UserId, business_id: RecordId) -> RepoResult<OrgChart> {
        ensure_business_owned(self.conn, owner, business_id)?;
        load_org_chart(self.conn, business_id)
    }

    fn replace_org_chart(
        &self,
        owner: UserId,
        business_id: RecordId,
        draft: &OrgChartDraft,
    ) -> RepoResult<OrgChart> {
        draft.validate()?;

        let tx = begin_immediate(self.conn)?;
        ensure_business_owned(&tx, owner, business_id)?;
        let business_key = business_id.to_string();
        clear_org_chart(&tx, &business_key)?;

        // People go in first without managers so `reports_to` can point
        // at any row of the new set.
        let mut person_ids: BTreeMap<&str, RecordId> = BTreeMap::new();
        let mut inserted_people = Vec::with_capacity(draft.people.len());
        for (index, person) in draft.people.iter().enumerate() {
            let id = new_id();
            tx.execute(
                "INSERT INTO org_chart_people (id, business_id, name, title, position)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    id.to_string(),
                    business_key,
                    person.name.trim(),
                    person.title.as_deref().map(str::trim),
                    index as i64,
                ],
            )?;
            if let Some(key) = person.key.as_deref() {
                person_ids.insert(key, id);
            }
            inserted_people.push(id);
        }
        for (person, id) in draft.people.iter().zip(&inserted_people) {
            let Some(target) = person.reports_to.as_deref() else {
                continue;
            };
            let manager = person_ids.get(target).copied();
            tx.execute(
                "UPDATE org_chart_people SET reports_to = ?2 WHERE id = ?1;",
                params![id.to_string(), opt_id(manager)],
            )?;
        }

        let mut team_ids: BTreeMap<&str, RecordId> = BTreeMap::new();
        for (index, team) in draft.teams.iter().enumerate() {
            let id = new_id();
            tx.execute(
                "INSERT INTO org_chart_teams (id, business_id, name, position)
                 VALUES (?1, ?2, ?3, ?4);",
                params![id.to_string(), business_key, team.name.trim(), index as i64],
            )?;
            for member_key in &team.member_keys {
                if let Some(person_id) = person_ids.get(member_key.as_str()) {
                    tx.execute(
                        "INSERT OR IGNORE INTO org_chart_team_members (team_id, person_id)
                         VALUES (?1, ?2);",
                        params![id.to_string(), person_id.to_string()],
                    )?;
                }
            }
            if let Some(key) = team.key.as_deref() {
                team_ids.insert(key, id);
            }
        }

        for (index, meeting) in draft.meetings.iter().enumerate() {
            let team_id = meeting
                .team_key
                .as_deref()
                .and_then(|key| team_ids.get(key).copied());
            tx.execute(
                "INSERT INTO org_chart_meetings (id, business_id, team_id, title, cadence, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    new_id().to_string(),
                    business_key,
                    opt_id(team_id),
                    meeting.title.trim(),
                    meeting.cadence.as_deref().map(str::trim),
                    index as i64,
                ],
            )?;
        }

        let chart = load_org_chart(&tx, business_id)?;
        tx.commit()?;
        Ok(chart)
    }
}

/// Fails with `NotFound("business")` unless the business exists for this owner.
pub(crate) fn ensure_business_owned(
    conn: &Connection,
    owner: UserId,
    business_id: RecordId,
) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM businesses WHERE id = ?1 AND user_id = ?2);",
        params![business_id.to_string(), owner.to_string()],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::not_found("business", business_id));
    }
    Ok(())
}

fn clear_org_chart(conn: &Connection, business_id: &str) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM org_chart_meetings WHERE business_id = ?1;",
        params![business_id],
    )?;
    conn.execute(
        "DELETE FROM org_chart_team_members
         WHERE team_id IN (SELECT id FROM org_chart_teams WHERE business_id = ?1);",
        params![business_id],
    )?;
    conn.execute(
        "DELETE FROM org_chart_teams WHERE business_id = ?1;",
        params![business_id],
    )?;
    conn.execute(
        "UPDATE org_chart_people SET reports_to = NULL WHERE business_id = ?1;",
        params![business_id],
    )?;
    conn.execute(
        "DELETE FROM org_chart_people WHERE business_id = ?1;",
        params![business_id],
    )?;
    Ok(())
}

fn load_org_chart(conn: &Connection, business_id: RecordId) -> RepoResult<OrgChart> {
    let business_key = business_id.to_string();

    let mut people = Vec::new();
    {
        let mut stmt = conn.prepare(
            "SELECT id, name, title, reports_to, position
             FROM org_chart_people
             WHERE business_id = ?1
             ORDER BY position ASC, id ASC;",
        )?;
        let mut rows = stmt.query(params![business_key])?;
        while let Some(row) = rows.next()? {
            people.push(OrgChartPerson {
                id: row_uuid(row, "id")?,
                name: row.get("name")?,
                title: row.get("title")?,
                reports_to: row_optional_uuid(row, "reports_to")?,
                position: row.get("position")?,
            });
        }
    }

    let mut teams = Vec::new();
    {
        let mut stmt = conn.prepare(
            "SELECT id, name, position
             FROM org_chart_teams
             WHERE business_id = ?1
             ORDER BY position ASC, id ASC;",
        )?;
        let mut rows = stmt.query(params![business_key])?;
        while let Some(row) = rows.next()? {
            teams.push(OrgChartTeam {
                id: row_uuid(row, "id")?,
                name: row.get("name")?,
                position: row.get("position")?,
                member_ids: Vec::new(),
            });
        }
    }
    {
        let mut stmt = conn.prepare(
            "SELECT m.team_id, m.person_id
             FROM org_chart_team_members m
             JOIN org_chart_people p ON p.id = m.person_id
             JOIN org_chart_teams t ON t.id = m.team_id
             WHERE t.business_id = ?1
             ORDER BY p.position ASC;",
        )?;
        let mut rows = stmt.query(params![business_key])?;
        while let Some(row) = rows.next()? {
            let team_id = row_uuid(row, "team_id")?;
            let person_id = row_uuid(row, "person_id")?;
            if let Some(team) = teams.iter_mut().find(|team| team.id == team_id) {
                team.member_ids.push(person_id);
            }
        }
    }

    let mut meetings = Vec::new();
    {
        let mut stmt = conn.prepare(
            "SELECT id, title, cadence, team_id, position
             FROM org_chart_meetings
             WHERE business_id = ?1
             ORDER BY position ASC, id ASC;",
        )?;
        let mut rows = stmt.query(params![business_key])?;
        while let Some(row) = rows.next()? {
            meetings.push(OrgChartMeeting {
                id: row_uuid(row, "id")?,
                title: row.get("title")?,
                cadence: row.get("cadence")?,
                team_id: row_optional_uuid(row, "team_id")?,
                position: row.get("position")?,
            });
        }
    }

    Ok(OrgChart {
        business_id,
        people,
        teams,
        meetings,
    })
}

fn load_business(conn: &Connection, owner: UserId, id: RecordId) -> RepoResult<Option<Business>> {
    let mut stmt = conn.prepare(&format!(
        "{BUSINESS_SELECT_SQL} WHERE id = ?1 AND user_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), owner.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_business_row(row)?));
    }
    Ok(None)
}

fn load_business_person(
    conn: &Connection,
    owner: UserId,
    id: RecordId,
) -> RepoResult<Option<BusinessPerson>> {
    let mut stmt = conn.prepare(&format!(
        "{BUSINESS_PERSON_SELECT_SQL} WHERE bp.id = ?1 AND b.user_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), owner.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_business_person_row(row)?));
    }
    Ok(None)
}

fn parse_business_row(row: &Row<'_>) -> RepoResult<Business> {
    Ok(Business {
        id: row_uuid(row, "id")?,
        user_id: row_uuid(row, "user_id")?,
        name: row.get("name")?,
        industry: row.get("industry")?,
        stage: row.get("stage")?,
        website: row.get("website")?,
        description: row.get("description")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_business_person_row(row: &Row<'_>) -> RepoResult<BusinessPerson> {
    Ok(BusinessPerson {
        id: row_uuid(row, "id")?,
        business_id: row_uuid(row, "business_id")?,
        name: row.get("name")?,
        role: row.get("role")?,
        email: row.get("email")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_business_note_row(row: &Row<'_>) -> RepoResult<BusinessNote> {
    Ok(BusinessNote {
        id: row_uuid(row, "id")?,
        business_id: row_uuid(row, "business_id")?,
        content: row.get("content")?,
        tags: row_tags(row)?,
        created_at: row.get("created_at")?,
    })
}
