//! Research result and conversation strategy persistence.
//!
//! # Invariants
//! - A strategy and its steps are inserted together or not at all.
//! - Steps are numbered from zero in the order they were generated.

use crate::model::strategy::{
    ConversationStep, ConversationStrategy, NewConversationStrategy, NewResearchResult,
    ResearchKind, ResearchResult, StrategyDetail,
};
use crate::model::{RecordId, UserId};
use crate::repo::business_repo::ensure_business_owned;
use crate::repo::people_repo::ensure_person_owned;
use crate::repo::{
    begin_immediate, ensure_connection_ready, new_id, opt_id, row_json, row_optional_uuid,
    row_uuid, to_json, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const RESEARCH_SELECT_SQL: &str = "SELECT
    id, user_id, business_id, kind, subject, query, summary, suggestions, citations, created_at
FROM research_results";

const STRATEGY_SELECT_SQL: &str = "SELECT
    id, user_id, person_id, situation, goal, summary, citations, created_at
FROM conversation_strategies";

/// Filter options for listing research results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResearchQuery {
    pub business_id: Option<RecordId>,
    pub kind: Option<ResearchKind>,
}

/// Repository interface for generated research and strategies.
pub trait StrategyRepository {
    fn insert_research(&self, owner: UserId, result: &NewResearchResult)
        -> RepoResult<ResearchResult>;
    fn get_research(&self, owner: UserId, id: RecordId) -> RepoResult<Option<ResearchResult>>;
    fn list_research(&self, owner: UserId, query: &ResearchQuery)
        -> RepoResult<Vec<ResearchResult>>;
    fn delete_research(&self, owner: UserId, id: RecordId) -> RepoResult<()>;

    /// Inserts the strategy and all of its steps in one transaction.
    fn insert_strategy(
        &self,
        owner: UserId,
        strategy: &NewConversationStrategy,
    ) -> RepoResult<StrategyDetail>;
    fn get_strategy(&self, owner: UserId, id: RecordId) -> RepoResult<Option<StrategyDetail>>;
    fn list_strategies(&self, owner: UserId) -> RepoResult<Vec<ConversationStrategy>>;
    fn delete_strategy(&self, owner: UserId, id: RecordId) -> RepoResult<()>;
}

/// SQLite-backed strategy repository.
pub struct SqliteStrategyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStrategyRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl StrategyRepository for SqliteStrategyRepository<'_> {
    fn insert_research(
        &self,
        owner: UserId,
        result: &NewResearchResult,
    ) -> RepoResult<ResearchResult> {
        if let Some(business_id) = result.business_id {
            ensure_business_owned(self.conn, owner, business_id)?;
        }
        let id = new_id();
        self.conn.execute(
            "INSERT INTO research_results (
                id, user_id, business_id, kind, subject, query, summary, suggestions, citations
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                id.to_string(),
                owner.to_string(),
                opt_id(result.business_id),
                result.kind.as_str(),
                result.subject.as_str(),
                result.query.as_str(),
                result.summary.as_deref(),
                to_json(&result.suggestions)?,
                to_json(&result.citations)?,
            ],
        )?;
        self.get_research(owner, id)?
            .ok_or(RepoError::not_found("research_result", id))
    }

    fn get_research(&self, owner: UserId, id: RecordId) -> RepoResult<Option<ResearchResult>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RESEARCH_SELECT_SQL} WHERE id = ?1 AND user_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), owner.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_research_row(row)?));
        }
        Ok(None)
    }

    fn list_research(
        &self,
        owner: UserId,
        query: &ResearchQuery,
    ) -> RepoResult<Vec<ResearchResult>> {
        let mut sql = format!("{RESEARCH_SELECT_SQL} WHERE user_id = ?");
        let mut bind_values = vec![Value::Text(owner.to_string())];
        if let Some(business_id) = query.business_id {
            sql.push_str(" AND business_id = ?");
            bind_values.push(Value::Text(business_id.to_string()));
        }
        if let Some(kind) = query.kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(Value::Text(kind.as_str().to_string()));
        }
        sql.push_str(" ORDER BY created_at DESC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(parse_research_row(row)?);
        }
        Ok(results)
    }

    fn delete_research(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM research_results WHERE id = ?1 AND user_id = ?2;",
            params![id.to_string(), owner.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("research_result", id));
        }
        Ok(())
    }

    fn insert_strategy(
        &self,
        owner: UserId,
        strategy: &NewConversationStrategy,
    ) -> RepoResult<StrategyDetail> {
        let tx = begin_immediate(self.conn)?;
        if let Some(person_id) = strategy.person_id {
            ensure_person_owned(&tx, owner, person_id)?;
        }

        let id = new_id();
        tx.execute(
            "INSERT INTO conversation_strategies (
                id, user_id, person_id, situation, goal, summary, citations
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                id.to_string(),
                owner.to_string(),
                opt_id(strategy.person_id),
                strategy.situation.as_str(),
                strategy.goal.as_str(),
                strategy.summary.as_deref(),
                to_json(&strategy.citations)?,
            ],
        )?;
        for (position, step) in strategy.steps.iter().enumerate() {
            tx.execute(
                "INSERT INTO conversation_steps (
                    id, strategy_id, position, title, description, sample_phrase
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    new_id().to_string(),
                    id.to_string(),
                    position as i64,
                    step.title.as_str(),
                    step.description.as_deref(),
                    step.sample_phrase.as_deref(),
                ],
            )?;
        }

        let detail =
            load_strategy_detail(&tx, owner, id)?.ok_or(RepoError::not_found("strategy", id))?;
        tx.commit()?;
        Ok(detail)
    }

    fn get_strategy(&self, owner: UserId, id: RecordId) -> RepoResult<Option<StrategyDetail>> {
        load_strategy_detail(self.conn, owner, id)
    }

    fn list_strategies(&self, owner: UserId) -> RepoResult<Vec<ConversationStrategy>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STRATEGY_SELECT_SQL} WHERE user_id = ?1 ORDER BY created_at DESC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![owner.to_string()])?;
        let mut strategies = Vec::new();
        while let Some(row) = rows.next()? {
            strategies.push(parse_strategy_row(row)?);
        }
        Ok(strategies)
    }

    fn delete_strategy(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        let tx = begin_immediate(self.conn)?;
        tx.execute(
            "DELETE FROM conversation_steps
             WHERE strategy_id IN (
                SELECT id FROM conversation_strategies WHERE id = ?1 AND user_id = ?2
             );",
            params![id.to_string(), owner.to_string()],
        )?;
        let removed = tx.execute(
            "DELETE FROM conversation_strategies WHERE id = ?1 AND user_id = ?2;",
            params![id.to_string(), owner.to_string()],
        )?;
        if removed == 0 {
            return Err(RepoError::not_found("strategy", id));
        }
        tx.commit()?;
        Ok(())
    }
}

fn load_strategy_detail(
    conn: &Connection,
    owner: UserId,
    id: RecordId,
) -> RepoResult<Option<StrategyDetail>> {
    let strategy = {
        let mut stmt = conn.prepare(&format!(
            "{STRATEGY_SELECT_SQL} WHERE id = ?1 AND user_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), owner.to_string()])?;
        match rows.next()? {
            Some(row) => parse_strategy_row(row)?,
            None => return Ok(None),
        }
    };

    let mut stmt = conn.prepare(
        "SELECT id, strategy_id, position, title, description, sample_phrase
         FROM conversation_steps
         WHERE strategy_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query(params![id.to_string()])?;
    let mut steps = Vec::new();
    while let Some(row) = rows.next()? {
        steps.push(ConversationStep {
            id: row_uuid(row, "id")?,
            strategy_id: row_uuid(row, "strategy_id")?,
            position: row.get("position")?,
            title: row.get("title")?,
            description: row.get("description")?,
            sample_phrase: row.get("sample_phrase")?,
        });
    }

    Ok(Some(StrategyDetail { strategy, steps }))
}

fn parse_research_row(row: &Row<'_>) -> RepoResult<ResearchResult> {
    let kind_raw: String = row.get("kind")?;
    let kind = ResearchKind::parse(&kind_raw)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid research kind `{kind_raw}`")))?;
    Ok(ResearchResult {
        id: row_uuid(row, "id")?,
        user_id: row_uuid(row, "user_id")?,
        business_id: row_optional_uuid(row, "business_id")?,
        kind,
        subject: row.get("subject")?,
        query: row.get("query")?,
        summary: row.get("summary")?,
        suggestions: row_json(row, "suggestions")?,
        citations: row_json(row, "citations")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_strategy_row(row: &Row<'_>) -> RepoResult<ConversationStrategy> {
    Ok(ConversationStrategy {
        id: row_uuid(row, "id")?,
        user_id: row_uuid(row, "user_id")?,
        person_id: row_optional_uuid(row, "person_id")?,
        situation: row.get("situation")?,
        goal: row.get("goal")?,
        summary: row.get("summary")?,
        citations: row_json(row, "citations")?,
        created_at: row.get("created_at")?,
    })
}
