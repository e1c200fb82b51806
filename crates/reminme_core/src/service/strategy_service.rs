//! Research and conversation strategy use-case service.
//!
//! # Responsibility
//! - Persist generated research and strategies after shape checks.
//! - Gather owner context used to ground strategy generation.

use crate::model::person::{Memory, Person};
use crate::model::strategy::{
    ConversationStrategy, NewConversationStrategy, NewResearchResult, ResearchResult,
    StrategyDetail,
};
use crate::model::{require_text, RecordId, UserId};
use crate::repo::strategy_repo::{ResearchQuery, StrategyRepository};
use crate::repo::{RepoError, RepoResult};

/// Use-case service for generated research and strategies.
pub struct StrategyService<R: StrategyRepository> {
    repo: R,
}

impl<R: StrategyRepository> StrategyService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn record_research(
        &self,
        owner: UserId,
        result: NewResearchResult,
    ) -> RepoResult<ResearchResult> {
        require_text("subject", &result.subject)?;
        self.repo.insert_research(owner, &result)
    }

    pub fn get_research(&self, owner: UserId, id: RecordId) -> RepoResult<ResearchResult> {
        self.repo
            .get_research(owner, id)?
            .ok_or(RepoError::not_found("research_result", id))
    }

    pub fn list_research(
        &self,
        owner: UserId,
        query: &ResearchQuery,
    ) -> RepoResult<Vec<ResearchResult>> {
        self.repo.list_research(owner, query)
    }

    pub fn delete_research(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        self.repo.delete_research(owner, id)
    }

    /// Persists a strategy with its steps. Steps without a title are dropped.
    pub fn record_strategy(
        &self,
        owner: UserId,
        mut strategy: NewConversationStrategy,
    ) -> RepoResult<StrategyDetail> {
        require_text("situation", &strategy.situation)?;
        require_text("goal", &strategy.goal)?;
        strategy.steps.retain(|step| !step.title.trim().is_empty());
        self.repo.insert_strategy(owner, &strategy)
    }

    pub fn get_strategy(&self, owner: UserId, id: RecordId) -> RepoResult<StrategyDetail> {
        self.repo
            .get_strategy(owner, id)?
            .ok_or(RepoError::not_found("strategy", id))
    }

    pub fn list_strategies(&self, owner: UserId) -> RepoResult<Vec<ConversationStrategy>> {
        self.repo.list_strategies(owner)
    }

    pub fn delete_strategy(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        self.repo.delete_strategy(owner, id)
    }
}

/// Context snippets collected for a strategy prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyContext {
    pub meetings: Vec<String>,
    pub memories: Vec<String>,
    pub people: Vec<String>,
}

impl StrategyContext {
    pub fn is_empty(&self) -> bool {
        self.meetings.is_empty() && self.memories.is_empty() && self.people.is_empty()
    }
}

/// One line per person: name plus whichever of role, company and
/// relationship is known.
pub fn describe_person(person: &Person) -> String {
    let details: Vec<&str> = [
        person.role.as_deref(),
        person.company.as_deref(),
        person.relationship.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();
    if details.is_empty() {
        person.name.clone()
    } else {
        format!("{} ({})", person.name, details.join(", "))
    }
}

pub fn describe_memory(memory: &Memory) -> String {
    memory.content.clone()
}

#[cfg(test)]
mod tests {
    use super::describe_person;
    use crate::model::person::Person;
    use crate::model::Tags;
    use uuid::Uuid;

    #[test]
    fn person_description_skips_unknown_fields() {
        let person = Person {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Grace".to_string(),
            relationship: None,
            company: Some("Navy".to_string()),
            role: Some("Admiral".to_string()),
            email: None,
            phone: None,
            notes: None,
            linkedin_url: None,
            tags: Tags::default(),
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(describe_person(&person), "Grace (Admiral, Navy)");
    }
}
