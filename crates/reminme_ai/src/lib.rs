//! AI helpers for ReminMe.
//!
//! Everything here is async and storage-free: callers read context from
//! `reminme_core`, release their database lock, call into this crate, then
//! persist the result.

pub mod breakdown;
pub mod citations;
pub mod json;
pub mod linkedin;
pub mod organize;
pub mod provider;
pub mod questions;
pub mod research;
pub mod strategy;
pub mod tagging;
pub mod vector;

pub use breakdown::{breakdown_task, GeneratedSubtask, MAX_SUBTASKS};
pub use citations::{extract_citations, fetch_citations, Citation};
pub use linkedin::{parse_linkedin_profile, LinkedInProfile};
pub use organize::{
    organize_text, OrganizedEvent, OrganizedFollowUp, OrganizedNote, OrganizedPerson,
};
pub use provider::{
    build_http_client, AiError, ChatMessage, CompletionParams, CompletionProvider,
    OpenAiCompatibleClient, ProviderConfig, DEFAULT_TIMEOUT_SECS,
};
pub use questions::{generate_questions, question_count, GeneratedQuestion};
pub use research::{generate_research, ResearchOutcome, ResearchRequest, ResearchSuggestion};
pub use strategy::{generate_strategy, GeneratedStep, GeneratedStrategy, StrategyRequest};
pub use tagging::{tag_text, AiTags};
pub use vector::{EmbeddingClient, HttpVectorIndex, NoopVectorIndex, VectorIndex, VectorMatch};
