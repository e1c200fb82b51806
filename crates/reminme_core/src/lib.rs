//! Core domain logic for ReminMe.
//! This crate is the single source of truth for storage, ownership scoping
//! and business invariants; transports stay thin on top of it.

pub mod auth;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use auth::{AuthError, AuthResult, IssuedToken, User};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::{ContentDraft, RecordId, Tags, UserId, ValidationError};
pub use repo::business_repo::{BusinessRepository, SqliteBusinessRepository};
pub use repo::meeting_repo::{
    ContextCardQuery, MeetingQuery, MeetingRepository, SqliteMeetingRepository,
};
pub use repo::people_repo::{
    EventQuery, FollowUpQuery, PeopleQuery, PeopleRepository, SqlitePeopleRepository,
};
pub use repo::planning_repo::{PlanningRepository, SqlitePlanningRepository, TaskQuery};
pub use repo::strategy_repo::{ResearchQuery, SqliteStrategyRepository, StrategyRepository};
pub use repo::{RepoError, RepoResult};
pub use service::business_service::BusinessService;
pub use service::meeting_service::MeetingService;
pub use service::people_service::PeopleService;
pub use service::planning_service::PlanningService;
pub use service::strategy_service::StrategyService;

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
