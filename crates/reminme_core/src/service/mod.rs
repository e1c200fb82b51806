//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the HTTP layer decoupled from storage details.

pub mod business_service;
pub mod meeting_service;
pub mod people_service;
pub mod planning_service;
pub mod strategy_service;
