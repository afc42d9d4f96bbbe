//! Jira Automation API client for autorule.
//!
//! Implements [`autorule_core::RuleApi`] on top of the public Automation
//! REST API v1 and the internal rule-label API. Rule bodies are passed
//! through as JSON; the update path is a read-modify-write of the full rule
//! (see [`payload`]).

mod client;
pub mod payload;
mod wire;

pub use client::{AutomationClient, PUBLIC_API_HOST};
pub use wire::*;
