//! Rule lifecycle for Jira Automation.
//!
//! [`RuleManager`] drives create, read, update, import and destroy over a
//! [`autorule_core::RuleApi`], using an [`autorule_codec::Codec`] to move
//! between specs and API JSON. Destroy only disables: the API cannot delete.

pub mod drift;
pub mod labels;
mod manager;
pub mod view;

pub use labels::MANAGED_LABEL;
pub use manager::RuleManager;
pub use view::Representation;
