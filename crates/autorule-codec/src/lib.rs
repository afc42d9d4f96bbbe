//! Rule codec for Jira Automation.
//!
//! Translates the friendly rule representation ([`autorule_core::RuleSpec`])
//! to the component JSON the Automation API stores and back:
//!
//! - [`alias`]: field alias substitution in argument values
//! - [`catalog`]: supported trigger and action kinds
//! - [`trigger`], [`action`], [`condition`]: per-kind builders and parsers
//! - [`codec`]: the [`Codec`] that walks whole component lists
//! - [`canonical`]: normalization used for drift comparison

pub mod action;
pub mod alias;
pub mod canonical;
pub mod catalog;
pub mod codec;
pub mod condition;
pub mod trigger;

pub use alias::AliasMap;
pub use canonical::{canonical_value, canonicalize, canonicalize_str};
pub use catalog::{ActionKind, Catalog, TriggerKind};
pub use codec::{BuildContext, Codec, WebhookCredentials};
