//! ALT - AI Localization Tool
//!
//! Translates a reference string table into any number of target languages
//! through an AI provider, retranslating only what changed since the last
//! run and never overwriting hand-edited translations.

pub mod cache;
pub mod cli;
pub mod config;
pub mod context_keys;
pub mod error;
pub mod executor;
pub mod hash;
pub mod messages;
pub mod persist;
pub mod pipeline;
pub mod provider;
pub mod queue;
pub mod reference;
pub mod state;
pub mod template;
