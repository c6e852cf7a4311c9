//! Structural style linter for Coq-like proof sources.
//!
//! This crate exposes programmatic APIs for linting proof files against
//! configurable allow/deny policies: sentences are recovered from the raw
//! text, tracked through their scoping contexts, and checked against the
//! policy table for the innermost context.
//!
//! High-level modules:
//! - `lexer`: Comment-erasing recovery of period-terminated sentences.
//! - `matchers`: The compiled pattern library and its policy-facing names.
//! - `classify`: Interactive-vs-terminal classification of declarations.
//! - `context`: Section/module/namespace/proof context tracking.
//! - `policy`: Compiled policies and their tiered evaluation order.
//! - `config`: Policy file loading (TOML/YAML/JSON) and built-in presets.
//! - `lint`: The linter driving the pieces above, plus parallel helpers.
//! - `models`: Data models for sentences, diagnostics, and policy specs.
//! - `error`: Fatal error tiers (the recoverable tier is `Diagnostic`).
//!
//! Note: All documentation comments are written in English by convention.
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod lexer;
pub mod lint;
pub mod matchers;
pub mod models;
pub mod policy;

pub use error::{ConfigError, ContextError, LexError, PartialLint, PolicyError};
pub use lint::Linter;
pub use matchers::PatternId;
pub use models::policy::PolicySpec;
pub use models::Diagnostic;
