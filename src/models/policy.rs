//! Serde-facing shape of a linting policy.
//!
//! A policy file carries one table per scoping context plus a global table.
//! Each table lists pattern names under three tiers; the tiers and their
//! precedence are enforced when the tables are compiled, not here.

use crate::matchers::PatternId;
use serde::{Deserialize, Serialize};

/// One allow/deny table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AllowDenySpec {
    /// Allowed ahead of every deny rule.
    pub eager_allow: Vec<PatternId>,
    pub allow: Vec<PatternId>,
    pub deny: Vec<DenySpec>,
}

/// A denied pattern and the message attached to its violations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DenySpec {
    pub pattern: PatternId,
    pub message: String,
}

/// A complete policy: the global table plus one per context kind. Missing
/// tables default to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PolicySpec {
    pub global: AllowDenySpec,
    pub section: AllowDenySpec,
    pub module_type: AllowDenySpec,
    pub module: AllowDenySpec,
    pub namespace: AllowDenySpec,
    pub proof: AllowDenySpec,
}
