//! Compiled linting policy and its evaluation order.
//!
//! A policy is one allow/deny table per scoping context plus a global
//! table. Tables are compiled from their serde shape with conflict checks:
//! precedence is eager-allow > deny > allow, and an extension may never
//! weaken an existing entry (allowing a denied pattern, or denying an
//! eagerly-allowed one).
//!
//! Evaluation interleaves the context table with the global one, strongest
//! tier first: context eager-allow, global eager-allow, context deny, global
//! deny, context allow, global allow. A sentence no tier claims falls
//! through to a fixed "extend the policy" violation, so an unconfigured
//! construct is always surfaced rather than silently admitted.

use crate::context::ContextKind;
use crate::error::PolicyError;
use crate::matchers::{Matchers, PatternId};
use crate::models::policy::{AllowDenySpec, PolicySpec};
use crate::models::{Diagnostic, Sentence};

const FALLBACK_MESSAGE: &str = "the linting policy needs to be extended";

/// One compiled allow/deny table.
#[derive(Debug, Default, Clone)]
pub struct AllowDenyPolicy {
    eager_allow: Vec<PatternId>,
    allow: Vec<PatternId>,
    deny: Vec<(PatternId, String)>,
}

impl AllowDenyPolicy {
    /// Add an allow entry. Fails if the pattern is already denied or
    /// eagerly allowed, since the stronger tier would shadow it.
    pub fn push_allow(&mut self, id: PatternId) -> Result<(), PolicyError> {
        if self.eager_allow.contains(&id) || self.deny.iter().any(|(d, _)| *d == id) {
            return Err(PolicyError::AllowConflict(id));
        }
        if !self.allow.contains(&id) {
            self.allow.push(id);
        }
        Ok(())
    }

    /// Add a deny entry. Fails if the pattern is eagerly allowed.
    pub fn push_deny(&mut self, id: PatternId, message: &str) -> Result<(), PolicyError> {
        if self.eager_allow.contains(&id) {
            return Err(PolicyError::DenyConflict(id));
        }
        self.allow.retain(|a| *a != id);
        if !self.deny.iter().any(|(d, _)| *d == id) {
            self.deny.push((id, message.to_string()));
        }
        Ok(())
    }

    /// Add an eager-allow entry. Strongest tier; displaces weaker entries
    /// for the same pattern.
    pub fn push_eager_allow(&mut self, id: PatternId) {
        self.allow.retain(|a| *a != id);
        self.deny.retain(|(d, _)| *d != id);
        if !self.eager_allow.contains(&id) {
            self.eager_allow.push(id);
        }
    }

    fn extend(&mut self, spec: &AllowDenySpec) -> Result<(), PolicyError> {
        for &id in &spec.eager_allow {
            self.push_eager_allow(id);
        }
        for entry in &spec.deny {
            self.push_deny(entry.pattern, &entry.message)?;
        }
        for &id in &spec.allow {
            self.push_allow(id)?;
        }
        Ok(())
    }

    fn eager_allows(&self, m: &Matchers, text: &str) -> bool {
        self.eager_allow.iter().any(|&id| m.get(id).is_match(text))
    }

    fn allows(&self, m: &Matchers, text: &str) -> bool {
        self.allow.iter().any(|&id| m.get(id).is_match(text))
    }

    fn denies(&self, m: &Matchers, text: &str) -> Option<&str> {
        self.deny
            .iter()
            .find(|(id, _)| m.get(*id).is_match(text))
            .map(|(_, msg)| msg.as_str())
    }
}

/// The compiled policy for a whole run.
#[derive(Debug, Default, Clone)]
pub struct Policy {
    global: AllowDenyPolicy,
    section: AllowDenyPolicy,
    module_type: AllowDenyPolicy,
    module: AllowDenyPolicy,
    namespace: AllowDenyPolicy,
    proof: AllowDenyPolicy,
}

impl Policy {
    /// Compile a policy from its serde shape.
    pub fn build(spec: &PolicySpec) -> Result<Self, PolicyError> {
        let mut policy = Policy::default();
        policy.extend(spec)?;
        Ok(policy)
    }

    /// Layer another spec on top, table by table. Conflict checks apply
    /// against the entries already present.
    pub fn extend(&mut self, spec: &PolicySpec) -> Result<(), PolicyError> {
        self.global.extend(&spec.global)?;
        self.section.extend(&spec.section)?;
        self.module_type.extend(&spec.module_type)?;
        self.module.extend(&spec.module)?;
        self.namespace.extend(&spec.namespace)?;
        self.proof.extend(&spec.proof)?;
        Ok(())
    }

    fn for_kind(&self, kind: ContextKind) -> &AllowDenyPolicy {
        match kind {
            ContextKind::Section => &self.section,
            ContextKind::ModuleType => &self.module_type,
            ContextKind::Module => &self.module,
            ContextKind::Namespace => &self.namespace,
            ContextKind::Proof => &self.proof,
        }
    }

    /// Evaluate a sentence in its context. `None` means admitted.
    pub fn evaluate(
        &self,
        m: &Matchers,
        kind: Option<ContextKind>,
        sentence: &Sentence,
    ) -> Option<Diagnostic> {
        let ctx = kind.map(|k| self.for_kind(k));
        let text = &sentence.text;

        if ctx.is_some_and(|p| p.eager_allows(m, text)) || self.global.eager_allows(m, text) {
            return None;
        }
        let denied = ctx
            .and_then(|p| p.denies(m, text))
            .or_else(|| self.global.denies(m, text));
        if let Some(message) = denied {
            return Some(violation(message, sentence));
        }
        if ctx.is_some_and(|p| p.allows(m, text)) || self.global.allows(m, text) {
            return None;
        }
        Some(violation(FALLBACK_MESSAGE, sentence))
    }
}

/// A violation quotes the offending sentence with each line gutter-prefixed.
fn violation(message: &str, sentence: &Sentence) -> Diagnostic {
    Diagnostic::new(
        format!("{message}:\n|{}", sentence.text.replace('\n', "\n|")),
        sentence.start_line,
        sentence.end_line,
    )
}
