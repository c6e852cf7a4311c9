//! Scoping-context tracker.
//!
//! A stack of frames mirrors the block structure of the source: sections,
//! module types, modules, namespaces, and interactive proofs. The toplevel
//! is implicit (empty stack) and can never be popped. Closers are matched by
//! kind only; the trailing name on an `End` sentence is not checked against
//! the opener's name, so `End Wrong.` closes `Section Foo.` silently.
//!
//! A sentence that enters or exits a context is *consumed*: the caller must
//! not evaluate it against the policy. Everything else passes through.
//!
//! Proof frames carry the opener-discipline bookkeeping: a declaration that
//! opens a proof obligation either expects an explicit `Proof` line before
//! the script starts, or elides it (goals, interactive definitions, and
//! obligation-style proofs, whose opening line is the obligation itself).

use crate::classify::is_interactive;
use crate::error::ContextError;
use crate::matchers::{Matchers, GROUP_GOAL_STMT, GROUP_LEMMA_NAME, GROUP_NAME, GROUP_TRAILER};
use crate::models::Sentence;
use std::fmt;

/// The kind of an open scoping frame. The implicit toplevel has no kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Section,
    ModuleType,
    Module,
    Namespace,
    Proof,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContextKind::Section => "section",
            ContextKind::ModuleType => "module type",
            ContextKind::Module => "module",
            ContextKind::Namespace => "namespace",
            ContextKind::Proof => "proof",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
struct ProofState {
    /// Obligation-style proof: closing it arms `Next Obligation` chaining.
    program_definition: bool,
    /// The opening declaration stands in for the `Proof` line.
    elide_opener: bool,
    opener_seen: bool,
    missing_opener_reported: bool,
}

#[derive(Debug)]
struct Frame {
    kind: ContextKind,
    /// Opener name: the section/module/namespace identifier, or the name of
    /// the declaration that opened a proof.
    name: String,
    start_line: usize,
    end_line: usize,
    proof: Option<ProofState>,
}

/// Tracks the open frames across one file's sentence stream.
#[derive(Debug, Default)]
pub struct ContextMachine {
    stack: Vec<Frame>,
    /// Set when an obligation-style proof just closed, so a following
    /// `Next Obligation` opens the next one without a fresh declaration.
    obligation_chain: bool,
}

impl ContextMachine {
    pub fn new() -> Self {
        ContextMachine::default()
    }

    /// Kind of the innermost open frame, or `None` at toplevel.
    pub fn current_kind(&self) -> Option<ContextKind> {
        self.stack.last().map(|f| f.kind)
    }

    pub fn in_proof(&self) -> bool {
        self.current_kind() == Some(ContextKind::Proof)
    }

    /// Number of open frames. Nonzero at end of stream means the source
    /// left blocks unclosed; callers may surface that as they see fit.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Line range of the innermost open frame's declaration, for reporting.
    pub fn current_span(&self) -> Option<(usize, usize)> {
        self.stack.last().map(|f| (f.start_line, f.end_line))
    }

    /// The innermost proof expected an explicit `Proof` line and has not
    /// seen one. Returns the opening declaration's name, at most once per
    /// proof. Call only for sentences `apply` did not consume.
    pub fn missing_opener(&mut self) -> Option<String> {
        let frame = self.stack.last_mut()?;
        let proof = frame.proof.as_mut()?;
        if !proof.elide_opener && !proof.opener_seen && !proof.missing_opener_reported {
            proof.missing_opener_reported = true;
            Some(frame.name.clone())
        } else {
            None
        }
    }

    /// Advance the machine over one sentence. `Ok(true)` means the sentence
    /// was a context transition and is consumed.
    pub fn apply(&mut self, m: &Matchers, sentence: &Sentence) -> Result<bool, ContextError> {
        if self.try_entry(m, sentence)? {
            return Ok(true);
        }
        self.try_exit(m, sentence)
    }

    fn try_entry(&mut self, m: &Matchers, sentence: &Sentence) -> Result<bool, ContextError> {
        let text = &sentence.text;
        let line = sentence.start_line;
        let span = (sentence.start_line, sentence.end_line);

        let chain_armed = self.obligation_chain;
        let mut entered = false;

        // Proof-opening declarations. A declaration whose body is supplied
        // with `:=` opens nothing and falls through to the policy.
        if let Some(caps) = m.lemma.captures(text) {
            if !is_interactive(m, text) {
                return Ok(false);
            }
            let name = caps
                .name(GROUP_LEMMA_NAME)
                .map(|g| g.as_str().to_string())
                .unwrap_or_default();
            self.push_proof(name, span, m.program_at_start.is_match(text), false);
            entered = true;
        } else if m.anonymous_instance.is_match(text) {
            if !is_interactive(m, text) {
                return Ok(false);
            }
            self.push_proof(
                "<anonymous instance>".to_string(),
                span,
                m.program_at_start.is_match(text),
                false,
            );
            entered = true;
        } else if let Some(caps) = m.goal.captures(text) {
            let name = caps
                .name(GROUP_GOAL_STMT)
                .map(|g| g.as_str().trim().to_string())
                .unwrap_or_default();
            self.push_proof(name, span, false, true);
            entered = true;
        } else if m.program_at_start.is_match(text) {
            // Obligation proofs open with `Next Obligation`, never `Proof`.
            self.push_proof(first_word(text), span, true, true);
            entered = true;
        } else if (m.definition.is_match(text) || m.fixpoint.is_match(text))
            && is_interactive(m, text)
        {
            self.push_proof(first_word(text), span, false, true);
            entered = true;
        } else if m.equations_at_start.is_match(text) && is_interactive(m, text) {
            self.push_proof(first_word(text), span, true, true);
            entered = true;
        }

        // A one-sentence proof script closes the obligation it opened; an
        // elided proof may end without ever opening.
        if m.proof_oneliner.is_match(text)
            || (self.top_proof().is_some_and(|p| p.elide_opener) && m.proof_end.is_match(text))
        {
            // A dangling `Next Obligation` oneliner arrives outside any
            // proof; consume it without popping.
            if self.in_proof() {
                self.pop_proof(line)?;
            }
            return Ok(true);
        }

        if (self.in_proof() || chain_armed) && m.proof_begin.is_match(text) {
            if chain_armed && !self.in_proof() && m.next_obligation_at_start.is_match(text) {
                self.push_proof("Next Obligation".to_string(), span, true, true);
            }
            if let Some(proof) = self.top_proof_mut() {
                proof.opener_seen = true;
            }
            return Ok(true);
        }

        if entered {
            return Ok(true);
        }

        // Block openers. `Module`/`Module Type` with a `:=` body are
        // definitions, not blocks.
        if let Some(caps) = m.section_begin.captures(text) {
            self.push_block(ContextKind::Section, &caps[GROUP_NAME], span);
            return Ok(true);
        }
        // `Module Type` first: the plain module shape also matches it.
        if let Some(caps) = m.module_type_begin.captures(text) {
            if !is_interactive(m, text) {
                return Ok(false);
            }
            self.push_block(ContextKind::ModuleType, &caps[GROUP_NAME], span);
            return Ok(true);
        }
        if let Some(caps) = m.module_begin.captures(text) {
            if !is_interactive(m, text) {
                return Ok(false);
            }
            self.push_block(ContextKind::Module, &caps[GROUP_NAME], span);
            return Ok(true);
        }
        if let Some(caps) = m.namespace_begin.captures(text) {
            self.push_block(ContextKind::Namespace, &caps[GROUP_NAME], span);
            return Ok(true);
        }

        Ok(false)
    }

    fn try_exit(&mut self, m: &Matchers, sentence: &Sentence) -> Result<bool, ContextError> {
        let text = &sentence.text;
        let line = sentence.start_line;

        if m.proof_end.is_match(text) {
            if !self.in_proof() {
                return Err(self.mismatch(line, ContextKind::Proof));
            }
            self.pop_proof(line)?;
            return Ok(true);
        }

        if let Some(caps) = m.nest_end.captures(text) {
            match self.current_kind() {
                Some(
                    ContextKind::Section
                    | ContextKind::ModuleType
                    | ContextKind::Module
                    | ContextKind::Namespace,
                ) => {
                    self.stack.pop();
                }
                _ => {
                    return Err(ContextError::UnmatchedCloser {
                        line,
                        trailer: caps[GROUP_TRAILER].trim().to_string(),
                    });
                }
            }
            return Ok(true);
        }

        Ok(false)
    }

    fn top_proof(&self) -> Option<&ProofState> {
        self.stack.last().and_then(|f| f.proof.as_ref())
    }

    fn top_proof_mut(&mut self) -> Option<&mut ProofState> {
        self.stack.last_mut().and_then(|f| f.proof.as_mut())
    }

    fn push_proof(&mut self, name: String, span: (usize, usize), program: bool, elide: bool) {
        self.obligation_chain = false;
        self.stack.push(Frame {
            kind: ContextKind::Proof,
            name,
            start_line: span.0,
            end_line: span.1,
            proof: Some(ProofState {
                program_definition: program,
                // Obligation proofs always elide.
                elide_opener: elide || program,
                opener_seen: false,
                missing_opener_reported: false,
            }),
        });
    }

    fn push_block(&mut self, kind: ContextKind, name: &str, span: (usize, usize)) {
        self.stack.push(Frame {
            kind,
            name: name.to_string(),
            start_line: span.0,
            end_line: span.1,
            proof: None,
        });
    }

    fn pop_proof(&mut self, line: usize) -> Result<(), ContextError> {
        match self.stack.pop() {
            Some(frame) => {
                debug_assert_eq!(frame.kind, ContextKind::Proof);
                if frame.proof.as_ref().is_some_and(|p| p.program_definition) {
                    self.obligation_chain = true;
                }
                Ok(())
            }
            None => Err(ContextError::PoppedToplevel { line }),
        }
    }

    fn mismatch(&self, line: usize, requested: ContextKind) -> ContextError {
        match self.current_kind() {
            Some(current) => ContextError::KindMismatch {
                line,
                current,
                requested,
            },
            None => ContextError::PoppedToplevel { line },
        }
    }
}

fn first_word(text: &str) -> String {
    text.split_whitespace().next().unwrap_or("").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(text: &str, line: usize) -> Sentence {
        Sentence {
            text: text.to_string(),
            start_line: line,
            end_line: line,
            comments: Vec::new(),
            maybe_nested_comment: false,
        }
    }

    fn feed(machine: &mut ContextMachine, m: &Matchers, texts: &[&str]) -> Vec<bool> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| machine.apply(m, &sentence(t, i + 1)).unwrap())
            .collect()
    }

    #[test]
    fn test_section_open_and_close_consumed() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        assert_eq!(feed(&mut cm, &m, &["Section Foo."]), vec![true]);
        assert_eq!(cm.current_kind(), Some(ContextKind::Section));
        assert_eq!(feed(&mut cm, &m, &["End Foo."]), vec![true]);
        assert_eq!(cm.depth(), 0);
    }

    #[test]
    fn test_closer_name_not_checked() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        feed(&mut cm, &m, &["Section Foo.", "End Wrong."]);
        assert_eq!(cm.depth(), 0);
    }

    #[test]
    fn test_module_type_before_module() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        feed(&mut cm, &m, &["Module Type SIG."]);
        assert_eq!(cm.current_kind(), Some(ContextKind::ModuleType));
        feed(&mut cm, &m, &["End SIG.", "Module M."]);
        assert_eq!(cm.current_kind(), Some(ContextKind::Module));
    }

    #[test]
    fn test_module_definition_passes_through() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        assert_eq!(feed(&mut cm, &m, &["Module M := N."]), vec![false]);
        assert_eq!(cm.depth(), 0);
    }

    #[test]
    fn test_plain_sentence_passes_through() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        assert_eq!(feed(&mut cm, &m, &["Import Foo."]), vec![false]);
    }

    #[test]
    fn test_lemma_opens_proof_and_expects_opener() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        assert_eq!(feed(&mut cm, &m, &["Lemma foo : True."]), vec![true]);
        assert!(cm.in_proof());
        assert_eq!(feed(&mut cm, &m, &["Proof."]), vec![true]);
        assert_eq!(feed(&mut cm, &m, &["reflexivity."]), vec![false]);
        assert!(cm.missing_opener().is_none());
        assert_eq!(feed(&mut cm, &m, &["Qed."]), vec![true]);
        assert_eq!(cm.depth(), 0);
    }

    #[test]
    fn test_missing_opener_reported_once() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        feed(&mut cm, &m, &["Lemma foo : True.", "reflexivity."]);
        assert_eq!(cm.missing_opener().as_deref(), Some("foo"));
        feed(&mut cm, &m, &["assumption."]);
        assert!(cm.missing_opener().is_none());
        feed(&mut cm, &m, &["Qed."]);
        assert_eq!(cm.depth(), 0);
    }

    #[test]
    fn test_goal_elides_opener() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        feed(&mut cm, &m, &["Goal True.", "exact I."]);
        assert!(cm.missing_opener().is_none());
        feed(&mut cm, &m, &["Qed."]);
        assert_eq!(cm.depth(), 0);
    }

    #[test]
    fn test_terminal_instance_opens_nothing() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        assert_eq!(feed(&mut cm, &m, &["Instance foo : T := bar."]), vec![false]);
        assert_eq!(cm.depth(), 0);
    }

    #[test]
    fn test_interactive_instance_expects_opener() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        feed(&mut cm, &m, &["Instance foo : T.", "apply mk."]);
        assert_eq!(cm.missing_opener().as_deref(), Some("foo"));
    }

    #[test]
    fn test_proof_oneliner_closes_obligation() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        feed(&mut cm, &m, &["Lemma foo : True.", "Proof. exact I. Qed."]);
        assert_eq!(cm.depth(), 0);
        assert!(cm.missing_opener().is_none());
    }

    #[test]
    fn test_dangling_oneliner_consumed_without_popping() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        assert_eq!(feed(&mut cm, &m, &["Proof. exact I. Qed."]), vec![true]);
        assert_eq!(cm.depth(), 0);
    }

    #[test]
    fn test_obligation_chain() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        feed(&mut cm, &m, &["Program Definition f : nat := _."]);
        assert!(cm.in_proof());
        feed(&mut cm, &m, &["Next Obligation.", "exact 0.", "Qed."]);
        assert_eq!(cm.depth(), 0);
        // The chain stays armed across the closer.
        assert_eq!(
            feed(&mut cm, &m, &["Next Obligation.", "exact 1.", "Qed."]),
            vec![true, false, true]
        );
        assert_eq!(cm.depth(), 0);
        assert!(cm.missing_opener().is_none());
    }

    #[test]
    fn test_interactive_definition_elides_opener() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        feed(&mut cm, &m, &["Definition f : nat.", "exact 0.", "Defined."]);
        assert!(cm.missing_opener().is_none());
        assert_eq!(cm.depth(), 0);
    }

    #[test]
    fn test_stray_qed_is_kind_mismatch() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        feed(&mut cm, &m, &["Section Foo."]);
        let err = cm.apply(&m, &sentence("Qed.", 2)).unwrap_err();
        assert!(matches!(
            err,
            ContextError::KindMismatch {
                current: ContextKind::Section,
                requested: ContextKind::Proof,
                ..
            }
        ));
    }

    #[test]
    fn test_stray_qed_at_toplevel_pops_toplevel() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        let err = cm.apply(&m, &sentence("Qed.", 1)).unwrap_err();
        assert!(matches!(err, ContextError::PoppedToplevel { line: 1 }));
    }

    #[test]
    fn test_end_inside_proof_is_unmatched() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        feed(&mut cm, &m, &["Lemma l : True.", "Proof."]);
        let err = cm.apply(&m, &sentence("End Foo.", 3)).unwrap_err();
        match err {
            ContextError::UnmatchedCloser { line, trailer } => {
                assert_eq!(line, 3);
                assert_eq!(trailer, "Foo");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_namespace_frames() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        feed(&mut cm, &m, &["NES.Begin ns."]);
        assert_eq!(cm.current_kind(), Some(ContextKind::Namespace));
        feed(&mut cm, &m, &["NES.End ns."]);
        assert_eq!(cm.depth(), 0);
    }

    #[test]
    fn test_unclosed_frames_left_on_stack() {
        let m = Matchers::new();
        let mut cm = ContextMachine::new();
        feed(&mut cm, &m, &["Section A.", "Module B."]);
        assert_eq!(cm.depth(), 2);
        assert_eq!(cm.current_span(), Some((2, 2)));
    }
}
