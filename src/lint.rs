//! The linter proper: drives the sentence lexer through the context machine
//! and evaluates the surviving sentences against the policy.
//!
//! Per sentence:
//! 1. advance the context machine; a sentence that enters or exits a
//!    context is consumed and never policy-checked,
//! 2. skip evaluation entirely when an erased comment carries the
//!    `[[NOLINT]]` marker,
//! 3. report a proof whose expected `Proof` line never arrived (once per
//!    proof, at the first checked sentence of its script),
//! 4. evaluate the sentence against the contextual policy.
//!
//! Fatal lexer or context errors abort the file but keep the diagnostics
//! collected so far.

use crate::context::ContextMachine;
use crate::error::{PartialLint, PolicyError};
use crate::lexer::{SentenceLexer, NOLINT_MARKER};
use crate::matchers::Matchers;
use crate::models::policy::PolicySpec;
use crate::models::Diagnostic;
use crate::policy::Policy;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub struct Linter {
    matchers: Matchers,
    policy: Policy,
}

impl Linter {
    /// Compile a linter from a policy spec.
    pub fn new(spec: &PolicySpec) -> Result<Self, PolicyError> {
        Ok(Linter {
            matchers: Matchers::new(),
            policy: Policy::build(spec)?,
        })
    }

    /// Lint one open text resource. `file` is used in error reports only.
    pub fn run<R: BufRead>(&self, file: &str, reader: R) -> Result<Vec<Diagnostic>, PartialLint> {
        let mut lexer = SentenceLexer::new(file, reader);
        let mut machine = ContextMachine::new();
        let mut diagnostics = Vec::new();

        loop {
            let sentence = match lexer.next_sentence(machine.in_proof()) {
                Ok(Some(sentence)) => sentence,
                Ok(None) => break,
                Err(cause) => {
                    return Err(PartialLint::new(file, cause.into(), diagnostics));
                }
            };

            let consumed = match machine.apply(&self.matchers, &sentence) {
                Ok(consumed) => consumed,
                Err(cause) => {
                    return Err(PartialLint::new(file, cause.into(), diagnostics));
                }
            };
            if consumed || sentence.has_marker(NOLINT_MARKER) {
                continue;
            }

            if let Some(name) = machine.missing_opener() {
                diagnostics.push(Diagnostic::new(
                    format!(
                        "Expected [Proof] line for [{name}] but found:\n|{}",
                        sentence.text.replace('\n', "\n|")
                    ),
                    sentence.start_line,
                    sentence.end_line,
                ));
            }

            if let Some(diagnostic) =
                self.policy
                    .evaluate(&self.matchers, machine.current_kind(), &sentence)
            {
                diagnostics.push(diagnostic);
            }
        }

        Ok(diagnostics)
    }

    /// Lint a file on disk. An unreadable file reports as an aborted run
    /// with no diagnostics.
    pub fn lint_path(&self, path: &Path) -> Result<Vec<Diagnostic>, PartialLint> {
        let file = path.display().to_string();
        match File::open(path) {
            Ok(f) => self.run(&file, BufReader::new(f)),
            Err(source) => Err(PartialLint::new(
                &file,
                crate::error::LexError::Io { file: file.clone(), source }.into(),
                Vec::new(),
            )),
        }
    }

    /// Lint many files in parallel, keyed by path in sorted order.
    pub fn lint_paths(
        &self,
        paths: &[PathBuf],
    ) -> BTreeMap<PathBuf, Result<Vec<Diagnostic>, PartialLint>> {
        paths
            .par_iter()
            .map(|path| (path.clone(), self.lint_path(path)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::error::{FatalCause, LexError};
    use std::io::Cursor;
    use std::io::Write;

    fn lint(spec: &PolicySpec, input: &str) -> Vec<Diagnostic> {
        Linter::new(spec)
            .unwrap()
            .run("test.v", Cursor::new(input))
            .unwrap()
    }

    #[test]
    fn test_permissive_admits_everything() {
        let input = "Import Foo.\nSet Printing All.\nDefinition f := 1.\n";
        assert!(lint(&config::permissive(), input).is_empty());
    }

    #[test]
    fn test_from_clause_denied() {
        let diags = lint(&config::no_from_imports(), "From X Import Y.\n");
        assert_eq!(diags.len(), 1);
        assert!(diags[0]
            .message
            .starts_with("The [From] keyword should not be used"));
        assert!(diags[0].message.contains("|From X Import Y."));
    }

    #[test]
    fn test_plain_import_eagerly_admitted() {
        // `Import Foo.` matches the denied broad import pattern too; the
        // eager allow on the From-less form wins.
        let diags = lint(
            &config::no_from_imports(),
            "Import Foo.\nExport Bar.\nRequire Import Baz.\n",
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_fallback_for_unconfigured_sentence() {
        let diags = lint(&PolicySpec::default(), "Import Foo.\n");
        assert_eq!(diags.len(), 1);
        assert!(diags[0]
            .message
            .starts_with("the linting policy needs to be extended"));
    }

    #[test]
    fn test_clean_code_proof_file() {
        let input = "\
Import proofs.prelude.
Section with_ctx.
Context (x : nat).
Lemma foo : x = x.
Proof.
reflexivity.
Qed.
End with_ctx.
";
        assert!(lint(&config::code_proof(), input).is_empty());
    }

    #[test]
    fn test_code_proof_denies_definitions() {
        let diags = lint(&config::code_proof(), "Definition f := 1.\n");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.starts_with("Upstream this [Definition]"));
    }

    #[test]
    fn test_code_proof_allows_hints_mid_proof_only() {
        let input = "\
Lemma foo : True.
Proof.
Hint Resolve bar : db.
exact I.
Qed.
Hint Resolve bar : db.
";
        let diags = lint(&config::code_proof(), input);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].start_line, 6);
        assert!(diags[0]
            .message
            .starts_with("Hints should be [#[export]]ed from some hint module"));
    }

    #[test]
    fn test_missing_opener_reported_once_at_first_tactic() {
        let input = "Lemma foo : True.\nreflexivity.\nreflexivity.\nQed.\n";
        let diags = lint(&config::permissive(), input);
        assert_eq!(diags.len(), 1);
        assert!(diags[0]
            .message
            .starts_with("Expected [Proof] line for [foo] but found"));
        assert_eq!((diags[0].start_line, diags[0].end_line), (2, 2));
    }

    #[test]
    fn test_opened_proof_reports_nothing() {
        let input = "Lemma foo : True.\nProof.\nreflexivity.\nQed.\n";
        assert!(lint(&config::permissive(), input).is_empty());
    }

    #[test]
    fn test_nolint_suppresses_policy_and_opener_check() {
        let input = "\
Lemma foo : True.
(* [[NOLINT]] *) reflexivity.
reflexivity.
Qed.
";
        let diags = lint(&config::permissive(), input);
        // The suppressed sentence reports nothing; the check is not
        // disarmed, so the next tactic still reports.
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].start_line, 3);
    }

    #[test]
    fn test_nolint_suppresses_denial() {
        let input = "(* [[NOLINT]] *)\nDefinition f := 1.\n";
        assert!(lint(&config::code_proof(), input).is_empty());
    }

    #[test]
    fn test_nolint_does_not_block_context_transitions() {
        let input = "(* [[NOLINT]] *)\nSection Foo.\nDefinition f := 1.\nEnd Foo.\n";
        let diags = lint(&config::code_proof(), input);
        // The section still opened; only the first sentence was suppressed.
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].start_line, 3);
    }

    #[test]
    fn test_partial_lint_preserves_diagnostics() {
        let input = "Definition f := 1.\n(* never closed\n";
        let err = Linter::new(&config::code_proof())
            .unwrap()
            .run("test.v", Cursor::new(input))
            .unwrap_err();
        assert!(err.likely_nested_comment);
        assert!(matches!(
            err.cause,
            FatalCause::Lex(LexError::UnbalancedOpen { .. })
        ));
        assert_eq!(err.diagnostics.len(), 1);
        assert!(err.diagnostics[0]
            .message
            .starts_with("Upstream this [Definition]"));
    }

    #[test]
    fn test_context_error_is_not_nested_comment_suspect() {
        let err = Linter::new(&config::permissive())
            .unwrap()
            .run("test.v", Cursor::new("Qed.\n"))
            .unwrap_err();
        assert!(!err.likely_nested_comment);
        assert!(matches!(err.cause, FatalCause::Context(_)));
    }

    #[test]
    fn test_identical_input_yields_identical_diagnostics() {
        let input = "Lemma foo : True.\nreflexivity.\nQed.\nFrom X Import Y.\n";
        let a = lint(&config::no_from_imports(), input);
        let b = lint(&config::no_from_imports(), input);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_lint_path_missing_file() {
        let linter = Linter::new(&config::permissive()).unwrap();
        let err = linter.lint_path(Path::new("/nonexistent/file.v")).unwrap_err();
        assert!(matches!(err.cause, FatalCause::Lex(LexError::Io { .. })));
        assert!(!err.likely_nested_comment);
        assert!(err.diagnostics.is_empty());
    }

    #[test]
    fn test_lint_paths_keyed_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let clean = dir.path().join("clean.v");
        let dirty = dir.path().join("dirty.v");
        std::fs::File::create(&clean)
            .unwrap()
            .write_all(b"Import Foo.\n")
            .unwrap();
        std::fs::File::create(&dirty)
            .unwrap()
            .write_all(b"From X Import Y.\n")
            .unwrap();

        let linter = Linter::new(&config::no_from_imports()).unwrap();
        let results = linter.lint_paths(&[clean.clone(), dirty.clone()]);
        assert_eq!(results.len(), 2);
        assert!(results[&clean].as_ref().unwrap().is_empty());
        assert_eq!(results[&dirty].as_ref().unwrap().len(), 1);
    }
}
