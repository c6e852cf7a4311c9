//! Two-tier error model.
//!
//! Recoverable problems (policy mismatches) become `Diagnostic`s and never
//! surface here. This module covers the fatal tier — errors that abort one
//! file's run while preserving the diagnostics collected so far — plus the
//! eager configuration errors raised before any file is linted.

use crate::context::ContextKind;
use crate::matchers::PatternId;
use crate::models::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal lexer errors. The sentence stream cannot continue past these.
#[derive(Debug, Error)]
pub enum LexError {
    #[error("[{file}]: read failed: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
    #[error("[{file}]: unbalanced `(*` at end of file")]
    UnbalancedOpen { file: String },
    #[error("[{file}:{line}]: unbalanced `*)`: {text}")]
    UnbalancedClose {
        file: String,
        line: usize,
        text: String,
    },
    #[error("[{file}:{start}-{end}]: end of file reached with an unterminated sentence: {text}")]
    UnterminatedSentence {
        file: String,
        start: usize,
        end: usize,
        text: String,
    },
}

/// Fatal context-tracking errors: the source's block structure does not
/// line up with the stack.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("context stack error at line {line}: `toplevel` should never be popped")]
    PoppedToplevel { line: usize },
    #[error(
        "context stack error at line {line}: currently in context `{current}` \
         but attempting to exit `{requested}`"
    )]
    KindMismatch {
        line: usize,
        current: ContextKind,
        requested: ContextKind,
    },
    #[error(
        "line {line}: `{trailer}` ends a nested context which is not an open \
         section, module, module type, or namespace"
    )]
    UnmatchedCloser { line: usize, trailer: String },
}

/// Construction-time policy conflicts. Precedence is
/// eager-allow > deny > allow; an extension may not override a stronger tier
/// with a weaker one.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("allow pattern `{0:?}` would override an existing deny or eager-allow entry")]
    AllowConflict(PatternId),
    #[error("deny pattern `{0:?}` would override an existing eager-allow entry")]
    DenyConflict(PatternId),
}

/// Errors loading a policy spec file. Always fatal to the whole run and
/// raised before any file is linted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("policy file {path} is not valid TOML: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("policy file {path} is not valid YAML: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("policy file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("policy file {path} has an unsupported extension (expected .toml, .yaml, .yml, or .json)")]
    UnsupportedExtension { path: PathBuf },
}

impl ConfigError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What aborted a file's run.
#[derive(Debug, Error)]
pub enum FatalCause {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// A distinguished partial-lint failure: the run aborted, but the
/// diagnostics collected up to the abort point are preserved.
#[derive(Debug, Error)]
#[error("lint aborted for {file}: {cause}")]
pub struct PartialLint {
    pub file: String,
    #[source]
    pub cause: FatalCause,
    /// Heuristic: the abort looks like the scanner tripping over a nested
    /// comment it cannot handle.
    pub likely_nested_comment: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl PartialLint {
    pub(crate) fn new(file: &str, cause: FatalCause, diagnostics: Vec<Diagnostic>) -> Self {
        let likely_nested_comment = matches!(
            cause,
            FatalCause::Lex(LexError::UnbalancedOpen { .. })
                | FatalCause::Lex(LexError::UnbalancedClose { .. })
                | FatalCause::Lex(LexError::UnterminatedSentence { .. })
        );
        PartialLint {
            file: file.to_string(),
            cause,
            likely_nested_comment,
            diagnostics,
        }
    }
}
