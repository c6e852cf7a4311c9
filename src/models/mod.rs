//! Shared data models for the lexer and lint output.

pub mod policy;

use serde::Serialize;

/// One period-terminated sentence recovered from a source file.
///
/// The text is comment-erased and whitespace-normalized: erased spans are
/// blanked in place so that character columns still line up with the source,
/// physical lines are joined with `\n`, and trailing whitespace is stripped.
/// A sentence is produced once by the lexer and then only read.
#[derive(Debug, Clone)]
pub struct Sentence {
    pub text: String,
    /// 1-based line of the first physical line contributing to the sentence.
    pub start_line: usize,
    /// 1-based line of the line carrying the terminating period.
    pub end_line: usize,
    /// Comment snippets erased before or within the sentence, in source order.
    pub comments: Vec<String>,
    /// True when an erased snippet itself begins with a comment delimiter,
    /// which usually means a nested comment confused the line scanner.
    pub maybe_nested_comment: bool,
}

impl Sentence {
    /// True if any erased comment carries the given inline marker.
    pub fn has_marker(&self, marker: &str) -> bool {
        self.comments.iter().any(|c| c.contains(marker))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A single style violation pinned to a line range.
pub struct Diagnostic {
    pub message: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl Diagnostic {
    pub fn new(message: String, start_line: usize, end_line: usize) -> Self {
        Diagnostic {
            message,
            start_line,
            end_line,
        }
    }
}
