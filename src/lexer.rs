//! Sentence lexer: recovers period-terminated sentences from a line-oriented
//! stream while erasing nested, string-aware comments.
//!
//! The lexer is a lazy, finite, non-restartable producer. Each call to
//! `next_sentence` pulls physical lines until one ends in a period; comment
//! spans are blanked in place (columns preserved) and recorded as snippets.
//! Comment nesting depth persists across lines; the check tool of the proof
//! language guarantees balanced delimiters, so a simple depth counter plus a
//! LIFO of open positions recovers the spans without a grammar.
//!
//! Known limits (by design, not defects): multiple sentences on one physical
//! line collapse into one; a line ending in `.` mid-expression terminates a
//! sentence early; multi-line strings are unsupported.

use crate::error::LexError;
use crate::models::Sentence;
use std::io::BufRead;

/// The inline-suppression marker recognized inside erased comments.
pub const NOLINT_MARKER: &str = "[[NOLINT]]";

struct VisibleLine {
    text: String,
    lineno: usize,
    comments: Vec<String>,
    maybe_nested_comment: bool,
}

/// Streaming sentence producer over one open text resource.
///
/// The reader is dropped as soon as the stream is exhausted; afterwards
/// `next_sentence` keeps returning `Ok(None)`.
pub struct SentenceLexer<R> {
    reader: Option<R>,
    file: String,
    lineno: usize,
    comment_depth: usize,
}

impl<R: BufRead> SentenceLexer<R> {
    pub fn new(file: &str, reader: R) -> Self {
        SentenceLexer {
            reader: Some(reader),
            file: file.to_string(),
            lineno: 0,
            comment_depth: 0,
        }
    }

    /// Pull the next sentence, or `None` at end of stream.
    ///
    /// `inside_interactive_proof` additionally blanks proof bullets and
    /// braces, which are proof-script organization rather than sentence
    /// content.
    pub fn next_sentence(
        &mut self,
        inside_interactive_proof: bool,
    ) -> Result<Option<Sentence>, LexError> {
        let first = match self.next_visible_line(inside_interactive_proof)? {
            Some(line) => line,
            None => return Ok(None),
        };

        let start_line = first.lineno;
        let mut end_line = first.lineno;
        let mut text = first.text;
        let mut comments = first.comments;
        let mut maybe_nested_comment = first.maybe_nested_comment;

        while !text.ends_with('.') {
            match self.next_visible_line(inside_interactive_proof)? {
                Some(line) => {
                    end_line = line.lineno;
                    comments.extend(line.comments);
                    maybe_nested_comment |= line.maybe_nested_comment;
                    text.push('\n');
                    text.push_str(&line.text);
                }
                None => {
                    return Err(LexError::UnterminatedSentence {
                        file: self.file.clone(),
                        start: start_line,
                        end: end_line,
                        text,
                    });
                }
            }
        }

        Ok(Some(Sentence {
            text,
            start_line,
            end_line,
            comments,
            maybe_nested_comment,
        }))
    }

    /// Skip whitespace/comment/proof-organization lines and return the next
    /// line with visible content, comment spans blanked in place.
    fn next_visible_line(
        &mut self,
        inside_interactive_proof: bool,
    ) -> Result<Option<VisibleLine>, LexError> {
        let mut comments: Vec<String> = Vec::new();

        loop {
            let raw = match self.read_line()? {
                Some(raw) => raw,
                None => {
                    if self.comment_depth != 0 {
                        return Err(LexError::UnbalancedOpen {
                            file: self.file.clone(),
                        });
                    }
                    // Exhausted: release the resource.
                    self.reader = None;
                    return Ok(None);
                }
            };

            // Character-indexed so that blanking preserves columns.
            let mut chars: Vec<char> = raw.chars().collect();

            let delimiters = find_delimiters(&chars);

            // A line with no delimiters while still inside a comment is pure
            // continuation: record it and move on.
            if delimiters.is_empty() && self.comment_depth != 0 {
                comments.push(raw);
                continue;
            }

            self.erase_comments(&mut chars, &delimiters, &raw, &mut comments)?;

            strip_line(&mut chars, inside_interactive_proof);
            if chars.is_empty() {
                continue;
            }

            // Interior snippets that themselves open or close a comment mean
            // a nested comment probably leaked into the surrounding text.
            let maybe_nested_comment = comments.len() > 2
                && comments[1..comments.len() - 1]
                    .iter()
                    .any(|s| snippet_is_delimiter(s));

            return Ok(Some(VisibleLine {
                text: chars.into_iter().collect(),
                lineno: self.lineno,
                comments,
                maybe_nested_comment,
            }));
        }
    }

    fn read_line(&mut self) -> Result<Option<String>, LexError> {
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(None),
        };
        let mut buf = String::new();
        let n = reader.read_line(&mut buf).map_err(|source| LexError::Io {
            file: self.file.clone(),
            source,
        })?;
        if n == 0 {
            return Ok(None);
        }
        self.lineno += 1;
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(Some(buf))
    }

    /// Walk the delimiters left to right, maintaining the depth counter and
    /// a LIFO of open positions; blank every cancelled span in place.
    fn erase_comments(
        &mut self,
        chars: &mut [char],
        delimiters: &[(usize, bool)],
        raw: &str,
        comments: &mut Vec<String>,
    ) -> Result<(), LexError> {
        let mut open_lifo: Vec<usize> = Vec::new();

        for &(pos, is_open) in delimiters {
            if is_open {
                self.comment_depth += 1;
                open_lifo.push(pos);
                continue;
            }

            if self.comment_depth == 0 {
                return Err(LexError::UnbalancedClose {
                    file: self.file.clone(),
                    line: self.lineno,
                    text: raw.to_string(),
                });
            }
            self.comment_depth -= 1;

            // Either the entire prefix of the line is comment, or only the
            // span back to the matching open. When the close leaves us still
            // nested, the whole prefix stays comment and the open positions
            // are kept for the outer span.
            let span_start = if self.comment_depth == 0 {
                open_lifo.pop().unwrap_or(0)
            } else {
                0
            };
            let span_end = pos + 2;
            comments.push(chars[span_start..span_end].iter().collect());
            blank(&mut chars[span_start..span_end]);
        }

        // A leftover open means the suffix of the line is comment; blank
        // from the outermost open.
        if let Some(&outermost) = open_lifo.first() {
            comments.push(chars[outermost..].iter().collect());
            blank(&mut chars[outermost..]);
        }

        Ok(())
    }
}

/// Positions of `(*` / `*)` pairs on one line, in order, excluding any that
/// sit inside a recognized string span. `true` marks an open delimiter.
fn find_delimiters(chars: &[char]) -> Vec<(usize, bool)> {
    let quotes = unescaped_quotes(chars);
    // Only an even, nonzero number of quotes is trusted as string spans;
    // multi-line strings are unsupported.
    let spans: Vec<(usize, usize)> = if !quotes.is_empty() && quotes.len() % 2 == 0 {
        quotes.chunks(2).map(|pair| (pair[0], pair[1])).collect()
    } else {
        Vec::new()
    };
    let in_string =
        |pos: usize| spans.iter().any(|&(open, close)| pos >= open + 1 && pos + 2 < close);

    let mut delimiters = Vec::new();
    for i in 0..chars.len().saturating_sub(1) {
        let is_open = chars[i] == '(' && chars[i + 1] == '*';
        // A `*)` immediately followed by `"` is a mangled name, not a close.
        let is_close =
            chars[i] == '*' && chars[i + 1] == ')' && chars.get(i + 2) != Some(&'"');
        if (is_open || is_close) && !in_string(i) {
            delimiters.push((i, is_open));
        }
    }
    delimiters
}

/// Quote positions, ignoring the doubled `""` escape form.
fn unescaped_quotes(chars: &[char]) -> Vec<usize> {
    (0..chars.len())
        .filter(|&i| {
            chars[i] == '"'
                && (i == 0 || chars[i - 1] != '"')
                && chars.get(i + 1) != Some(&'"')
        })
        .collect()
}

fn blank(span: &mut [char]) {
    for c in span.iter_mut() {
        *c = ' ';
    }
}

fn snippet_is_delimiter(snippet: &str) -> bool {
    let t = snippet.trim_start();
    t.starts_with("(*") || (t.starts_with("*)") && !t[2..].starts_with('"'))
}

/// Strip a line after comment erasure.
///
/// Always removes trailing whitespace. Inside an interactive proof, leading
/// bullet runs (`-`, `+`, `*`) and leading/trailing brace runs are blanked
/// first (blanked, not deleted, to preserve columns).
fn strip_line(chars: &mut Vec<char>, inside_interactive_proof: bool) {
    if inside_interactive_proof {
        for bullet in ['-', '+', '*'] {
            blank_leading_run(chars, bullet);
        }
        // Leading/trailing brace organization.
        for c in chars
            .iter_mut()
            .take_while(|c| c.is_whitespace() || **c == '{' || **c == '}')
        {
            if *c == '{' || *c == '}' {
                *c = ' ';
            }
        }
        for c in chars
            .iter_mut()
            .rev()
            .take_while(|c| c.is_whitespace() || **c == '{' || **c == '}')
        {
            if *c == '{' || *c == '}' {
                *c = ' ';
            }
        }
    }

    while chars.last().is_some_and(|c| c.is_whitespace()) {
        chars.pop();
    }
}

fn blank_leading_run(chars: &mut [char], bullet: char) {
    let mut i = 0;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    while i < chars.len() && chars[i] == bullet {
        chars[i] = ' ';
        i += 1;
    }
}
