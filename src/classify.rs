//! Interactive-vs-terminal classification of declaration sentences.
//!
//! A declaration is *interactive* when it opens a proof obligation for a
//! subsequent proof script instead of supplying its body inline with `:=`.
//! The heuristic: every `:=` occurrence must be explained away, either by a
//! recognized bracket/let form or by the nested-parenthesis balance walk
//! below. A sentence with no `:=` at all is interactive.

use crate::matchers::Matchers;

/// Classify a sentence as interactive.
///
/// Special cases, in order:
/// - `Definition`/`Fixpoint`: interactive iff the sentence has no `:=` at
///   all (named arguments like `(foo := bar)` defeat this, a known limit).
/// - A `Program`-flagged sentence is always interactive.
/// - Otherwise, interactive iff every `:=` is explained away.
pub fn is_interactive(m: &Matchers, sentence: &str) -> bool {
    if m.definition.is_match(sentence) || m.fixpoint.is_match(sentence) {
        return m.colon_equals.find(sentence).is_none();
    }

    if m.program_search.is_match(sentence) {
        return true;
    }

    // Spans of bracket/let forms whose `:=` is known-harmless, sorted by
    // start offset.
    let mut explained: Vec<(usize, usize)> = Vec::new();
    for form in &m.explained_forms {
        for mat in form.find_iter(sentence) {
            explained.push((mat.start(), mat.end()));
        }
    }
    explained.sort_by_key(|&(start, _)| start);

    m.colon_equals
        .find_iter(sentence)
        .all(|mat| is_explained(sentence, &explained, mat.start(), mat.end()))
}

fn is_explained(
    sentence: &str,
    explained: &[(usize, usize)],
    start: usize,
    end: usize,
) -> bool {
    for &(span_start, span_end) in explained {
        if start <= span_start {
            // Explaining forms strictly enclose their `:=`, so a span
            // starting at or after the occurrence cannot cover it.
            continue;
        }
        if span_start <= start && end <= span_end {
            return true;
        }
        // Spans are sorted; one ending before this occurrence just means we
        // keep looking.
    }

    explained_by_nested_parens(sentence, start, end)
}

/// Manual special case for arguments of the form `(FOO := ...(...(BAR)...))`
/// which the span regexes miss: walk left from the `:=` to the nearest open
/// paren with no intervening close paren, then walk right counting parens
/// until it is balanced by a close paren.
fn explained_by_nested_parens(sentence: &str, start: usize, end: usize) -> bool {
    let bytes = sentence.as_bytes();

    let mut seen_open = false;
    let mut i = start;
    loop {
        match bytes[i] {
            b'(' => {
                seen_open = true;
                break;
            }
            // A defined argument can only have a bare name on its left-hand
            // side.
            b')' => return false,
            _ => {}
        }
        if i == 0 {
            break;
        }
        i -= 1;
    }
    if !seen_open {
        return false;
    }

    let mut open_count = 0usize;
    let mut j = end;
    while j < bytes.len() {
        match bytes[j] {
            b'(' => open_count += 1,
            b')' => {
                if open_count == 0 {
                    return true;
                }
                open_count -= 1;
            }
            _ => {}
        }
        j += 1;
    }

    // No close paren balances the open paren we walked out to.
    false
}
