//! Template reference parsing
//!
//! Finds both reference forms in a string:
//!
//! - `{{name}}` anywhere
//! - `:name` path parameters, only at positions a URL allows: the colon
//!   must not follow an identifier character (so `https://` and
//!   resolved values survive) and the name must end at `/`, `?`, `&`,
//!   `#` or the end of the string.
//!
//! The scanner is hand-rolled: the path-parameter rule needs a
//! look-behind, which the regex crate does not support.

use std::ops::Range;

/// Which syntactic form a reference used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `{{name}}`
    Template,
    /// `:name`
    PathParam,
}

/// One parsed reference with its byte span in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The name without delimiters; built-ins keep their `$` prefix
    pub name: String,
    /// The syntactic form
    pub kind: ReferenceKind,
    /// Byte range of the whole reference, delimiters included
    pub span: Range<usize>,
}

/// Parses all references in the input, ordered by position.
#[must_use]
pub fn parse_references(input: &str) -> Vec<Reference> {
    let mut references = parse_templates(input);
    let templates: Vec<Range<usize>> = references.iter().map(|r| r.span.clone()).collect();

    for reference in parse_path_params(input) {
        // A colon inside {{...}} is part of the template text, not a
        // path parameter.
        let inside_template = templates
            .iter()
            .any(|span| span.start < reference.span.start && reference.span.start < span.end);
        if !inside_template {
            references.push(reference);
        }
    }

    references.sort_by_key(|r| r.span.start);
    references
}

fn parse_templates(input: &str) -> Vec<Reference> {
    let mut references = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            if let Some(rel_end) = input[i + 2..].find("}}") {
                let name_start = i + 2;
                let name_end = name_start + rel_end;
                let name = input[name_start..name_end].trim();
                if !name.is_empty() {
                    references.push(Reference {
                        name: name.to_string(),
                        kind: ReferenceKind::Template,
                        span: i..name_end + 2,
                    });
                }
                i = name_end + 2;
                continue;
            }
            // Unclosed braces: nothing further can match.
            break;
        }
        i += 1;
    }

    references
}

fn parse_path_params(input: &str) -> Vec<Reference> {
    let mut references = Vec::new();
    let chars: Vec<(usize, char)> = input.char_indices().collect();

    for (pos, &(start, ch)) in chars.iter().enumerate() {
        if ch != ':' {
            continue;
        }

        // Look-behind: a colon after an identifier character is part of
        // a scheme, port or plain text.
        if pos > 0 {
            let (_, prev) = chars[pos - 1];
            if prev.is_alphanumeric() || prev == '_' {
                continue;
            }
        }

        // Name: [A-Za-z_][A-Za-z0-9_]*
        let mut end = pos + 1;
        if end >= chars.len() {
            continue;
        }
        let (_, first) = chars[end];
        if !(first.is_ascii_alphabetic() || first == '_') {
            continue;
        }
        while end < chars.len() {
            let (_, c) = chars[end];
            if c.is_ascii_alphanumeric() || c == '_' {
                end += 1;
            } else {
                break;
            }
        }

        // The name must end at a URL delimiter or the end of input.
        if end < chars.len() {
            let (_, next) = chars[end];
            if !matches!(next, '/' | '?' | '&' | '#') {
                continue;
            }
        }

        let byte_end = if end < chars.len() {
            chars[end].0
        } else {
            input.len()
        };
        references.push(Reference {
            name: input[start + 1..byte_end].to_string(),
            kind: ReferenceKind::PathParam,
            span: start..byte_end,
        });
    }

    references
}
