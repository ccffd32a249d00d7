//! Route pattern parsing.
//!
//! Patterns are slash-separated segments. A segment is static text, a
//! named parameter `{id}`, a constrained parameter `{id:[0-9]+}` whose
//! regular expression must match the whole segment, or a trailing
//! wildcard `*rest` capturing the remainder of the path.

use regex::Regex;

use crate::error::BuildError;

/// What one pattern segment matches.
#[derive(Debug, Clone)]
pub enum SegmentKind {
    /// Matches the segment text exactly.
    Static,
    /// Captures a single path segment under `name`. A constrained
    /// parameter only matches when the anchored expression accepts the
    /// whole segment.
    Param {
        /// The capture name.
        name: String,
        /// The optional anchored constraint.
        constraint: Option<Regex>,
    },
    /// Captures the rest of the path, slashes included, under the name.
    Wildcard(String),
}

/// One parsed pattern segment.
///
/// The literal is the segment's source text and doubles as its identity:
/// `{id}` and `{id:[0-9]+}` are distinct segments even though both bind
/// `id`.
#[derive(Debug, Clone)]
pub struct Segment {
    /// The segment as written in the pattern.
    pub literal: String,
    /// What the segment matches.
    pub kind: SegmentKind,
}

/// Parses a pattern into segments.
///
/// # Errors
///
/// Returns [`BuildError::InvalidPattern`] for empty parameter names,
/// unbalanced braces, malformed constraint expressions, or a wildcard
/// anywhere but the final segment.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, BuildError> {
    let mut segments = Vec::new();
    for raw in pattern.split('/').filter(|s| !s.is_empty()) {
        let kind = if let Some(inner) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            match inner.split_once(':') {
                Some((name, expr)) => {
                    if name.is_empty() {
                        return Err(BuildError::invalid(pattern, "empty parameter name"));
                    }
                    if expr.is_empty() {
                        return Err(BuildError::invalid(pattern, "empty constraint expression"));
                    }
                    let constraint = Regex::new(&format!("^(?:{expr})$"))
                        .map_err(|e| BuildError::invalid(pattern, e.to_string()))?;
                    SegmentKind::Param {
                        name: name.to_owned(),
                        constraint: Some(constraint),
                    }
                }
                None => {
                    if inner.is_empty() {
                        return Err(BuildError::invalid(pattern, "empty parameter name"));
                    }
                    SegmentKind::Param {
                        name: inner.to_owned(),
                        constraint: None,
                    }
                }
            }
        } else if let Some(name) = raw.strip_prefix('*') {
            if name.is_empty() {
                return Err(BuildError::invalid(pattern, "empty wildcard name"));
            }
            SegmentKind::Wildcard(name.to_owned())
        } else if raw.contains('{') || raw.contains('}') {
            return Err(BuildError::invalid(pattern, "unbalanced braces in segment"));
        } else {
            SegmentKind::Static
        };
        segments.push(Segment {
            literal: raw.to_owned(),
            kind,
        });
    }

    let non_final_wildcard = segments
        .iter()
        .rev()
        .skip(1)
        .any(|s| matches!(s.kind, SegmentKind::Wildcard(_)));
    if non_final_wildcard {
        return Err(BuildError::invalid(
            pattern,
            "wildcard must be the final segment",
        ));
    }

    Ok(segments)
}

/// Joins a controller mount point and a route pattern into one
/// normalized path: single leading slash, single slashes between
/// segments, no trailing slash except for the root.
#[must_use]
pub fn join(mount: &str, pattern: &str) -> String {
    let mut out = String::from("/");
    for segment in mount
        .split('/')
        .chain(pattern.split('/'))
        .filter(|s| !s.is_empty())
    {
        if !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(segment);
    }
    out
}
