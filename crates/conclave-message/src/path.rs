//! The path grammar: `scheme "://" route`, where `route` is a `/`-separated
//! list of segments. This module only knows about *concrete* paths (the
//! kind carried on a [`crate::Message`]); pattern segments (`{name}`, `*`)
//! are compiled by `conclave-router`, which depends on this crate.

use std::fmt;

use thiserror::Error;

/// Errors produced while parsing a path string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// The `://` separator is missing entirely.
    #[error("path {0:?} is missing the \"://\" scheme separator")]
    MissingSeparator(String),
    /// The scheme does not match `[a-z][a-z0-9-]*`.
    #[error("scheme {0:?} does not match [a-z][a-z0-9-]*")]
    InvalidScheme(String),
    /// A route segment was empty (e.g. `a//b`).
    #[error("path {0:?} contains an empty segment")]
    EmptySegment(String),
}

fn is_valid_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// A parsed, concrete path: `scheme://seg1/seg2/...`.
///
/// Two paths are equal iff their scheme and segments are equal; formatting
/// a parsed path and re-parsing it always yields an equal `Path` (the
/// round-trip invariant from spec.md §8).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    scheme: String,
    segments: Vec<String>,
}

impl Path {
    /// Parse a path string per the grammar in spec.md §3/§6.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let (scheme, route) = input
            .split_once("://")
            .ok_or_else(|| PathError::MissingSeparator(input.to_string()))?;

        if !is_valid_scheme(scheme) {
            return Err(PathError::InvalidScheme(scheme.to_string()));
        }

        let segments = if route.is_empty() {
            Vec::new()
        } else {
            route
                .split('/')
                .map(|seg| {
                    if seg.is_empty() {
                        Err(PathError::EmptySegment(input.to_string()))
                    } else {
                        Ok(seg.to_string())
                    }
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Path {
            scheme: scheme.to_string(),
            segments,
        })
    }

    /// Construct a path from an already-validated scheme and segments.
    pub fn new(scheme: impl Into<String>, segments: Vec<String>) -> Result<Self, PathError> {
        let scheme = scheme.into();
        if !is_valid_scheme(&scheme) {
            return Err(PathError::InvalidScheme(scheme));
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(PathError::EmptySegment(scheme));
        }
        Ok(Path { scheme, segments })
    }

    /// The substring before `://`; identifies the owning subsystem.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The `/`-separated route segments, in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Render back to the canonical `scheme://a/b/c` string form.
    pub fn format(&self) -> String {
        let mut out = String::with_capacity(self.scheme.len() + 3 + self.segments.len() * 8);
        out.push_str(&self.scheme);
        out.push_str("://");
        out.push_str(&self.segments.join("/"));
        out
    }

    /// Append a literal segment, returning a new path (used to build
    /// reply/event paths such as `kernel://response/<correlationId>`).
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Path {
            scheme: self.scheme.clone(),
            segments,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl std::str::FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}
