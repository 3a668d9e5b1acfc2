//! Route pattern compilation: literal segments, `{name}` captures, and a
//! trailing `*` wildcard (spec.md §3/§4.2).

use std::collections::BTreeMap;

use conclave_message::Path;
use thiserror::Error;

/// Captured parameter values from a dynamic match, keyed by capture name.
pub type RouteParams = BTreeMap<String, String>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern {0:?} is not a valid path")]
    InvalidPath(String),
    #[error("wildcard `*` may only appear as the final segment of {0:?}")]
    WildcardNotLast(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
    Wildcard,
}

/// A compiled dynamic route pattern (contains at least one `{name}` or a
/// trailing `*`).
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    raw: String,
    scheme: String,
    segments: Vec<Segment>,
}

impl CompiledPattern {
    /// Whether `pattern` needs dynamic compilation at all (contains `{` or
    /// `*`), vs. being eligible for the static table.
    pub fn is_dynamic(route_segments: &[String]) -> bool {
        route_segments
            .iter()
            .any(|seg| seg.starts_with('{') || seg == "*")
    }

    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let path = Path::parse(pattern).map_err(|_| PatternError::InvalidPath(pattern.to_string()))?;
        let raw_segments = path.segments();
        let mut segments = Vec::with_capacity(raw_segments.len());
        for (idx, seg) in raw_segments.iter().enumerate() {
            let is_last = idx + 1 == raw_segments.len();
            let compiled = if seg == "*" {
                if !is_last {
                    return Err(PatternError::WildcardNotLast(pattern.to_string()));
                }
                Segment::Wildcard
            } else if let Some(name) = seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Segment::Capture(name.to_string())
            } else {
                Segment::Literal(seg.clone())
            };
            segments.push(compiled);
        }
        Ok(CompiledPattern {
            raw: pattern.to_string(),
            scheme: path.scheme().to_string(),
            segments,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Attempt to match `path` against this pattern, returning the
    /// captured parameters on success.
    pub fn matches(&self, path: &Path) -> Option<RouteParams> {
        if path.scheme() != self.scheme {
            return None;
        }
        let incoming = path.segments();
        let mut params = RouteParams::new();

        let mut i = 0;
        for seg in &self.segments {
            match seg {
                Segment::Wildcard => {
                    return Some(params);
                }
                Segment::Literal(lit) => {
                    if incoming.get(i) != Some(lit) {
                        return None;
                    }
                    i += 1;
                }
                Segment::Capture(name) => {
                    let value = incoming.get(i)?;
                    params.insert(name.clone(), value.clone());
                    i += 1;
                }
            }
        }
        if i == incoming.len() {
            Some(params)
        } else {
            None
        }
    }
}
