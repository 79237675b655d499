//! Path pattern parsing and matching.
//!
//! # Responsibilities
//! - Parse a path pattern into literal and placeholder segments
//! - Match a concrete request path, capturing placeholder values
//! - Order overlapping patterns (literal beats placeholder per segment)
//!
//! # Design Decisions
//! - A placeholder occupies a whole segment (`/users/{id}`, not `/u{id}`)
//! - Placeholder names must be unique within one pattern
//! - Matching is case-sensitive and O(segments)

use std::collections::HashMap;

/// One segment of a parsed path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// Named placeholder capturing the segment value.
    Param(String),
}

/// Error raised while parsing a path pattern.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("duplicate placeholder '{{{name}}}'")]
    DuplicateParam { name: String },

    #[error("malformed segment '{segment}' (placeholders must span a whole segment)")]
    MalformedSegment { segment: String },
}

/// A pre-parsed path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a pattern like `/users/{id}/orders` into segments.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();
        let mut names = std::collections::HashSet::new();

        for part in pattern.split('/').filter(|p| !p.is_empty()) {
            if let Some(name) = part
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
            {
                if name.is_empty() || name.contains(['{', '}']) {
                    return Err(PatternError::MalformedSegment {
                        segment: part.to_string(),
                    });
                }
                if !names.insert(name.to_string()) {
                    return Err(PatternError::DuplicateParam {
                        name: name.to_string(),
                    });
                }
                segments.push(Segment::Param(name.to_string()));
            } else if part.contains(['{', '}']) {
                return Err(PatternError::MalformedSegment {
                    segment: part.to_string(),
                });
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// The pattern as written in configuration.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Placeholder names declared by this pattern.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Key identifying the pattern's shape: literals verbatim, placeholders
    /// collapsed. Two patterns with the same shape always match the same
    /// paths, so a shape collision is an ambiguity.
    pub fn shape_key(&self) -> String {
        let mut key = String::new();
        for segment in &self.segments {
            key.push('/');
            match segment {
                Segment::Literal(lit) => key.push_str(lit),
                Segment::Param(_) => key.push('*'),
            }
        }
        if key.is_empty() {
            key.push('/');
        }
        key
    }

    /// Match a concrete path, capturing placeholder values. Captured values
    /// are percent-decoded; literal segments compare as sent.
    pub fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = percent_encoding::percent_decode_str(part)
                        .decode_utf8_lossy()
                        .into_owned();
                    params.insert(name.clone(), value);
                }
            }
        }
        Some(params)
    }

    /// Whether this pattern is more specific than `other` for paths both
    /// match: the first differing segment position decides, literal beating
    /// placeholder. Equal shapes are rejected at compile time, so ties fall
    /// back to declaration order in the table.
    pub fn more_specific_than(&self, other: &PathPattern) -> bool {
        for (a, b) in self.segments.iter().zip(&other.segments) {
            match (a, b) {
                (Segment::Literal(_), Segment::Param(_)) => return true,
                (Segment::Param(_), Segment::Literal(_)) => return false,
                _ => continue,
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literals_and_params() {
        let pattern = PathPattern::parse("/users/{id}/orders").unwrap();
        assert_eq!(pattern.segments.len(), 3);
        assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(pattern.shape_key(), "/users/*/orders");
    }

    #[test]
    fn test_parse_rejects_duplicate_placeholder() {
        let err = PathPattern::parse("/{id}/{id}").unwrap_err();
        assert!(matches!(err, PatternError::DuplicateParam { name } if name == "id"));
    }

    #[test]
    fn test_parse_rejects_partial_placeholder() {
        assert!(PathPattern::parse("/users/v{id}").is_err());
        assert!(PathPattern::parse("/users/{}").is_err());
    }

    #[test]
    fn test_match_captures_params() {
        let pattern = PathPattern::parse("/users/{id}").unwrap();
        let params = pattern.match_path("/users/42").unwrap();
        assert_eq!(params.get("id"), Some(&"42".to_string()));

        assert!(pattern.match_path("/users").is_none());
        assert!(pattern.match_path("/users/42/orders").is_none());
        assert!(pattern.match_path("/accounts/42").is_none());
    }

    #[test]
    fn test_match_decodes_captured_values() {
        let pattern = PathPattern::parse("/users/{id}").unwrap();
        let params = pattern.match_path("/users/a%20b").unwrap();
        assert_eq!(params.get("id"), Some(&"a b".to_string()));
    }

    #[test]
    fn test_root_pattern_matches_root() {
        let pattern = PathPattern::parse("/").unwrap();
        assert!(pattern.match_path("/").is_some());
        assert!(pattern.match_path("").is_some());
        assert!(pattern.match_path("/users").is_none());
    }

    #[test]
    fn test_literal_more_specific_than_param() {
        let literal = PathPattern::parse("/users/me").unwrap();
        let param = PathPattern::parse("/users/{id}").unwrap();
        assert!(literal.more_specific_than(&param));
        assert!(!param.more_specific_than(&literal));
    }
}
