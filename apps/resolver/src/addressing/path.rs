//! Path tokenizer for the dot/bracket addressing syntax.
//!
//! Grammar has exactly two token kinds: a map key and a list index.
//! `"a.b[0].c"` → `[Key("a"), Key("b"), Index(0), Key("c")]`.
//! Bracket groups are rewritten to dot segments before splitting, so
//! `"work[experience][0].title"` addresses the same node as `"work.experience.0.title"`.

use thiserror::Error;

/// One traversal step through a profile tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Malformed addressing input. This is a caller bug, not a data problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPathError {
    #[error("unterminated '[' at byte {position} in path '{path}'")]
    UnterminatedBracket { path: String, position: usize },

    #[error("unmatched ']' at byte {position} in path '{path}'")]
    UnmatchedBracket { path: String, position: usize },
}

/// Splits a path into key/index segments.
///
/// Empty segments are dropped (`"a..b"` == `"a.b"`), purely numeric segments
/// become list indices, everything else is a map key.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, InvalidPathError> {
    let normalized = normalize_brackets(path)?;

    Ok(normalized
        .split('.')
        .filter(|part| !part.is_empty())
        .map(classify_segment)
        .collect())
}

/// Rewrites every `[x]` group to `.x`.
fn normalize_brackets(path: &str) -> Result<String, InvalidPathError> {
    let mut out = String::with_capacity(path.len() + 4);
    let mut chars = path.char_indices();

    while let Some((position, c)) = chars.next() {
        match c {
            '[' => {
                out.push('.');
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    out.push(inner);
                }
                if !closed {
                    return Err(InvalidPathError::UnterminatedBracket {
                        path: path.to_string(),
                        position,
                    });
                }
            }
            ']' => {
                return Err(InvalidPathError::UnmatchedBracket {
                    path: path.to_string(),
                    position,
                })
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

fn classify_segment(part: &str) -> PathSegment {
    if part.bytes().all(|b| b.is_ascii_digit()) {
        // Digit strings too long for usize can never be a valid index; keep them as keys.
        if let Ok(idx) = part.parse::<usize>() {
            return PathSegment::Index(idx);
        }
    }
    PathSegment::Key(part.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> PathSegment {
        PathSegment::Key(s.to_string())
    }

    #[test]
    fn test_parse_dot_and_bracket_mix() {
        assert_eq!(
            parse_path("a.b[0].c").unwrap(),
            vec![key("a"), key("b"), PathSegment::Index(0), key("c")]
        );
    }

    #[test]
    fn test_parse_bracket_keys() {
        assert_eq!(
            parse_path("work[experience][0].title").unwrap(),
            vec![
                key("work"),
                key("experience"),
                PathSegment::Index(0),
                key("title")
            ]
        );
    }

    #[test]
    fn test_empty_segments_are_dropped() {
        assert_eq!(parse_path("a..b.").unwrap(), vec![key("a"), key("b")]);
        assert_eq!(parse_path("").unwrap(), vec![]);
        assert_eq!(parse_path("[0]").unwrap(), vec![PathSegment::Index(0)]);
    }

    #[test]
    fn test_mixed_alphanumeric_segment_is_a_key() {
        assert_eq!(parse_path("items.0a").unwrap(), vec![key("items"), key("0a")]);
        assert_eq!(parse_path("items.-1").unwrap(), vec![key("items"), key("-1")]);
    }

    #[test]
    fn test_huge_index_stays_a_key() {
        let path = "a.99999999999999999999999999";
        assert_eq!(
            parse_path(path).unwrap(),
            vec![key("a"), key("99999999999999999999999999")]
        );
    }

    #[test]
    fn test_dot_inside_bracket_splits() {
        assert_eq!(parse_path("a[b.c]").unwrap(), vec![key("a"), key("b"), key("c")]);
    }

    #[test]
    fn test_unterminated_bracket_is_rejected() {
        let err = parse_path("addresses[0").unwrap_err();
        assert_eq!(
            err,
            InvalidPathError::UnterminatedBracket {
                path: "addresses[0".to_string(),
                position: 9
            }
        );
    }

    #[test]
    fn test_stray_closing_bracket_is_rejected() {
        assert!(matches!(
            parse_path("a]b"),
            Err(InvalidPathError::UnmatchedBracket { position: 1, .. })
        ));
    }
}
