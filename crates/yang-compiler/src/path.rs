//! Parsing of the XPath-like schema paths used by `leafref`, `augment`,
//! `deviation`, `refine` and `unique` arguments.
//!
//! Only syntactic well-formedness matters at load time: predicates inside
//! `[` … `]` are checked for balance and skipped, and the remaining node
//! steps are resolved against the schema graph.

/// One step of a schema path: an optionally prefixed node identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Segment {
    pub prefix: Option<String>,
    pub name: String,
}

/// A parsed schema path. `up` counts leading `../` steps; an absolute path
/// has `absolute == true` and `up == 0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SchemaPath {
    pub absolute: bool,
    pub up: usize,
    pub segments: Vec<Segment>,
}

pub(crate) fn parse(input: &str) -> Result<SchemaPath, String> {
    let mut rest = input.trim();
    if rest.is_empty() {
        return Err("empty path".to_string());
    }

    let absolute = rest.starts_with('/');
    if absolute {
        rest = &rest[1..];
    }

    let mut up = 0;
    if !absolute {
        while let Some(tail) = rest.strip_prefix("..") {
            up += 1;
            rest = tail.strip_prefix('/').unwrap_or(tail);
            if tail.is_empty() {
                break;
            }
        }
    }

    let mut segments = Vec::new();
    for raw in rest.split('/') {
        if raw.is_empty() {
            if segments.is_empty() && up > 0 {
                continue;
            }
            return Err("empty path step".to_string());
        }
        segments.push(parse_segment(raw)?);
    }
    if segments.is_empty() {
        return Err("path names no node".to_string());
    }

    Ok(SchemaPath {
        absolute,
        up,
        segments,
    })
}

/// A descendant path: relative, no `../` steps. Used by `refine`, `unique`
/// and uses-augment targets.
pub(crate) fn parse_descendant(input: &str) -> Result<Vec<Segment>, String> {
    let path = parse(input)?;
    if path.absolute || path.up > 0 {
        return Err("expected a descendant path".to_string());
    }
    Ok(path.segments)
}

fn parse_segment(raw: &str) -> Result<Segment, String> {
    let step = strip_predicates(raw)?;
    if step.is_empty() {
        return Err("empty path step".to_string());
    }

    let (prefix, name) = match step.split_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, step),
    };
    if name.is_empty() || !is_identifier(name) || prefix.is_some_and(|p| !is_identifier(p)) {
        return Err(format!("malformed path step `{raw}`"));
    }

    Ok(Segment {
        prefix: prefix.map(str::to_string),
        name: name.to_string(),
    })
}

/// Drop `[` … `]` predicate blocks, verifying balance.
fn strip_predicates(raw: &str) -> Result<&str, String> {
    match raw.find('[') {
        None => {
            if raw.contains(']') {
                Err(format!("unbalanced predicate in `{raw}`"))
            } else {
                Ok(raw)
            }
        }
        Some(open) => {
            let mut depth = 0usize;
            for c in raw[open..].chars() {
                match c {
                    '[' => depth += 1,
                    ']' => {
                        depth = depth
                            .checked_sub(1)
                            .ok_or_else(|| format!("unbalanced predicate in `{raw}`"))?;
                    }
                    _ => {}
                }
            }
            if depth != 0 {
                return Err(format!("unbalanced predicate in `{raw}`"));
            }
            Ok(&raw[..open])
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Split a `prefix:name` reference.
pub(crate) fn split_reference(input: &str) -> (Option<&str>, &str) {
    match input.split_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, input),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_parses_absolute_paths() {
        let path = parse("/if:interfaces/if:interface").unwrap();
        assert!(path.absolute);
        assert_eq!(path.up, 0);
        assert_eq!(path.segments.len(), 2);
        assert_eq!(path.segments[0].prefix.as_deref(), Some("if"));
        assert_eq!(path.segments[1].name, "interface");
    }

    #[test]
    fn it_parses_relative_paths() {
        let path = parse("../../config/name").unwrap();
        assert!(!path.absolute);
        assert_eq!(path.up, 2);
        assert_eq!(path.segments.len(), 2);
    }

    #[test]
    fn it_skips_predicates() {
        let path = parse("/a:b[current()/../x = 'y']/a:c").unwrap();
        assert_eq!(path.segments[0].name, "b");
        assert_eq!(path.segments[1].name, "c");
    }

    #[test]
    fn it_rejects_unbalanced_predicates() {
        assert!(parse("/a:b[foo/a:c").is_err());
        assert!(parse("/a:b]x").is_err());
    }

    #[test]
    fn it_rejects_malformed_steps() {
        assert!(parse("/a//b").is_err());
        assert!(parse("").is_err());
        assert!(parse("/9bad").is_err());
    }

    #[test]
    fn it_parses_descendant_paths() {
        assert_eq!(parse_descendant("a/b").unwrap().len(), 2);
        assert!(parse_descendant("../a").is_err());
        assert!(parse_descendant("/a").is_err());
    }
}
