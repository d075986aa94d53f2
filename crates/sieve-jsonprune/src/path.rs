use sieve_error::{Error, Result};

/// One segment of the narrow JSONPath subset this pruner supports: a
/// leading `$`, dotted member names, bracketed quoted members or numeric
/// indices, and a `[*]` wildcard. Recursive descent (`..`) and filter
/// expressions are out of scope — this is a best-effort transform, not a
/// general JSONPath engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Member(String),
    Index(usize),
    Wildcard,
}

pub fn parse(path: &str) -> Result<Vec<Segment>> {
    let rest = path
        .strip_prefix('$')
        .ok_or_else(|| parse_error(path, "must start with '$'"))?;

    let mut segments = Vec::new();
    let bytes = rest.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'.' => {
                let start = pos + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end] != b'.' && bytes[end] != b'[' {
                    end += 1;
                }
                if end == start {
                    return Err(parse_error(path, "empty member name"));
                }
                segments.push(Segment::Member(rest[start..end].to_owned()));
                pos = end;
            }
            b'[' => {
                let start = pos + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end] != b']' {
                    end += 1;
                }
                if end >= bytes.len() {
                    return Err(parse_error(path, "unterminated '['"));
                }
                segments.push(parse_bracket(path, &rest[start..end])?);
                pos = end + 1;
            }
            _ => return Err(parse_error(path, "expected '.' or '['")),
        }
    }

    if segments.is_empty() {
        return Err(parse_error(path, "no segments after '$'"));
    }

    Ok(segments)
}

fn parse_bracket(path: &str, inner: &str) -> Result<Segment> {
    if inner == "*" {
        return Ok(Segment::Wildcard);
    }
    if inner.len() >= 2 && inner.starts_with('\'') && inner.ends_with('\'') {
        return Ok(Segment::Member(inner[1..inner.len() - 1].to_owned()));
    }
    inner
        .parse::<usize>()
        .map(Segment::Index)
        .map_err(|_| parse_error(path, "expected '*', a quoted member, or a numeric index"))
}

fn parse_error(path: &str, why: &str) -> Error {
    Error::ParseFailed {
        what: "jsonpath",
        message: format!("{path}: {why}"),
    }
}
