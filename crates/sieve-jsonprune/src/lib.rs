//! Deletes nodes from a JSON response body matched by a JSONPath
//! expression.

mod path;

use http::Response;
use path::Segment;
use sieve_error::{Error, Result};
use sieve_rewrite::{buffer_rewrite, Body};

/// A compiled `jsonprune=` rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsonPruneModifier {
    raw: String,
    segments: Vec<Segment>,
}

impl JsonPruneModifier {
    /// Parses a `jsonprune=<jsonpath>` rule string.
    pub fn parse(rule: &str) -> Result<Self> {
        let expr = rule
            .strip_prefix("jsonprune=")
            .ok_or_else(|| Error::InvalidModifier(rule.to_owned()))?;
        let segments = path::parse(expr)?;
        Ok(Self {
            raw: expr.to_owned(),
            segments,
        })
    }

    /// Requests never carry a JSON body this modifier touches.
    pub fn modify_req(&self) -> bool {
        false
    }

    /// If `response` is JSON, deletes every node the JSONPath matches.
    /// Parse, evaluate, or serialize failures are best-effort: the
    /// original bytes are kept and the failure is logged, not
    /// propagated. Returns whether any node was actually deleted.
    pub async fn modify_res(&self, response: &mut Response<Body>) -> Result<bool> {
        let is_json = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<mime::Mime>().ok())
            .map(|mime| mime.essence_str() == mime::APPLICATION_JSON.essence_str())
            .unwrap_or(false);

        if !is_json {
            return Ok(false);
        }

        let segments = self.segments.clone();
        let mut modified = false;
        buffer_rewrite(response, |bytes| {
            match prune_bytes(&bytes, &segments) {
                Ok(Some(pruned)) => {
                    modified = true;
                    Ok(pruned)
                }
                Ok(None) => Ok(bytes),
                Err(e) => {
                    log::warn!("jsonprune: {e}, leaving body unmodified");
                    Ok(bytes)
                }
            }
        })
        .await?;
        Ok(modified)
    }

    /// Two JSON-prune modifiers cancel each other iff their JSONPath
    /// expressions are textually identical.
    pub fn cancels(&self, other: &JsonPruneModifier) -> bool {
        self.raw == other.raw
    }
}

fn prune_bytes(bytes: &[u8], segments: &[Segment]) -> Result<Option<Vec<u8>>> {
    let mut value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| Error::ParseFailed {
        what: "json",
        message: e.to_string(),
    })?;

    if apply(&mut value, segments) == 0 {
        return Ok(None);
    }

    let out = serde_json::to_vec(&value).map_err(|e| Error::ParseFailed {
        what: "json",
        message: e.to_string(),
    })?;
    Ok(Some(out))
}

fn apply(value: &mut serde_json::Value, path: &[Segment]) -> usize {
    use serde_json::Value;
    match path {
        [] => 0,
        [Segment::Member(name)] => match value {
            Value::Object(map) => usize::from(map.remove(name).is_some()),
            _ => 0,
        },
        [Segment::Member(name), rest @ ..] => match value.as_object_mut().and_then(|m| m.get_mut(name)) {
            Some(child) => apply(child, rest),
            None => 0,
        },
        [Segment::Index(i)] => match value {
            Value::Array(arr) if *i < arr.len() => {
                arr.remove(*i);
                1
            }
            _ => 0,
        },
        [Segment::Index(i), rest @ ..] => match value.as_array_mut().and_then(|a| a.get_mut(*i)) {
            Some(child) => apply(child, rest),
            None => 0,
        },
        [Segment::Wildcard] => match value {
            Value::Array(arr) => {
                let n = arr.len();
                arr.clear();
                n
            }
            Value::Object(map) => {
                let n = map.len();
                map.clear();
                n
            }
            _ => 0,
        },
        [Segment::Wildcard, rest @ ..] => match value {
            Value::Array(arr) => arr.iter_mut().map(|v| apply(v, rest)).sum(),
            Value::Object(map) => map.values_mut().map(|v| apply(v, rest)).sum(),
            _ => 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::future::block_on;
    use http::Response;

    fn json_response(body: &str) -> Response<Body> {
        Response::builder()
            .header(http::header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::new_static(body.as_bytes().to_vec()))
            .unwrap()
    }

    #[test]
    fn prunes_wildcard_matched_field_from_every_array_element() {
        let modifier = JsonPruneModifier::parse("jsonprune=$.items[*].ad").unwrap();
        let mut response = json_response(r#"{"items":[{"id":1,"ad":true},{"id":2,"ad":false}]}"#);
        assert!(block_on(modifier.modify_res(&mut response)).unwrap());
        let body = block_on(
            std::mem::take(response.body_mut()).into_bytes(),
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, serde_json::json!({"items":[{"id":1},{"id":2}]}));
    }

    #[test]
    fn unmatched_path_leaves_body_untouched() {
        let modifier = JsonPruneModifier::parse("jsonprune=$.nope").unwrap();
        let original = r#"{"items":[1,2,3]}"#;
        let mut response = json_response(original);
        assert!(!block_on(modifier.modify_res(&mut response)).unwrap());
        let body = block_on(std::mem::take(response.body_mut()).into_bytes()).unwrap();
        assert_eq!(&*body, original.as_bytes());
    }

    #[test]
    fn non_json_response_is_skipped() {
        let modifier = JsonPruneModifier::parse("jsonprune=$.items").unwrap();
        let mut response = Response::builder()
            .header(http::header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(Body::new_static(b"<html></html>".to_vec()))
            .unwrap();
        assert!(!block_on(modifier.modify_res(&mut response)).unwrap());
        let body = block_on(std::mem::take(response.body_mut()).into_bytes()).unwrap();
        assert_eq!(&*body, b"<html></html>");
    }

    #[test]
    fn cancels_only_matches_identical_expression() {
        let a = JsonPruneModifier::parse("jsonprune=$.a").unwrap();
        let b = JsonPruneModifier::parse("jsonprune=$.a").unwrap();
        let c = JsonPruneModifier::parse("jsonprune=$.b").unwrap();
        assert!(a.cancels(&b));
        assert!(!a.cancels(&c));
    }

    #[test]
    fn rejects_rule_missing_prefix() {
        assert!(JsonPruneModifier::parse("$.a").is_err());
    }
}
