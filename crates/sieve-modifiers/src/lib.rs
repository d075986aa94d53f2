//! A tagged union over the response modifier kinds, with the capability
//! set every modifier shares: `parse`, `modify_req`, `modify_res`, and
//! `cancels`. Rule registration stores one of these per matched rule
//! rather than an object behind a trait, since the set of kinds is
//! closed.

use http::{Request, Response};
use sieve_error::{Error, Result};
use sieve_jsonprune::JsonPruneModifier;
use sieve_jsprune::JsConstantStripModifier;
use sieve_rewrite::Body;

/// One compiled response modifier, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Modifier {
    JsonPrune(JsonPruneModifier),
    JsConstantStrip(JsConstantStripModifier),
}

impl Modifier {
    /// Parses a modifier rule string, dispatching on its prefix.
    /// Returns [`Error::InvalidModifier`] if the prefix is recognised but
    /// the expression after it fails to parse, or if no known prefix
    /// matches at all.
    pub fn parse(rule: &str) -> Result<Self> {
        if rule.starts_with("jsonprune=") {
            return JsonPruneModifier::parse(rule).map(Modifier::JsonPrune);
        }
        if rule.starts_with("remove-js-constant=") {
            return JsConstantStripModifier::parse(rule).map(Modifier::JsConstantStrip);
        }
        Err(Error::InvalidModifier(rule.to_owned()))
    }

    /// Whether this modifier acts on the request. None of the current
    /// kinds do; requests never carry a body any of them touch.
    pub fn modify_req<B>(&self, _request: &Request<B>) -> bool {
        match self {
            Modifier::JsonPrune(m) => m.modify_req(),
            Modifier::JsConstantStrip(m) => m.modify_req(),
        }
    }

    /// Applies this modifier to the response, returning whether it
    /// actually changed anything.
    pub async fn modify_res(&self, response: &mut Response<Body>) -> Result<bool> {
        match self {
            Modifier::JsonPrune(m) => m.modify_res(response).await,
            Modifier::JsConstantStrip(m) => m.modify_res(response).await,
        }
    }

    /// Two modifiers cancel each other iff they are the same kind and
    /// their inner parameters are identical. A primary rule registering
    /// a modifier that an already-registered exception rule cancels is
    /// suppressed at rule-load time rather than at dispatch time.
    pub fn cancels(&self, other: &Modifier) -> bool {
        match (self, other) {
            (Modifier::JsonPrune(a), Modifier::JsonPrune(b)) => a.cancels(b),
            (Modifier::JsConstantStrip(a), Modifier::JsConstantStrip(b)) => a.cancels(b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::future::block_on;
    use sieve_rewrite::Body;

    #[test]
    fn parses_jsonprune_rule() {
        let modifier = Modifier::parse("jsonprune=$.items[*].ad").unwrap();
        assert!(matches!(modifier, Modifier::JsonPrune(_)));
    }

    #[test]
    fn parses_remove_js_constant_rule() {
        let modifier = Modifier::parse("remove-js-constant=tracking").unwrap();
        assert!(matches!(modifier, Modifier::JsConstantStrip(_)));
    }

    #[test]
    fn unrecognised_prefix_is_rejected() {
        assert!(Modifier::parse("first-party=true").is_err());
    }

    #[test]
    fn different_kinds_never_cancel() {
        let json = Modifier::parse("jsonprune=$.a").unwrap();
        let js = Modifier::parse("remove-js-constant=a").unwrap();
        assert!(!json.cancels(&js));
    }

    #[test]
    fn same_kind_cancels_on_identical_parameters() {
        let a = Modifier::parse("jsonprune=$.a").unwrap();
        let b = Modifier::parse("jsonprune=$.a").unwrap();
        let c = Modifier::parse("jsonprune=$.b").unwrap();
        assert!(a.cancels(&b));
        assert!(!a.cancels(&c));
    }

    #[test]
    fn modify_res_dispatches_to_the_wrapped_kind() {
        let modifier = Modifier::parse("jsonprune=$.ad").unwrap();
        let mut response = Response::builder()
            .header(http::header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::new_static(br#"{"ad":true,"id":1}"#.to_vec()))
            .unwrap();
        assert!(block_on(modifier.modify_res(&mut response)).unwrap());
    }
}
