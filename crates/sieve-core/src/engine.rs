use crate::ruleset::RuleSet;
use arc_swap::{ArcSwap, Guard};
use http::{Request, Response};
use sieve_rewrite::Body;
use sieve_scriptlet::Injector;
use std::sync::Arc;

/// Ties the scriptlet injector and the matcher-backed rule set
/// together behind an atomically-swappable snapshot, so that a rule
/// reload never blocks or tears an in-flight response's view of the
/// rules it matched against.
pub struct Engine {
    rules: ArcSwap<RuleSet>,
    injector: Injector,
}

impl Engine {
    /// `bundle` is the scriptlet runtime bundle injected alongside
    /// matched scriptlet calls, embedded by the caller at build time.
    pub fn new(bundle: &'static [u8]) -> Self {
        Self {
            rules: ArcSwap::from_pointee(RuleSet::new()),
            injector: Injector::new(bundle),
        }
    }

    /// The rule set currently in effect. Holding the returned guard
    /// across an `await` point is safe: it keeps the snapshot it was
    /// taken from alive even if a concurrent reload swaps a new one in.
    pub fn current(&self) -> Guard<Arc<RuleSet>> {
        self.rules.load()
    }

    /// Builds an entirely new rule set via `build` and swaps it in
    /// atomically. In-flight lookups against the previous snapshot
    /// observe a consistent, if stale, view and are never blocked.
    pub fn reload<F>(&self, build: F)
    where
        F: FnOnce(&mut RuleSet),
    {
        log::info!("rule reload starting");
        let mut fresh = RuleSet::new();
        build(&mut fresh);
        self.rules.store(Arc::new(fresh));
        log::info!("rule reload complete");
    }

    /// Whether any modifier registered for `hostname` would act on the
    /// request. Hot-path, so this does not log.
    pub fn modifies_request<B>(&self, hostname: &str, request: &Request<B>) -> bool {
        self.rules
            .load()
            .modifiers
            .get(hostname)
            .iter()
            .any(|modifier| modifier.modify_req(request))
    }

    /// Injects matching scriptlets and applies every matching content
    /// modifier to `response`, in that order. Every step is best-effort:
    /// a failure in one transform is logged at `warn` and does not
    /// prevent the remaining transforms from running, so a broken rule
    /// never breaks the page for the end user.
    pub async fn process_response(&self, hostname: &str, response: &mut Response<Body>) {
        let snapshot = self.rules.load_full();

        if let Err(e) = self.injector.inject(hostname, &snapshot.scriptlets, response).await {
            log::warn!("scriptlet injection failed for {hostname}: {e}");
        }

        for modifier in snapshot.modifiers.get(hostname) {
            match modifier.modify_res(response).await {
                Ok(true) => log::debug!("modifier matched for {hostname}"),
                Ok(false) => {}
                Err(e) => log::warn!("modifier failed for {hostname}: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::ModifierRule;
    use futures_lite::future::block_on;
    use sieve_modifiers::Modifier;

    fn html_response(body: &str) -> Response<Body> {
        Response::builder()
            .header(http::header::CONTENT_TYPE, "text/html; charset=UTF-8")
            .body(Body::new_static(body.as_bytes().to_vec()))
            .unwrap()
    }

    #[test]
    fn reload_makes_new_rules_visible_to_later_lookups() {
        let engine = Engine::new(b"/* bundle */");
        assert!(engine.current().scriptlets.get("example.com").is_empty());

        engine.reload(|set| {
            set.add_scriptlet_rule("example.com#%#//scriptlet('prevent-xhr')").unwrap();
        });

        assert_eq!(engine.current().scriptlets.get("example.com").len(), 1);
    }

    #[test]
    fn process_response_injects_and_applies_modifiers() {
        let engine = Engine::new(b"/* bundle */");
        engine.reload(|set| {
            set.add_scriptlet_rule("#%#//scriptlet('prevent-xhr')").unwrap();
            set.add_modifier_rule(ModifierRule {
                host_patterns: String::new(),
                modifier: Modifier::parse("remove-js-constant=tracking").unwrap(),
                is_exception: false,
            })
            .unwrap();
        });

        let mut response = html_response("<html><head><script>var tracking = 1;</script></head></html>");
        block_on(engine.process_response("example.com", &mut response));

        let body = block_on(std::mem::take(response.body_mut()).into_bytes()).unwrap();
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains("<script"));
        assert!(!body.contains("tracking"));
    }

    #[test]
    fn stale_snapshot_survives_a_concurrent_reload() {
        let engine = Engine::new(b"/* bundle */");
        engine.reload(|set| {
            set.add_scriptlet_rule("#%#//scriptlet('first')").unwrap();
        });
        let snapshot = engine.current();
        engine.reload(|set| {
            set.add_scriptlet_rule("#%#//scriptlet('second')").unwrap();
        });
        assert_eq!(snapshot.scriptlets.get("example.com").len(), 1);
        assert_eq!(engine.current().scriptlets.get("example.com").len(), 1);
    }
}
