use crate::trie::HostTrie;
use hashbrown::HashSet;
use sieve_error::{Error, Result};
use sieve_interner::Interner;
use std::hash::Hash;
use std::sync::Arc;

/// Indexes rule payloads by hostname pattern and answers lookups under
/// concurrent read load. A matcher holds two tries (primary and
/// exception) plus two flat lists for rules that apply to every
/// hostname.
pub struct HostMatcher<T> {
    primary: HostTrie<T>,
    exception: HostTrie<T>,
    generic: Vec<T>,
    generic_exceptions: Vec<T>,
    interner: Arc<Interner>,
}

// See the note on `HostTrie`'s hand-written `Default`: a derived impl
// here would wrongly require `T: Default`.
impl<T> Default for HostMatcher<T> {
    fn default() -> Self {
        Self {
            primary: HostTrie::default(),
            exception: HostTrie::default(),
            generic: Vec::new(),
            generic_exceptions: Vec::new(),
            interner: Arc::new(Interner::new()),
        }
    }
}

impl<T: Clone + Eq + Hash> HostMatcher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a matcher whose hostname labels are interned through a
    /// caller-supplied, possibly shared, interner. [`sieve_core::RuleSet`]
    /// uses this to give its scriptlet and modifier matchers one common
    /// interner, matching the process-wide lifetime a token interner is
    /// meant to have rather than one private table per matcher.
    pub fn with_interner(interner: Arc<Interner>) -> Self {
        Self {
            interner,
            ..Self::default()
        }
    }

    /// Registers a positive rule. `patterns` is a comma-separated list of
    /// hostname patterns, or the empty string for a rule that applies to
    /// every hostname.
    ///
    /// Each pattern element may be prefixed with `~` to register it as an
    /// exception instead (so positive and negative rules can share one
    /// rule line). A bare element is also registered under its implicit
    /// `*.`-prefixed wildcard, so `example.com` matches its subdomains as
    /// well as the apex.
    pub fn add_primary_rule(&mut self, patterns: &str, payload: T) -> Result<()> {
        if patterns.is_empty() {
            self.generic.push(payload);
            return Ok(());
        }
        for raw in patterns.split(',') {
            let elem = raw.trim();
            if elem.is_empty() {
                return Err(Error::EmptyHostPattern);
            }
            if let Some(stripped) = elem.strip_prefix('~') {
                if stripped.is_empty() {
                    return Err(Error::EmptyHostPattern);
                }
                self.exception.add(stripped, payload.clone(), &self.interner);
            } else {
                self.primary.add(elem, payload.clone(), &self.interner);
                self.primary
                    .add(&format!("*.{elem}"), payload.clone(), &self.interner);
            }
        }
        Ok(())
    }

    /// Registers an exception rule. Unlike [`add_primary_rule`][Self::add_primary_rule],
    /// every element is treated positively (no `~` handling) and written
    /// to the exception store.
    ///
    /// An empty `patterns` string is appended to the generic (positive)
    /// list rather than the generic-exceptions list. This mirrors a quirk
    /// in the rule format this matcher was ported from: an
    /// exception rule with no hostname applies to nothing to exempt, so
    /// it is treated as an unconditional positive rule instead. Existing
    /// rule sets depend on this, so it is preserved rather than changed.
    pub fn add_exception_rule(&mut self, patterns: &str, payload: T) -> Result<()> {
        if patterns.is_empty() {
            self.generic.push(payload);
            return Ok(());
        }
        for raw in patterns.split(',') {
            let elem = raw.trim();
            if elem.is_empty() {
                return Err(Error::EmptyHostPattern);
            }
            self.exception.add(elem, payload.clone(), &self.interner);
            self.exception
                .add(&format!("*.{elem}"), payload.clone(), &self.interner);
        }
        Ok(())
    }

    /// Returns every payload that applies to `hostname`, with exceptions
    /// already filtered out. Insertion order is preserved: generic rules
    /// first, then hostname-specific rules.
    pub fn get(&self, hostname: &str) -> Vec<T> {
        let primary_hits = self.primary.get(hostname, &self.interner);
        let exception_hits = self.exception.get(hostname, &self.interner);

        if self.generic_exceptions.is_empty() && exception_hits.is_empty() {
            let mut hits = self.generic.clone();
            hits.extend(primary_hits);
            return hits;
        }

        let excluded: HashSet<T> = self
            .generic_exceptions
            .iter()
            .cloned()
            .chain(exception_hits)
            .collect();

        self.generic
            .iter()
            .cloned()
            .chain(primary_hits)
            .filter(|hit| !excluded.contains(hit))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_rule_applies_everywhere() {
        let mut matcher = HostMatcher::new();
        matcher.add_primary_rule("", "always").unwrap();
        assert_eq!(matcher.get("example.com"), vec!["always"]);
        assert_eq!(matcher.get("other.org"), vec!["always"]);
    }

    #[test]
    fn exception_suppresses_matching_primary_hit() {
        let mut matcher = HostMatcher::new();
        matcher.add_primary_rule("example.com", "payload").unwrap();
        matcher.add_exception_rule("example.com", "payload").unwrap();
        assert!(matcher.get("example.com").is_empty());
    }

    #[test]
    fn tilde_prefixed_element_registers_as_exception() {
        let mut matcher = HostMatcher::new();
        matcher
            .add_primary_rule("example.com,~safe.example.com", "payload")
            .unwrap();
        assert_eq!(matcher.get("example.com"), vec!["payload"]);
        assert!(matcher.get("safe.example.com").is_empty());
    }

    #[test]
    fn insertion_order_is_preserved_with_generics_first() {
        let mut matcher = HostMatcher::new();
        matcher.add_primary_rule("", "generic").unwrap();
        matcher.add_primary_rule("example.com", "specific").unwrap();
        assert_eq!(matcher.get("example.com"), vec!["generic", "specific"]);
    }

    #[test]
    fn empty_pattern_element_is_rejected() {
        let mut matcher = HostMatcher::new();
        assert!(matcher.add_primary_rule("example.com,,other.com", "x").is_err());
    }

    #[test]
    fn hostname_specific_rule_does_not_leak_to_other_hosts() {
        let mut matcher = HostMatcher::new();
        matcher
            .add_primary_rule("news.example.com", "payload")
            .unwrap();
        assert!(matcher.get("notexamplecom.com").is_empty());
    }

    #[test]
    fn two_matchers_sharing_an_interner_see_each_others_labels() {
        let interner = Arc::new(Interner::new());
        let mut a = HostMatcher::with_interner(Arc::clone(&interner));
        let mut b = HostMatcher::with_interner(Arc::clone(&interner));
        a.add_primary_rule("example.com", "from-a").unwrap();
        b.add_primary_rule("example.com", "from-b").unwrap();
        assert_eq!(a.get("example.com"), vec!["from-a"]);
        assert_eq!(b.get("example.com"), vec!["from-b"]);
        assert_eq!(interner.len(), 2);
    }
}
