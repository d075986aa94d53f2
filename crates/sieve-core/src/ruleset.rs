use sieve_error::Result;
use sieve_hostmatch::{HostMatcher, Interner};
use sieve_modifiers::Modifier;
use sieve_scriptlet::ScriptletStore;
use std::sync::Arc;

/// A single content modifier rule prior to registration: which hostname
/// pattern it applies under, the compiled modifier, and whether it is a
/// suppressing (exception) rule rather than an activating (primary)
/// one. The textual syntax that produces these is an external
/// collaborator's concern (the rule parser named in the external
/// interfaces) — this crate only stores and dispatches already-parsed
/// rules.
#[derive(Debug, Clone)]
pub struct ModifierRule {
    pub host_patterns: String,
    pub modifier: Modifier,
    pub is_exception: bool,
}

/// Indexes content modifier rules by hostname pattern, mirroring
/// [`ScriptletStore`]'s shape but over [`Modifier`] payloads.
pub struct ModifierStore {
    matcher: HostMatcher<Modifier>,
}

impl Default for ModifierStore {
    fn default() -> Self {
        Self { matcher: HostMatcher::default() }
    }
}

impl ModifierStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store whose hostname labels are interned through a
    /// shared [`Interner`], so a label also seen by [`ScriptletStore`]
    /// in the same [`RuleSet`] gets the same id rather than a private
    /// one per store.
    pub fn with_interner(interner: Arc<Interner>) -> Self {
        Self {
            matcher: HostMatcher::with_interner(interner),
        }
    }

    pub fn add_primary_rule(&mut self, host_patterns: &str, modifier: Modifier) -> Result<()> {
        self.matcher.add_primary_rule(host_patterns, modifier)
    }

    pub fn add_exception_rule(&mut self, host_patterns: &str, modifier: Modifier) -> Result<()> {
        self.matcher.add_exception_rule(host_patterns, modifier)
    }

    /// Every modifier that applies to `hostname`.
    pub fn get(&self, hostname: &str) -> Vec<Modifier> {
        self.matcher.get(hostname)
    }
}

/// The compiled state produced by one rule-load pass: the scriptlet
/// store and the modifier store, built together so that a reload swaps
/// both atomically.
pub struct RuleSet {
    pub scriptlets: ScriptletStore,
    pub modifiers: ModifierStore,
    exception_modifiers: Vec<Modifier>,
}

impl Default for RuleSet {
    /// Both stores share one [`Interner`], matching the process-wide
    /// lifetime a token interner is meant to have: a hostname label
    /// registered for a scriptlet rule and the same label registered for
    /// a modifier rule end up interned to the same id instead of two
    /// independent ones.
    fn default() -> Self {
        let interner = Arc::new(Interner::new());
        Self {
            scriptlets: ScriptletStore::with_interner(Arc::clone(&interner)),
            modifiers: ModifierStore::with_interner(interner),
            exception_modifiers: Vec::new(),
        }
    }
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scriptlet rule line, recognizing the canonical and
    /// uBlock syntaxes described by [`sieve_scriptlet::parse_rule`].
    /// Malformed lines are reported to the caller rather than aborting
    /// the whole batch; the conventional handling is to log at `warn`
    /// and continue with the next line.
    pub fn add_scriptlet_rule(&mut self, line: &str) -> Result<()> {
        self.scriptlets.add_rule(line)
    }

    /// Registers an already-parsed content modifier rule. A primary
    /// rule whose modifier [`Modifier::cancels`] an already-registered
    /// exception rule's modifier is suppressed here rather than at
    /// dispatch time, so that a rule set's surviving primary rules are
    /// exactly the ones that can fire for some hostname. Loaders should
    /// feed exception rules before the primary rules they are meant to
    /// cancel.
    pub fn add_modifier_rule(&mut self, rule: ModifierRule) -> Result<()> {
        if rule.is_exception {
            self.exception_modifiers.push(rule.modifier.clone());
            return self.modifiers.add_exception_rule(&rule.host_patterns, rule.modifier);
        }
        if self.exception_modifiers.iter().any(|existing| existing.cancels(&rule.modifier)) {
            log::info!("suppressing modifier rule for '{}': cancelled by an exception rule", rule.host_patterns);
            return Ok(());
        }
        self.modifiers.add_primary_rule(&rule.host_patterns, rule.modifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_modifiers::Modifier;

    #[test]
    fn scriptlet_rule_is_retrievable_by_hostname() {
        let mut set = RuleSet::new();
        set.add_scriptlet_rule("example.com#%#//scriptlet('prevent-xhr')").unwrap();
        assert_eq!(set.scriptlets.get("example.com").len(), 1);
        assert!(set.scriptlets.get("other.com").is_empty());
    }

    #[test]
    fn modifier_rule_is_retrievable_by_hostname() {
        let mut set = RuleSet::new();
        let modifier = Modifier::parse("jsonprune=$.ad").unwrap();
        set.add_modifier_rule(ModifierRule {
            host_patterns: "example.com".into(),
            modifier,
            is_exception: false,
        })
        .unwrap();
        assert_eq!(set.modifiers.get("example.com").len(), 1);
    }

    #[test]
    fn exception_rule_suppresses_a_later_identical_primary_rule() {
        let mut set = RuleSet::new();
        set.add_modifier_rule(ModifierRule {
            host_patterns: "safe.example.com".into(),
            modifier: Modifier::parse("jsonprune=$.ad").unwrap(),
            is_exception: true,
        })
        .unwrap();
        set.add_modifier_rule(ModifierRule {
            host_patterns: "example.com".into(),
            modifier: Modifier::parse("jsonprune=$.ad").unwrap(),
            is_exception: false,
        })
        .unwrap();
        assert!(set.modifiers.get("example.com").is_empty());
    }

    #[test]
    fn non_cancelling_primary_rule_survives() {
        let mut set = RuleSet::new();
        set.add_modifier_rule(ModifierRule {
            host_patterns: "safe.example.com".into(),
            modifier: Modifier::parse("jsonprune=$.ad").unwrap(),
            is_exception: true,
        })
        .unwrap();
        set.add_modifier_rule(ModifierRule {
            host_patterns: "example.com".into(),
            modifier: Modifier::parse("jsonprune=$.other").unwrap(),
            is_exception: false,
        })
        .unwrap();
        assert_eq!(set.modifiers.get("example.com").len(), 1);
    }
}
