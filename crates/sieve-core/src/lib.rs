//! The content-rewriting core: hostname-scoped rule storage, a
//! hot-reloadable snapshot of the compiled rule set, and dispatch into
//! the scriptlet injector and content modifiers for each response.
//!
//! This crate is the seam an embedding proxy depends on directly; the
//! lower-level pieces (the interner, the trie-based matcher, the
//! streaming rewrite driver, the individual content transformers) are
//! each usable standalone but are wired together here.

mod engine;
mod ruleset;

pub use engine::Engine;
pub use ruleset::{ModifierRule, ModifierStore, RuleSet};
