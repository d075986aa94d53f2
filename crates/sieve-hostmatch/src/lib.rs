//! Hostname pattern matching for the sieve content-rewriting core.
//!
//! [`HostMatcher`] indexes rule payloads by hostname pattern (with
//! wildcard and negation support) and answers per-request lookups.

mod matcher;
mod trie;

pub use matcher::HostMatcher;
pub use sieve_interner::Interner;
pub use trie::HostTrie;
