use hashbrown::HashMap;
use sieve_interner::Interner;

/// A suffix trie over dot-separated hostname labels, traversed from the
/// rightmost (TLD) label inward. A `*` label denotes "one or more further
/// labels beneath this point" and is stored on a dedicated wildcard edge
/// rather than as an ordinary child, since `*` is not a valid DNS label.
///
/// Labels are keyed by the id an [`Interner`] assigns them rather than by
/// the label text itself, so a lookup against a hostname with a label
/// that was never registered in any pattern can reject that branch with
/// an id lookup instead of hashing and comparing the string against
/// every sibling.
pub struct HostTrie<T> {
    root: Node<T>,
}

// Written by hand rather than derived: `derive(Default)` would add a
// `T: Default` bound to this impl even though every field defaults
// without one, which would make `HostTrie<T>` unusable for the
// non-Default payload types (e.g. `ScriptletArgs`, `Modifier`) it is
// actually instantiated with.
impl<T> Default for HostTrie<T> {
    fn default() -> Self {
        Self { root: Node::default() }
    }
}

struct Node<T> {
    payloads: Vec<T>,
    children: HashMap<u32, Node<T>>,
    wildcard: Option<Box<Node<T>>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            payloads: Vec::new(),
            children: HashMap::new(),
            wildcard: None,
        }
    }
}

impl<T: Clone> HostTrie<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `payload` under `pattern`, e.g. `"example.com"` or
    /// `"*.example.com"`. The pattern is not validated here; callers are
    /// expected to reject empty patterns before calling this. Every
    /// concrete label is interned via `interner`, assigning it an id if
    /// this is the first time the label has been seen.
    pub fn add(&mut self, pattern: &str, payload: T, interner: &Interner) {
        let mut node = &mut self.root;
        for label in pattern.split('.').rev() {
            node = if label == "*" {
                node.wildcard.get_or_insert_with(Box::default)
            } else {
                let id = interner.intern(label);
                node.children.entry(id).or_default()
            };
        }
        node.payloads.push(payload);
    }

    /// Returns every payload registered for a pattern that matches
    /// `hostname`, in insertion order: wildcard hits first (shallowest
    /// first), followed by an exact hit if one exists. A label of
    /// `hostname` that was never interned by any `add` call cannot match
    /// any child edge, so the walk stops there without growing the
    /// interner's table.
    pub fn get(&self, hostname: &str, interner: &Interner) -> Vec<T> {
        let mut hits = Vec::new();
        let mut node = &self.root;
        let mut fully_consumed = true;
        for label in hostname.split('.').rev() {
            if let Some(wildcard) = &node.wildcard {
                hits.extend(wildcard.payloads.iter().cloned());
            }
            let next = interner.get(label).and_then(|id| node.children.get(&id));
            match next {
                Some(next) => node = next,
                None => {
                    fully_consumed = false;
                    break;
                }
            }
        }
        if fully_consumed {
            hits.extend(node.payloads.iter().cloned());
        }
        hits
    }
}
