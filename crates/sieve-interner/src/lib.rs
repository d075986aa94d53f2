//! A process-wide string interner assigning small, monotonic integer ids.
//!
//! Reads are lock-free after the first hit; a new string takes the write
//! lock exactly once and is checked again under that lock in case another
//! writer beat us to it.

use hashbrown::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

/// Interns strings to `u32` ids. Ids are assigned in first-seen order and
/// are never reused, so two interners never agree unless they're the same
/// instance.
#[derive(Default)]
pub struct Interner {
    ids: RwLock<HashMap<String, u32>>,
    next: AtomicU32,
}

impl Interner {
    /// Builds an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `s`, assigning a fresh one if `s` has not been
    /// seen before.
    pub fn intern(&self, s: &str) -> u32 {
        if let Some(&id) = self.ids.read().unwrap().get(s) {
            return id;
        }

        let mut ids = self.ids.write().unwrap();
        if let Some(&id) = ids.get(s) {
            return id;
        }

        let id = self.next.fetch_add(1, Ordering::Relaxed);
        ids.insert(s.to_owned(), id);
        id
    }

    /// Returns the id already assigned to `s`, if any, without
    /// assigning a new one. Useful on a lookup path where a miss means
    /// "nothing registered under this string could possibly match" and
    /// the caller wants to avoid growing the table on every query.
    pub fn get(&self, s: &str) -> Option<u32> {
        self.ids.read().unwrap().get(s).copied()
    }

    /// Number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.ids.read().unwrap().len()
    }

    /// Whether any strings have been interned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Interner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interner").field("len", &self.len()).finish()
    }
}
