//! The persisted JSON configuration document for the sieve
//! content-rewriting core: filter-list registration, the user's own
//! rules, proxy settings, and the debug-export document, all guarded by
//! a reader/writer discipline.
//!
//! This crate implements the document shape and the load/save/reload
//! contract only; resolving *where* the file lives on a given OS is the
//! embedding application's job.

mod document;
mod store;

pub use document::{CertManagerConfig, ConfigDocument, DebugExport, FilterConfig, FilterList, FilterListType, ProxyConfig, UpdatePolicy};
pub use store::ConfigStore;

/// The configuration document written verbatim on first launch.
pub const DEFAULT_CONFIG_JSON: &str = include_str!("../assets/default-config.json");
