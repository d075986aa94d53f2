//! Scriptlet rule registration and CSP-aware injection.
//!
//! A [`ScriptletStore`] indexes parsed rules by hostname; [`Injector`]
//! splices a `<script>` carrying the matched scriptlets' calls into a
//! matching response, patching `Content-Security-Policy` to permit it
//! when necessary.

mod csp;
mod rule;

pub use rule::{parse_rule, ScriptletArgs};

use http::Response;
use sieve_error::Result;
use sieve_hostmatch::{HostMatcher, Interner};
use sieve_rewrite::{buffer_rewrite_async, Body};
use std::sync::Arc;

/// Indexes parsed scriptlet rules by hostname pattern.
pub struct ScriptletStore {
    matcher: HostMatcher<ScriptletArgs>,
}

impl Default for ScriptletStore {
    fn default() -> Self {
        Self { matcher: HostMatcher::default() }
    }
}

impl ScriptletStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store whose hostname labels are interned through a
    /// shared [`Interner`], so the same label seen by a sibling store
    /// (e.g. [`sieve_core::ModifierStore`]) is assigned the same id.
    pub fn with_interner(interner: Arc<Interner>) -> Self {
        Self {
            matcher: HostMatcher::with_interner(interner),
        }
    }

    /// Parses and registers one rule line, recognizing both the
    /// canonical and uBlock scriptlet syntaxes.
    pub fn add_rule(&mut self, line: &str) -> Result<()> {
        let parsed = rule::parse_rule(line)?;
        if parsed.is_exception {
            self.matcher.add_exception_rule(&parsed.host_patterns, parsed.args)
        } else {
            self.matcher.add_primary_rule(&parsed.host_patterns, parsed.args)
        }
    }

    /// Every scriptlet argument list that applies to `hostname`.
    pub fn get(&self, hostname: &str) -> Vec<ScriptletArgs> {
        self.matcher.get(hostname)
    }
}

/// Splices the embedded scriptlet bundle plus per-rule invocations into
/// a matching HTML response, patching CSP as needed so the injected
/// script is permitted to run.
pub struct Injector {
    bundle: &'static [u8],
}

impl Injector {
    /// `bundle` is the scriptlet runtime's JavaScript source, embedded
    /// at build time by the caller (e.g. via `include_bytes!`).
    pub fn new(bundle: &'static [u8]) -> Self {
        Self { bundle }
    }

    /// Injects scriptlets matching `hostname` into `response`, if any
    /// are registered for it. A response with no matching rules is
    /// returned unmodified.
    ///
    /// The splice is done buffered rather than streamed: the splicer
    /// has to read the whole document before the driver's pipe can be
    /// drained, and with no concurrent reader of that pipe in this
    /// in-crate call, a document bigger than the pipe's buffer would
    /// otherwise deadlock the single task that both writes and awaits
    /// it.
    pub async fn inject(&self, hostname: &str, store: &ScriptletStore, response: &mut Response<Body>) -> Result<()> {
        let args = store.get(hostname);
        if args.is_empty() {
            return Ok(());
        }

        let nonce = if csp::blocks_inline_scripts(response.headers()) {
            let nonce = uuid::Uuid::new_v4().to_string();
            csp::add_nonce_to_csp(response.headers_mut(), &nonce);
            Some(nonce)
        } else {
            None
        };

        let injection = build_injection(self.bundle, &args, nonce.as_deref());

        buffer_rewrite_async(response, move |bytes| async move {
            let mut out = Vec::new();
            match sieve_html::append_in_head(
                futures_lite::io::Cursor::new(bytes.clone()),
                futures_lite::io::Cursor::new(&mut out),
                injection,
            )
            .await
            {
                Ok(()) => Ok(out),
                Err(e) => {
                    log::warn!("scriptlet injection failed: {e}");
                    Ok(bytes)
                }
            }
        })
        .await
    }
}

fn build_injection(bundle: &[u8], args: &[ScriptletArgs], nonce: Option<&str>) -> Vec<u8> {
    let mut out = Vec::new();
    match nonce {
        Some(nonce) => out.extend_from_slice(format!("<script nonce=\"{nonce}\">").as_bytes()),
        None => out.extend_from_slice(b"<script>"),
    }
    out.extend_from_slice(bundle);
    out.extend_from_slice(b"(()=>{");
    for arg in args {
        out.extend_from_slice(arg.generate_injection().as_bytes());
    }
    out.extend_from_slice(b"})();");
    out.extend_from_slice(b"</script>");
    out
}
