//! Deletes named `var`-scoped constants or nested object-literal
//! properties from JavaScript, either a standalone script response or
//! every inline `<script>` in an HTML response.

mod ast;

use http::Response;
use lol_async::html::{html_content::ContentType, text, Settings};
use sieve_error::{Error, Result};
use sieve_rewrite::{buffer_rewrite, buffer_rewrite_async, Body};

pub use ast::strip_keys;

/// A compiled `remove-js-constant=` rule: a list of dotted key paths,
/// each identifying a top-level `var` binding or a property reached by
/// descending into its object-literal initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsConstantStripModifier {
    keys: Vec<Vec<String>>,
}

impl JsConstantStripModifier {
    /// Parses `remove-js-constant=key.path|other.key` — pipe-separated
    /// key paths, each dot-separated.
    pub fn parse(rule: &str) -> Result<Self> {
        let expr = rule
            .strip_prefix("remove-js-constant=")
            .ok_or_else(|| Error::InvalidModifier(rule.to_owned()))?;
        if expr.is_empty() {
            return Err(Error::InvalidModifier(rule.to_owned()));
        }
        let keys = expr
            .split('|')
            .map(|path| path.split('.').map(str::to_owned).collect())
            .collect();
        Ok(Self { keys })
    }

    /// Requests never carry a body this modifier touches.
    pub fn modify_req(&self) -> bool {
        false
    }

    /// Dispatches on the response's media type: a standalone
    /// `text/javascript` body is buffer-rewritten whole; an HTML body has
    /// every inline `<script>` passed through the stripper, also
    /// buffered (the splicer needs the whole document before it can
    /// produce output, so there's no concurrent reader here for a
    /// streaming pipe to matter). Any other media type passes through
    /// untouched. Returns whether any key was actually removed.
    pub async fn modify_res(&self, response: &mut Response<Body>) -> Result<bool> {
        let media_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<mime::Mime>().ok())
            .map(|mime| mime.essence_str().to_owned());

        match media_type.as_deref() {
            Some("text/javascript") => {
                let keys = self.keys.clone();
                let mut modified = false;
                buffer_rewrite(response, |bytes| {
                    let source = String::from_utf8_lossy(&bytes).into_owned();
                    match strip_keys(&source, &keys) {
                        Ok((stripped, removed)) => {
                            modified = removed;
                            Ok(stripped.into_bytes())
                        }
                        Err(e) => {
                            log::warn!("remove-js-constant: {e}, leaving script unmodified");
                            Ok(bytes)
                        }
                    }
                })
                .await?;
                Ok(modified)
            }
            Some("text/html") => {
                let keys = self.keys.clone();
                let mut modified = false;
                let modified_ref = &mut modified;
                buffer_rewrite_async(response, move |bytes| async move {
                    let (rewritten, removed) = rewrite_inline_scripts(&bytes, keys).await;
                    *modified_ref = removed;
                    Ok(rewritten)
                })
                .await?;
                Ok(modified)
            }
            _ => Ok(false),
        }
    }

    /// Two constant-strip modifiers cancel each other iff their key
    /// path lists are exactly equal.
    pub fn cancels(&self, other: &JsConstantStripModifier) -> bool {
        self.keys == other.keys
    }
}

async fn rewrite_inline_scripts(html: &[u8], keys: Vec<Vec<String>>) -> (Vec<u8>, bool) {
    let mut buffer = String::new();
    let modified = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let modified_handle = std::sync::Arc::clone(&modified);
    let settings = Settings {
        element_content_handlers: vec![text!("script", move |chunk| {
            buffer.push_str(chunk.as_str());
            if chunk.last_in_text_node() {
                let script = std::mem::take(&mut buffer);
                let stripped = match strip_keys(&script, &keys) {
                    Ok((stripped, removed)) => {
                        if removed {
                            modified_handle.store(true, std::sync::atomic::Ordering::Relaxed);
                        }
                        stripped
                    }
                    Err(_) => script,
                };
                chunk.replace(&stripped, ContentType::Text);
            } else {
                chunk.remove();
            }
            Ok(())
        })],
        ..Settings::default()
    };

    let (drive, mut rewritten) = lol_async::rewrite(futures_lite::io::Cursor::new(html.to_vec()), settings);
    let mut out = Vec::new();
    let copy = futures_lite::io::copy(&mut rewritten, &mut out);
    let (_drive_result, _copy_result) = futures_lite::future::zip(drive, copy).await;
    (out, modified.load(std::sync::atomic::Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::future::block_on;

    #[test]
    fn parses_pipe_and_dot_separated_key_paths() {
        let modifier = JsConstantStripModifier::parse("remove-js-constant=cfg.a.b|tracking").unwrap();
        assert_eq!(
            modifier.keys,
            vec![
                vec!["cfg".to_string(), "a".to_string(), "b".to_string()],
                vec!["tracking".to_string()],
            ]
        );
    }

    #[test]
    fn strips_inline_script_in_html_document() {
        let modifier = JsConstantStripModifier::parse("remove-js-constant=tracking").unwrap();
        let html = b"<html><head><script>var tracking = true;\nvar keep = 1;</script></head></html>".to_vec();
        let (out, modified) = block_on(rewrite_inline_scripts(&html, modifier.keys.clone()));
        let out = String::from_utf8(out).unwrap();
        assert!(modified);
        assert!(!out.contains("tracking"));
        assert!(out.contains("keep"));
    }

    #[test]
    fn inline_script_without_a_matching_key_reports_no_modification() {
        let modifier = JsConstantStripModifier::parse("remove-js-constant=tracking").unwrap();
        let html = b"<html><head><script>var keep = 1;</script></head></html>".to_vec();
        let (out, modified) = block_on(rewrite_inline_scripts(&html, modifier.keys.clone()));
        assert!(!modified);
        assert!(String::from_utf8(out).unwrap().contains("keep"));
    }

    #[test]
    fn cancels_requires_identical_key_paths() {
        let a = JsConstantStripModifier::parse("remove-js-constant=a.b").unwrap();
        let b = JsConstantStripModifier::parse("remove-js-constant=a.b").unwrap();
        let c = JsConstantStripModifier::parse("remove-js-constant=a.c").unwrap();
        assert!(a.cancels(&b));
        assert!(!a.cancels(&c));
    }
}
