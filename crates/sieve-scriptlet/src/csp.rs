use http::{HeaderMap, HeaderValue};

const PRIORITY: [&str; 3] = ["script-src-elem", "script-src", "default-src"];

/// Whether any `Content-Security-Policy` header value restricts inline
/// scripts, i.e. names one of the directives in [`PRIORITY`].
pub fn blocks_inline_scripts(headers: &HeaderMap) -> bool {
    headers
        .get_all(http::header::CONTENT_SECURITY_POLICY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|value| {
            let lower = value.to_ascii_lowercase();
            PRIORITY.iter().any(|directive| lower.contains(directive))
        })
}

/// Patches the highest-priority CSP directive (`script-src-elem` >
/// `script-src` > `default-src`) across all `Content-Security-Policy`
/// header lines to permit a script carrying `nonce`. Only the first
/// matching directive, in the first matching header line, is touched —
/// a page emitting multiple CSP lines that both declare the same
/// directive only gets the nonce on the earliest one.
///
/// - `'unsafe-inline'` present: no-op, the nonce would be redundant.
/// - `'none'` present: replaced with `'nonce-<nonce>'`.
/// - otherwise: `'nonce-<nonce>'` is appended.
pub fn add_nonce_to_csp(headers: &mut HeaderMap, nonce: &str) {
    let values: Vec<String> = headers
        .get_all(http::header::CONTENT_SECURITY_POLICY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_owned)
        .collect();

    let mut patched_line = None;
    'outer: for directive_name in PRIORITY {
        for (line_index, value) in values.iter().enumerate() {
            if let Some(rewritten) = patch_directive(value, directive_name, nonce) {
                patched_line = Some((line_index, rewritten));
                break 'outer;
            }
        }
    }

    let Some((line_index, rewritten)) = patched_line else {
        return;
    };

    let mut headers_copy: Vec<HeaderValue> = headers
        .get_all(http::header::CONTENT_SECURITY_POLICY)
        .iter()
        .cloned()
        .collect();
    headers_copy[line_index] = HeaderValue::from_str(&rewritten).expect("valid header value");

    headers.remove(http::header::CONTENT_SECURITY_POLICY);
    for value in headers_copy {
        headers.append(http::header::CONTENT_SECURITY_POLICY, value);
    }
}

/// Finds `directive_name` in `line` and returns the whole line rewritten
/// to permit `nonce`, or `None` if `directive_name` is absent from this
/// line.
fn patch_directive(line: &str, directive_name: &str, nonce: &str) -> Option<String> {
    let directives: Vec<&str> = line.split(';').collect();
    let index = directives.iter().position(|d| {
        d.trim_start()
            .split_whitespace()
            .next()
            .map(|name| name.eq_ignore_ascii_case(directive_name))
            .unwrap_or(false)
    })?;

    let directive = directives[index];
    let tokens: Vec<&str> = directive.split_whitespace().collect();
    let nonce_token = format!("'nonce-{nonce}'");
    if tokens.iter().any(|t| *t == "'unsafe-inline'" || *t == nonce_token) {
        return Some(line.to_owned());
    }

    let rewritten_directive = if tokens.iter().any(|t| *t == "'none'") {
        directive.replacen("'none'", &nonce_token, 1)
    } else {
        format!("{directive} {nonce_token}")
    };

    let mut rewritten_directives = directives;
    rewritten_directives[index] = &rewritten_directive;
    Some(rewritten_directives.join(";"))
}
