//! Streaming HTML splicing for the sieve content-rewriting core.
//!
//! The two operations here are narrow by design: inject bytes right
//! before `</head>` (used by the scriptlet injector) or right after the
//! `<body>` start tag. Both are built on `lol-html`'s incremental
//! tokenizer via the `lol-async` wrapper, rather than a hand-rolled
//! tokenizer loop, since that's the same mechanism the rest of this
//! toolkit reaches for when it needs to touch markup in flight.

use futures_lite::{AsyncRead, AsyncWrite};
use lol_async::html::{element, html_content::ContentType, Settings};
use sieve_error::Result;

/// Copies `input` to `output`, appending `injection` immediately before
/// the closing `</head>` tag. If the document has no `<head>` element,
/// every byte of `input` is still flushed to `output` unmodified — an
/// unmatched document is not an excuse to truncate output.
pub async fn append_in_head(
    input: impl AsyncRead + Send + Unpin + 'static,
    mut output: impl AsyncWrite + Send + Unpin,
    injection: Vec<u8>,
) -> Result<()> {
    splice(input, &mut output, "head", Splice::Append(injection)).await
}

/// Copies `input` to `output`, prepending `injection` immediately after
/// the opening `<body>` tag.
pub async fn prepend_in_body(
    input: impl AsyncRead + Send + Unpin + 'static,
    mut output: impl AsyncWrite + Send + Unpin,
    injection: Vec<u8>,
) -> Result<()> {
    splice(input, &mut output, "body", Splice::Prepend(injection)).await
}

enum Splice {
    Append(Vec<u8>),
    Prepend(Vec<u8>),
}

async fn splice(
    input: impl AsyncRead + Send + Unpin + 'static,
    output: &mut (impl AsyncWrite + Send + Unpin + ?Sized),
    tag: &'static str,
    splice: Splice,
) -> Result<()> {
    let settings = move || {
        let injection = match &splice {
            Splice::Append(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Splice::Prepend(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        };
        let append = matches!(splice, Splice::Append(_));
        Settings {
            element_content_handlers: vec![element!(tag, move |el| {
                if append {
                    el.append(&injection, ContentType::Html);
                } else {
                    el.prepend(&injection, ContentType::Html);
                }
                Ok(())
            })],
            ..Settings::default()
        }
    };

    let (drive, mut rewritten) = lol_async::rewrite(input, settings());
    let copy = futures_lite::io::copy(&mut rewritten, output);

    let (_drive_result, copy_result) = futures_lite::future::zip(drive, copy).await;
    copy_result?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::future::block_on;
    use futures_lite::io::Cursor;

    async fn run_append(html: &str, injection: &str) -> String {
        let mut out = Vec::new();
        append_in_head(
            Cursor::new(html.as_bytes().to_vec()),
            Cursor::new(&mut out),
            injection.as_bytes().to_vec(),
        )
        .await
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn injects_before_closing_head_tag() {
        let out = block_on(run_append(
            "<html><head><title>x</title></head><body></body></html>",
            "<script>1</script>",
        ));
        assert!(out.contains("<title>x</title><script>1</script></head>"));
    }

    #[test]
    fn missing_head_still_flushes_the_whole_document() {
        let out = block_on(run_append("<html><body>hi</body></html>", "<script>1</script>"));
        assert!(out.contains("hi"));
    }

    #[test]
    fn prepend_in_body_lands_right_after_the_open_tag() {
        let mut out = Vec::new();
        block_on(prepend_in_body(
            Cursor::new(b"<html><body><p>hi</p></body></html>".to_vec()),
            Cursor::new(&mut out),
            b"<h1>banner</h1>".to_vec(),
        ))
        .unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("<body><h1>banner</h1><p>hi</p></body>"));
    }
}
