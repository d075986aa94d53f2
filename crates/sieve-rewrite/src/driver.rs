use crate::body::Body;
use crate::raw_body::raw_body_reader;
use futures_lite::{AsyncRead, AsyncReadExt};
use http::{header, HeaderMap, Response};
use sieve_error::Result;
use sluice::pipe::PipeWriter;
use std::future::Future;
use std::pin::Pin;

fn rewrite_content_type(headers: &mut HeaderMap, media_type: &mime::Mime) {
    let value = format!("{}; charset=utf-8", media_type.essence_str());
    headers.insert(header::CONTENT_TYPE, value.parse().expect("valid header value"));
}

/// Swaps `response`'s body for a streaming pipe and drives `processor`
/// concurrently with whatever reads the new body downstream.
///
/// `processor` receives the decompressed, UTF-8 raw body reader and the
/// write end of a pipe; it is responsible for writing the rewritten body
/// and then dropping the writer (which closes the pipe and signals EOF
/// to the reader side). This function returns the driving future rather
/// than spawning it, since this crate does not own an async runtime —
/// the caller must poll it to completion exactly once, on whatever
/// executor it already uses, and must not drop the response body before
/// it completes.
pub fn stream_rewrite<F, Fut>(
    response: &mut Response<Body>,
    processor: F,
) -> Result<impl Future<Output = ()> + Send + 'static>
where
    F: FnOnce(Pin<Box<dyn AsyncRead + Send>>, PipeWriter) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let body = std::mem::take(response.body_mut());
    let (raw_reader, media_type) = raw_body_reader(body.into_reader(), response.headers())?;

    let (pipe_reader, pipe_writer) = sluice::pipe::pipe();

    let headers = response.headers_mut();
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::CONTENT_ENCODING);
    headers.insert(header::TRANSFER_ENCODING, "chunked".parse().unwrap());
    rewrite_content_type(headers, &media_type);

    *response.body_mut() = Body::new_streaming(pipe_reader, None);

    Ok(processor(raw_reader, pipe_writer))
}

/// Reads `response`'s body fully, hands it to `processor`, and replaces
/// the body with whatever bytes it returns. Unlike [`stream_rewrite`],
/// this is a single future the caller awaits directly: there is no
/// unknown-length streaming concern, so `Content-Length` is always
/// recomputed exactly.
pub async fn buffer_rewrite<F>(response: &mut Response<Body>, processor: F) -> Result<()>
where
    F: FnOnce(Vec<u8>) -> Result<Vec<u8>>,
{
    let (bytes, media_type) = read_full_body(response).await?;
    let rewritten = processor(bytes)?;
    finish_buffered(response, &media_type, rewritten);
    Ok(())
}

/// Identical to [`buffer_rewrite`], except `processor` is itself
/// asynchronous. Used by transformers whose in-memory rewrite pass is
/// built on an async API (the HTML splicer) but whose input, being
/// buffered here, needs no concurrent reader of its own — unlike
/// [`stream_rewrite`], this crate drives `processor` to completion
/// before returning, so there is no pipe and no backpressure to manage.
pub async fn buffer_rewrite_async<F, Fut>(response: &mut Response<Body>, processor: F) -> Result<()>
where
    F: FnOnce(Vec<u8>) -> Fut,
    Fut: Future<Output = Result<Vec<u8>>>,
{
    let (bytes, media_type) = read_full_body(response).await?;
    let rewritten = processor(bytes).await?;
    finish_buffered(response, &media_type, rewritten);
    Ok(())
}

async fn read_full_body(response: &mut Response<Body>) -> Result<(Vec<u8>, mime::Mime)> {
    let body = std::mem::take(response.body_mut());
    let (mut raw_reader, media_type) = raw_body_reader(body.into_reader(), response.headers())?;

    let mut bytes = Vec::new();
    raw_reader.read_to_end(&mut bytes).await?;
    Ok((bytes, media_type))
}

fn finish_buffered(response: &mut Response<Body>, media_type: &mime::Mime, rewritten: Vec<u8>) {
    let headers = response.headers_mut();
    headers.remove(header::TRANSFER_ENCODING);
    headers.remove(header::CONTENT_ENCODING);
    headers.insert(
        header::CONTENT_LENGTH,
        rewritten.len().to_string().parse().unwrap(),
    );
    rewrite_content_type(headers, media_type);

    *response.body_mut() = Body::new_static(rewritten);
}
