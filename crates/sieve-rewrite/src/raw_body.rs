use async_compression::futures::bufread::{BrotliDecoder, DeflateDecoder, GzipDecoder, ZstdDecoder};
use encoding_rs::{Decoder, Encoding, UTF_8};
use futures_lite::io::BufReader;
use futures_lite::AsyncRead;
use http::HeaderMap;
use sieve_error::{Error, Result};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Picks the encoding declared by a `Content-Type` header's `charset`
/// parameter, falling back to Windows-1252 when none is declared, the
/// same default the HTML Standard's encoding sniffing algorithm uses for
/// unlabelled text.
pub fn charset_for(content_type: &mime::Mime) -> &'static Encoding {
    content_type
        .get_param("charset")
        .and_then(|charset| Encoding::for_label(charset.as_str().as_bytes()))
        .unwrap_or(encoding_rs::WINDOWS_1252)
}

/// Wraps `reader` in a decompressor chosen by `encoding` (the lowercase
/// value of a `Content-Encoding` header). An empty string is identity.
/// Chained encodings are not supported: this function only ever applies
/// one layer.
pub fn decompress<R>(reader: R, encoding: &str) -> Result<Pin<Box<dyn AsyncRead + Send>>>
where
    R: AsyncRead + Send + 'static,
{
    let buffered = BufReader::new(reader);
    match encoding.to_ascii_lowercase().as_str() {
        "" => Ok(Box::pin(buffered)),
        "gzip" => Ok(Box::pin(GzipDecoder::new(buffered))),
        "deflate" => Ok(Box::pin(DeflateDecoder::new(buffered))),
        "br" => Ok(Box::pin(BrotliDecoder::new(buffered))),
        "zstd" => Ok(Box::pin(ZstdDecoder::new(buffered))),
        other => Err(Error::UnsupportedEncoding(other.to_owned())),
    }
}

/// Transcodes an arbitrary-encoded byte stream into UTF-8 incrementally,
/// using an `encoding_rs` streaming decoder so multi-byte sequences that
/// straddle a read boundary are handled correctly.
pub struct Transcoder<R> {
    inner: R,
    decoder: Decoder,
    raw: Vec<u8>,
    pending: String,
    pending_pos: usize,
    inner_eof: bool,
}

impl<R: AsyncRead + Unpin> Transcoder<R> {
    pub fn new(inner: R, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            decoder: encoding.new_decoder(),
            raw: vec![0u8; 8192],
            pending: String::new(),
            pending_pos: 0,
            inner_eof: false,
        }
    }

    /// A transcoder that assumes its input is already UTF-8; used when
    /// the declared charset is UTF-8 so we avoid an unnecessary decode
    /// pass.
    pub fn identity(inner: R) -> Self {
        Self::new(inner, UTF_8)
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for Transcoder<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        loop {
            if this.pending_pos < this.pending.len() {
                let bytes = this.pending.as_bytes();
                let n = buf.len().min(bytes.len() - this.pending_pos);
                buf[..n].copy_from_slice(&bytes[this.pending_pos..this.pending_pos + n]);
                this.pending_pos += n;
                if this.pending_pos == this.pending.len() {
                    this.pending.clear();
                    this.pending_pos = 0;
                }
                return Poll::Ready(Ok(n));
            }

            if this.inner_eof {
                return Poll::Ready(Ok(0));
            }

            match Pin::new(&mut this.inner).poll_read(cx, &mut this.raw) {
                Poll::Ready(Ok(n)) => {
                    let last = n == 0;
                    this.inner_eof = last;
                    let _ = this.decoder.decode_to_string(&this.raw[..n], &mut this.pending, last);
                    if this.pending.is_empty() && !last {
                        continue;
                    }
                }
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Builds the full raw-body pipeline for a response: a decompressor
/// selected by `Content-Encoding`, followed by a transcoder selected by
/// the `Content-Type` charset parameter. Returns `(reader, media_type)`.
///
/// A response with no `Content-Type` header (or a non-UTF-8 one) is
/// rejected with [`Error::BadContentType`] rather than assumed to be
/// `text/plain`: a media type is what selects the charset a decompressed
/// body gets transcoded from, so guessing one risks mangling a body this
/// pipeline should have left untouched.
///
/// If the body declares no encoding and a UTF-8 charset, the original
/// reader is returned unmodified (wrapped only so the return type is
/// uniform) — this is the common case and avoids a needless decode pass.
pub fn raw_body_reader<R>(
    body: R,
    headers: &HeaderMap,
) -> Result<(Pin<Box<dyn AsyncRead + Send>>, mime::Mime)>
where
    R: AsyncRead + Send + 'static,
{
    let content_type_header = headers
        .get(http::header::CONTENT_TYPE)
        .ok_or(Error::BadContentType)?
        .to_str()
        .map_err(|_| Error::BadContentType)?;
    let content_type: mime::Mime = content_type_header.parse().map_err(|_| Error::BadContentType)?;

    let encoding = headers
        .get(http::header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let charset_is_utf8 = content_type
        .get_param("charset")
        .map(|c| c.as_str().eq_ignore_ascii_case("utf-8"))
        .unwrap_or(false);

    if encoding.is_empty() && charset_is_utf8 {
        return Ok((Box::pin(body), content_type));
    }

    let decompressed = decompress(body, encoding)?;
    let charset = charset_for(&content_type);
    let transcoded: Pin<Box<dyn AsyncRead + Send>> = Box::pin(Transcoder::new(decompressed, charset));
    Ok((transcoded, content_type))
}
