use futures_lite::{io::Cursor, AsyncRead, AsyncReadExt};
use std::{borrow::Cow, io, pin::Pin};

/// A response body that is either fully in memory or a streaming
/// [`AsyncRead`] source. This is the crate-local body abstraction the
/// rewrite driver swaps into a response in place of its original body;
/// it intentionally knows nothing about a particular HTTP client or
/// server implementation so this crate stays usable from any of them.
pub enum Body {
    /// no body at all
    Empty,
    /// a body whose full content is already in memory
    Static(Cow<'static, [u8]>),
    /// a body backed by an async reader, with an optional known length
    Streaming {
        reader: Pin<Box<dyn AsyncRead + Send + 'static>>,
        len: Option<u64>,
    },
}

impl Default for Body {
    fn default() -> Self {
        Body::Empty
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Static(content) => f.debug_tuple("Body::Static").field(&content.len()).finish(),
            Body::Streaming { len, .. } => f.debug_struct("Body::Streaming").field("len", len).finish(),
        }
    }
}

impl Body {
    /// Builds a body from a streaming reader. `len`, if known, becomes
    /// the response's `Content-Length`; pass `None` for chunked framing.
    pub fn new_streaming(reader: impl AsyncRead + Send + 'static, len: Option<u64>) -> Self {
        Body::Streaming {
            reader: Box::pin(reader),
            len,
        }
    }

    /// Builds a body from content already held in memory.
    pub fn new_static(content: impl Into<Cow<'static, [u8]>>) -> Self {
        Body::Static(content.into())
    }

    /// The length of this body, if known without consuming it.
    pub fn len(&self) -> Option<u64> {
        match self {
            Body::Empty => Some(0),
            Body::Static(content) => Some(content.len() as u64),
            Body::Streaming { len, .. } => *len,
        }
    }

    /// Whether this body is known to carry no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Converts this body into a boxed reader, wrapping in-memory
    /// content in a [`Cursor`].
    pub fn into_reader(self) -> Pin<Box<dyn AsyncRead + Send>> {
        match self {
            Body::Streaming { reader, .. } => reader,
            Body::Static(content) => Box::pin(Cursor::new(content)),
            Body::Empty => Box::pin(Cursor::new(&[][..])),
        }
    }

    /// Reads this body to completion and returns its full content.
    pub async fn into_bytes(self) -> io::Result<Cow<'static, [u8]>> {
        match self {
            Body::Static(content) => Ok(content),
            Body::Empty => Ok(Cow::Borrowed(&[])),
            Body::Streaming { mut reader, len } => {
                let mut buf = len
                    .and_then(|len| usize::try_from(len).ok())
                    .map(Vec::with_capacity)
                    .unwrap_or_default();
                reader.read_to_end(&mut buf).await?;
                Ok(Cow::Owned(buf))
            }
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(content: Vec<u8>) -> Self {
        Body::new_static(content)
    }
}

impl From<&'static [u8]> for Body {
    fn from(content: &'static [u8]) -> Self {
        Body::new_static(content)
    }
}
