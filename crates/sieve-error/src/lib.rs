//! The shared error type for the sieve content-rewriting crates.

use thiserror::Error;

/// Errors that occur while matching hostnames, rewriting bodies, or
/// applying a content transformer.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// [`std::io::Error`]
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// the `Content-Type` header could not be parsed
    #[error("malformed content-type header")]
    BadContentType,

    /// the `Content-Encoding` was not one we know how to decompress
    #[error("unsupported content-encoding: {0}")]
    UnsupportedEncoding(String),

    /// decompression or charset transcoding failed partway through the body
    #[error("failed to decode response body: {0}")]
    DecodeFailed(String),

    /// a JSON, JSONPath, or JavaScript document failed to parse
    #[error("failed to parse {what}: {message}")]
    ParseFailed {
        /// what kind of document failed to parse, e.g. `"json"` or `"javascript"`
        what: &'static str,
        /// the underlying parser's message
        message: String,
    },

    /// a scriptlet rule line matched none of the recognized syntaxes
    #[error("unrecognized scriptlet rule syntax: {0}")]
    UnsupportedSyntax(String),

    /// a modifier string failed its own validation, e.g. a `jsonprune=`
    /// rule with no JSONPath expression
    #[error("invalid modifier: {0}")]
    InvalidModifier(String),

    /// a comma-separated hostname pattern contained an empty element
    #[error("empty hostname pattern element")]
    EmptyHostPattern,

    /// the configuration document could not be loaded or persisted
    #[error("configuration error: {0}")]
    Config(String),
}

/// this crate's result type
pub type Result<T> = std::result::Result<T, Error>;
