//! Streaming and buffered HTTP response body rewriting.
//!
//! This crate turns a [`http::Response`] whose body may be compressed
//! and non-UTF-8 encoded into one whose body is plain UTF-8, either by
//! streaming the transform concurrently with the response being sent
//! ([`stream_rewrite`]) or by buffering the whole body first
//! ([`buffer_rewrite`]).

mod body;
mod driver;
mod raw_body;

pub use body::Body;
pub use driver::{buffer_rewrite, buffer_rewrite_async, stream_rewrite};
pub use raw_body::{charset_for, decompress, raw_body_reader, Transcoder};
