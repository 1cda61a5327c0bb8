//! [`AnalyzerBackend`](crate::AnalyzerBackend) implementations.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpBackend;
