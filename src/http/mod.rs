//! HTTP client module with download error classification.

mod client;

pub use client::HttpClient;
