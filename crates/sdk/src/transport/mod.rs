//! Transport layer for the PxWeb client.

pub mod http;

pub use http::HttpTransport;
