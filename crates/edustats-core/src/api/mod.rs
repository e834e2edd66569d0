//! REST client for the education platform's statistics endpoints.
//!
//! Each dashboard role reads one aggregate endpoint. The JSON body is passed
//! through untouched; its shape belongs to the backend.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
