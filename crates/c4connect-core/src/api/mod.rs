//! HTTP plumbing for the CarrefourConnect identity provider.
//!
//! This module provides the `HttpClient` that carries the cookie store on
//! every request, the `TransportError` it fails with, and the classifier
//! that turns those failures into an `AuthError`.
//!
//! Retries are deliberately absent: a failed step fails the whole attempt.

pub mod client;
pub mod error;

pub use client::{HttpClient, HttpResponse, Request, DEFAULT_TIMEOUT_SECS};
pub use error::{classify, AuthError, TransportError};
