//! c4connect core library.
//!
//! Establishes and reuses a logged-in session against the CarrefourConnect
//! identity provider:
//! - `cookies`: the cookie store threaded through every request, and its
//!   encrypted on-disk persistence
//! - `api`: the HTTP client and the transport error classifier
//! - `auth`: session probe, login flow, session finalizer and the
//!   `Authenticator` that ties them together
//! - `endpoints`: provider URLs and the precomputed redirect target
//! - `config`: user configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod cookies;
pub mod endpoints;

pub use api::{AuthError, HttpClient, TransportError};
pub use auth::{AuthenticationOutcome, Authenticator, Credentials, SessionSource};
pub use config::Config;
pub use cookies::{Cookie, CookieStore, CookieVault, SessionStore};
pub use endpoints::{Endpoints, RedirectTarget};
