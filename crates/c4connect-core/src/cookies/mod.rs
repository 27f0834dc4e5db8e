//! Cookie handling for the authentication session.
//!
//! This module provides:
//! - `CookieStore`: the cookie jar every request reads and writes
//! - `CookieVault`: encrypted per-account persistence of the store across runs
//!
//! The identity provider keeps the whole session in cookies, so reusing a
//! session only requires restoring the store.

pub mod store;
pub mod vault;

pub use store::{Cookie, CookieStore};
pub use vault::{CookieVault, MemorySessionStore, SessionStore};
