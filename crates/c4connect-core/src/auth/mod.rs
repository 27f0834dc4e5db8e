//! Authentication against the CarrefourConnect identity provider.
//!
//! This module provides:
//! - `probe`: resolve the identity from stored cookies, no credentials
//! - `login`: the six-step credential flow
//! - `finalize`: profile fetch, goto validation and redirect that establish the session
//! - `Authenticator`: tries the probe first and falls back to a login
//! - `CredentialStore`: optional OS keychain storage of the password

pub mod challenge;
pub mod credentials;
pub mod finalize;
pub mod login;
pub mod orchestrator;
pub mod probe;

pub use challenge::AuthChallenge;
pub use credentials::{CredentialStore, Credentials};
pub use finalize::finalize;
pub use login::login;
pub use orchestrator::{AuthenticationOutcome, Authenticator, SessionSource};
pub use probe::probe;
