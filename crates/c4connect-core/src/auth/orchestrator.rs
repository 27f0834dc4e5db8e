//! Top-level entry point: reuse the stored session when possible, log in
//! otherwise.

use tracing::{error, info, warn};

use crate::api::{AuthError, HttpClient};
use crate::cookies::CookieStore;
use crate::endpoints::Endpoints;

use super::{finalize, login, probe, Credentials};

/// How an authenticated session was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    /// Stored cookies were still valid; no credentials were sent.
    Reused,
    /// A full credential login was performed.
    Fresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationOutcome {
    Authenticated(SessionSource),
    Failed(AuthError),
}

impl AuthenticationOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthenticationOutcome::Authenticated(_))
    }
}

/// Owns the cookie store for one run and drives the authentication steps.
pub struct Authenticator {
    http: HttpClient,
    cookies: CookieStore,
    endpoints: Endpoints,
}

impl Authenticator {
    pub fn new(http: HttpClient, cookies: CookieStore, endpoints: Endpoints) -> Self {
        Self {
            http,
            cookies,
            endpoints,
        }
    }

    /// Make sure a usable session exists, logging in only when the stored
    /// one cannot be reused.
    pub async fn ensure_authenticated(&mut self, credentials: &Credentials) -> AuthenticationOutcome {
        if let Some(id) = probe(&self.http, &mut self.cookies, &self.endpoints).await {
            match finalize(&self.http, &mut self.cookies, &self.endpoints, &id).await {
                Ok(()) => {
                    info!("Reusing stored session");
                    return AuthenticationOutcome::Authenticated(SessionSource::Reused);
                }
                Err(e) => warn!(error = %e, "Stored session could not be finalized"),
            }
        }

        info!("No correct session found, authenticating");
        match self.login_and_finalize(credentials).await {
            Ok(()) => {
                info!("Successfully logged in");
                AuthenticationOutcome::Authenticated(SessionSource::Fresh)
            }
            Err(e) => {
                error!(error = %e, "Authentication failed");
                AuthenticationOutcome::Failed(e)
            }
        }
    }

    async fn login_and_finalize(&mut self, credentials: &Credentials) -> Result<(), AuthError> {
        let id = login(&self.http, &mut self.cookies, &self.endpoints, credentials).await?;
        finalize(&self.http, &mut self.cookies, &self.endpoints, &id).await
    }

    pub fn cookies(&self) -> &CookieStore {
        &self.cookies
    }

    /// Hand the session cookies to a downstream consumer.
    pub fn into_cookies(self) -> CookieStore {
        self.cookies
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}
