//! Credential-based login against the IAM authenticate endpoint.

use serde::Deserialize;
use tracing::{debug, info};

use crate::api::{AuthError, HttpClient, Request, TransportError};
use crate::cookies::CookieStore;
use crate::endpoints::{Endpoints, SESSION_COOKIE};

use super::challenge::AuthChallenge;
use super::probe::id_from_session;
use super::Credentials;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(rename = "tokenId")]
    token_id: String,
}

/// Run the full login sequence and return the resolved identity id.
///
/// Steps are strictly ordered and each depends on the previous response;
/// the first failure aborts the sequence.
pub async fn login(
    http: &HttpClient,
    cookies: &mut CookieStore,
    endpoints: &Endpoints,
    credentials: &Credentials,
) -> Result<String, AuthError> {
    info!("Logging in with credentials");

    // Seeds the initial cookies; the page itself is not needed
    http.request(cookies, Request::get(endpoints.login_page())).await?;
    debug!("Login page loaded");

    let response = http
        .request(
            cookies,
            Request::post(endpoints.authenticate())
                .query("realm", &endpoints.realm)
                .query("goto", endpoints.goto.as_str()),
        )
        .await?;
    let challenge = AuthChallenge::from_response(&response)?;
    debug!(stage = ?challenge.as_value().get("stage"), "Authentication challenge received");

    let filled = challenge.fill(credentials);
    let response = http
        .request(
            cookies,
            Request::post(endpoints.authenticate())
                .query("realm", &endpoints.realm)
                .json(filled),
        )
        .await?;
    let token: TokenResponse = response.json()?;
    debug!("Session token issued");

    // The token arrives in the body, not in a Set-Cookie header
    let host = endpoints.account_host().ok_or_else(|| {
        AuthError::from(TransportError::InvalidUrl {
            url: endpoints.account_base_url.clone(),
            message: "no host".to_string(),
        })
    })?;
    cookies.inject(SESSION_COOKIE, &token.token_id, &host);

    let id = id_from_session(http, cookies, endpoints).await?;
    info!("Credentials accepted");
    Ok(id)
}
