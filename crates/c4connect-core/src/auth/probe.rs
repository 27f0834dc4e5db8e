//! Session probe: resolve the account id from the cookies alone.

use serde::Deserialize;
use tracing::{debug, info};

use crate::api::{HttpClient, Request, TransportError};
use crate::cookies::CookieStore;
use crate::endpoints::Endpoints;

#[derive(Debug, Deserialize)]
pub(crate) struct IdFromSession {
    pub id: String,
}

/// POST `idFromSession` and extract the identity id.
///
/// Shared by the probe and the last step of the login flow.
pub(crate) async fn id_from_session(
    http: &HttpClient,
    cookies: &mut CookieStore,
    endpoints: &Endpoints,
) -> Result<String, TransportError> {
    let response = http
        .request(
            cookies,
            Request::post(endpoints.users())
                .query("_action", "idFromSession")
                .query("realm", &endpoints.realm),
        )
        .await?;
    let body: IdFromSession = response.json()?;
    Ok(body.id)
}

/// Try to resolve an identity id from the stored session.
///
/// Failure is expected when the session is stale and only means a full login
/// is needed, so errors are logged and reported as `None`.
pub async fn probe(http: &HttpClient, cookies: &mut CookieStore, endpoints: &Endpoints) -> Option<String> {
    match id_from_session(http, cookies, endpoints).await {
        Ok(id) => {
            info!("Stored session resolved to an identity");
            Some(id)
        }
        Err(e) => {
            debug!(error = %e, "No usable stored session");
            None
        }
    }
}
