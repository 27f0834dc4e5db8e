//! Turn a resolved identity into an established web session.

use serde::Deserialize;
use tracing::{debug, info};

use crate::api::{AuthError, HttpClient, Request};
use crate::cookies::CookieStore;
use crate::endpoints::Endpoints;

#[derive(Debug, Deserialize)]
struct ValidateGoto {
    #[serde(rename = "successURL")]
    success_url: String,
}

/// Fetch the profile, validate the redirect target and follow it.
///
/// Completing the last GET is what "session established" means.
pub async fn finalize(
    http: &HttpClient,
    cookies: &mut CookieStore,
    endpoints: &Endpoints,
    id: &str,
) -> Result<(), AuthError> {
    // Only the side effect on the provider's session state matters here;
    // the profile body is not read.
    let profile = http
        .request(
            cookies,
            Request::get(endpoints.user_profile(id)).query("realm", &endpoints.realm),
        )
        .await?;
    debug!(bytes = profile.body.len(), "Profile fetched");

    let response = http
        .request(
            cookies,
            Request::post(endpoints.users())
                .query("_action", "validateGoto")
                .json(serde_json::json!({ "goto": endpoints.goto.as_str() })),
        )
        .await?;
    let validated: ValidateGoto = response.json()?;

    http.request(cookies, Request::get(validated.success_url)).await?;
    info!("Session established");
    Ok(())
}
