//! Identity provider URLs and the precomputed authorization redirect target.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Url;

// ============================================================================
// Constants
// ============================================================================

/// Public site; serves the human-facing login page
pub const SITE_BASE_URL: &str = "https://www.carrefour.fr";

/// Account host running the IAM REST API
pub const ACCOUNT_BASE_URL: &str = "https://moncompte.carrefour.fr";

/// IAM realm every authentication call is scoped to
pub const REALM: &str = "/CarrefourConnect";

/// Cookie carrying the session token issued by the authenticate endpoint
pub const SESSION_COOKIE: &str = "c4iamsecuretk";

const CLIENT_ID: &str = "carrefour_onecarrefour_web";
const REDIRECT_URI: &str = "https://www.carrefour.fr/login/check";
const REGISTRATION_PATH: &str = "/mon-compte/inscription";
const AUTHORIZE_PATH: &str = "/iam/oauth2/CarrefourConnect/authorize";

/// The `gotoUrl` correlating a login with the web client registration.
///
/// The provider compares it verbatim, so it is built once and passed around
/// rather than recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget(String);

impl RedirectTarget {
    /// Redirect target of the production web client.
    pub fn carrefour_connect() -> Self {
        Self::build(ACCOUNT_BASE_URL, CLIENT_ID, REDIRECT_URI, REGISTRATION_PATH)
    }

    /// Build the authorize URL for a client registration.
    ///
    /// The account base is downgraded to `http://`, and query values are
    /// percent-encoded with `%20` for spaces. Both quirks are expected by
    /// the provider.
    pub fn build(account_base_url: &str, client_id: &str, redirect_uri: &str, registration_path: &str) -> Self {
        let registration = STANDARD.encode(format!("{}{}", account_base_url, registration_path));
        let scope = format!("openid iam register-{}", registration);
        let params = [
            ("response_type", "code"),
            ("client_id", client_id),
            ("scope", scope.as_str()),
            ("redirect_uri", redirect_uri),
        ];
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        Self(format!(
            "{}{}?{}",
            account_base_url.replacen("s://", "://", 1),
            AUTHORIZE_PATH,
            query
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the authentication calls go.
///
/// Base URLs are overridable (configuration, tests); the redirect target is
/// always the production one since the provider validates it.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub site_base_url: String,
    pub account_base_url: String,
    pub realm: String,
    pub goto: RedirectTarget,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(SITE_BASE_URL, ACCOUNT_BASE_URL)
    }
}

impl Endpoints {
    pub fn new(site_base_url: &str, account_base_url: &str) -> Self {
        Self {
            site_base_url: site_base_url.trim_end_matches('/').to_string(),
            account_base_url: account_base_url.trim_end_matches('/').to_string(),
            realm: REALM.to_string(),
            goto: RedirectTarget::carrefour_connect(),
        }
    }

    pub fn login_page(&self) -> String {
        format!("{}/mon-compte/login", self.site_base_url)
    }

    pub fn authenticate(&self) -> String {
        format!("{}/iam/json/authenticate", self.account_base_url)
    }

    pub fn users(&self) -> String {
        format!("{}/iam/json/users", self.account_base_url)
    }

    pub fn user_profile(&self, id: &str) -> String {
        format!(
            "{}/iam/json/carrefourconnect/users/{}",
            self.account_base_url,
            urlencoding::encode(id)
        )
    }

    /// Host the session cookie is scoped to.
    pub fn account_host(&self) -> Option<String> {
        Url::parse(&self.account_base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED_GOTO: &str = "http://moncompte.carrefour.fr/iam/oauth2/CarrefourConnect/authorize?response_type=code&client_id=carrefour_onecarrefour_web&scope=openid%20iam%20register-aHR0cHM6Ly9tb25jb21wdGUuY2FycmVmb3VyLmZyL21vbi1jb21wdGUvaW5zY3JpcHRpb24%3D&redirect_uri=https%3A%2F%2Fwww.carrefour.fr%2Flogin%2Fcheck";

    #[test]
    fn test_redirect_target_is_byte_identical() {
        assert_eq!(RedirectTarget::carrefour_connect().as_str(), EXPECTED_GOTO);
    }

    #[test]
    fn test_redirect_target_is_stable() {
        let a = RedirectTarget::carrefour_connect();
        let b = RedirectTarget::carrefour_connect();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_endpoints_paths() {
        let endpoints = Endpoints::new("http://127.0.0.1:8080/", "http://127.0.0.1:8080");
        assert_eq!(endpoints.login_page(), "http://127.0.0.1:8080/mon-compte/login");
        assert_eq!(endpoints.authenticate(), "http://127.0.0.1:8080/iam/json/authenticate");
        assert_eq!(endpoints.users(), "http://127.0.0.1:8080/iam/json/users");
        assert_eq!(
            endpoints.user_profile("u1"),
            "http://127.0.0.1:8080/iam/json/carrefourconnect/users/u1"
        );
        assert_eq!(endpoints.account_host().as_deref(), Some("127.0.0.1"));
        // Redirect target never follows the overridden base
        assert_eq!(endpoints.goto.as_str(), EXPECTED_GOTO);
    }

    #[test]
    fn test_default_endpoints() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.account_host().as_deref(), Some("moncompte.carrefour.fr"));
        assert_eq!(endpoints.realm, "/CarrefourConnect");
    }
}
