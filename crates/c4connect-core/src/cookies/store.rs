//! Cookie jar shared by every request of an authentication run.
//!
//! Parsing, domain/path matching and expiry follow RFC 6265 through
//! `cookie_store`. This wrapper adds what the login flow needs on top:
//! placing the session token by hand, reading a value by name, and keeping
//! values out of `Debug` output.

use std::fmt;

use anyhow::{anyhow, Result};
use cookie::Cookie as RawCookie;
use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::Url;
use tracing::{debug, trace, warn};

pub use cookie_store::Cookie;

#[derive(Default)]
pub struct CookieStore {
    jar: cookie_store::CookieStore,
}

// Values are session secrets; only names are printed.
impl fmt::Debug for CookieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.jar.iter_unexpired().map(|c| c.name()))
            .finish()
    }
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one `Set-Cookie` value received from `url`.
    ///
    /// A cookie with the same name, domain and path is overwritten; an
    /// already-expired one (past `Expires`, `Max-Age<=0`) removes it instead.
    /// Returns false when the header is malformed or its `Domain` does not
    /// cover the responding host.
    pub fn set(&mut self, set_cookie: &str, url: &Url) -> bool {
        let cookie = match RawCookie::parse(set_cookie.to_string()) {
            Ok(cookie) => cookie,
            Err(e) => {
                trace!(error = %e, "Ignoring malformed Set-Cookie");
                return false;
            }
        };

        match self.jar.insert_raw(&cookie, url) {
            Ok(_) => {
                trace!(cookie = %cookie.name(), host = ?url.host_str(), "Cookie stored");
                true
            }
            Err(e) => {
                trace!(cookie = %cookie.name(), error = %e, "Cookie not stored");
                false
            }
        }
    }

    /// All live cookies that would be sent to `domain`, whatever their path.
    pub fn get(&self, domain: &str) -> Vec<&Cookie<'static>> {
        let Ok(url) = Url::parse(&format!("https://{}/", domain)) else {
            return Vec::new();
        };
        self.jar
            .iter_unexpired()
            .filter(|c| c.domain.matches(&url))
            .collect()
    }

    /// Place a host-only cookie that did not arrive through a `Set-Cookie`
    /// header. It has no expiry and is sent on every path of `domain`.
    pub fn inject(&mut self, name: &str, value: &str, domain: &str) {
        let url = match Url::parse(&format!("https://{}/", domain)) {
            Ok(url) => url,
            Err(e) => {
                warn!(cookie = %name, %domain, error = %e, "Cannot inject cookie for invalid domain");
                return;
            }
        };

        let cookie = RawCookie::new(name.to_string(), value.to_string());
        match self.jar.insert_raw(&cookie, &url) {
            Ok(_) => debug!(cookie = %name, %domain, "Injecting cookie"),
            Err(e) => warn!(cookie = %name, %domain, error = %e, "Injected cookie rejected"),
        }
    }

    /// Record every `Set-Cookie` header of a response received from `url`.
    /// Returns the number of headers accepted.
    pub fn store_response(&mut self, url: &Url, headers: &HeaderMap) -> usize {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|raw| raw.to_str().ok())
            .filter(|raw| self.set(raw, url))
            .count()
    }

    /// Value of the `Cookie` request header for `url`, if any cookie applies.
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let pairs: Vec<String> = self
            .jar
            .get_request_values(url)
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// Value of a live cookie named `name`, regardless of domain.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.jar
            .iter_unexpired()
            .find(|c| c.name() == name)
            .map(|c| c.value())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie<'static>> {
        self.jar.iter_unexpired()
    }

    pub fn len(&self) -> usize {
        self.jar.iter_unexpired().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.jar.clear();
    }

    /// Serialize every cookie, session cookies included, as JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        cookie_store::serde::json::save_incl_expired_and_nonpersistent(&self.jar, &mut buf)
            .map_err(|e| anyhow!("Failed to serialize cookies: {}", e))?;
        Ok(buf)
    }

    /// Inverse of `to_json`. Cookies that expired in the meantime are dropped.
    pub fn from_json(json: &[u8]) -> Result<Self> {
        let jar = cookie_store::serde::json::load(json)
            .map_err(|e| anyhow!("Failed to parse cookies: {}", e))?;
        Ok(Self { jar })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    /// Cookie header pairs, sorted: the jar does not guarantee an order.
    fn pairs(header: Option<String>) -> Vec<String> {
        let mut pairs: Vec<String> = header
            .map(|h| h.split("; ").map(str::to_string).collect())
            .unwrap_or_default();
        pairs.sort();
        pairs
    }

    #[test]
    fn test_set_defaults_to_host_only_and_request_path() {
        let mut store = CookieStore::new();
        assert!(store.set("sid=abc", &url("https://moncompte.carrefour.fr/iam/json/users")));

        assert_eq!(store.value("sid"), Some("abc"));
        assert_eq!(
            store.header_for(&url("https://moncompte.carrefour.fr/iam/json/authenticate")).as_deref(),
            Some("sid=abc")
        );
        assert_eq!(store.header_for(&url("https://moncompte.carrefour.fr/mon-compte")), None);
        assert_eq!(store.header_for(&url("https://www.moncompte.carrefour.fr/iam/json/x")), None);
    }

    #[test]
    fn test_set_rejects_malformed_and_foreign_domain() {
        let mut store = CookieStore::new();
        let u = url("https://moncompte.carrefour.fr/");
        assert!(!store.set("a=b; Domain=example.com", &u));
        assert!(!store.set("=b", &u));
        assert!(!store.set("novalue", &u));
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_overwrites_same_key() {
        let mut store = CookieStore::new();
        let u = url("https://www.carrefour.fr/");
        store.set("a=1; Path=/", &u);
        store.set("b=2; Path=/", &u);
        store.set("a=3; Path=/", &u);
        assert_eq!(store.len(), 2);
        assert_eq!(store.value("a"), Some("3"));

        // Different path is a different key
        store.set("a=4; Path=/iam", &u);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_max_age_zero_removes_entry() {
        let mut store = CookieStore::new();
        let u = url("https://moncompte.carrefour.fr/");
        store.set("sid=1; Path=/", &u);
        assert_eq!(store.len(), 1);

        store.set("sid=; Path=/; Max-Age=0", &u);
        assert!(store.is_empty());
    }

    #[test]
    fn test_past_expires_removes_entry() {
        let u = url("https://moncompte.carrefour.fr/");
        for expires in ["Thu, 01-Jan-1970 00:00:10 GMT", "Thu, 01 Jan 1970 00:00:10 GMT"] {
            let mut store = CookieStore::new();
            store.set("iPlanetDirectoryPro=abc; Path=/", &u);
            store.set(&format!("iPlanetDirectoryPro=LOGOUT; Path=/; Expires={}", expires), &u);
            assert_eq!(store.value("iPlanetDirectoryPro"), None, "Expires={}", expires);
        }
    }

    #[test]
    fn test_max_age_beyond_representable_time_is_kept() {
        let mut store = CookieStore::new();
        let u = url("https://moncompte.carrefour.fr/");
        assert!(store.set("sid=1; Path=/; Max-Age=9223372036854775807", &u));
        assert_eq!(store.value("sid"), Some("1"));

        // Max-Age wins over a past Expires
        assert!(store.set("other=2; Path=/; Max-Age=3600; Expires=Wed, 21 Oct 2015 07:28:00 GMT", &u));
        assert_eq!(store.value("other"), Some("2"));
    }

    #[test]
    fn test_get_by_domain() {
        let mut store = CookieStore::new();
        store.inject("c4iamsecuretk", "tok", "moncompte.carrefour.fr");
        store.set("shared=1; Domain=carrefour.fr", &url("https://www.carrefour.fr/"));

        assert_eq!(store.get("moncompte.carrefour.fr").len(), 2);
        let www: Vec<_> = store.get("www.carrefour.fr").iter().map(|c| c.name().to_string()).collect();
        assert_eq!(www, vec!["shared".to_string()]);
        assert!(store.get("evilcarrefour.fr").is_empty());
    }

    #[test]
    fn test_inject_overwrites_and_covers_every_path() {
        let mut store = CookieStore::new();
        store.inject("c4iamsecuretk", "old", "moncompte.carrefour.fr");
        store.inject("c4iamsecuretk", "new", "moncompte.carrefour.fr");

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.header_for(&url("http://moncompte.carrefour.fr/iam/json/users")).as_deref(),
            Some("c4iamsecuretk=new")
        );
    }

    #[test]
    fn test_header_for_filters_path_and_secure() {
        let mut store = CookieStore::new();
        let u = url("https://moncompte.carrefour.fr/");
        store.set("root=1; Path=/", &u);
        store.set("iam=2; Path=/iam", &u);
        store.set("sec=3; Path=/; Secure", &u);

        assert_eq!(
            pairs(store.header_for(&url("https://moncompte.carrefour.fr/iam/json/users"))),
            vec!["iam=2", "root=1", "sec=3"]
        );
        assert_eq!(
            pairs(store.header_for(&url("http://moncompte.carrefour.fr/iamx"))),
            vec!["root=1"]
        );
        assert_eq!(store.header_for(&url("https://www.carrefour.fr/")), None);
    }

    #[test]
    fn test_store_response_reads_every_header() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2; Domain=other.org"));
        headers.append(SET_COOKIE, HeaderValue::from_static("c=3"));

        let mut store = CookieStore::new();
        let accepted = store.store_response(&url("https://www.carrefour.fr/mon-compte/login"), &headers);
        assert_eq!(accepted, 2);
        assert_eq!(store.value("a"), Some("1"));
        assert_eq!(store.value("b"), None);
        assert_eq!(store.value("c"), Some("3"));
    }

    #[test]
    fn test_json_keeps_session_cookies() {
        let mut store = CookieStore::new();
        store.inject("c4iamsecuretk", "tok", "moncompte.carrefour.fr");
        store.set("amlbcookie=01; Path=/; Max-Age=3600", &url("https://moncompte.carrefour.fr/"));

        let restored = CookieStore::from_json(&store.to_json().unwrap()).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.value("c4iamsecuretk"), Some("tok"));
        assert_eq!(restored.value("amlbcookie"), Some("01"));
    }

    #[test]
    fn test_debug_redacts_values() {
        let mut store = CookieStore::new();
        store.inject("c4iamsecuretk", "super-secret", "moncompte.carrefour.fr");
        let rendered = format!("{:?}", store);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("c4iamsecuretk"));
    }
}
