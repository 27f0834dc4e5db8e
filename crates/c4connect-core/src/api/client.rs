//! HTTP client for the identity provider.
//!
//! This module provides the `HttpClient` struct that sends authentication
//! requests with the caller's `CookieStore` attached and records every
//! cookie the provider sets, redirect hops included.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::cookies::CookieStore;

use super::TransportError;

// ============================================================================
// Constants
// ============================================================================

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of redirect hops followed for a single request.
const MAX_REDIRECTS: usize = 10;

/// Header the provider uses to tell XHR calls from page loads.
const X_REQUESTED_WITH: &str = "x-requested-with";

/// Header selecting the IAM REST API version.
const ACCEPT_API_VERSION: &str = "accept-api-version";

const API_VERSION: &str = "protocol=1.0,resource=2.0";

#[derive(Debug, Clone)]
enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// A single request to issue through `HttpClient`.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    body: RequestBody,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        self.body = RequestBody::Form(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }
}

/// Successful (2xx) response, after redirects.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    /// Final URL, after any redirect hops.
    pub url: Url,
    pub body: String,
}

impl HttpResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_str(&self.body)
            .map_err(|e| TransportError::invalid_response(self.url.as_str(), e.to_string()))
    }
}

/// HTTP client for the identity provider.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new client with the given request timeout
    pub fn new(timeout_secs: u64) -> Result<Self, TransportError> {
        // Redirects are followed by hand so that every hop's cookies land in the store
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(Policy::none())
            .build()?;

        Ok(Self { client })
    }

    fn auth_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUESTED_WITH, HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(ACCEPT_API_VERSION, HeaderValue::from_static(API_VERSION));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn parse_url(raw: &str, query: &[(String, String)]) -> Result<Url, TransportError> {
        let mut url = Url::parse(raw).map_err(|e| TransportError::InvalidUrl {
            url: raw.to_string(),
            message: e.to_string(),
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Send `request` with the matching cookies attached.
    ///
    /// Cookies set by the response (and by any redirect hop) are recorded
    /// in `cookies` before returning, even when the final status is an error.
    /// Status codes are not interpreted beyond success / failure.
    pub async fn request(
        &self,
        cookies: &mut CookieStore,
        request: Request,
    ) -> Result<HttpResponse, TransportError> {
        let mut url = Self::parse_url(&request.url, &request.query)?;
        let mut method = request.method;
        let mut body = request.body;

        for hop in 0..=MAX_REDIRECTS {
            let mut builder = self
                .client
                .request(method.clone(), url.clone())
                .headers(Self::auth_headers());
            if let Some(cookie_header) = cookies.header_for(&url) {
                builder = builder.header(header::COOKIE, cookie_header);
            }
            builder = match &body {
                RequestBody::Empty => builder,
                RequestBody::Json(value) => builder.json(value),
                RequestBody::Form(fields) => builder.form(fields),
            };

            debug!(method = %method, url = %url.path(), hop, "Sending request");
            let response = builder.send().await?;
            let status = response.status();
            let stored = cookies.store_response(&url, response.headers());
            trace!(status = %status, stored, "Response received");

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                if let Some(location) = location {
                    let next = url.join(&location).map_err(|e| TransportError::InvalidUrl {
                        url: location.clone(),
                        message: e.to_string(),
                    })?;
                    if status == StatusCode::SEE_OTHER
                        || (method == Method::POST
                            && (status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND))
                    {
                        method = Method::GET;
                        body = RequestBody::Empty;
                    }
                    debug!(status = %status, to = %next.path(), "Following redirect");
                    url = next;
                    continue;
                }
            }

            let text = response.text().await?;
            if !status.is_success() {
                return Err(TransportError::from_status(status, url.as_str(), &text));
            }
            return Ok(HttpResponse {
                status,
                url,
                body: text,
            });
        }

        Err(TransportError::invalid_response(
            url.as_str(),
            format!("more than {} redirects", MAX_REDIRECTS),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client() -> HttpClient {
        HttpClient::new(DEFAULT_TIMEOUT_SECS).unwrap()
    }

    #[tokio::test]
    async fn test_request_sends_provider_headers_and_cookies() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/iam/json/users")
                .query_param("_action", "idFromSession")
                .header("x-requested-with", "XMLHttpRequest")
                .header("accept-api-version", "protocol=1.0,resource=2.0")
                .header("cookie", "c4iamsecuretk=tok");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "id": "u1" }));
        });

        let mut cookies = CookieStore::new();
        cookies.inject("c4iamsecuretk", "tok", "127.0.0.1");

        let response = client()
            .request(
                &mut cookies,
                Request::post(server.url("/iam/json/users")).query("_action", "idFromSession"),
            )
            .await
            .unwrap();

        mock.assert();
        let body: Value = response.json().unwrap();
        assert_eq!(body["id"], "u1");
    }

    #[tokio::test]
    async fn test_request_records_cookies_across_redirects() {
        let server = MockServer::start_async().await;
        let first = server.mock(|when, then| {
            when.method(GET).path("/start");
            then.status(302)
                .header("location", "/landing")
                .header("set-cookie", "hop=1; Path=/");
        });
        let landing = server.mock(|when, then| {
            when.method(GET).path("/landing").header("cookie", "hop=1");
            then.status(200)
                .header("set-cookie", "final=2; Path=/")
                .body("<html></html>");
        });

        let mut cookies = CookieStore::new();
        let response = client()
            .request(&mut cookies, Request::get(server.url("/start")))
            .await
            .unwrap();

        first.assert();
        landing.assert();
        assert_eq!(response.url.path(), "/landing");
        assert_eq!(cookies.value("hop"), Some("1"));
        assert_eq!(cookies.value("final"), Some("2"));
    }

    #[tokio::test]
    async fn test_request_surfaces_error_status_and_keeps_cookies() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/iam/json/authenticate");
            then.status(403)
                .header("set-cookie", "blocked=yes")
                .body("challenge");
        });

        let mut cookies = CookieStore::new();
        let err = client()
            .request(&mut cookies, Request::post(server.url("/iam/json/authenticate")))
            .await
            .expect_err("403 should fail");

        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(cookies.value("blocked"), Some("yes"));
    }

    #[tokio::test]
    async fn test_json_decode_failure_is_invalid_response() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/page");
            then.status(200).body("not json");
        });

        let mut cookies = CookieStore::new();
        let response = client()
            .request(&mut cookies, Request::get(server.url("/page")))
            .await
            .unwrap();
        let err = response.json::<Value>().expect_err("body is not JSON");
        assert!(matches!(err, TransportError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let mut cookies = CookieStore::new();
        let err = client()
            .request(&mut cookies, Request::get("not a url"))
            .await
            .expect_err("url should not parse");
        assert!(matches!(err, TransportError::InvalidUrl { .. }));
    }
}
