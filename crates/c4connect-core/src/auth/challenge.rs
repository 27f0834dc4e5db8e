//! The callback structure returned by the authenticate endpoint.
//!
//! The provider validates the whole structure when it comes back, so the
//! received JSON is kept as-is (key order included) and only the two input
//! slots the login flow fills are ever written.

use serde_json::Value;

use crate::api::{HttpResponse, TransportError};

use super::Credentials;

/// `callbacks[i].input[0]` holds the value for slot `i`.
const LOGIN_SLOT: &str = "/callbacks/0/input/0";
const PASSWORD_SLOT: &str = "/callbacks/1/input/0";

#[derive(Debug, Clone, PartialEq)]
pub struct AuthChallenge {
    auth_id: String,
    raw: Value,
}

impl AuthChallenge {
    /// Validate a received challenge: it must carry an `authId` and at least
    /// two callbacks, each with an `input[0]` object.
    pub fn from_value(raw: Value, url: &str) -> Result<Self, TransportError> {
        let auth_id = raw
            .get("authId")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::invalid_response(url, "challenge without authId"))?
            .to_string();

        for slot in [LOGIN_SLOT, PASSWORD_SLOT] {
            if !raw.pointer(slot).map(Value::is_object).unwrap_or(false) {
                return Err(TransportError::invalid_response(
                    url,
                    format!("challenge missing callback input {}", slot),
                ));
            }
        }

        Ok(Self { auth_id, raw })
    }

    pub fn from_response(response: &HttpResponse) -> Result<Self, TransportError> {
        let raw: Value = response.json()?;
        Self::from_value(raw, response.url.as_str())
    }

    pub fn auth_id(&self) -> &str {
        &self.auth_id
    }

    /// The challenge exactly as received.
    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    fn set_slot(&mut self, slot: &str, value: &str) {
        if let Some(input) = self.raw.pointer_mut(slot).and_then(Value::as_object_mut) {
            input.insert("value".to_string(), Value::String(value.to_string()));
        }
    }

    /// Fill the login and password slots, leaving every other field verbatim.
    pub fn fill(mut self, credentials: &Credentials) -> Value {
        self.set_slot(LOGIN_SLOT, &credentials.login);
        self.set_slot(PASSWORD_SLOT, &credentials.password);
        self.raw
    }
}
