use crate::core::{DriverError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Fixed schema tag carried by every request envelope.
pub const SCHEMA: &str = "jsonAction";

/// Protocol version spoken by this driver.
pub const API_VERSION: &str = "1.0";

/// Session management actions live on the admin subsystem.
pub const API_ADMIN: &str = "admin";

/// SQL dispatch actions live on the db subsystem.
pub const API_DB: &str = "db";

/// Outgoing command envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request<'a> {
    pub schema: &'static str,
    pub request_id: u64,
    pub api: &'a str,
    pub api_version: &'static str,
    pub action: &'a str,
    pub params: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<&'a str>,
}

/// Incoming response envelope. `errorCode == 0` means success.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default)]
    pub result: Map<String, Value>,
    pub error_code: i64,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// One blocking HTTP round trip: JSON body out, JSON body back.
///
/// This is the seam between the protocol layer and the network. Production
/// code uses [`HttpTransport`]; tests and pooling layers may supply their own
/// implementation.
pub trait Transport: Send {
    fn roundtrip(&self, body: &Value) -> Result<Value>;
}

/// Transport backed by a blocking HTTP client with a fixed request timeout.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn roundtrip(&self, body: &Value) -> Result<Value> {
        let response = self.client.post(&self.url).json(body).send()?;
        Ok(response.json()?)
    }
}

/// JSON command client.
///
/// Builds request envelopes, sends them through the transport, and decodes
/// the response. The request id is owned by this instance and strictly
/// increases by 1 per send attempt, starting at 0. Failed attempts consume
/// an id too, so a retried call is always a logically distinct request.
pub struct ProtocolClient {
    transport: Box<dyn Transport>,
    next_request_id: AtomicU64,
    debug: bool,
}

impl ProtocolClient {
    pub fn new(transport: Box<dyn Transport>, debug: bool) -> Self {
        Self {
            transport,
            next_request_id: AtomicU64::new(0),
            debug,
        }
    }

    /// Send one command and return the response's `result` mapping.
    ///
    /// Fails with [`DriverError::Protocol`] when the server reports a nonzero
    /// error code and with [`DriverError::Transport`] when the exchange
    /// itself fails. No retry in either case.
    pub fn send(
        &self,
        api: &str,
        action: &str,
        params: &Map<String, Value>,
        auth_token: Option<&str>,
    ) -> Result<Map<String, Value>> {
        // Allocate the id up front so failed exchanges consume one as well.
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);

        let request = Request {
            schema: SCHEMA,
            request_id,
            api,
            api_version: API_VERSION,
            action,
            params,
            auth_token,
        };
        let body = serde_json::to_value(&request)?;

        if self.debug {
            debug!("request {}: {}", request_id, body);
        }

        let raw = self.transport.roundtrip(&body)?;

        if self.debug {
            debug!("response {}: {}", request_id, raw);
        }

        let response: Response = serde_json::from_value(raw)
            .map_err(|e| DriverError::Transport(format!("malformed response: {e}")))?;

        if response.error_code != 0 {
            return Err(DriverError::Protocol {
                code: response.error_code,
                message: response.error_message.unwrap_or_default(),
            });
        }

        Ok(response.result)
    }

    /// The id the next send will use. Diagnostic only.
    pub fn next_request_id(&self) -> u64 {
        self.next_request_id.load(Ordering::Relaxed)
    }
}
