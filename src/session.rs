use crate::core::{DriverError, Result};
use crate::protocol::{API_ADMIN, API_DB, ProtocolClient};
use log::debug;
use serde_json::{Map, Value, json};

/// Owns the auth token obtained by `createSession` and the protocol client
/// it was obtained through.
///
/// All SQL dispatch flows through [`SessionManager::dispatch`] so the token
/// is attached in exactly one place.
pub struct SessionManager {
    client: ProtocolClient,
    token: Option<String>,
}

impl SessionManager {
    pub fn new(client: ProtocolClient) -> Self {
        Self {
            client,
            token: None,
        }
    }

    /// Open a session. The token is stored and returned on success.
    ///
    /// A server rejection (bad credentials) surfaces as [`DriverError::Auth`]
    /// with the server's message preserved; the token stays unset.
    pub fn login(&mut self, username: &str, password: &str) -> Result<String> {
        let mut params = Map::new();
        params.insert("username".into(), json!(username));
        params.insert("password".into(), json!(password));

        let result = self
            .client
            .send(API_ADMIN, "createSession", &params, None)
            .map_err(|e| match e {
                DriverError::Protocol { code, message } if message.is_empty() => {
                    DriverError::Auth(format!("login rejected (code {code})"))
                }
                DriverError::Protocol { message, .. } => DriverError::Auth(message),
                other => other,
            })?;

        let token = result
            .get("authToken")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DriverError::Transport("createSession response missing authToken".into())
            })?
            .to_string();

        self.token = Some(token.clone());
        Ok(token)
    }

    /// Close the session, best effort.
    ///
    /// The token is cleared before the wire call completes, so from the
    /// caller's point of view release always succeeds; a failed closeSession
    /// is recorded at debug level and otherwise suppressed. Calling logout
    /// without an open session is a no-op.
    pub fn logout(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };

        match self
            .client
            .send(API_ADMIN, "closeSession", &Map::new(), Some(&token))
        {
            Ok(_) => debug!("session closed"),
            Err(e) => debug!("closeSession failed, session dropped anyway: {e}"),
        }
    }

    pub fn is_open(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Send a db-api action with the session token attached.
    pub fn dispatch(&self, action: &str, params: &Map<String, Value>) -> Result<Map<String, Value>> {
        self.client
            .send(API_DB, action, params, self.token.as_deref())
    }
}
