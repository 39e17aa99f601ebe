//! Authenticator — obtains one bearer credential per simulated-user iteration.

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use serde_json::Value;

/// The result of one login attempt. An absent token is the normal
/// representation of a rejected or unreachable login — subsequent probes are
/// simply sent unauthenticated.
#[derive(Clone, Debug)]
pub struct LoginOutcome {
    pub token: Option<String>,
    pub elapsed: Duration,
}

/// Posts fixed credentials to the login endpoint and extracts the session
/// token from the response. Never fails hard: any non-200 status, transport
/// error or malformed body yields `token: None`.
#[derive(Clone, Debug)]
pub struct Authenticator {
    client: Client,
    login_url: String,
    login: String,
    password: String,
}

impl Authenticator {
    pub fn new(
        client: Client,
        base_url: &str,
        login_path: &str,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client,
            login_url: format!("{base_url}{login_path}"),
            login: login.into(),
            password: password.into(),
        }
    }

    /// One `POST {base}{login_path}` with a JSON `{login, password}` body.
    /// On 200 the `auth_key` field of the response is the credential.
    pub async fn session(&self) -> LoginOutcome {
        let started = Instant::now();
        let payload = serde_json::json!({
            "login": self.login,
            "password": self.password,
        });
        let response = self
            .client
            .post(&self.login_url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await;

        let token = match response {
            Ok(response) if response.status() == StatusCode::OK => response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| {
                    body.get("auth_key")
                        .and_then(Value::as_str)
                        .map(str::to_owned)
                }),
            Ok(response) => {
                tracing::debug!(url = %self.login_url, status = %response.status(), "login rejected");
                None
            }
            Err(err) => {
                tracing::debug!(url = %self.login_url, error = %err, "login transport failure");
                None
            }
        };

        LoginOutcome {
            token,
            elapsed: started.elapsed(),
        }
    }
}
