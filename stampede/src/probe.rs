//! Endpoint probe — one instrumented HTTP exchange against the target API.
//!
//! The probe never returns an error: a rejected status and a transport
//! failure are both ordinary [`ProbeResult`]s with `success == false`, so the
//! scenario keeps iterating and the metrics stay complete no matter what the
//! network does.

use std::time::{Duration, Instant};

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The verbs the harness dispatches. Anything else falls back to GET.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl ProbeMethod {
    /// Maps a configured method name onto a verb. Unrecognized names
    /// dispatch as GET — an explicit default policy, not an error.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "POST" => ProbeMethod::Post,
            "PUT" => ProbeMethod::Put,
            "DELETE" => ProbeMethod::Delete,
            _ => ProbeMethod::Get,
        }
    }
}

/// One request against the API under test, immutable once constructed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProbeRequest {
    pub method: ProbeMethod,
    pub path: String,
    pub body: Option<Value>,
}

impl ProbeRequest {
    pub fn new(method: &str, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: ProbeMethod::parse(method),
            path: path.into(),
            body,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: ProbeMethod::Get,
            path: path.into(),
            body: None,
        }
    }
}

/// What one probe observed. `status` is `None` when no response was obtained
/// (connection refused, timeout); that still counts as a failed probe.
#[derive(Clone, Debug)]
pub struct ProbeResult {
    pub status: Option<u16>,
    pub body: String,
    pub elapsed: Duration,
    pub success: bool,
}

impl ProbeResult {
    /// The response body as JSON, if it parses.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    pub fn is_ok(&self) -> bool {
        self.status == Some(200)
    }
}

/// Issues instrumented requests against one base URL with one injected
/// client. Consumers receive the client explicitly — there is no shared
/// global to mutate, and two probes against different deployments can
/// coexist in one process.
#[derive(Clone, Debug)]
pub struct ApiProbe {
    client: Client,
    base_url: String,
}

impl ApiProbe {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Builds the outgoing request: `Content-Type: application/json` always,
    /// `Authorization: Bearer <token>` only when a credential is present.
    pub fn build_request(&self, token: Option<&str>, request: &ProbeRequest) -> reqwest::RequestBuilder {
        let url = self.url(&request.path);
        let mut builder = match request.method {
            ProbeMethod::Get => self.client.get(&url),
            ProbeMethod::Post => self.client.post(&url),
            ProbeMethod::Put => self.client.put(&url),
            ProbeMethod::Delete => self.client.delete(&url),
        };
        builder = builder.header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }
        builder
    }

    /// Dispatches one probe and classifies the outcome.
    ///
    /// Elapsed time covers dispatch to full body receipt. A failed probe
    /// (status >= 400, or no response at all) emits one diagnostic line with
    /// the target URL, status and body.
    pub async fn call(&self, token: Option<&str>, request: &ProbeRequest) -> ProbeResult {
        let url = self.url(&request.path);
        let started = Instant::now();
        match self.build_request(token, request).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                let elapsed = started.elapsed();
                let success = status < 400;
                if !success {
                    tracing::warn!(%url, status, body = %body, "probe failed");
                }
                ProbeResult {
                    status: Some(status),
                    body,
                    elapsed,
                    success,
                }
            }
            Err(err) => {
                let elapsed = started.elapsed();
                tracing::warn!(%url, error = %err, "probe transport failure");
                ProbeResult {
                    status: None,
                    body: String::new(),
                    elapsed,
                    success: false,
                }
            }
        }
    }
}
