//! Run configuration: target, credentials, ramp schedule, thresholds and the
//! endpoint groups each simulated user walks through.
//!
//! `RunConfig::default()` reproduces the reference profile this harness grew
//! out of: a 17-minute ramp 20 → 50 → 100 → 0 users, sub-5% failure rate,
//! p95 under three seconds, and the four dashboard API endpoint groups
//! (the chat group ships disabled, see [`EndpointConfig::enabled`]).

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::checks::Check;
use crate::executor::Stage;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub name: String,
    /// Base URL every path is joined onto, e.g. `http://10.0.0.2:8081/api`.
    pub base_url: String,
    pub credentials: Credentials,
    pub login_path: String,
    /// Per-request timeout in seconds, applied to the shared HTTP client.
    /// Defaults to 30; a timed-out probe is a failed probe, not an abort.
    pub request_timeout_secs: u64,
    /// Governor tick in milliseconds: how often the allowed concurrency
    /// level is re-interpolated.
    pub governor_tick_ms: u64,
    /// Bounds of the random pause at the end of every iteration, seconds.
    pub iteration_pause_secs: (f64, f64),
    pub stages: Vec<StageConfig>,
    pub thresholds: Vec<ThresholdConfig>,
    pub endpoints: Vec<EndpointConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct StageConfig {
    pub duration_secs: u64,
    /// Target concurrent simulated users at the end of the stage.
    pub target: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ThresholdConfig {
    pub metric: String,
    /// k6-style predicate string, e.g. `rate<0.05` or `p(95)<3000`.
    pub expr: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    /// HTTP method name; unrecognized values dispatch as GET.
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub body: Option<Value>,
    /// Structural check run when the probe returns 200.
    #[serde(default)]
    pub check: Option<Check>,
    /// Think time after the group, seconds. Runs even when the probe failed
    /// or the group is disabled.
    #[serde(default = "default_pause")]
    pub pause_secs: f64,
    /// A disabled group is skipped (no request, no check) but keeps its
    /// place — and its pause — in the iteration.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_pause() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name: "api-ramp".into(),
            base_url: "http://127.0.0.1:8081/api".into(),
            credentials: Credentials {
                login: "admin".into(),
                password: "admin".into(),
            },
            login_path: "/user/login".into(),
            request_timeout_secs: 30,
            governor_tick_ms: 250,
            iteration_pause_secs: (1.0, 3.0),
            stages: vec![
                StageConfig { duration_secs: 60, target: 20 },
                StageConfig { duration_secs: 120, target: 50 },
                StageConfig { duration_secs: 300, target: 50 },
                StageConfig { duration_secs: 120, target: 100 },
                StageConfig { duration_secs: 300, target: 100 },
                StageConfig { duration_secs: 120, target: 0 },
            ],
            thresholds: vec![
                ThresholdConfig {
                    metric: "http_req_failed".into(),
                    expr: "rate<0.05".into(),
                },
                ThresholdConfig {
                    metric: "http_req_duration".into(),
                    expr: "p(95)<3000".into(),
                },
                ThresholdConfig {
                    metric: "success_rate".into(),
                    expr: "rate>0.95".into(),
                },
                ThresholdConfig {
                    metric: "endpoint_errors".into(),
                    expr: "count<100".into(),
                },
            ],
            endpoints: vec![
                EndpointConfig {
                    name: "users".into(),
                    method: "GET".into(),
                    path: "/user/users".into(),
                    body: None,
                    check: Some(Check::ArrayNonEmpty),
                    pause_secs: 1.0,
                    enabled: true,
                },
                // the chat endpoint is kept in the scenario but disabled:
                // the backend call it exercises was retired
                EndpointConfig {
                    name: "chat".into(),
                    method: "POST".into(),
                    path: "/llm/query-sync".into(),
                    body: Some(serde_json::json!({
                        "question": "Smoke question for the chat pipeline",
                        "department_id": 1,
                    })),
                    check: Some(Check::FieldNonEmpty("answer".into())),
                    pause_secs: 3.0,
                    enabled: false,
                },
                EndpointConfig {
                    name: "content".into(),
                    method: "GET".into(),
                    path: "/content".into(),
                    body: None,
                    check: Some(Check::NonNull),
                    pause_secs: 1.0,
                    enabled: true,
                },
                EndpointConfig {
                    name: "tags".into(),
                    method: "GET".into(),
                    path: "/tags".into(),
                    body: None,
                    check: Some(Check::Array),
                    pause_secs: 1.0,
                    enabled: true,
                },
            ],
        }
    }
}

impl RunConfig {
    pub fn stages(&self) -> Vec<Stage> {
        self.stages
            .iter()
            .map(|s| Stage::new(Duration::from_secs(s.duration_secs), s.target))
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn governor_tick(&self) -> Duration {
        Duration::from_millis(self.governor_tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_matches_reference_ramp() {
        let config = RunConfig::default();
        let schedule: Vec<(u64, u64)> = config
            .stages
            .iter()
            .map(|s| (s.duration_secs, s.target))
            .collect();
        assert_eq!(
            schedule,
            [(60, 20), (120, 50), (300, 50), (120, 100), (300, 100), (120, 0)]
        );
        assert_eq!(config.thresholds.len(), 4);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn chat_group_ships_disabled() {
        let config = RunConfig::default();
        let chat = config.endpoints.iter().find(|e| e.name == "chat").unwrap();
        assert!(!chat.enabled);
        assert_eq!(chat.check, Some(Check::FieldNonEmpty("answer".into())));
        let enabled: Vec<&str> = config
            .endpoints
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(enabled, ["users", "content", "tags"]);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: RunConfig = serde_json::from_str(
            r#"{
                "base_url": "http://10.1.2.3:8081/api",
                "stages": [{"duration_secs": 30, "target": 5}],
                "endpoints": [
                    {"name": "tags", "method": "get", "path": "/tags"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://10.1.2.3:8081/api");
        assert_eq!(config.stages.len(), 1);
        // unlisted fields keep the reference defaults
        assert_eq!(config.login_path, "/user/login");
        assert_eq!(config.thresholds.len(), 4);
        let tags = &config.endpoints[0];
        assert!(tags.enabled);
        assert_eq!(tags.pause_secs, 1.0);
        assert!(tags.check.is_none());
    }
}
