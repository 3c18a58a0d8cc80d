//! Search provider abstractions and the shared REST client.

pub mod radarr;
pub mod sonarr;

use std::time::Duration;

/// One searchable item discovered during a run. Ids are backend-scoped and
/// only meaningful within the instance that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    pub id: i64,
    pub title: String,
    pub kind: CandidateKind,
}

/// Why a candidate is eligible for searching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// No file has been acquired at all.
    Missing,
    /// A file exists but fails the quality cutoff.
    Upgrade,
}

impl CandidateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateKind::Missing => "missing",
            CandidateKind::Upgrade => "upgrade",
        }
    }
}

/// Interface implemented by concrete backend providers. The run orchestrator
/// depends only on this trait, never on a concrete variant.
pub trait SearchProvider {
    /// Enumerates missing/upgrade candidates from the backend. Produced fresh
    /// each run and never persisted.
    fn get_candidates(&self) -> Result<Vec<SearchCandidate>, String>;
    /// Issues one search command covering a batch of item ids. A single
    /// attempt; retrying is the caller's policy decision.
    fn search(&self, ids: &[i64]) -> Result<(), String>;
}

/// Shared JSON REST client for Sonarr/Radarr-shaped v3 APIs, backed by `ureq`.
pub(crate) struct ArrClient {
    http_client: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl ArrClient {
    pub fn new(url: &str, api_key: &str) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(30))
            .timeout_write(Duration::from_secs(30))
            .build();
        Self {
            http_client,
            base_url: url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn get_json<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T, String> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .http_client
            .get(&url)
            .set("X-Api-Key", &self.api_key)
            .set("Content-Type", "application/json")
            .call()
            .map_err(|err| request_error(endpoint, err))?;
        response
            .into_json()
            .map_err(|err| format!("response parse failed ({endpoint}): {err}"))
    }

    pub fn post_json(&self, endpoint: &str, body: serde_json::Value) -> Result<(), String> {
        let url = format!("{}{}", self.base_url, endpoint);
        self.http_client
            .post(&url)
            .set("X-Api-Key", &self.api_key)
            .send_json(body)
            .map_err(|err| request_error(endpoint, err))?;
        Ok(())
    }
}

fn request_error(endpoint: &str, err: ureq::Error) -> String {
    match err {
        ureq::Error::Status(code, _) => format!("HTTP {code} from {endpoint}"),
        other => format!("request failed ({endpoint}): {other}"),
    }
}
