//! Remote signature-database client.
//!
//! When a selector misses the store, candidate human-readable signatures
//! can be fetched from an external lookup service. The service is reached
//! through the [`SignatureSource`] trait so the fallback flow can be tested
//! against a stub; the HTTP implementation talks to a samczsun-compatible
//! endpoint:
//!
//! `GET <base>/api/v1/signatures?<function|event>=<0xselector>`
//!
//! Responses look like
//! `{"ok": true, "result": {"function": {"0xa9059cbb": [{"name": "...", "filtered": false}]}}}`.
//! Network failures and malformed bodies are hard errors — never "no match".

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://sig.eth.samczsun.com";

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("signature lookup request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("signature service response is not ok")]
    ServiceNotOk,

    #[error("signature service response has no {kind} results for {selector}")]
    MalformedResponse { kind: String, selector: String },
}

/// Which signature namespace to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    Function,
    Event,
}

impl SignatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureKind::Function => "function",
            SignatureKind::Event => "event",
        }
    }
}

/// One candidate signature, in the order the service returned it.
#[derive(Debug, Clone, Deserialize)]
pub struct SigCandidate {
    pub name: String,
    #[serde(default)]
    pub filtered: bool,
}

/// Seam for the signature database. Implementations must not retry
/// internally; the caller owns the retry policy.
#[async_trait]
pub trait SignatureSource: Send + Sync {
    /// Candidate signatures for a selector. An empty list is a clean
    /// no-match; errors are service/network failures.
    async fn signatures(
        &self,
        kind: SignatureKind,
        selector_hex: &str,
    ) -> Result<Vec<SigCandidate>, LookupError>;
}

// ─── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SigResponse {
    ok: bool,
    #[serde(default)]
    result: SigResult,
}

#[derive(Debug, Default, Deserialize)]
struct SigResult {
    #[serde(default)]
    function: Option<HashMap<String, Vec<SigCandidate>>>,
    #[serde(default)]
    event: Option<HashMap<String, Vec<SigCandidate>>>,
}

fn extract_candidates(
    body: SigResponse,
    kind: SignatureKind,
    selector_hex: &str,
) -> Result<Vec<SigCandidate>, LookupError> {
    if !body.ok {
        return Err(LookupError::ServiceNotOk);
    }
    let per_kind = match kind {
        SignatureKind::Function => body.result.function,
        SignatureKind::Event => body.result.event,
    };
    per_kind
        .and_then(|mut m| m.remove(selector_hex))
        .ok_or_else(|| LookupError::MalformedResponse {
            kind: kind.as_str().to_string(),
            selector: selector_hex.to_string(),
        })
}

// ─── HTTP implementation ──────────────────────────────────────────────────

/// HTTP client for the signature database, with an explicit request
/// timeout. One bounded external call per lookup, no internal retries.
pub struct HttpSignatureSource {
    client: Client,
    base: String,
}

impl HttpSignatureSource {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("evmsift/0.2")
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base: DEFAULT_BASE_URL.into(),
        }
    }

    /// Point at a different lookup endpoint (mirrors, self-hosted).
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }
}

impl Default for HttpSignatureSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignatureSource for HttpSignatureSource {
    async fn signatures(
        &self,
        kind: SignatureKind,
        selector_hex: &str,
    ) -> Result<Vec<SigCandidate>, LookupError> {
        let url = format!(
            "{}/api/v1/signatures?{}={}",
            self.base,
            kind.as_str(),
            selector_hex
        );
        let resp = self.client.get(&url).send().await?;
        let resp = resp.error_for_status()?;
        let body: SigResponse = resp.json().await?;
        extract_candidates(body, kind, selector_hex)
    }
}
