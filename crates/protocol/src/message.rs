//! Wire shapes exchanged with the engine.
//!
//! ```text
//! request  { id, kind: "compile", payload: source }
//!          { id, kind: "compute", payload: { artifacts, args } }
//! response { id, kind: "compile", payload: artifacts, span }
//!          { id, kind: "compute", payload: { output, logs }, span }
//!          { id, kind: "error", payload: { error, type }, span }
//! ```
//!
//! `id` is generated at dispatch and echoed by the worker, so a consumer can
//! tie a response to its own request instead of relying on the kind alone.

use std::fmt;

use serde::{Deserialize, Serialize};
use zkplay_abi::{Abi, CandidateValue, SchemaError};

// ──────────────────────────────────────────────
// Identifiers and kinds
// ──────────────────────────────────────────────

/// Correlation id of one request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The two long-running operations the engine performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Compile,
    Compute,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Compile => "compile",
            RequestKind::Compute => "compute",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────────────────────────────────
// Payloads
// ──────────────────────────────────────────────

/// The opaque bundle produced by a successful compile.
///
/// Only the ABI is interpreted on this side; `program` goes back to the
/// engine untouched with every compute request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    #[serde(with = "base64_bytes")]
    pub program: Vec<u8>,
    pub abi: serde_json::Value,
}

impl Artifacts {
    /// Decode the ABI the engine attached to these artifacts.
    pub fn abi(&self) -> Result<Abi, SchemaError> {
        Abi::from_json(&self.abi)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeRequest {
    pub artifacts: Artifacts,
    /// One value per ABI input, in ABI order.
    pub args: Vec<CandidateValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComputeOutput {
    pub output: String,
    #[serde(default)]
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineFailure {
    pub error: String,
    /// The kind of request that failed.
    #[serde(rename = "type")]
    pub origin: RequestKind,
}

// ──────────────────────────────────────────────
// Requests
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
pub enum Request {
    Compile(String),
    Compute(ComputeRequest),
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Compile(_) => RequestKind::Compile,
            Request::Compute(_) => RequestKind::Compute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: RequestId,
    #[serde(flatten)]
    pub request: Request,
}

// ──────────────────────────────────────────────
// Responses
// ──────────────────────────────────────────────

/// Timestamps (milliseconds on the worker's monotonic clock) bracketing
/// one exchange: `start` when the worker dequeues the request and begins
/// handling it, `end` right before the response is dispatched.
///
/// Time a request spends queued behind earlier requests is not part of
/// its duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    pub fn duration_ms(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Duration with two decimals, as shown to the user.
    pub fn format_duration(&self) -> String {
        format!("{:.2}", self.duration_ms())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
pub enum ResponseBody {
    Compile(Artifacts),
    Compute(ComputeOutput),
    Error(EngineFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: RequestId,
    #[serde(flatten)]
    pub body: ResponseBody,
    pub span: Span,
}

impl Response {
    /// The kind of request this message answers, success or failure.
    pub fn origin(&self) -> RequestKind {
        match &self.body {
            ResponseBody::Compile(_) => RequestKind::Compile,
            ResponseBody::Compute(_) => RequestKind::Compute,
            ResponseBody::Error(failure) => failure.origin,
        }
    }

    /// Whether a consumer waiting on `kind` should look at this message.
    pub fn concerns(&self, kind: RequestKind) -> bool {
        self.origin() == kind
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, ResponseBody::Error(_))
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
