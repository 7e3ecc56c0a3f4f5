//! Compile and execute view models over one engine channel.
//!
//! Both panels share the `Idle` state and are restartable:
//!
//! ```text
//! compiler: Idle -> Compiling -> Idle (artifacts set | artifacts unchanged)
//! executor: Idle -> Computing -> Idle (output and logs set | error shown)
//! ```
//!
//! Each panel looks only at responses to its own outstanding request: the
//! kind must match and so must the echoed id. Everything else is cross-talk
//! and is dropped without comment.

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use zkplay_abi::{InputBinding, InputSet, SchemaError};

use crate::client::{ProtocolClient, Subscription};
use crate::config::SessionConfig;
use crate::engine::{Engine, EngineHost};
use crate::error::{EngineError, ProtocolError, SessionError};
use crate::message::{
    Artifacts, ComputeOutput, ComputeRequest, Request, RequestId, RequestKind, Response,
    ResponseBody,
};

// ──────────────────────────────────────────────
// Shared view state
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// A request is outstanding (compiling or computing).
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Success,
    Error,
}

/// The compile panel's single global message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub level: StatusLevel,
    pub message: String,
    /// RFC 3339 time the message was produced.
    pub timestamp: String,
}

impl StatusLine {
    fn new(level: StatusLevel, message: String) -> Self {
        StatusLine {
            level,
            message,
            timestamp: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
        }
    }
}

/// What the executor shows after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub level: StatusLevel,
    pub message: String,
    pub result: Option<String>,
    pub logs: Vec<String>,
}

/// A response that changed one of the panels.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Compiled { duration_ms: f64 },
    CompileFailed { error: String },
    Computed { duration_ms: f64, output: ComputeOutput },
    ComputeFailed { error: String },
}

/// Request tracking shared by both panels.
#[derive(Debug)]
struct Tracker {
    kind: RequestKind,
    phase: Phase,
    pending: Option<RequestId>,
}

impl Tracker {
    fn new(kind: RequestKind) -> Self {
        Tracker {
            kind,
            phase: Phase::Idle,
            pending: None,
        }
    }

    fn begin(&mut self) -> Result<(), SessionError> {
        if self.phase == Phase::Busy {
            return Err(SessionError::Busy(self.kind));
        }
        self.phase = Phase::Busy;
        self.pending = None;
        Ok(())
    }

    fn track(&mut self, id: RequestId) {
        self.pending = Some(id);
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.pending = None;
    }

    /// Accept a response if it answers the outstanding request.
    fn settle(&mut self, response: &Response) -> bool {
        if !response.concerns(self.kind) || self.pending != Some(response.id) {
            return false;
        }
        self.reset();
        true
    }
}

// ──────────────────────────────────────────────
// Compiler panel
// ──────────────────────────────────────────────

#[derive(Debug)]
pub struct CompilerPanel {
    tracker: Tracker,
    artifacts: Option<Artifacts>,
    status: Option<StatusLine>,
}

impl Default for CompilerPanel {
    fn default() -> Self {
        CompilerPanel {
            tracker: Tracker::new(RequestKind::Compile),
            artifacts: None,
            status: None,
        }
    }
}

impl CompilerPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.tracker.phase
    }

    pub fn is_busy(&self) -> bool {
        self.tracker.phase == Phase::Busy
    }

    /// Artifacts of the last successful compile.
    pub fn artifacts(&self) -> Option<&Artifacts> {
        self.artifacts.as_ref()
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    /// Enter `Compiling`; fails if a compile is already outstanding.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        self.tracker.begin()?;
        self.status = None;
        Ok(())
    }

    /// Record the id of the dispatched compile request.
    pub fn track(&mut self, id: RequestId) {
        self.tracker.track(id);
    }

    /// Return to `Idle` when the request never left.
    pub fn abort(&mut self, error: &ProtocolError) {
        self.tracker.reset();
        self.status = Some(StatusLine::new(StatusLevel::Error, error.to_string()));
    }

    pub fn on_response(&mut self, response: &Response) -> Option<SessionEvent> {
        if !self.tracker.settle(response) {
            return None;
        }
        match &response.body {
            ResponseBody::Compile(artifacts) => {
                self.artifacts = Some(artifacts.clone());
                self.status = Some(StatusLine::new(
                    StatusLevel::Success,
                    format!(
                        "Compilation successful (took {} ms)",
                        response.span.format_duration()
                    ),
                ));
                Some(SessionEvent::Compiled {
                    duration_ms: response.span.duration_ms(),
                })
            }
            ResponseBody::Error(failure) => {
                tracing::debug!(error = %failure.error, "compile failed");
                self.status = Some(StatusLine::new(StatusLevel::Error, failure.error.clone()));
                Some(SessionEvent::CompileFailed {
                    error: failure.error.clone(),
                })
            }
            ResponseBody::Compute(_) => None,
        }
    }
}

// ──────────────────────────────────────────────
// Executor panel
// ──────────────────────────────────────────────

#[derive(Debug)]
pub struct ExecutorPanel {
    tracker: Tracker,
    artifacts: Option<Artifacts>,
    inputs: InputSet,
    output: Option<ExecutionOutput>,
}

impl Default for ExecutorPanel {
    fn default() -> Self {
        ExecutorPanel {
            tracker: Tracker::new(RequestKind::Compute),
            artifacts: None,
            inputs: InputSet::default(),
            output: None,
        }
    }
}

impl ExecutorPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the program under execution and rebuild every input.
    ///
    /// An ABI that cannot be compiled into rules leaves the panel empty.
    pub fn load(&mut self, artifacts: Artifacts) -> Result<(), SchemaError> {
        self.output = None;
        let inputs = artifacts.abi().and_then(|abi| InputSet::from_abi(&abi));
        match inputs {
            Ok(inputs) => {
                self.inputs = inputs;
                self.artifacts = Some(artifacts);
                Ok(())
            }
            Err(e) => {
                self.inputs = InputSet::default();
                self.artifacts = None;
                Err(e)
            }
        }
    }

    pub fn phase(&self) -> Phase {
        self.tracker.phase
    }

    pub fn is_busy(&self) -> bool {
        self.tracker.phase == Phase::Busy
    }

    pub fn artifacts(&self) -> Option<&Artifacts> {
        self.artifacts.as_ref()
    }

    pub fn inputs(&self) -> &InputSet {
        &self.inputs
    }

    pub fn output(&self) -> Option<&ExecutionOutput> {
        self.output.as_ref()
    }

    pub fn set_input(
        &mut self,
        name: &str,
        raw: impl Into<String>,
    ) -> Result<&InputBinding, SessionError> {
        self.inputs
            .set(name, raw)
            .ok_or_else(|| SessionError::UnknownInput(name.to_string()))
    }

    /// Enter `Computing` and build the request from the current inputs.
    ///
    /// Local verdicts do not gate submission; the engine has the final say.
    pub fn begin(&mut self) -> Result<ComputeRequest, SessionError> {
        let artifacts = self.artifacts.clone().ok_or(SessionError::NoArtifacts)?;
        self.tracker.begin()?;
        self.output = None;
        if !self.inputs.all_valid() {
            tracing::debug!("submitting inputs that fail local validation");
        }
        Ok(ComputeRequest {
            artifacts,
            args: self.inputs.arguments(),
        })
    }

    pub fn track(&mut self, id: RequestId) {
        self.tracker.track(id);
    }

    pub fn abort(&mut self, error: &ProtocolError) {
        self.tracker.reset();
        self.output = Some(ExecutionOutput {
            level: StatusLevel::Error,
            message: error.to_string(),
            result: None,
            logs: vec![],
        });
    }

    pub fn on_response(&mut self, response: &Response) -> Option<SessionEvent> {
        if !self.tracker.settle(response) {
            return None;
        }
        match &response.body {
            ResponseBody::Compute(output) => {
                self.output = Some(ExecutionOutput {
                    level: StatusLevel::Success,
                    message: format!(
                        "Successfully computed in {}ms",
                        response.span.format_duration()
                    ),
                    result: Some(output.output.clone()),
                    logs: output.logs.clone(),
                });
                Some(SessionEvent::Computed {
                    duration_ms: response.span.duration_ms(),
                    output: output.clone(),
                })
            }
            ResponseBody::Error(failure) => {
                tracing::debug!(error = %failure.error, "compute failed");
                self.output = Some(ExecutionOutput {
                    level: StatusLevel::Error,
                    message: failure.error.clone(),
                    result: None,
                    logs: vec![],
                });
                Some(SessionEvent::ComputeFailed {
                    error: failure.error.clone(),
                })
            }
            ResponseBody::Compile(_) => None,
        }
    }
}

// ──────────────────────────────────────────────
// Session
// ──────────────────────────────────────────────

/// One front-end session: the engine channel plus both panels.
pub struct Session {
    client: ProtocolClient,
    events: Subscription,
    config: SessionConfig,
    compiler: CompilerPanel,
    executor: ExecutorPanel,
}

impl Session {
    /// Start an engine worker and open a session on it.
    pub fn start<E, F>(factory: F, config: SessionConfig) -> Result<Self, ProtocolError>
    where
        E: Engine + 'static,
        F: FnOnce() -> Result<E, EngineError> + Send + 'static,
    {
        let client = EngineHost::spawn(factory, &config)?;
        Ok(Session::new(client, config))
    }

    pub fn new(client: ProtocolClient, config: SessionConfig) -> Self {
        let events = client.subscribe();
        Session {
            client,
            events,
            config,
            compiler: CompilerPanel::new(),
            executor: ExecutorPanel::new(),
        }
    }

    pub fn compiler(&self) -> &CompilerPanel {
        &self.compiler
    }

    pub fn executor(&self) -> &ExecutorPanel {
        &self.executor
    }

    pub fn set_input(
        &mut self,
        name: &str,
        raw: impl Into<String>,
    ) -> Result<&InputBinding, SessionError> {
        self.executor.set_input(name, raw)
    }

    /// Dispatch a compile request for `source`.
    pub async fn compile(&mut self, source: impl Into<String>) -> Result<RequestId, SessionError> {
        self.compiler.begin()?;
        self.pause().await;
        match self.client.send(Request::Compile(source.into())) {
            Ok(id) => {
                self.compiler.track(id);
                Ok(id)
            }
            Err(e) => {
                self.compiler.abort(&e);
                Err(e.into())
            }
        }
    }

    /// Dispatch a compute request with the current inputs.
    pub async fn compute(&mut self) -> Result<RequestId, SessionError> {
        let request = self.executor.begin()?;
        self.pause().await;
        match self.client.send(Request::Compute(request)) {
            Ok(id) => {
                self.executor.track(id);
                Ok(id)
            }
            Err(e) => {
                self.executor.abort(&e);
                Err(e.into())
            }
        }
    }

    /// Wait for the next response that changes a panel and apply it.
    ///
    /// A successful compile reloads the executor with the new artifacts; if
    /// their ABI is unusable the error is returned after the compile status
    /// has been updated. If the engine goes away, busy panels return to
    /// `Idle` showing the channel error, and that error is returned.
    pub async fn next_event(&mut self) -> Result<SessionEvent, SessionError> {
        loop {
            let response = match self.events.recv().await {
                Ok(response) => response,
                Err(e) => {
                    self.abandon(&e);
                    return Err(e.into());
                }
            };
            if let Some(event) = self.route(&response)? {
                return Ok(event);
            }
            tracing::trace!(id = %response.id, "response matched no outstanding request");
        }
    }

    /// End the session and dispose of the engine channel.
    pub fn end(self) {
        self.client.terminate();
    }

    fn abandon(&mut self, error: &ProtocolError) {
        if !self.compiler.is_busy() && !self.executor.is_busy() {
            return;
        }
        tracing::warn!(error = %error, "engine channel closed with requests outstanding");
        if self.compiler.is_busy() {
            self.compiler.abort(error);
        }
        if self.executor.is_busy() {
            self.executor.abort(error);
        }
    }

    fn route(&mut self, response: &Response) -> Result<Option<SessionEvent>, SessionError> {
        if let Some(event) = self.compiler.on_response(response) {
            if matches!(event, SessionEvent::Compiled { .. }) {
                if let Some(artifacts) = self.compiler.artifacts() {
                    self.executor.load(artifacts.clone())?;
                }
            }
            return Ok(Some(event));
        }
        Ok(self.executor.on_response(response))
    }

    async fn pause(&self) {
        let delay = self.config.dispatch_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
