//! The engine seam and the worker thread that hosts it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};

use crate::client::ProtocolClient;
use crate::config::SessionConfig;
use crate::error::{EngineError, ProtocolError};
use crate::message::{
    Artifacts, ComputeOutput, ComputeRequest, EngineFailure, Request, RequestEnvelope, Response,
    ResponseBody, Span,
};

/// The opaque compiler/executor behind the protocol.
///
/// Implementations are constructed on the worker thread and never leave it,
/// so they need not be `Send`.
pub trait Engine {
    /// Compile program source into artifacts.
    fn compile(&mut self, source: &str) -> Result<Artifacts, EngineError>;

    /// Evaluate compiled artifacts against an ordered argument list.
    fn compute(&mut self, request: &ComputeRequest) -> Result<ComputeOutput, EngineError>;

    /// A handle that aborts whatever the engine is doing, callable from
    /// another thread.
    ///
    /// Fetched once, right after the engine is built. Without one, ending a
    /// session waits for the running request to finish before the engine
    /// is dropped.
    fn interrupter(&self) -> Option<Arc<dyn Interrupt>> {
        None
    }
}

/// Stops a running engine from outside its worker thread.
///
/// After `interrupt` the engine may fail its current request; that
/// response is discarded.
pub trait Interrupt: Send + Sync {
    fn interrupt(&self);
}

/// Teardown state shared by a client and its worker.
#[derive(Default)]
pub(crate) struct Shutdown {
    terminated: AtomicBool,
    interrupter: Mutex<Option<Arc<dyn Interrupt>>>,
}

impl Shutdown {
    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Install the engine's interrupter. Returns false if the session
    /// ended while the engine was starting.
    fn arm(&self, interrupter: Option<Arc<dyn Interrupt>>) -> bool {
        let mut slot = self
            .interrupter
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_terminated() {
            return false;
        }
        *slot = interrupter;
        true
    }

    /// Mark the session ended and interrupt the engine if it can be.
    pub(crate) fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
        let interrupter = self
            .interrupter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(interrupter) = interrupter {
            tracing::debug!("interrupting engine");
            interrupter.interrupt();
        }
    }
}

/// Starts engine workers.
pub struct EngineHost;

impl EngineHost {
    /// Spawn a worker thread, build the engine on it with `factory`, and
    /// return the client that owns the channel.
    ///
    /// If the factory fails, the worker logs the error and exits. Requests
    /// already queued are dropped, every subscription then reports
    /// [`ProtocolError::Closed`], and so does the next send.
    pub fn spawn<E, F>(factory: F, config: &SessionConfig) -> Result<ProtocolClient, ProtocolError>
    where
        E: Engine + 'static,
        F: FnOnce() -> Result<E, EngineError> + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = broadcast::channel(config.channel_capacity.max(1));
        let shutdown = Arc::new(Shutdown::default());

        // The worker holds the only response sender, so its exit closes
        // every subscription.
        let worker = Worker {
            requests: request_rx,
            responses: response_tx,
            shutdown: Arc::clone(&shutdown),
        };
        thread::Builder::new()
            .name("zkplay-engine".to_string())
            .spawn(move || match factory() {
                Ok(engine) => {
                    if worker.shutdown.arm(engine.interrupter()) {
                        worker.run(engine);
                    } else {
                        tracing::debug!("session ended before the engine started");
                    }
                }
                Err(e) => tracing::error!(error = %e, "engine failed to initialize"),
            })?;

        Ok(ProtocolClient::new(request_tx, response_rx, shutdown))
    }
}

struct Worker {
    requests: mpsc::UnboundedReceiver<RequestEnvelope>,
    responses: broadcast::Sender<Response>,
    shutdown: Arc<Shutdown>,
}

impl Worker {
    /// Process requests one at a time, in arrival order, until the client
    /// goes away.
    fn run<E: Engine>(mut self, mut engine: E) {
        let epoch = Instant::now();
        let now_ms = || epoch.elapsed().as_secs_f64() * 1000.0;

        while let Some(envelope) = self.requests.blocking_recv() {
            let start = now_ms();
            let body = handle(&mut engine, &envelope.request);
            let end = now_ms();

            if self.shutdown.is_terminated() {
                tracing::debug!(id = %envelope.id, "session ended; discarding response");
                break;
            }
            let response = Response {
                id: envelope.id,
                body,
                span: Span { start, end },
            };
            tracing::debug!(
                id = %response.id,
                kind = %response.origin(),
                error = response.is_error(),
                duration_ms = response.span.duration_ms(),
                "engine responded"
            );
            if self.responses.send(response).is_err() {
                tracing::trace!("no subscribers; response dropped");
            }
        }
        tracing::debug!("engine worker stopped");
    }
}

fn handle<E: Engine>(engine: &mut E, request: &Request) -> ResponseBody {
    let origin = request.kind();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match request {
        Request::Compile(source) => engine.compile(source).map(ResponseBody::Compile),
        Request::Compute(compute) => engine.compute(compute).map(ResponseBody::Compute),
    }));
    let error = match outcome {
        Ok(Ok(body)) => return body,
        Ok(Err(e)) => e.message,
        Err(payload) => format!("engine panicked: {}", panic_message(payload.as_ref())),
    };
    ResponseBody::Error(EngineFailure { error, origin })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
