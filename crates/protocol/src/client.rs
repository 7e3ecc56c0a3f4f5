//! The caller's end of the engine channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc};

use crate::engine::Shutdown;
use crate::error::ProtocolError;
use crate::message::{Request, RequestEnvelope, RequestId, RequestKind, Response};

/// Owns the channel to one engine worker for the lifetime of a session.
///
/// Dispatch is fire-and-forget: [`send`](Self::send) never blocks and there
/// is no timeout or cancellation. The worker answers in dispatch order.
/// The protocol does not stop two requests of the same kind from being in
/// flight; callers keep at most one outstanding per kind.
///
/// Dropping the client (or calling [`terminate`](Self::terminate)) ends the
/// session: an engine that exposes an interrupter is stopped at once,
/// otherwise the worker stops after the request it is running. Either way
/// that request's response is discarded.
///
/// The client never holds a response sender. When the worker exits, for
/// whatever reason, every [`Subscription`] sees the channel close.
pub struct ProtocolClient {
    requests: mpsc::UnboundedSender<RequestEnvelope>,
    // Never read; only used to open new subscriptions.
    responses: broadcast::Receiver<Response>,
    next_id: AtomicU64,
    shutdown: Arc<Shutdown>,
}

impl ProtocolClient {
    pub(crate) fn new(
        requests: mpsc::UnboundedSender<RequestEnvelope>,
        responses: broadcast::Receiver<Response>,
        shutdown: Arc<Shutdown>,
    ) -> Self {
        ProtocolClient {
            requests,
            responses,
            next_id: AtomicU64::new(1),
            shutdown,
        }
    }

    /// Dispatch a request and return the id its response will carry.
    pub fn send(&self, request: Request) -> Result<RequestId, ProtocolError> {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let kind = request.kind();
        self.requests
            .send(RequestEnvelope { id, request })
            .map_err(|_| ProtocolError::Closed)?;
        tracing::debug!(id = %id, kind = %kind, "dispatched request");
        Ok(id)
    }

    /// Open a new stream of every response dispatched from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.responses.resubscribe(),
        }
    }

    /// True once the worker has stopped accepting requests.
    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }

    /// End the session and release the worker.
    pub fn terminate(self) {
        drop(self);
    }
}

impl Drop for ProtocolClient {
    fn drop(&mut self) {
        self.shutdown.terminate();
    }
}

/// One consumer's view of the response stream.
pub struct Subscription {
    rx: broadcast::Receiver<Response>,
}

impl Subscription {
    /// Wait for the next response of any kind.
    pub async fn recv(&mut self) -> Result<Response, ProtocolError> {
        loop {
            match self.rx.recv().await {
                Ok(response) => return Ok(response),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber lagged; responses were dropped");
                }
                Err(RecvError::Closed) => return Err(ProtocolError::Closed),
            }
        }
    }

    /// Wait for the next response answering a request of `kind`.
    ///
    /// Responses to the other kind, errors included, are skipped silently.
    pub async fn recv_for(&mut self, kind: RequestKind) -> Result<Response, ProtocolError> {
        loop {
            let response = self.recv().await?;
            if response.concerns(kind) {
                return Ok(response);
            }
            tracing::trace!(id = %response.id, origin = %response.origin(), want = %kind, "ignoring cross-talk");
        }
    }

    /// Wait for the response to one specific request.
    pub async fn recv_reply(&mut self, id: RequestId) -> Result<Response, ProtocolError> {
        loop {
            let response = self.recv().await?;
            if response.id == id {
                return Ok(response);
            }
            tracing::trace!(id = %response.id, want = %id, "ignoring response to another request");
        }
    }

    /// Take the next buffered response without waiting.
    pub fn try_recv(&mut self) -> Result<Option<Response>, ProtocolError> {
        loop {
            match self.rx.try_recv() {
                Ok(response) => return Ok(Some(response)),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber lagged; responses were dropped");
                }
                Err(TryRecvError::Closed) => return Err(ProtocolError::Closed),
            }
        }
    }
}
