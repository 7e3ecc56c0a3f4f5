//! Request/response protocol between the zkplay front-end and its engine.
//!
//! The engine runs in its own execution context, a dedicated worker thread
//! hosting an [`Engine`] implementation, and is reached only by message
//! passing. A [`ProtocolClient`] dispatches requests fire-and-forget and
//! fans every response out to its [`Subscription`]s; each consumer filters
//! the messages that concern it. The [`session`] module layers the compile
//! and execute view models on top.

pub mod client;
pub mod config;
pub mod engine;
mod error;
pub mod message;
pub mod process;
pub mod session;

pub use client::{ProtocolClient, Subscription};
pub use config::SessionConfig;
pub use engine::{Engine, EngineHost, Interrupt};
pub use error::{EngineError, ProtocolError, SessionError};
pub use message::{
    Artifacts, ComputeOutput, ComputeRequest, EngineFailure, Request, RequestEnvelope, RequestId,
    RequestKind, Response, ResponseBody, Span,
};
pub use process::ProcessEngine;
pub use session::{
    CompilerPanel, ExecutionOutput, ExecutorPanel, Phase, Session, SessionEvent, StatusLevel,
    StatusLine,
};
