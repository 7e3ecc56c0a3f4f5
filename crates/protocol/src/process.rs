//! An [`Engine`] backed by an external engine process.
//!
//! The child reads one JSON request per line on stdin and answers with one
//! JSON reply per line on stdout:
//!
//! ```text
//! > {"kind":"compile","payload":"def main() -> field { return 1; }"}
//! < {"kind":"compile","payload":{"program":"...","abi":{"inputs":[]}}}
//! > {"kind":"compute","payload":{"artifacts":{...},"args":[]}}
//! < {"kind":"error","payload":{"error":"...","type":"compute"}}
//! ```
//!
//! Ids and spans are added by the hosting worker, not by the child.

use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::engine::{Engine, Interrupt};
use crate::error::EngineError;
use crate::message::{Artifacts, ComputeOutput, ComputeRequest, RequestKind, ResponseBody};

#[derive(Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
enum ChildRequest<'a> {
    Compile(&'a str),
    Compute(&'a ComputeRequest),
}

pub struct ProcessEngine {
    // Shared with the interrupter so a session can kill a busy child.
    child: Arc<Mutex<Child>>,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ProcessEngine {
    /// Start the engine command with piped stdin/stdout; stderr is inherited.
    pub fn spawn<S: AsRef<OsStr>>(program: S, args: &[String]) -> Result<Self, EngineError> {
        let program = program.as_ref();
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                EngineError::new(format!(
                    "failed to start engine '{}': {}",
                    program.to_string_lossy(),
                    e
                ))
            })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::new("engine stdin is not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::new("engine stdout is not piped"))?;
        tracing::debug!(program = %program.to_string_lossy(), pid = child.id(), "engine process started");
        Ok(ProcessEngine {
            child: Arc::new(Mutex::new(child)),
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn exchange(&mut self, request: &ChildRequest<'_>) -> Result<ResponseBody, EngineError> {
        let mut line = serde_json::to_string(request)
            .map_err(|e| EngineError::new(format!("failed to encode request: {}", e)))?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .and_then(|()| self.stdin.flush())
            .map_err(|e| EngineError::new(format!("failed to write to engine: {}", e)))?;

        let mut reply = String::new();
        let read = self
            .stdout
            .read_line(&mut reply)
            .map_err(|e| EngineError::new(format!("failed to read from engine: {}", e)))?;
        if read == 0 {
            return Err(EngineError::new("engine process closed its output"));
        }
        decode_reply(&reply)
    }
}

fn decode_reply(line: &str) -> Result<ResponseBody, EngineError> {
    serde_json::from_str(line.trim_end())
        .map_err(|e| EngineError::new(format!("invalid engine reply: {}", e)))
}

fn unexpected(want: RequestKind, got: &ResponseBody) -> EngineError {
    let got = match got {
        ResponseBody::Compile(_) => "compile",
        ResponseBody::Compute(_) => "compute",
        ResponseBody::Error(_) => "error",
    };
    EngineError::new(format!("engine answered a {} request with '{}'", want, got))
}

/// Kills the engine child; a blocked read on its stdout then hits EOF.
struct ChildKiller {
    child: Arc<Mutex<Child>>,
}

impl Interrupt for ChildKiller {
    fn interrupt(&self) {
        kill(&self.child);
    }
}

fn kill(child: &Mutex<Child>) {
    let mut child = child.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = child.kill() {
        tracing::trace!(error = %e, "engine process already exited");
    }
    match child.wait() {
        Ok(status) => tracing::trace!(%status, "engine process reaped"),
        Err(e) => tracing::trace!(error = %e, "failed to reap engine process"),
    }
}

impl Engine for ProcessEngine {
    fn compile(&mut self, source: &str) -> Result<Artifacts, EngineError> {
        match self.exchange(&ChildRequest::Compile(source))? {
            ResponseBody::Compile(artifacts) => Ok(artifacts),
            ResponseBody::Error(failure) => Err(EngineError::new(failure.error)),
            other => Err(unexpected(RequestKind::Compile, &other)),
        }
    }

    fn compute(&mut self, request: &ComputeRequest) -> Result<ComputeOutput, EngineError> {
        match self.exchange(&ChildRequest::Compute(request))? {
            ResponseBody::Compute(output) => Ok(output),
            ResponseBody::Error(failure) => Err(EngineError::new(failure.error)),
            other => Err(unexpected(RequestKind::Compute, &other)),
        }
    }

    fn interrupter(&self) -> Option<Arc<dyn Interrupt>> {
        Some(Arc::new(ChildKiller {
            child: Arc::clone(&self.child),
        }))
    }
}

impl Drop for ProcessEngine {
    fn drop(&mut self) {
        kill(&self.child);
    }
}
