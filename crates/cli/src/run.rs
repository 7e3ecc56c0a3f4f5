use std::path::PathBuf;
use std::process;

use serde_json::{json, Map, Value};
use zkplay_abi::InputSet;
use zkplay_protocol::{ProcessEngine, Session, SessionError, SessionEvent};

use crate::check::{print_verdicts, verdicts_json};
use crate::config::Config;
use crate::{inputs, print_json, report_error, OutputFormat};

pub(crate) struct RunOptions {
    pub source: PathBuf,
    pub engine: Option<String>,
    pub engine_args: Vec<String>,
    pub inputs: Vec<String>,
    pub inputs_file: Option<PathBuf>,
    pub compile_only: bool,
}

/// Compile `source` with an engine process, then compute with the given
/// inputs.
///
/// Exits 1 when compilation or computation fails.
pub(crate) fn cmd_run(opts: RunOptions, config: Config, output: OutputFormat, quiet: bool) {
    let source = match std::fs::read_to_string(&opts.source) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", opts.source.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let Some(command) = opts.engine.clone().or_else(|| config.engine.command.clone()) else {
        report_error(
            "no engine configured: pass --engine or set [engine].command in zkplay.toml",
            output,
            quiet,
        );
        process::exit(1);
    };
    // Flag arguments only apply to a flag-selected engine.
    let engine_args = if opts.engine.is_some() {
        opts.engine_args.clone()
    } else {
        config.engine.args.clone()
    };
    let raw = match inputs::collect(&opts.inputs, opts.inputs_file.as_deref()) {
        Ok(r) => r,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("failed to create tokio runtime: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let mut report = Report::new(output, quiet);
    let result = rt.block_on(run_session(
        command,
        engine_args,
        source,
        raw,
        opts.compile_only,
        config,
        &mut report,
    ));
    let succeeded = match result {
        Ok(succeeded) => succeeded,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    report.finish();
    if !succeeded {
        process::exit(1);
    }
}

async fn run_session(
    command: String,
    engine_args: Vec<String>,
    source: String,
    raw: Vec<(String, String)>,
    compile_only: bool,
    config: Config,
    report: &mut Report,
) -> Result<bool, SessionError> {
    let mut session = Session::start(
        move || ProcessEngine::spawn(&command, &engine_args),
        config.session,
    )?;

    session.compile(source).await?;
    let compiled = matches!(session.next_event().await?, SessionEvent::Compiled { .. });
    if let Some(status) = session.compiler().status() {
        report.status("compile", &status.message, &status.timestamp);
    }
    if !compiled || compile_only {
        session.end();
        return Ok(compiled);
    }

    for (name, value) in raw {
        session.set_input(&name, value)?;
    }
    report.inputs(session.executor().inputs());
    if !session.executor().inputs().all_valid() {
        tracing::warn!("some inputs failed local validation; submitting anyway");
    }

    session.compute().await?;
    let computed = session.next_event().await?;
    if let Some(shown) = session.executor().output() {
        report.execution(&shown.message, shown.result.as_deref(), &shown.logs);
    }
    session.end();
    Ok(matches!(computed, SessionEvent::Computed { .. }))
}

/// Collects what a run prints: text goes out as it happens, JSON is emitted
/// as one object at the end.
struct Report {
    output: OutputFormat,
    quiet: bool,
    json: Map<String, Value>,
}

impl Report {
    fn new(output: OutputFormat, quiet: bool) -> Self {
        Report {
            output,
            quiet,
            json: Map::new(),
        }
    }

    fn status(&mut self, stage: &str, message: &str, timestamp: &str) {
        match self.output {
            OutputFormat::Text => {
                if !self.quiet {
                    println!("[{}] {}", timestamp, message);
                }
            }
            OutputFormat::Json => {
                self.json.insert(
                    stage.to_string(),
                    json!({ "message": message, "timestamp": timestamp }),
                );
            }
        }
    }

    fn inputs(&mut self, set: &InputSet) {
        match self.output {
            OutputFormat::Text => {
                if !self.quiet {
                    print_verdicts(set);
                }
            }
            OutputFormat::Json => {
                self.json
                    .insert("inputs".to_string(), Value::Array(verdicts_json(set)));
            }
        }
    }

    fn execution(&mut self, message: &str, result: Option<&str>, logs: &[String]) {
        match self.output {
            OutputFormat::Text => {
                if !self.quiet {
                    println!("{}", message);
                }
                if let Some(result) = result {
                    println!("output: {}", result);
                }
                for line in logs {
                    println!("log: {}", line);
                }
            }
            OutputFormat::Json => {
                self.json.insert(
                    "compute".to_string(),
                    json!({ "message": message, "output": result, "logs": logs }),
                );
            }
        }
    }

    fn finish(self) {
        if self.output == OutputFormat::Json {
            print_json(&Value::Object(self.json));
        }
    }
}
