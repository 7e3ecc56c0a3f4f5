use std::path::Path;
use std::process;

use serde_json::{json, Value};
use zkplay_abi::{InputBinding, InputSet};

use crate::{inputs, load_abi, print_json, report_error, OutputFormat};

/// Coerce and validate input values against an ABI.
///
/// Invalid values are reported but do not fail the command; only an
/// unreadable or unusable ABI, or a malformed assignment, exits non-zero.
pub(crate) fn cmd_check(
    abi_path: &Path,
    assignments: &[String],
    inputs_file: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let abi = load_abi(abi_path, output, quiet);
    let mut set = match InputSet::from_abi(&abi) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("unusable ABI in '{}': {}", abi_path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let raw = match inputs::collect(assignments, inputs_file) {
        Ok(r) => r,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    for (name, value) in raw {
        if set.set(&name, value).is_none() {
            let msg = format!("unknown input '{}'", name);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }

    match output {
        OutputFormat::Text => {
            print_verdicts(&set);
            println!("args: {}", Value::Array(set.arguments()));
        }
        OutputFormat::Json => {
            print_json(&json!({
                "inputs": verdicts_json(&set),
                "valid": set.all_valid(),
                "args": set.arguments(),
            }));
        }
    }
}

fn status(binding: &InputBinding) -> &'static str {
    if binding.raw().is_empty() {
        "not set"
    } else if binding.verdict().valid {
        "ok"
    } else {
        "invalid"
    }
}

/// One line per input, followed by indented diagnostics for flagged values.
pub(crate) fn print_verdicts(set: &InputSet) {
    for binding in set.iter() {
        println!(
            "{} ({}): {}",
            binding.name(),
            binding.descriptor(),
            status(binding)
        );
        if binding.is_invalid() {
            for line in binding.verdict().diagnostic.lines() {
                println!("    {}", line);
            }
        }
    }
}

pub(crate) fn verdicts_json(set: &InputSet) -> Vec<Value> {
    set.iter()
        .map(|binding| {
            json!({
                "name": binding.name(),
                "type": binding.descriptor().to_string(),
                "raw": binding.raw(),
                "status": status(binding),
                "valid": binding.verdict().valid,
                "diagnostic": binding.verdict().diagnostic,
            })
        })
        .collect()
}
