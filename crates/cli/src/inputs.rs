//! Raw input text gathered from `-i NAME=VALUE` flags and `--inputs` files.

use std::path::Path;

use serde_json::Value;

/// Split `NAME=VALUE` at the first `=`. The value may be empty.
pub(crate) fn parse_assignment(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", arg)),
    }
}

/// Read a JSON object of input values.
///
/// String members are taken as the raw text a user would type; any other
/// member is re-serialized, so `{"flags": [true, false]}` becomes the text
/// `[true,false]`.
pub(crate) fn read_inputs_file(path: &Path) -> Result<Vec<(String, String)>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading file '{}': {}", path.display(), e))?;
    let json: Value = serde_json::from_str(&content)
        .map_err(|e| format!("invalid JSON in '{}': {}", path.display(), e))?;
    let Value::Object(members) = json else {
        return Err(format!(
            "inputs file '{}' must contain a JSON object",
            path.display()
        ));
    };
    Ok(members
        .into_iter()
        .map(|(name, value)| {
            let raw = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (name, raw)
        })
        .collect())
}

/// File values first, then flags, so a flag overrides the file.
pub(crate) fn collect(
    assignments: &[String],
    file: Option<&Path>,
) -> Result<Vec<(String, String)>, String> {
    let mut raw = match file {
        Some(path) => read_inputs_file(path)?,
        None => Vec::new(),
    };
    for arg in assignments {
        raw.push(parse_assignment(arg)?);
    }
    Ok(raw)
}
