use std::path::Path;

use serde_json::json;
use zkplay_abi::SchemaBuilder;

use crate::{load_abi, print_json, OutputFormat};

/// Print the JSON Schema each input's value is checked against.
pub(crate) fn cmd_schema(abi_path: &Path, output: OutputFormat, quiet: bool) {
    let abi = load_abi(abi_path, output, quiet);

    match output {
        OutputFormat::Text => {
            for input in &abi.inputs {
                let visibility = if input.public { "public" } else { "private" };
                println!("{} ({}, {}):", input.name, input.ty, visibility);
                match serde_json::to_string_pretty(&SchemaBuilder::schema(&input.ty)) {
                    Ok(s) => {
                        for line in s.lines() {
                            println!("  {}", line);
                        }
                    }
                    Err(e) => eprintln!("error serializing schema: {}", e),
                }
            }
        }
        OutputFormat::Json => {
            let inputs: Vec<_> = abi
                .inputs
                .iter()
                .map(|input| {
                    json!({
                        "name": input.name,
                        "public": input.public,
                        "type": input.ty.to_string(),
                        "schema": SchemaBuilder::schema(&input.ty),
                    })
                })
                .collect();
            print_json(&json!({ "inputs": inputs }));
        }
    }
}
