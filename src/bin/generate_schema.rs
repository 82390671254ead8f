//! Print the JSON schema of the range cache configuration.

use fresh_lines::EngineConfig;

fn main() {
    let schema = schemars::schema_for!(EngineConfig);
    match serde_json::to_string_pretty(&schema) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to serialize schema: {e}");
            std::process::exit(1);
        }
    }
}
