use sandbox::app::App;
use sandbox::catalog::endpoint_by_id;
use sandbox::errors::SandboxError;
use sandbox::services::identity::ChannelType;
use sandbox::services::payload::PayloadEditor;
use sandbox::utils::merge::merge_deep;
use serde_json::Value;
use std::io::Read;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("sandbox: {}", err);
        std::process::exit(1);
    }
}

/// Reads one JSON command from stdin, executes it and prints the normalized
/// outcome. Command shape:
///
/// ```json
/// { "endpoint": "bill-fetch", "channel": "agent",
///   "params": { "billerId": "..." }, "payload": "{...}" }
/// ```
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let app = App::initialize()?;
    app.bootstrap_tokens().await?;

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let command: Value = serde_json::from_str(&input)
        .map_err(|err| SandboxError::parse(format!("Command is not valid JSON: {}", err)))?;

    let endpoint_id = command
        .get("endpoint")
        .and_then(|value| value.as_str())
        .ok_or_else(|| SandboxError::invalid_params("Command needs an endpoint id"))?;
    let endpoint = endpoint_by_id(endpoint_id)
        .ok_or_else(|| SandboxError::not_found(format!("Unknown endpoint: {}", endpoint_id)))?;

    let channel = command
        .get("channel")
        .and_then(|value| value.as_str())
        .and_then(ChannelType::parse)
        .unwrap_or(ChannelType::Web);
    let identity = app.sandbox.session(channel);

    let mut editor = PayloadEditor::initialize(endpoint);
    editor.apply_identity(&identity);
    if let Some(params) = command.get("params") {
        if !params.is_null() {
            let merged = merge_deep(editor.tree(), params);
            editor.apply_text_edit(&serde_json::to_string(&merged)?)?;
        }
    }
    if let Some(payload) = command.get("payload").and_then(|value| value.as_str()) {
        editor.apply_text_edit(payload)?;
    }

    let outcome = app
        .sandbox
        .execute(endpoint, editor.tree(), Some(editor.text()), &identity)
        .await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
