//! `bizpilot chat`: one assistant turn from the terminal.
//!
//! Runs the same pipeline as the HTTP endpoint and replays the result with
//! the same pacing. Tool statuses go to stderr, the answer to stdout.

use std::io::Write;
use std::path::Path;

use bizpilot_agent::{SimulatedStream, StreamEvent};
use bizpilot_config::AppConfig;
use bizpilot_core::message::{Message, Transcript};
use bizpilot_core::tenant::TenantId;
use bizpilot_gateway::GatewayState;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    tenant: &str,
    user: &str,
    message: &str,
    page_hint: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set BIZPILOT_API_KEY or ANTHROPIC_API_KEY, or add api_key to");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }
    if message.trim().is_empty() {
        return Err("Message must not be empty".into());
    }

    let state = GatewayState::from_config(&config).await?;
    let transcript = Transcript::default().with(Message::user(message));

    eprint!("  Thinking...");
    let result = bizpilot_gateway::answer(
        &state,
        TenantId::new(tenant),
        user,
        transcript,
        page_hint,
    )
    .await;
    eprint!("\r              \r");
    let result = result?;

    let mut events = SimulatedStream::from_result(result)
        .with_config(&state.stream)
        .emit();
    let mut stdout = std::io::stdout();
    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::ToolStatus(status) => eprintln!("  [{status}]"),
            StreamEvent::TextChunk(chunk) => {
                print!("{chunk}");
                stdout.flush()?;
            }
            StreamEvent::Done => println!(),
        }
    }

    state.audit.flush().await;
    Ok(())
}
