#![forbid(unsafe_code)]

//! Operator CLI for the `agent-hub` HTTP API.
//!
//! Talks to the hub's synchronous HTTP surface: list connected agents and
//! their pending tasks, submit a task, or probe health.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

#[derive(Debug, Parser)]
#[command(
    name = "agent-hub-ctl",
    about = "Operator CLI for agent-hub",
    version,
    long_about = None
)]
struct Cli {
    /// Base URL of the hub's HTTP listener.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show connected agents, pending and abandoned tasks.
    Agents,

    /// Route a task to a connected agent.
    Submit {
        /// Target agent id.
        target_agent: String,
        /// JSON object merged into the task payload.
        #[arg(long, default_value = "{}")]
        payload: String,
    },

    /// Check that the hub is up.
    Health,
}

fn main() -> ExitCode {
    let args = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&args)) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Cli) -> Result<String, String> {
    let base = args.url.trim_end_matches('/');
    let client = reqwest::Client::new();

    let response = match &args.command {
        Command::Agents => client.get(format!("{base}/api/agents")).send().await,
        Command::Submit {
            target_agent,
            payload,
        } => {
            let body = build_submission(target_agent, payload)?;
            client
                .post(format!("{base}/api/tasks"))
                .json(&body)
                .send()
                .await
        }
        Command::Health => client.get(format!("{base}/health")).send().await,
    }
    .map_err(|err| format!("request failed: {err}"))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|err| format!("failed to read response: {err}"))?;

    let pretty = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or(text);

    if status.is_success() {
        Ok(pretty)
    } else {
        Err(format!("{status}: {pretty}"))
    }
}

/// Merge `target_agent` into the user-supplied payload object.
fn build_submission(target_agent: &str, payload: &str) -> Result<Value, String> {
    let mut body: Map<String, Value> = serde_json::from_str(payload)
        .map_err(|err| format!("--payload must be a JSON object: {err}"))?;
    body.insert("target_agent".into(), Value::String(target_agent.to_owned()));
    Ok(Value::Object(body))
}
