use clap::Subcommand;
use serde_json::Value;
use std::time::Duration;

use crate::cli::utils::{output_error, output_fields, output_success};
use crate::cli::OutputFormat;

const DEFAULT_URL: &str = "http://localhost:3000";

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Check server health from the /health endpoint")]
    Health {
        #[arg(long, default_value = DEFAULT_URL, help = "Server base URL")]
        url: String,
    },

    #[command(about = "Show server information from the API root endpoint")]
    Info {
        #[arg(long, default_value = DEFAULT_URL, help = "Server base URL")]
        url: String,
    },
}

async fn fetch(base: &str, path: &str) -> anyhow::Result<(reqwest::StatusCode, Value)> {
    let url = format!("{}{}", base.trim_end_matches('/'), path);
    let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
    let response = client.get(&url).send().await?;
    let status = response.status();
    let body = response.json::<Value>().await?;
    Ok((status, body))
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Health { url } => {
            let (status, body) = fetch(&url, "/health").await?;
            if status.is_success() {
                output_success(&output_format, &format!("{} is healthy", url), body.get("data").cloned())?;
                Ok(())
            } else {
                output_error(
                    &output_format,
                    &format!("{} is degraded ({})", url, status.as_u16()),
                    body.get("code").and_then(Value::as_str),
                )?;
                anyhow::bail!("server health check failed")
            }
        }
        ServerCommands::Info { url } => {
            let (_, body) = fetch(&url, "/").await?;
            let data = body.get("data").cloned().unwrap_or(Value::Null);
            output_success(&output_format, &format!("Server info for {}", url), Some(data.clone()))?;
            if matches!(output_format, OutputFormat::Text) {
                output_fields(&data);
            }
            Ok(())
        }
    }
}
