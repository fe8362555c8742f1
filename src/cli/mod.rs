pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "kanban")]
#[command(about = "Kanban CLI - maintenance commands for the Kanban API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations (uses DATABASE_URL)")]
    Migrate,

    #[command(about = "Recurring board maintenance")]
    Recurring {
        #[command(subcommand)]
        cmd: commands::recurring::RecurringCommands,
    },

    #[command(about = "Inspect a running server")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Recurring { cmd } => commands::recurring::handle(cmd, output_format).await,
        Commands::Server { cmd } => commands::server::handle(cmd, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_json_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["kanban", "recurring", "run", "--json"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Recurring { .. }));
    }

    #[test]
    fn server_health_takes_optional_url() {
        let cli = Cli::try_parse_from(["kanban", "server", "health", "--url", "http://localhost:4000"]).unwrap();
        match cli.command {
            Commands::Server {
                cmd: commands::server::ServerCommands::Health { url },
            } => assert_eq!(url, "http://localhost:4000"),
            _ => panic!("expected server health"),
        }
    }

    #[test]
    fn rejects_unknown_commands() {
        assert!(Cli::try_parse_from(["kanban", "boards", "list"]).is_err());
    }
}
