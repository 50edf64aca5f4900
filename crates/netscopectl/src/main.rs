//! Netscope Control - CLI client for the netscope daemon.

mod client;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use client::DaemonClient;

#[derive(Parser)]
#[command(name = "netscopectl")]
#[command(about = "Netscope - cloud network troubleshooting assistant", long_about = None)]
#[command(version)]
struct Cli {
    /// Daemon URL (defaults to $NETSCOPED_URL or http://127.0.0.1:7411)
    #[arg(long, global = true)]
    daemon: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe a connectivity problem and follow the diagnosis
    Ask {
        /// The problem, in plain words
        prompt: Vec<String>,

        /// Root project for scope discovery
        #[arg(long)]
        project: Option<String>,

        /// Continue an existing session (required to confirm a fix)
        #[arg(long)]
        session: Option<Uuid>,
    },

    /// Show daemon health
    Health,

    /// Show a session's state and evidence trail
    Session {
        /// Session id
        id: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = DaemonClient::discover(cli.daemon.as_deref())?;

    match cli.command {
        Commands::Ask { prompt, project, session } => {
            let prompt = prompt.join(" ");
            if prompt.trim().is_empty() {
                anyhow::bail!("Nothing to ask. Example: netscopectl ask \"VMs in proj-a cannot reach 10.0.0.2:443\"");
            }
            let response = client.troubleshoot(&prompt, project, session).await?;
            output::print_troubleshoot(&response);
        }
        Commands::Health => {
            let health = client.health().await?;
            output::print_health(&health);
        }
        Commands::Session { id } => {
            let session = client.session(id).await?;
            output::print_session(&session);
        }
    }

    Ok(())
}
