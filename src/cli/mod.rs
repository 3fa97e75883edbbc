//! CLI entry point for tasklink.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Talk to agents over the JSON-RPC task protocol.
#[derive(Parser, Debug)]
#[command(name = "tasklink", version, about = "Agent task protocol client")]
pub struct Cli {
    /// Directory holding agents.json and settings.toml (default ~/.tasklink)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and print an agent's capability card
    Card(CardArgs),
    /// Send one message as a task
    Send(SendArgs),
    /// Fetch the current state of a task
    Get(GetArgs),
    /// Manage saved agents
    Agents(AgentsArgs),
    /// Interactive conversation with an agent
    Chat(ChatArgs),
}

#[derive(Args, Debug)]
pub struct CardArgs {
    pub url: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    pub url: String,
    pub text: String,

    /// Request a streamed reply
    #[arg(long)]
    pub stream: bool,

    /// Attach a file
    #[arg(long)]
    pub file: Option<PathBuf>,

    #[arg(long)]
    pub session: Option<String>,

    /// Continue an existing task
    #[arg(long)]
    pub task: Option<String>,

    /// Print the raw server payload instead of the extracted text
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    pub url: String,
    pub task_id: String,
}

#[derive(Args, Debug)]
pub struct AgentsArgs {
    #[command(subcommand)]
    pub command: AgentsCommands,
}

#[derive(Subcommand, Debug)]
pub enum AgentsCommands {
    /// List saved agents
    List,
    /// Add an agent by fetching its capability card
    Add { url: String },
    /// Remove a saved agent
    Remove { id: String },
    /// Replace saved agents with the contents of a JSON export
    Import { file: PathBuf },
    /// Print saved agents as JSON
    Export,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    pub url: String,

    /// Never stream, even if the agent supports it
    #[arg(long)]
    pub no_stream: bool,
}
