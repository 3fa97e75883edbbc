//! Command handlers for the `tasklink` binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::client::{AgentClient, AgentProtocol, TaskReply, TaskRequest};
use crate::config::ClientConfig;
use crate::conversation::{Coordinator, OutgoingMessage};
use crate::store::{
    default_dir, export_agents, import_agents, AgentDirectory, FileAgentDirectory,
    FileSettingsStore,
};
use crate::types::{AgentEndpoint, CapabilityCard, FileAttachment, TaskState};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// File-backed stores rooted at one data directory.
pub struct Stores {
    pub agents: FileAgentDirectory,
    pub settings: FileSettingsStore,
}

impl Stores {
    pub fn open(data_dir: Option<&Path>) -> Self {
        let dir = data_dir.map(Path::to_path_buf).unwrap_or_else(default_dir);
        Self {
            agents: FileAgentDirectory::new(dir.join("agents.json")),
            settings: FileSettingsStore::new(dir.join("settings.toml")),
        }
    }
}

/// Read a file for attachment, guessing its mime type from the extension.
pub async fn read_attachment(path: &Path) -> Result<FileAttachment, Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime = mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string());
    Ok(FileAttachment::from_bytes(name, mime, &bytes))
}

fn client(url: &str, config: &Arc<ClientConfig>) -> AgentClient {
    AgentClient::new(url, config.clone())
}

/// Handle `tasklink card <url>`.
pub async fn handle_card(url: &str, config: Arc<ClientConfig>) -> CliResult {
    let card = client(url, &config).fetch_capability_card().await?;
    println!("{}", serde_json::to_string_pretty(&card)?);
    Ok(())
}

/// Handle `tasklink send`.
pub async fn handle_send(args: super::SendArgs, config: Arc<ClientConfig>) -> CliResult {
    let client = client(&args.url, &config);
    let file = match &args.file {
        Some(path) => Some(read_attachment(path).await?),
        None => None,
    };
    let request = TaskRequest::builder()
        .text(args.text)
        .maybe_file(file)
        .maybe_session_id(args.session)
        .maybe_task_id(args.task)
        .build();

    let reply = if args.stream {
        let mut last_state = None;
        let mut on_chunk = |value: &Value| {
            let state = crate::normalize::normalize(value).state;
            if let Some(current) = state.filter(|_| state != last_state) {
                eprintln!("[{current}]");
                last_state = state;
            }
        };
        client.send_task_streaming(request, &mut on_chunk).await?
    } else {
        client.send_task(request).await?
    };
    print_reply(&reply, args.raw)
}

fn print_reply(reply: &TaskReply, raw: bool) -> CliResult {
    if raw {
        println!("{}", serde_json::to_string_pretty(&reply.body)?);
        return Ok(());
    }
    let response = reply.normalize();
    println!("{}", response.content);
    eprintln!(
        "task {} session {} state {}",
        reply.server_task_id().unwrap_or(&reply.task_id),
        reply.session_id,
        response.state.unwrap_or(TaskState::Unknown)
    );
    Ok(())
}

/// Handle `tasklink get <url> <task-id>`.
pub async fn handle_get(args: super::GetArgs, config: Arc<ClientConfig>) -> CliResult {
    let body = client(&args.url, &config).get_task(&args.task_id).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

/// Handle `tasklink agents ...`.
pub async fn handle_agents(
    command: super::AgentsCommands,
    stores: &Stores,
    config: Arc<ClientConfig>,
) -> CliResult {
    use super::AgentsCommands;

    let directory = &stores.agents;
    match command {
        AgentsCommands::List => {
            for agent in directory.load()? {
                let streaming = if agent.streaming { "streaming" } else { "" };
                println!("{}\t{}\t{}\t{}", agent.id, agent.name, agent.url, streaming);
            }
        }
        AgentsCommands::Add { url } => {
            let card = client(&url, &config).fetch_capability_card().await?;
            let endpoint = AgentEndpoint::from_card(url, card)?;
            let mut agents = directory.load()?;
            println!("added {} ({})", endpoint.name, endpoint.id);
            agents.push(endpoint);
            directory.save(&agents)?;
        }
        AgentsCommands::Remove { id } => {
            let mut agents = directory.load()?;
            let before = agents.len();
            agents.retain(|agent| agent.id != id);
            if agents.len() == before {
                return Err(format!("no agent with id {id}").into());
            }
            directory.save(&agents)?;
        }
        AgentsCommands::Import { file } => {
            let raw = tokio::fs::read_to_string(&file).await?;
            let agents = import_agents(&raw)?;
            directory.save(&agents)?;
            println!("imported {} agent(s)", agents.len());
        }
        AgentsCommands::Export => {
            println!("{}", export_agents(&directory.load()?)?);
        }
    }
    Ok(())
}

/// Endpoint for `chat`; a missing or unusable card falls back to a plain one.
fn chat_endpoint(url: &str, card: crate::error::Result<CapabilityCard>) -> AgentEndpoint {
    match card.and_then(|card| AgentEndpoint::from_card(url, card)) {
        Ok(endpoint) => endpoint,
        Err(err) => {
            eprintln!("could not use capability card ({err}), continuing without it");
            AgentEndpoint::new("chat", url, false)
        }
    }
}

/// Handle `tasklink chat <url>`: one line per message, `/reset` starts over,
/// `/file <path>` attaches a file to the next message.
pub async fn handle_chat(args: super::ChatArgs, config: Arc<ClientConfig>) -> CliResult {
    let card = client(&args.url, &config).fetch_capability_card().await;
    let mut endpoint = chat_endpoint(&args.url, card);
    if args.no_stream {
        endpoint.streaming = false;
    }
    let agent_id = endpoint.id.clone();
    eprintln!(
        "connected to {} (streaming {})",
        if endpoint.name.is_empty() { &endpoint.url } else { &endpoint.name },
        endpoint.streaming
    );

    let coordinator = Coordinator::new(config);
    coordinator.add_agent(endpoint);
    coordinator.select_agent(&agent_id)?;

    let mut attachment: Option<PathBuf> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/reset" {
            let session = coordinator.reset_conversation(&agent_id)?;
            eprintln!("new session {session}");
            continue;
        }
        if let Some(path) = line.strip_prefix("/file ") {
            attachment = Some(PathBuf::from(path.trim()));
            continue;
        }

        let mut message = OutgoingMessage::text(line);
        if let Some(path) = attachment.take() {
            message = message.with_file(read_attachment(&path).await?);
        }
        let record = coordinator
            .send_message_with(&agent_id, message, |record| {
                if record.pending {
                    if let Some(state) = record.state {
                        eprintln!("[{state}]");
                    }
                }
            })
            .await?;
        println!("{}", record.content);
        if record.state == Some(TaskState::InputRequired) {
            eprintln!("(agent is waiting for more input on this task)");
        }
    }
    Ok(())
}
