//! Command-line front end: mint, inspect and talk to `did:self` agents.

use clap::{Parser, Subcommand};
use did_connect::keys::{Identity, KeyStore};
use did_connect::{
    did, AgentClient, AssistantClient, AssistantConfig, ChatMessage, ClientConfig,
};
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_API_BASE_URL: &str = "https://anptest.vercel.app";

#[derive(Parser)]
#[command(name = "did-connect")]
#[command(about = "Connect to agents addressed by self-describing did:self identifiers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new identity and save its keys
    Generate {
        #[arg(long, default_value = "User")]
        name: String,
        /// Endpoint embedded in the identifier [default: $API_BASE_URL/api/message]
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long, env = "DID_CONNECT_KEYS_DIR", default_value = "keys")]
        keys_dir: PathBuf,
    },
    /// Show the agent described by an identifier
    Inspect { did: String },
    /// Check whether an identifier is well formed
    Validate { did: String },
    /// Chat with an agent interactively
    Chat {
        did: String,
        /// Identifier to send as the sender
        #[arg(long, default_value = "")]
        sender: String,
        /// Retries after a transient failure
        #[arg(long, default_value_t = did_connect::MAX_RETRIES)]
        max_retries: u32,
    },
    /// Ask the chat-completion assistant a single question
    Ask { message: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("did_connect=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Generate {
            name,
            endpoint,
            keys_dir,
        } => {
            let endpoint = endpoint.unwrap_or_else(default_endpoint);
            let identity = Identity::generate(&name, &endpoint)?;
            let path = KeyStore::new(keys_dir).save(&identity)?;

            println!("{}", identity.did);
            eprintln!("Public key: {}", identity.public_key);
            eprintln!("Keys saved to {}", path.display());
        }
        Command::Inspect { did } => {
            let decoded = did::decode(&did)?;
            let info = did_connect::AgentInfo::from(&decoded);

            println!("Name:      {}", info.name);
            println!("Type:      {}", info.agent_type);
            println!("Created:   {}", info.created.as_deref().unwrap_or("-"));
            println!("Version:   {}", info.version);
            println!("Endpoint:  {}", info.endpoint);
            println!("Algorithm: {}", decoded.algorithm);
        }
        Command::Validate { did } => {
            let valid = did::is_valid(&did);
            println!("{}", serde_json::json!({ "valid": valid }));
            if !valid {
                std::process::exit(1);
            }
        }
        Command::Chat {
            did,
            sender,
            max_retries,
        } => chat(&did, &sender, max_retries).await?,
        Command::Ask { message } => {
            let assistant = AssistantClient::new(AssistantConfig::from_env())?;
            println!("{}", assistant.reply(&message, &[]).await);
        }
    }

    Ok(())
}

fn default_endpoint() -> String {
    let base = std::env::var("API_BASE_URL")
        .ok()
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    format!("{}/api/message", base.trim_end_matches('/'))
}

async fn chat(did: &str, sender: &str, max_retries: u32) -> Result<(), Box<dyn Error>> {
    use dialoguer::Input;

    let info = did::agent_info_of(did).ok_or("could not parse identifier")?;
    println!("Connected to {} ({})", info.name, info.agent_type);
    println!("Endpoint: {}", info.endpoint);
    println!("Type \"exit\" to quit.\n");

    let client = AgentClient::new(ClientConfig {
        max_retries,
        ..ClientConfig::default()
    })?;
    let mut history: Vec<ChatMessage> = Vec::new();

    loop {
        let message: String = Input::new().with_prompt("you").interact_text()?;
        if message.trim().eq_ignore_ascii_case("exit") {
            println!("Bye!");
            break;
        }

        match client.send_with(did, &message, sender, &history).await {
            Ok(reply) => {
                let text = reply.response().unwrap_or_default().to_string();
                println!("{}: {}\n", info.name, text);
                history.push(ChatMessage::user(message));
                history.push(ChatMessage::assistant(text));
            }
            Err(err) => eprintln!("Error: {err}\n"),
        }
    }

    Ok(())
}
