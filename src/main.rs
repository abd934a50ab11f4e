use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::io::{self, BufRead, Write};
use tracing::{info, warn};

use parley::agent::ChatOrchestrator;
use parley::config::Config;
use parley::models::{ProviderKind, TurnResult};
use parley::tools::{KnowledgeTool, Tool};

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Multi-provider chat orchestration with long-term memory")]
struct Args {
    #[arg(short, long, help = "Message for the model (use /clear to wipe history)")]
    prompt: Option<String>,

    #[arg(long, value_enum, help = "Force a provider instead of the configured priority")]
    provider: Option<ProviderKind>,

    #[arg(short, long, help = "Verbose diagnostics on stderr")]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Long-term memory management
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },
}

#[derive(Subcommand)]
enum MemoryCommands {
    /// Store a fact in the vector index
    Add {
        text: String,
        #[arg(long)]
        source: Option<String>,
    },
    /// Remove a stored fact by id
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Print every stored fact
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();

    // Diagnostics go to stderr; stdout carries only the JSON payload.
    let subscriber = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => return exit_with_error(format!("invalid configuration: {}", e)),
    };

    if let Some(Commands::Memory { command }) = args.command {
        return run_memory_command(&config, command).await;
    }

    if !config.any_credentials() {
        warn!("No OPENAI_API_KEY, ANTHROPIC_API_KEY or GOOGLE_API_KEY set");
    }

    let orchestrator = match ChatOrchestrator::new(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => return exit_with_error(e.to_string()),
    };

    match args.prompt {
        Some(prompt) => run_single_turn(&orchestrator, &prompt, args.provider).await,
        None => run_interactive_mode(&orchestrator, args.provider).await,
    }
}

/// Prints the `{error}` payload and exits non-zero.
fn exit_with_error(error: String) -> Result<()> {
    println!("{}", serde_json::to_string(&TurnResult::Failure { error })?);
    std::process::exit(1);
}

async fn run_single_turn(
    orchestrator: &ChatOrchestrator,
    prompt: &str,
    provider: Option<ProviderKind>,
) -> Result<()> {
    let result = orchestrator.respond(prompt, provider).await;
    println!("{}", serde_json::to_string(&result)?);

    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_interactive_mode(
    orchestrator: &ChatOrchestrator,
    provider: Option<ProviderKind>,
) -> Result<()> {
    info!("Interactive mode: type /exit to quit, /clear to forget the conversation");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("/exit") {
            break;
        }

        match orchestrator.respond(line, provider).await {
            TurnResult::Success { content } => println!("{}\n", content),
            TurnResult::Failure { error } => println!("❌ {}\n", error),
        }
    }

    Ok(())
}

async fn run_memory_command(config: &Config, command: MemoryCommands) -> Result<()> {
    let tool = KnowledgeTool::new(&config.storage);

    let (function, args) = match command {
        MemoryCommands::Add { text, source } => {
            ("add_memory", json!({ "content": text, "source": source }))
        }
        MemoryCommands::Delete { id } => ("delete_memory", json!({ "id": id })),
        MemoryCommands::List => ("list_memories", json!({})),
    };

    let result = match tool.execute(function, args).await {
        Ok(result) => result,
        Err(e) => parley::tools::ToolResult::failed(e.to_string()),
    };
    println!("{}", serde_json::to_string(&result.to_payload())?);

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
