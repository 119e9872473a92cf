use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use lease_rag::api;
use lease_rag::commands::CommandHandler;
use lease_rag::config::AppConfig;
use lease_rag::database::{bootstrap_store, DocumentStore, IngestOptions};
use lease_rag::llm::{Oracle, QueryPipeline};
use lease_rag::providers::gemini::GeminiProvider;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Ask questions about a folder of lease contracts", long_about = None)]
struct Args {
    /// Gemini API key (overrides GEMINI_API_KEY)
    #[arg(short, long)]
    api_key: Option<String>,

    /// Serve the HTTP API instead of the interactive prompt
    #[arg(long)]
    api: bool,

    #[arg(long)]
    port: Option<u16>,

    /// Directory scanned for PDFs (overrides PDF_DIR)
    #[arg(long)]
    pdf_dir: Option<PathBuf>,

    /// Snapshot file (overrides SNAPSHOT_PATH)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Ignore the existing snapshot and rebuild it from the PDF directory
    #[arg(long)]
    reindex: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    colored::control::set_override(true);
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Some(key) = &args.api_key {
        std::env::set_var("GEMINI_API_KEY", key);
    }

    let mut config = AppConfig::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dir) = &args.pdf_dir {
        config.pdf_dir = dir.clone();
    }
    if let Some(snapshot) = &args.snapshot {
        config.snapshot_path = snapshot.clone();
    }

    let provider = GeminiProvider::new(&config.gemini);
    let oracle = Oracle::new(Arc::new(provider));
    log::info!("Using models {}", oracle.model_info());

    let store = bootstrap_store(
        &config.snapshot_path,
        &config.pdf_dir,
        &oracle,
        args.reindex,
        IngestOptions::default(),
    )
    .await?;
    let pipeline = QueryPipeline::new(oracle);

    if args.api {
        run_api_server(&config, pipeline, store).await
    } else {
        run_cli_mode(pipeline, store).await
    }
}

async fn run_cli_mode(pipeline: QueryPipeline, store: DocumentStore) -> Result<()> {
    let mut command_handler = CommandHandler::new(pipeline, store);
    println!("{} documents ready.", command_handler.store().len().to_string().bright_green());
    command_handler.handle_command("help").await.map_err(anyhow::Error::msg)?;

    let mut rl = Editor::<(), DefaultHistory>::new()?;

    loop {
        match rl.readline("👤 ") {
            Ok(line) => {
                let input = line.trim();
                if input == "exit" || input == "quit" {
                    break;
                }
                let _ = rl.add_history_entry(input);

                if let Err(e) = command_handler.handle_command(input).await {
                    println!("{}", e.red());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}

async fn run_api_server(config: &AppConfig, pipeline: QueryPipeline, store: DocumentStore) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = api::create_api(pipeline, Arc::new(RwLock::new(store)));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    log::info!("Server running on http://localhost:{}", config.port);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
