//! pdfchat entrypoint.
//!
//! Runs the HTTP server by default. `ingest` and `ask` run a single pipeline invocation against
//! the configured providers without starting the server.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdfchat::{
    api, config, logging,
    processing::{Answer, RagApi, RagService, UploadedDocument},
};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "pdfchat",
    version,
    about = "Index PDFs into a vector store and answer questions about them"
)]
struct Cli {
    /// Listening port; overrides `SERVER_PORT`.
    #[arg(long, global = true)]
    port: Option<u16>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default).
    Serve,
    /// Ingest a PDF file into the vector store.
    Ingest {
        /// Path to the PDF.
        path: PathBuf,
    },
    /// Answer a question from the indexed documents.
    Ask {
        /// Question text.
        question: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    logging::init_tracing();
    let config = config::init_config().context("failed to load configuration")?;

    let service = RagService::from_config(&config).context("failed to initialize providers")?;
    service
        .ensure_ready()
        .await
        .context("vector store is not ready")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let port = cli.port.unwrap_or(config.server_port);
            let app = api::create_router(Arc::new(service), config.unsupported_content_type);
            let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
                .await
                .with_context(|| format!("failed to bind port {port}"))?;
            tracing::info!("Listening on http://0.0.0.0:{}", port);
            axum::serve(listener, app)
                .await
                .context("HTTP server terminated unexpectedly")?;
        }
        Command::Ingest { path } => {
            let outcome = service
                .ingest_pdf(&UploadedDocument::new(path, None))
                .await
                .context("ingestion failed")?;
            println!(
                "Indexed {} chunks from {} pages",
                outcome.chunks_indexed, outcome.pages
            );
        }
        Command::Ask { question } => {
            match service.answer(&question).await.context("question failed")? {
                Answer::Generated(text) => println!("{text}"),
                Answer::Matches(matches) => {
                    println!("{}", serde_json::to_string_pretty(&matches)?);
                }
            }
        }
    }

    Ok(())
}
