use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use std::path::PathBuf;

use agenthub_rs::agenthub::config::Settings;
use agenthub_rs::agenthub::server::{self, AppState};
use agenthub_rs::agenthub::workflow::models::Models;
use agenthub_rs::agenthub::workflow::types::{Classification, GenerationType, TargetFormat};
use agenthub_rs::agenthub::workflow::WorkflowRequest;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides config and environment)
        #[arg(short, long)]
        port: Option<u16>,

        /// YAML settings file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run a single message through the workflow
    Ask {
        /// The message to send
        #[arg(short, long)]
        message: String,

        /// Skip classification and generate an artifact
        #[arg(short, long, value_enum)]
        generate: Option<Generate>,

        /// Artifact format, e.g. py, ts, md
        #[arg(short, long, requires = "generate")]
        format: Option<String>,

        /// YAML settings file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Generate {
    Code,
    Document,
}

impl From<Generate> for GenerationType {
    fn from(value: Generate) -> Self {
        match value {
            Generate::Code => GenerationType::Code,
            Generate::Document => GenerationType::Document,
        }
    }
}

fn load_settings(config: Option<PathBuf>) -> anyhow::Result<Settings> {
    Settings::load(config.as_deref()).context("failed to load settings")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Serve { port, config } => {
            let mut settings = load_settings(config)?;
            if let Some(port) = port {
                settings.port = port;
            }
            let models = Models::from_settings(&settings).context("failed to create models")?;
            log::info!(
                "Using models: main={}, code={}, document={}",
                settings.main_model.name,
                settings.code_model.name,
                settings.document_model.name
            );
            server::serve(settings, models).await?;
        }
        Commands::Ask {
            message,
            generate,
            format,
            config,
        } => {
            let settings = load_settings(config)?;
            let models = Models::from_settings(&settings).context("failed to create models")?;

            let preset = match generate {
                Some(kind) => {
                    let target = match format.as_deref() {
                        Some(name) => Some(
                            TargetFormat::from_name(name)
                                .with_context(|| format!("unknown format '{}'", name))?,
                        ),
                        None => None,
                    };
                    Some(Classification::generate(kind.into(), target))
                }
                None => None,
            };

            let state = AppState::new(settings, models).await?;
            let request = WorkflowRequest {
                preset,
                ..WorkflowRequest::new(message)
            };
            let outcome = state.workflow.run(request).await?;

            println!("{}", outcome.message);
            if let Some(canvas) = outcome.canvas_content {
                let id = outcome.file_identifier.unwrap_or_default();
                let format = outcome
                    .target_format
                    .map(|f| f.as_str())
                    .unwrap_or_default();
                println!("\n--- {} ({}) ---\n{}", id, format, canvas);
            }
            for err in &outcome.task_status.errors {
                log::warn!("{} failed: {}", err.stage, err.message);
            }
        }
    }

    Ok(())
}
