use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use api::config::LogFormat;
use api::{telemetry, AppConfig, Metrics, QueryService};
use export::SnapshotConfig;
use query::{GeminiClient, GeminiConfig, GraphRagPipeline};

#[derive(Parser)]
#[command(name = "graphrag")]
#[command(about = "Build a chunk/entity knowledge graph over text files and query it")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the graph and print a summary
    Build {
        data_path: PathBuf,

        /// Also write the graph as GraphML
        #[arg(long)]
        export_graphml: Option<PathBuf>,
    },

    /// Answer a question from the corpus
    Query {
        data_path: PathBuf,
        question: String,

        #[arg(long, default_value_t = 3)]
        top_k: usize,

        /// Generate the answer with Gemini instead of the offline summary
        #[arg(long)]
        use_llm: bool,

        /// API key, read from --llm-env-var when omitted
        #[arg(long)]
        llm_api_key: Option<String>,

        #[arg(long)]
        llm_model: Option<String>,

        #[arg(long)]
        llm_temperature: Option<f32>,

        #[arg(long)]
        llm_max_output_tokens: Option<u32>,

        #[arg(long)]
        llm_env_var: Option<String>,
    },

    /// Render part of the graph as Graphviz DOT
    Snapshot {
        data_path: PathBuf,

        #[arg(long, default_value = "graph.dot")]
        output: PathBuf,

        #[arg(long, default_value_t = 200)]
        max_nodes: usize,

        /// Hops around each focus node
        #[arg(long, default_value_t = 2)]
        radius: usize,

        /// Focus the snapshot on the nodes retrieved for this question
        #[arg(long)]
        focus_question: Option<String>,

        #[arg(long, default_value_t = 5)]
        top_k: usize,

        #[arg(long)]
        with_labels: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if cli.json_logs {
        config.logging.format = LogFormat::Json;
    }
    telemetry::init_logging(&config.logging)?;

    match cli.command {
        Command::Build {
            data_path,
            export_graphml,
        } => {
            let pipeline = build_pipeline(&config, data_path).await?;
            println!("{}", pipeline.explain_graph());

            if let Some(path) = export_graphml {
                export::export_graphml(pipeline.graph(), &path)?;
                println!("\nGraphML written to {}", path.display());
            }
        }

        Command::Query {
            data_path,
            question,
            top_k,
            use_llm,
            llm_api_key,
            llm_model,
            llm_temperature,
            llm_max_output_tokens,
            llm_env_var,
        } => {
            if let Some(model) = llm_model {
                config.llm.model = model;
            }
            if let Some(temperature) = llm_temperature {
                config.llm.temperature = temperature;
            }
            if let Some(max_output_tokens) = llm_max_output_tokens {
                config.llm.max_output_tokens = max_output_tokens;
            }
            if let Some(env_var) = llm_env_var {
                config.llm.api_key_env = env_var;
            }

            let llm = if use_llm {
                let client = match llm_api_key {
                    Some(key) => GeminiClient::new(GeminiConfig::new(
                        key,
                        &config.llm.model,
                        config.llm.temperature,
                        config.llm.max_output_tokens,
                    )),
                    None => api::service::llm_client(&config.llm)?,
                };
                Some(client)
            } else {
                None
            };

            let pipeline = build_pipeline(&config, data_path).await?;
            let service = QueryService::new(pipeline, llm, &config, Metrics::new());
            let response = service.answer(&question, top_k, use_llm).await?;
            println!("{}", response);
        }

        Command::Snapshot {
            data_path,
            output,
            max_nodes,
            radius,
            focus_question,
            top_k,
            with_labels,
        } => {
            let pipeline = build_pipeline(&config, data_path).await?;

            let focus = match focus_question {
                Some(question) => {
                    let results = pipeline.retrieve(&question, top_k)?;
                    export::focus_from_results(&results)
                }
                None => Vec::new(),
            };

            let snapshot = SnapshotConfig {
                max_nodes,
                radius,
                with_labels,
            };
            export::write_snapshot(pipeline.graph(), &focus, &snapshot, &output)
                .context("Failed to render graph snapshot")?;
            println!("Graph snapshot written to {}", output.display());
        }
    }

    Ok(())
}

async fn build_pipeline(config: &AppConfig, data_path: PathBuf) -> Result<GraphRagPipeline> {
    GraphRagPipeline::from_path(&data_path, &config.pipeline_config())
        .await
        .context(format!("Failed to build graph from {:?}", data_path))
}
