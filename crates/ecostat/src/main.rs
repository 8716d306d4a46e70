use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use ecostat::catalog::{load_catalog, KeywordCatalog};
use ecostat::config::{load_config, Config};
use ecostat::ecos::{EcosClient, EcosSettings};
use ecostat::logging;
use ecostat::oracle::{
    AnswerGenerator, ChatOracle, ChatSettings, RuleOracle, SelectionOracle,
};
use ecostat::pipeline::{
    BroadcastProgress, NoopProgress, Pipeline, PipelineConfig, RunReport, Termination,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OracleKind {
    /// OpenAI-compatible chat model
    Chat,
    /// Offline keyword rules
    Rules,
}

/// Answer a question about Korean economic statistics.
#[derive(Debug, Parser)]
#[command(name = "ecostat", version)]
struct Cli {
    /// Path to a JSON config file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OracleKind::Chat)]
    oracle: OracleKind,

    /// Print the full run report as JSON
    #[arg(long)]
    json: bool,

    /// Stream run events as JSON lines on stderr
    #[arg(long)]
    events: bool,

    #[arg(required = true)]
    query: Vec<String>,
}

fn build_pipeline(config: &Config, oracle: OracleKind) -> anyhow::Result<Pipeline> {
    let pipeline_config = Arc::new(PipelineConfig::from_config(config));

    let statistics = load_catalog(&config.catalog.path)
        .with_context(|| format!("failed to load catalog from {}", config.catalog.path))?;
    let catalog = Arc::new(KeywordCatalog::new(statistics));

    let data = Arc::new(EcosClient::new(EcosSettings {
        base_url: config.ecos.base_url.clone(),
        api_key: config.ecos.key_source().resolve("ecos")?,
        language: config.ecos.language.clone(),
        max_rows: config.ecos.max_rows,
        timeout: pipeline_config.call_timeout,
    })?);

    let (selector, generator) = match oracle {
        OracleKind::Chat => {
            let chat = Arc::new(ChatOracle::new(ChatSettings {
                base_url: config.llm.base_url.clone(),
                model: config.llm.model.clone(),
                api_key: config.llm.key_source().resolve("llm")?,
                temperature: config.llm.temperature,
                timeout: pipeline_config.call_timeout,
            })?);
            (
                chat.clone() as Arc<dyn SelectionOracle>,
                chat as Arc<dyn AnswerGenerator>,
            )
        }
        OracleKind::Rules => {
            let rules = Arc::new(RuleOracle::new(config.pipeline.recent_years));
            (
                rules.clone() as Arc<dyn SelectionOracle>,
                rules as Arc<dyn AnswerGenerator>,
            )
        }
    };

    Ok(Pipeline::new(
        pipeline_config,
        catalog,
        selector,
        data,
        generator,
    ))
}

async fn run_with_events(pipeline: &Pipeline, run_id: &str, query: &str) -> RunReport {
    let (tx, mut rx) = broadcast::channel(64);
    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => eprintln!("{}", line),
                    Err(e) => warn!("Failed to serialize run event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let progress = BroadcastProgress::new(run_id, Arc::new(tx));
    let report = pipeline.run_with_id(run_id, query, &progress).await;
    drop(progress);

    if let Err(e) = printer.await {
        warn!("Event printer stopped abnormally: {}", e);
    }
    report
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    logging::init(&config.logging)?;
    info!("Starting ecostat v{}", env!("CARGO_PKG_VERSION"));

    let pipeline = build_pipeline(&config, cli.oracle)?;
    let query = cli.query.join(" ");
    let run_id = uuid::Uuid::new_v4().to_string();

    let report = if cli.events {
        run_with_events(&pipeline, &run_id, &query).await
    } else {
        pipeline.run_with_id(&run_id, &query, &NoopProgress).await
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    match &report.termination {
        Termination::Answered => {
            if !cli.json {
                println!("{}", report.answer().unwrap_or_default());
            }
            Ok(())
        }
        Termination::Terminated { stage, error } => {
            bail!("no answer: run terminated at {}: {}", stage, error)
        }
    }
}
