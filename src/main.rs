//! The `sage` binary: wires configuration, tools and agents together and
//! drives one research run per invocation.

use anyhow::Context as _;
use sage::agents::Orchestrator;
use sage::analysis::AnalysisPipeline;
use sage::cli::output::Output;
use sage::cli::{Cli, Commands, MemoryCommands};
use sage::llm::GeminiClient;
use sage::memory::{ContextManager, MemoryStore};
use sage::search::SearchCoordinator;
use sage::tools::memory::{MemoryRecallTool, MemoryStoreTool};
use sage::tools::papers::PaperSearchTool;
use sage::tools::report::ReportWriterTool;
use sage::tools::search::WebSearchTool;
use sage::tools::ToolGateway;
use sage::types::{Importance, Query};
use sage::utils::config::Config;
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let default_filter = if cli.verbose { "sage=debug" } else { "sage=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let out = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let config = Config::from_env().context("failed to load configuration")?;

    let memory = match &config.memory.path {
        Some(path) => Arc::new(
            MemoryStore::with_persistence(path.clone())
                .context("failed to open memory snapshot")?,
        ),
        None => Arc::new(MemoryStore::new()),
    };

    match cli.command {
        Commands::Research {
            query,
            max_results,
            report,
        } => {
            run_research(&config, memory, &out, query, max_results, report).await
        }
        Commands::Memory(cmd) => run_memory(memory, &out, cmd),
    }
}

async fn run_research(
    config: &Config,
    memory: Arc<MemoryStore>,
    out: &Output,
    query: String,
    max_results: usize,
    report: bool,
) -> anyhow::Result<()> {
    let api_key = config
        .llm
        .api_key
        .clone()
        .context("GOOGLE_API_KEY is not set")?;

    out.banner();

    let mut gateway = ToolGateway::new();
    gateway.register(Arc::new(PaperSearchTool::new()));
    if let Ok(serper_key) = std::env::var("SERPER_API_KEY") {
        gateway.register(Arc::new(WebSearchTool::new(serper_key)));
    } else {
        out.info("SERPER_API_KEY not set; web search disabled");
    }
    gateway.register(Arc::new(MemoryStoreTool::new(memory.clone())));
    gateway.register(Arc::new(MemoryRecallTool::new(memory.clone())));
    gateway.register(Arc::new(ReportWriterTool::new(
        config.report.output_dir.clone(),
    )));
    let gateway = Arc::new(gateway);

    // Only fan out to sources that actually resolved to a registered tool.
    let sources: Vec<String> = config
        .search
        .sources
        .iter()
        .filter(|s| gateway.has_capability(s))
        .cloned()
        .collect();
    anyhow::ensure!(!sources.is_empty(), "no search sources are available");

    let llm: Arc<GeminiClient> = Arc::new(GeminiClient::new(
        api_key,
        config.llm.base_url.clone(),
        config.llm.model.clone(),
    ));

    let coordinator =
        SearchCoordinator::new(gateway.clone(), sources, config.search.per_source_timeout());
    let pipeline = AnalysisPipeline::new(
        llm.clone(),
        config.analysis.top_k,
        config.analysis.synthesis_limit,
        config.analysis.max_retries,
        config.analysis.stage_timeout(),
    );
    let context = ContextManager::new(
        config.context.compaction_threshold_tokens,
        config.context.preserve_recent_turns,
    );

    let mut orchestrator = Orchestrator::new(
        llm,
        gateway.clone(),
        coordinator,
        pipeline,
        context,
        memory,
    );

    out.info(&format!("Researching: {}", query));
    let outcome = orchestrator
        .run(Query::new(query, max_results.max(1)))
        .await;
    out.run_outcome(&outcome);

    if report {
        if let Some(synthesis) = &outcome.synthesis {
            let destination = format!(
                "{}.md",
                sage::types::normalize_title(&outcome.query).replace(' ', "_")
            );
            let invocation = gateway
                .invoke(
                    "report_write",
                    json!({"destination": destination, "body": synthesis.body}),
                )
                .await;
            match invocation.payload {
                Some(payload) if invocation.is_ok() => {
                    out.success(&format!(
                        "Report written to {}",
                        payload["path"].as_str().unwrap_or(&destination)
                    ));
                }
                _ => out.error(&format!(
                    "Report export failed: {}",
                    invocation.error.as_deref().unwrap_or("unknown error")
                )),
            }
        } else {
            out.warning("No synthesis produced; skipping report export");
        }
    }

    Ok(())
}

fn run_memory(memory: Arc<MemoryStore>, out: &Output, cmd: MemoryCommands) -> anyhow::Result<()> {
    match cmd {
        MemoryCommands::List => {
            let mut records = memory.records_at_least(Importance::Low);
            records.sort_by(|a, b| a.key.cmp(&b.key));
            if records.is_empty() {
                out.info("Memory is empty");
            }
            for record in records {
                out.info(&format!(
                    "{} ({:?}, {})",
                    record.key,
                    record.importance,
                    record.timestamp.format("%Y-%m-%d %H:%M")
                ));
            }
        }
        MemoryCommands::Show { key } => match memory.recall(&key) {
            Some(record) => {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            None => out.error(&format!("No record under key '{}'", key)),
        },
    }
    Ok(())
}
