//! Resonance CLI
//!
//! The `resonance` command inspects and drives one owner's knowledge-resonance
//! graph against the configured SurrealDB backend.
//!
//! ## Commands
//!
//! - `seed`: Insert or replace a memory fragment
//! - `event`: Apply a domain event and persist the result
//! - `render`: Print the prompt projection of the graph
//! - `summary`: Print per-type counts and average charges
//! - `top`: List the highest-charged nodes of one type
//! - `neighbors`: List a node's neighbours by resonance

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use resonance_core::{
    render_with, NodeKey, RenderOptions, ResonanceCache, ResonanceConfig,
};
use resonance_state::{MemoryCategory, MemoryFragment, NodeType, OwnerKey, SurrealResonanceStore};
use serde_json::Value;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "resonance")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Knowledge-resonance graph for agent memory", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// User that owns the graph
    #[arg(long, global = true, env = "RESONANCE_USER", default_value = "default")]
    user: String,

    /// Firm that owns the graph
    #[arg(long, global = true, env = "RESONANCE_FIRM", default_value = "default")]
    firm: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert or replace a memory fragment
    Seed {
        /// Category (identity_dimensions, exemplars, corrections, ...)
        category: MemoryCategory,

        /// Fragment reference, unique within the category
        reference: String,

        /// Confidence or strength in [0, 1]
        #[arg(short, long, default_value = "0.5")]
        strength: f64,

        /// Human-readable text
        #[arg(short, long, default_value = "")]
        content: String,

        /// Comma-separated concepts (associations)
        #[arg(long, value_delimiter = ',')]
        concepts: Vec<String>,

        /// Store the fragment as inactive
        #[arg(long)]
        inactive: bool,
    },

    /// Apply a domain event and persist the changed charges
    Event {
        /// approved, rejected, document_edited, task_complete or feedback
        event_type: String,

        /// JSON payload, e.g. '{"work_type": "research", "score": 80}'
        #[arg(short, long, conflicts_with = "payload_file")]
        payload: Option<String>,

        /// Read the JSON payload from a file
        #[arg(long)]
        payload_file: Option<PathBuf>,
    },

    /// Print the prompt projection of the graph
    Render {
        /// Character budget (default: RESONANCE_RENDER_MAX_CHARS or 2000)
        #[arg(short, long)]
        max_chars: Option<usize>,
    },

    /// Print per-type counts, average charges and edge totals
    Summary,

    /// List the highest-charged nodes of one type
    Top {
        node_type: NodeType,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// List a node's neighbours ranked by resonance
    Neighbors {
        /// Node as `node_type:reference`, e.g. `correction:pinpoint`
        node: NodeKey,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    resonance_core::telemetry::init_tracing(cli.json, level);

    let store = SurrealResonanceStore::from_env()
        .await
        .context("Failed to connect to resonance database")?;
    let config = ResonanceConfig::from_env();
    let owner = OwnerKey::new(cli.user, cli.firm);

    let output = run(cli.command, &store, &config, &owner).await?;
    if !output.is_empty() {
        println!("{}", output);
    }
    resonance_core::metrics::METRICS.flush();
    Ok(())
}

async fn run(
    command: Commands,
    store: &SurrealResonanceStore,
    config: &ResonanceConfig,
    owner: &OwnerKey,
) -> Result<String> {
    match command {
        Commands::Seed {
            category,
            reference,
            strength,
            content,
            concepts,
            inactive,
        } => {
            let mut fragment = MemoryFragment::new(reference, strength)
                .with_content(content)
                .with_concepts(concepts);
            if inactive {
                fragment = fragment.inactive();
            }
            cmd_seed(store, owner, category, fragment).await
        }
        Commands::Event {
            event_type,
            payload,
            payload_file,
        } => {
            let payload = read_payload(payload.as_deref(), payload_file.as_deref())?;
            cmd_event(store, config, owner, &event_type, payload).await
        }
        Commands::Render { max_chars } => cmd_render(store, config, owner, max_chars).await,
        Commands::Summary => cmd_summary(store, config, owner).await,
        Commands::Top { node_type, limit } => {
            cmd_top(store, config, owner, node_type, limit).await
        }
        Commands::Neighbors { node } => cmd_neighbors(store, config, owner, &node).await,
    }
}

fn cache_for(store: &SurrealResonanceStore, config: &ResonanceConfig) -> ResonanceCache {
    let store = Arc::new(store.clone());
    ResonanceCache::new(store.clone(), store, config)
}

fn read_payload(inline: Option<&str>, file: Option<&Path>) -> Result<Value> {
    let raw = match (inline, file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .context(format!("Failed to read payload file {:?}", path))?,
        (None, None) => return Ok(Value::Null),
    };
    serde_json::from_str(&raw).context("Payload is not valid JSON")
}

/// Insert or replace one fragment
async fn cmd_seed(
    store: &SurrealResonanceStore,
    owner: &OwnerKey,
    category: MemoryCategory,
    fragment: MemoryFragment,
) -> Result<String> {
    if !(0.0..=1.0).contains(&fragment.strength) {
        bail!("strength must be within [0, 1], got {}", fragment.strength);
    }
    let reference = fragment.reference.clone();
    store
        .put_fragment(owner, category, fragment)
        .await
        .context("Failed to store fragment")?;
    info!(owner = %owner, category = %category, reference = %reference, "fragment seeded");
    Ok(format!("Seeded {}:{} for {}", category, reference, owner))
}

/// Apply one event, then persist dirty state
async fn cmd_event(
    store: &SurrealResonanceStore,
    config: &ResonanceConfig,
    owner: &OwnerKey,
    event_type: &str,
    payload: Value,
) -> Result<String> {
    let cache = cache_for(store, config);
    let shared = cache.load(owner).await;
    let mut graph = shared.lock().await;

    let outcome = cache
        .processor(config)
        .process_raw(&mut graph, event_type, payload)
        .context(format!("Failed to apply {} event", event_type))?;
    let report = cache.persist(&mut graph).await;
    if report.failed {
        bail!("Event applied but persisting the graph failed; see log for details");
    }

    let body = serde_json::json!({
        "outcome": outcome,
        "persisted": report,
    });
    Ok(serde_json::to_string_pretty(&body)?)
}

async fn cmd_render(
    store: &SurrealResonanceStore,
    config: &ResonanceConfig,
    owner: &OwnerKey,
    max_chars: Option<usize>,
) -> Result<String> {
    let cache = cache_for(store, config);
    let shared = cache.load(owner).await;
    let graph = shared.lock().await;
    let options = RenderOptions {
        floor: config.render_floor,
        max_chars: max_chars.unwrap_or(config.render_max_chars),
    };
    Ok(render_with(&graph, &options))
}

async fn cmd_summary(
    store: &SurrealResonanceStore,
    config: &ResonanceConfig,
    owner: &OwnerKey,
) -> Result<String> {
    let cache = cache_for(store, config);
    let shared = cache.load(owner).await;
    let graph = shared.lock().await;
    Ok(serde_json::to_string_pretty(&graph.get_summary())?)
}

async fn cmd_top(
    store: &SurrealResonanceStore,
    config: &ResonanceConfig,
    owner: &OwnerKey,
    node_type: NodeType,
    limit: usize,
) -> Result<String> {
    let cache = cache_for(store, config);
    let shared = cache.load(owner).await;
    let graph = shared.lock().await;

    let top = graph.get_top_nodes(node_type, limit);
    if top.is_empty() {
        return Ok(format!("No {} nodes for {}", node_type, owner));
    }
    let lines: Vec<String> = top
        .iter()
        .map(|n| format!("{:.3}  {}", n.charge(), n.reference()))
        .collect();
    Ok(lines.join("\n"))
}

async fn cmd_neighbors(
    store: &SurrealResonanceStore,
    config: &ResonanceConfig,
    owner: &OwnerKey,
    node: &NodeKey,
) -> Result<String> {
    let cache = cache_for(store, config);
    let shared = cache.load(owner).await;
    let graph = shared.lock().await;

    if !graph.contains(node.node_type, &node.reference) {
        bail!("Node not found: {}", node);
    }
    let reference = &node.reference;
    let lines: Vec<String> = graph
        .get_connected(node.node_type, reference)
        .iter()
        .map(|n| {
            format!(
                "{:.3}  {} --{}({:.2})--> {}",
                n.resonance, reference, n.edge_type, n.weight, n.key
            )
        })
        .collect();
    Ok(lines.join("\n"))
}
