//! Loregraph CLI - narrative knowledge graph operator tool

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use loregraph_core::GraphError;
use loregraph_core::config::{Config, GraphBackend};
use loregraph_core::domain::graph::{EntityType, ExportFormat, ExportPayload, GraphPort, RelationshipType};
use loregraph_core::domain::import::{ExtractionBatch, import_extraction};
use loregraph_core::domain::retrieval::{GraphRetrievalService, RetrievedChunk};
use loregraph_core::infrastructure::graph::{SqlGraph, SqlGraphSettings, open_graph};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "loregraph")]
#[command(author, version, about = "Narrative knowledge graph storage and retrieval", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Graph engine to use, overriding the config
    #[arg(long, global = true)]
    backend: Option<BackendArg>,

    /// Connection URI for the sql engine, overriding the config
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Extraction file loaded into the graph before the command runs
    #[arg(long, global = true)]
    load: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum BackendArg {
    Memory,
    Sql,
}

impl From<BackendArg> for GraphBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Memory => GraphBackend::Memory,
            BackendArg::Sql => GraphBackend::Sql,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ExportFormatArg {
    Json,
    Graphml,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Json => ExportFormat::Json,
            ExportFormatArg::Graphml => ExportFormat::Graphml,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show graph statistics
    Stats,

    /// Import an extraction file (JSON entities and relationships)
    Import {
        /// Path to the extraction file
        file: PathBuf,
    },

    /// Show an entity and its relationships
    Show {
        /// Entity name
        name: String,
    },

    /// List entities reachable from an entity
    Neighbors {
        /// Entity name
        name: String,
        /// Maximum number of hops
        #[arg(short, long, default_value_t = 1)]
        depth: u32,
        /// Relationship types to follow (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        types: Option<Vec<String>>,
    },

    /// Find the shortest path between two entities
    Path {
        from: String,
        to: String,
        /// Maximum path length in edges
        #[arg(short, long)]
        max_length: Option<usize>,
    },

    /// List maximal cliques
    Cliques {
        /// Minimum clique size
        #[arg(long, default_value_t = 3)]
        min: usize,
        /// Maximum clique size
        #[arg(long)]
        max: Option<usize>,
        /// Only consider entities of this type
        #[arg(short, long = "type")]
        entity_type: Option<String>,
    },

    /// Show centrality scores
    Centrality {
        /// Only this entity
        #[arg(short, long)]
        entity: Option<String>,
        /// Number of entities to show
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Export the graph
    Export {
        /// Export format
        export_format: ExportFormatArg,
        /// Output file (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print JSON
        #[arg(long)]
        pretty: bool,
        /// Include metadata in GraphML
        #[arg(long)]
        metadata: bool,
    },

    /// Enrich retrieved chunks with graph context
    Enrich {
        /// JSON array of chunks, or a plain text file treated as one chunk
        file: PathBuf,
        /// Include the reasoning trace
        #[arg(long)]
        explain: bool,
    },

    /// Run health check
    Doctor,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all configuration values
    Show,
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up LOREGRAPH_* variables from a local .env
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("loregraph_core=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Some(suggestion) = e.downcast_ref::<GraphError>().and_then(GraphError::suggestion) {
                eprintln!("hint: {}", suggestion);
            }
            Err(e)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        config: config_path,
        backend,
        uri,
        load,
        format,
        quiet,
    } = cli;

    if let Commands::Config { action } = command {
        return cmd_config(action, config_path.as_deref(), format, quiet);
    }

    let mut config = load_config(config_path.as_deref())?;
    if let Some(backend) = backend {
        config.graph.backend = backend.into();
    }
    if let Some(uri) = uri {
        config.graph.uri = uri;
    }

    if let Commands::Doctor = command {
        return cmd_doctor(&config, quiet).await;
    }

    let mut graph = open_graph(&config.graph)?;
    if let Some(path) = load {
        let batch = read_batch(&path)?;
        let report = import_extraction(graph.as_mut(), &batch).await?;
        debug!(
            entities = report.entities.added,
            relationships = report.relationships.added,
            "Preloaded extraction"
        );
    }

    match command {
        Commands::Stats => cmd_stats(graph.as_ref(), format).await,
        Commands::Import { file } => cmd_import(graph.as_mut(), &file, format, quiet).await,
        Commands::Show { name } => cmd_show(graph.as_ref(), &name, format).await,
        Commands::Neighbors { name, depth, types } => {
            cmd_neighbors(graph.as_ref(), &name, depth, types, format).await
        }
        Commands::Path {
            from,
            to,
            max_length,
        } => cmd_path(graph.as_ref(), &from, &to, max_length, format).await,
        Commands::Cliques {
            min,
            max,
            entity_type,
        } => cmd_cliques(graph.as_ref(), min, max, entity_type.as_deref(), format).await,
        Commands::Centrality { entity, top } => {
            cmd_centrality(graph.as_ref(), entity.as_deref(), top, format).await
        }
        Commands::Export {
            export_format,
            output,
            pretty,
            metadata,
        } => {
            cmd_export(
                graph.as_ref(),
                export_format.into(),
                output.as_deref(),
                pretty,
                metadata,
                quiet,
            )
            .await
        }
        Commands::Enrich { file, explain } => {
            let explain = explain || config.retrieval.explain;
            let service = GraphRetrievalService::with_config(Arc::from(graph), config.retrieval);
            cmd_enrich(service, &file, explain, format).await
        }
        Commands::Doctor | Commands::Config { .. } => unreachable!("handled before opening the graph"),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn read_batch(path: &Path) -> anyhow::Result<ExtractionBatch> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read extraction file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse extraction file: {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_entity_type(s: &str) -> anyhow::Result<EntityType> {
    EntityType::parse(s).ok_or_else(|| anyhow!("Unknown entity type '{}'", s))
}

fn parse_relationship_type(s: &str) -> anyhow::Result<RelationshipType> {
    RelationshipType::parse(s).ok_or_else(|| anyhow!("Unknown relationship type '{}'", s))
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_stats(graph: &dyn GraphPort, format: OutputFormat) -> anyhow::Result<()> {
    let stats = graph.get_stats().await?;
    if format == OutputFormat::Json {
        return print_json(&stats);
    }

    println!("Graph Statistics");
    println!("  Entities: {}", stats.node_count);
    println!("  Relationships: {}", stats.edge_count);
    if !stats.entity_types.is_empty() {
        println!("\nEntities by type:");
        for (entity_type, count) in &stats.entity_types {
            println!("  {}: {}", entity_type, count);
        }
    }
    if !stats.relationship_types.is_empty() {
        println!("\nRelationships by type:");
        for (relationship_type, count) in &stats.relationship_types {
            println!("  {}: {}", relationship_type, count);
        }
    }
    Ok(())
}

async fn cmd_import(
    graph: &mut dyn GraphPort,
    file: &Path,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let batch = read_batch(file)?;
    let report = import_extraction(graph, &batch).await?;
    if format == OutputFormat::Json {
        return print_json(&report);
    }

    if !quiet {
        println!("Imported {}", file.display());
        println!(
            "  Entities: {} added, {} existing, {} failed",
            report.entities.added, report.entities.existing, report.entities.failed
        );
        println!(
            "  Relationships: {} added, {} existing, {} failed",
            report.relationships.added, report.relationships.existing, report.relationships.failed
        );
    }
    Ok(())
}

async fn cmd_show(graph: &dyn GraphPort, name: &str, format: OutputFormat) -> anyhow::Result<()> {
    let entity = graph
        .get_entity(name)
        .await?
        .ok_or_else(|| anyhow!("Entity '{}' not found", name))?;
    let relationships = graph.get_relationships(&entity.name, None).await?;

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "entity": entity,
            "relationships": relationships,
        }));
    }

    println!("{} ({})", entity.name, entity.entity_type);
    if !entity.description.is_empty() {
        println!("  Description: {}", entity.description);
    }
    if !entity.aliases.is_empty() {
        println!("  Aliases: {}", entity.aliases.join(", "));
    }
    for (key, value) in &entity.metadata {
        println!("  {}: {}", key, value);
    }
    if !relationships.is_empty() {
        println!("\nRelationships:");
        for r in &relationships {
            println!(
                "  {} -[{}]-> {} (strength {:.2})",
                r.source, r.relationship_type, r.target, r.strength
            );
        }
    }
    Ok(())
}

async fn cmd_neighbors(
    graph: &dyn GraphPort,
    name: &str,
    depth: u32,
    types: Option<Vec<String>>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let types = types
        .map(|types| {
            types
                .iter()
                .map(|t| parse_relationship_type(t))
                .collect::<anyhow::Result<Vec<_>>>()
        })
        .transpose()?;
    let neighbors = graph.get_neighbors(name, depth, types.as_deref()).await?;

    if format == OutputFormat::Json {
        return print_json(&neighbors);
    }

    if neighbors.is_empty() {
        println!("No neighbors found for '{}'.", name);
        return Ok(());
    }
    for n in &neighbors {
        println!(
            "  [{}] {} ({}) via {} {} -> {}",
            n.distance,
            n.entity.name,
            n.entity.entity_type,
            n.relationship.source,
            n.relationship.relationship_type,
            n.relationship.target
        );
    }
    Ok(())
}

async fn cmd_path(
    graph: &dyn GraphPort,
    from: &str,
    to: &str,
    max_length: Option<usize>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let path = graph.find_path(from, to, max_length).await?;

    if format == OutputFormat::Json {
        return print_json(&path);
    }

    match path {
        Some(path) => {
            println!("Path ({} hops): {}", path.length, path.entities.join(" -> "));
            for r in &path.relationships {
                println!("  {} -[{}]-> {}", r.source, r.relationship_type, r.target);
            }
        }
        None => println!("No path from '{}' to '{}'.", from, to),
    }
    Ok(())
}

async fn cmd_cliques(
    graph: &dyn GraphPort,
    min: usize,
    max: Option<usize>,
    entity_type: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let entity_type = entity_type.map(parse_entity_type).transpose()?;
    let result = graph.find_cliques(min, max, entity_type).await?;

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    if result.cliques.is_empty() {
        println!("No cliques of size {} or more.", min);
        return Ok(());
    }
    println!(
        "{} cliques (largest: {})",
        result.total_count, result.largest_size
    );
    for clique in &result.cliques {
        println!("  {}", clique.join(", "));
    }
    Ok(())
}

async fn cmd_centrality(
    graph: &dyn GraphPort,
    entity: Option<&str>,
    top: Option<usize>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let scores = graph.get_centrality(entity, top).await?;

    if format == OutputFormat::Json {
        return print_json(&scores);
    }

    println!(
        "{:<24} {:>8} {:>12} {:>10} {:>9}",
        "entity", "degree", "betweenness", "closeness", "pagerank"
    );
    for s in &scores {
        println!(
            "{:<24} {:>8.4} {:>12.4} {:>10.4} {:>9.4}",
            s.entity, s.degree, s.betweenness, s.closeness, s.pagerank
        );
    }
    Ok(())
}

async fn cmd_export(
    graph: &dyn GraphPort,
    format: ExportFormat,
    output: Option<&Path>,
    pretty: bool,
    include_metadata: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let result = match format {
        ExportFormat::Json => graph.export_json(output, pretty).await?,
        ExportFormat::Graphml => graph.export_graphml(output, include_metadata).await?,
    };

    match &result.payload {
        ExportPayload::Inline(content) => println!("{}", content),
        ExportPayload::File(path) => {
            if !quiet {
                println!(
                    "Exported {} entities and {} relationships to {} ({} bytes)",
                    result.node_count,
                    result.edge_count,
                    path.display(),
                    result.size_bytes
                );
            }
        }
    }
    Ok(())
}

async fn cmd_enrich(
    mut service: GraphRetrievalService<dyn GraphPort>,
    file: &Path,
    explain: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read chunks file: {}", file.display()))?;
    let chunks: Vec<RetrievedChunk> = match serde_json::from_str(&contents) {
        Ok(chunks) => chunks,
        Err(e) => {
            debug!(error = %e, "Chunks file is not JSON, treating it as one chunk");
            let id = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "chunk".to_string());
            vec![RetrievedChunk::new(id, contents)]
        }
    };

    let result = service.enrich_chunks(&chunks, explain).await?;

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    for enriched in &result.chunks {
        println!("[{}]", enriched.chunk.id);
        if enriched.graph_context.is_empty() {
            println!("  (no graph context)");
        } else {
            println!("{}", enriched.graph_context);
        }
        println!();
    }
    println!(
        "Entities: {}  Relationships: {}  Cache: {} hits, {} misses",
        result.total_entities, result.total_relationships, result.cache_hits, result.cache_misses
    );

    if let Some(explanation) = &result.explanation {
        println!("\n{}", explanation.summary);
        for step in &explanation.steps {
            println!(
                "  {}. [{}] {} (relevance {:.2})",
                step.step_number, step.step_type, step.description, step.relevance_score
            );
        }
    }
    Ok(())
}

async fn cmd_doctor(config: &Config, quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("Loregraph Health Check");
        println!("======================");
        println!();
    }

    let mut all_ok = true;

    match config.validate() {
        Ok(()) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
            }
        }
    }

    if !quiet {
        println!("[OK] Backend: {}", config.graph.backend);
    }

    if config.graph.backend == GraphBackend::Sql {
        match config.graph.redacted_password() {
            Ok(Some(redacted)) => {
                if !quiet {
                    println!("[OK] Credential: Configured ({})", redacted);
                }
            }
            Ok(None) => {
                if !quiet {
                    println!("[--] Credential: Not set (not needed for sqlite)");
                }
            }
            Err(e) => {
                all_ok = false;
                if !quiet {
                    println!("[!!] Credential: Error - {}", e);
                }
            }
        }
    }

    let graph = open_graph(&config.graph)?;
    if graph.health_check().await {
        if !quiet {
            let stats = graph.get_stats().await?;
            println!(
                "[OK] Graph store: Reachable ({} entities, {} relationships)",
                stats.node_count, stats.edge_count
            );
        }
        if config.graph.backend == GraphBackend::Sql {
            let store = SqlGraph::new(SqlGraphSettings::from_config(&config.graph)?);
            match store.schema_status().await {
                Ok(status) if !status.needs_migration => {
                    if !quiet {
                        println!("[OK] Schema: Version {}", status.current_version);
                    }
                }
                Ok(status) => {
                    all_ok = false;
                    if !quiet {
                        println!(
                            "[!!] Schema: Version {} (expected {})",
                            status.current_version, status.target_version
                        );
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Schema: Error - {}", e);
                    }
                }
            }
        }
    } else {
        all_ok = false;
        warn!(uri = %config.graph.uri, "Graph store unreachable");
        if !quiet {
            println!("[!!] Graph store: Unreachable ({})", config.graph.uri);
        }
    }

    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    if all_ok {
        Ok(())
    } else {
        Err(anyhow!("Health check failed"))
    }
}

fn cmd_config(
    action: ConfigAction,
    path: Option<&Path>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(path)?;
            let items = config.list()?;
            if format == OutputFormat::Json {
                let map: serde_json::Map<String, serde_json::Value> = items
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::String(v)))
                    .collect();
                return print_json(&map);
            }
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Get { key } => {
            let config = load_config(path)?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = load_config(path)?;
            config.set(&key, &value)?;
            match path {
                Some(path) => config.save_to(path)?,
                None => config.save()?,
            }
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::Path => {
            let path = match path {
                Some(path) => path.to_path_buf(),
                None => Config::config_path()?,
            };
            println!("{}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_neighbors_types_are_comma_separated() {
        let cli = Cli::parse_from(["loregraph", "neighbors", "Alice", "--types", "knows,loves"]);
        match cli.command {
            Commands::Neighbors { types, depth, .. } => {
                assert_eq!(types.unwrap(), vec!["knows", "loves"]);
                assert_eq!(depth, 1);
            }
            _ => panic!("expected neighbors"),
        }
    }

    #[test]
    fn test_global_backend_flag() {
        let cli = Cli::parse_from(["loregraph", "stats", "--backend", "memory"]);
        assert!(matches!(cli.backend, Some(BackendArg::Memory)));
    }

    #[test]
    fn test_unknown_relationship_type_is_rejected() {
        assert!(parse_relationship_type("befriends").is_err());
        assert_eq!(parse_relationship_type("enemy_of").unwrap(), RelationshipType::EnemyOf);
    }
}
