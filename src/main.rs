use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use vibe_core::{OutputFormat, SearchResult, VibeError, CONFIG_FILE};
use vibe_index::workspace::resolve_project_root;
use vibe_index::{StatusReport, SyncProgress, SyncStats, Workspace};

#[derive(Parser)]
#[command(
    name = "vibe-sync",
    version,
    about = "Hybrid code indexing and retrieval",
    long_about = "vibe-sync indexes a project into a local SQLite store and finds code by\n\
                   symbol name, full text, or meaning, merged into one ranked list.\n\n\
                   Examples:\n  \
                     vibe-sync init                     Create config and index\n  \
                     vibe-sync sync --embeddings        Re-index with Ollama embeddings\n  \
                     vibe-sync search 'cart total'      Hybrid search\n  \
                     vibe-sync symbol useAuth           Find a declaration by name\n  \
                     vibe-sync status --format json     Index health as JSON"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: <project>/.vibe-sync.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project root (default: enclosing git work tree, else current directory)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text  Human-readable listings and summaries (default)\n  \
                         json  Machine-readable JSON with camelCase keys"
    )]
    format: OutputFormat,

    /// Enable debug logging (overridden by VIBE_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Create a .vibe-sync.toml template and an empty index
    #[command(long_about = "Create a .vibe-sync.toml template and an empty index.\n\n\
        Writes a commented-out configuration template at the project root unless\n\
        one already exists, then creates .claude/memory/vibe.db with the schema.")]
    Init,
    /// Re-index the project
    #[command(long_about = "Re-index the project.\n\n\
        Chunks every file matching sync.patterns, records symbols and components,\n\
        and replaces the previous index for this project. With --embeddings, each\n\
        chunk is embedded through Ollama when the server is reachable.\n\n\
        Examples:\n  vibe-sync sync\n  vibe-sync sync --embeddings --project ../web")]
    Sync {
        /// Generate embeddings for chunks and components
        #[arg(long)]
        embeddings: bool,
    },
    /// Hybrid search combining symbol, full-text and semantic signals
    #[command(long_about = "Hybrid search combining symbol, full-text and semantic signals.\n\n\
        Each signal is weighted by search.weights; results matched by more than one\n\
        signal get a boost. Semantic results are skipped when the provider is down.\n\n\
        Examples:\n  vibe-sync search useCart\n  vibe-sync search 'session token refresh' --limit 5")]
    Search {
        /// Search query
        query: String,
        /// Maximum results (default: search.default_limit)
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
    /// Find declarations by name
    #[command(long_about = "Find declarations by name.\n\n\
        Exact matches score 1.0, then prefix (0.8), substring (0.5) and\n\
        case-insensitive (0.4) matches.\n\n\
        Example:\n  vibe-sync symbol AuthService")]
    Symbol {
        /// Symbol name or fragment
        query: String,
        /// Maximum results (default: search.default_limit)
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
    /// Full-text search with highlighted excerpts
    #[command(long_about = "Full-text search with highlighted excerpts.\n\n\
        Every query term must appear in a chunk. Falls back to a substring scan\n\
        when the full-text index finds nothing, and also matches components by\n\
        name or path.\n\n\
        Example:\n  vibe-sync text 'session_token'")]
    Text {
        /// Words or fragment to find
        query: String,
        /// Maximum results (default: search.default_limit)
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
    /// Search by meaning using stored embeddings
    #[command(long_about = "Search by meaning using stored embeddings.\n\n\
        Requires a reachable Ollama server serving embedding.model and a previous\n\
        `vibe-sync sync --embeddings`.\n\n\
        Example:\n  vibe-sync semantic 'where do we refresh the login session'")]
    Semantic {
        /// Natural-language description
        query: String,
        /// Maximum results (default: search.default_limit)
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
    /// Show index counts and available search modes
    #[command(long_about = "Show index counts and available search modes.\n\n\
        Reports chunk, symbol and component counts, embedding coverage, language\n\
        breakdown, the last sync, and whether the embedding provider is reachable.")]
    Status,
    /// Start the MCP server for IDE integration
    #[command(long_about = "Start the MCP (Model Context Protocol) server for IDE integration.\n\n\
        Exposes the search and sync tools over stdio transport for use by AI\n\
        coding agents and IDE extensions.\n\n\
        Example:\n  vibe-sync mcp --project /my/project")]
    Mcp,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

const DEFAULT_CONFIG: &str = r#"# vibe-sync configuration
# Every setting is optional; uncomment to override the default.

[embedding]
# base_url = "http://localhost:11434"
# model = "nomic-embed-text"
# timeout_secs = 30
# probe_timeout_secs = 2
# max_chars = 8000

[search]
# default_limit = 10

# Must sum to 1.0
# [search.weights]
# semantic = 0.4
# symbol = 0.35
# fulltext = 0.25

[sync]
# patterns = ["src/**/*.ts", "src/**/*.tsx", "**/*.swift", "**/*.py"]
# exclude_dirs = ["node_modules", ".git", "__pycache__", "dist", "build"]
# embed_chars = 2000
# fallback_max_chars = 4000
# block_scan_lines = 2000
# prune_stale_files = true

# [[sync.component_patterns]]
# pattern = "src/components/**/*.tsx"
# kind = "component"
"#;

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");
    let commands = [
        ("init", "Create config and an empty index"),
        ("sync", "Re-index the project (--embeddings for Ollama vectors)"),
        ("search", "Hybrid symbol + full-text + semantic search"),
        ("symbol", "Find declarations by name"),
        ("text", "Full-text search with excerpts"),
        ("semantic", "Search by meaning"),
        ("status", "Index counts and available search modes"),
        ("mcp", "Start MCP server for IDE integration"),
    ];

    if use_color {
        println!("\x1b[1mvibe-sync\x1b[0m v{version}: hybrid code search over a local index\n");
        println!("Commands:");
        for (name, about) in commands {
            println!("  \x1b[32m{name:<9}\x1b[0m {about}");
        }
    } else {
        println!("vibe-sync v{version}: hybrid code search over a local index\n");
        println!("Commands:");
        for (name, about) in commands {
            println!("  {name:<9} {about}");
        }
    }

    println!("\nRun 'vibe-sync <command> --help' for details.");
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("VIBE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Progress bar on stderr while a sync walks the project.
struct SyncBar {
    bar: Option<ProgressBar>,
}

impl SyncBar {
    fn new(enabled: bool) -> Self {
        let bar = enabled.then(|| {
            let pb = ProgressBar::new(0);
            if let Ok(style) =
                ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            {
                pb.set_style(style.progress_chars("=> "));
            }
            pb
        });
        Self { bar }
    }
}

impl SyncProgress for SyncBar {
    fn start(&self, total_files: usize) {
        if let Some(pb) = &self.bar {
            pb.set_length(total_files as u64);
            pb.enable_steady_tick(std::time::Duration::from_millis(120));
        }
    }

    fn file(&self, relative_path: &str) {
        if let Some(pb) = &self.bar {
            pb.set_message(relative_path.to_string());
            pb.inc(1);
        }
    }

    fn finish(&self, stats: &SyncStats) {
        if let Some(pb) = &self.bar {
            pb.finish_and_clear();
        }
        tracing::debug!(?stats, "sync finished");
    }
}

fn open_workspace(cli: &Cli) -> Result<Workspace> {
    Workspace::load(cli.project.as_deref(), cli.config.as_deref()).into_diagnostic()
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn print_results(
    format: OutputFormat,
    query: &str,
    results: &[SearchResult],
    show_breakdown: bool,
) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "query": query,
            "results": results,
            "total": results.len(),
        }));
    }

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    for (i, r) in results.iter().enumerate() {
        let location = match (r.line, r.end_line) {
            (Some(start), Some(end)) if end != start => format!("{}:{start}-{end}", r.file_path),
            (Some(start), _) => format!("{}:{start}", r.file_path),
            _ => r.file_path.clone(),
        };
        let name = match (&r.name, &r.parent) {
            (Some(name), Some(parent)) => format!("{parent}.{name}"),
            (Some(name), None) => name.clone(),
            _ => String::new(),
        };
        let matches: Vec<&str> = r.match_types.iter().map(|m| m.as_str()).collect();
        println!(
            "{}. {location}  {name} ({}) score {:.3} [{}]",
            i + 1,
            r.kind,
            r.score,
            matches.join(", "),
        );
        if show_breakdown {
            if let Some(b) = &r.breakdown {
                println!(
                    "   symbol {:.2}  fulltext {:.2}  semantic {:.2}",
                    b.symbol, b.fulltext, b.semantic
                );
            }
        }
        if let Some(preview) = &r.preview {
            for line in preview.lines().take(3) {
                println!("   {line}");
            }
        }
        println!();
    }
    Ok(())
}

fn print_sync_stats(format: OutputFormat, stats: &SyncStats) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(stats);
    }
    println!(
        "Indexed {} files: {} chunks, {} symbols, {} components, {} embeddings",
        stats.files, stats.code_chunks, stats.symbols, stats.components, stats.embeddings,
    );
    if stats.skipped_files > 0 {
        println!("Skipped {} unreadable files", stats.skipped_files);
    }
    if stats.pruned_files > 0 {
        println!("Pruned {} stale files", stats.pruned_files);
    }
    Ok(())
}

fn print_status(format: OutputFormat, report: &StatusReport, use_color: bool) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }

    let mark = |ok: bool| match (ok, use_color) {
        (true, true) => "\x1b[32m\u{2713}\x1b[0m",
        (false, true) => "\x1b[31m\u{2717}\x1b[0m",
        (true, false) => "\u{2713}",
        (false, false) => "\u{2717}",
    };

    println!("Project: {}", report.project_path);
    println!("Index:   {}", report.db_path.display());

    match &report.index {
        None => println!("\nNot initialized. Run `vibe-sync sync` to build the index."),
        Some(index) => {
            println!(
                "Schema:  {} ({} bytes)",
                index.schema_version.as_deref().unwrap_or("unknown"),
                index.db_size_bytes
            );
            println!();
            println!("  files       {}", index.files);
            println!(
                "  chunks      {} ({} with embeddings)",
                index.code_chunks, index.chunks_with_embeddings
            );
            println!("  symbols     {}", index.symbols);
            println!(
                "  components  {} ({} with embeddings)",
                index.components, index.components_with_embeddings
            );
            if !index.languages.is_empty() {
                let langs: Vec<String> = index
                    .languages
                    .iter()
                    .map(|(lang, n)| format!("{lang} {n}"))
                    .collect();
                println!("  languages   {}", langs.join(", "));
            }
            if !index.symbol_types.is_empty() {
                let kinds: Vec<String> = index
                    .symbol_types
                    .iter()
                    .map(|(kind, n)| format!("{kind} {n}"))
                    .collect();
                println!("  kinds       {}", kinds.join(", "));
            }
            match &index.last_sync {
                Some(event) => println!("  last sync   {} ({})", event.timestamp, event.event_type),
                None => println!("  last sync   never"),
            }
        }
    }

    let caps = &report.capabilities;
    println!();
    println!("{} symbol search", mark(caps.symbol_search));
    println!("{} full-text search", mark(caps.fulltext_search));
    println!("{} semantic search", mark(caps.semantic_search));
    println!(
        "{} embedding provider ({})",
        mark(caps.provider_available),
        caps.embedding_model
    );
    Ok(())
}

fn write_config_template(root: &Path) -> Result<Option<PathBuf>> {
    let path = root.join(CONFIG_FILE);
    if path.exists() {
        return Ok(None);
    }
    std::fs::write(&path, DEFAULT_CONFIG).into_diagnostic()?;
    Ok(Some(path))
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    match cli.command {
        None => print_welcome(use_color),
        Some(Command::Init) => {
            let root = resolve_project_root(cli.project.as_deref()).into_diagnostic()?;
            let created = match cli.config {
                Some(_) => None,
                None => write_config_template(&root)?,
            };
            let workspace = open_workspace(&cli)?;
            let db = workspace.init().into_diagnostic()?;
            if cli.format == OutputFormat::Json {
                print_json(&serde_json::json!({
                    "projectPath": workspace.project_key(),
                    "config": created,
                    "dbPath": db,
                }))?;
            } else {
                match created {
                    Some(path) => println!("Created {}", path.display()),
                    None => println!("Keeping existing configuration"),
                }
                println!("Initialized index at {}", db.display());
            }
        }
        Some(Command::Sync { embeddings }) => {
            let workspace = open_workspace(&cli)?;
            let show_bar = cli.format == OutputFormat::Text && std::io::stderr().is_terminal();
            let progress = SyncBar::new(show_bar);
            let stats = workspace.sync(embeddings, &progress).await.into_diagnostic()?;
            print_sync_stats(cli.format, &stats)?;
        }
        Some(Command::Search { ref query, limit }) => {
            let workspace = open_workspace(&cli)?;
            let results = workspace.hybrid_search(query, limit).await.into_diagnostic()?;
            print_results(cli.format, query, &results, true)?;
        }
        Some(Command::Symbol { ref query, limit }) => {
            let workspace = open_workspace(&cli)?;
            let results = workspace.symbol_search(query, limit);
            print_results(cli.format, query, &results, false)?;
        }
        Some(Command::Text { ref query, limit }) => {
            let workspace = open_workspace(&cli)?;
            let results = workspace.text_search(query, limit);
            print_results(cli.format, query, &results, false)?;
        }
        Some(Command::Semantic { ref query, limit }) => {
            let workspace = open_workspace(&cli)?;
            let results = match workspace.semantic_search(query, limit).await {
                Ok(results) => results,
                Err(e @ VibeError::ProviderUnavailable(_)) => {
                    miette::bail!(miette::miette!(
                        help = format!(
                            "Start Ollama and run `ollama pull {}`, or use `vibe-sync search`",
                            workspace.config().embedding.model
                        ),
                        "{e}"
                    ))
                }
                Err(e) => return Err(e).into_diagnostic(),
            };
            print_results(cli.format, query, &results, false)?;
        }
        Some(Command::Status) => {
            let workspace = open_workspace(&cli)?;
            let report = workspace.status().await.into_diagnostic()?;
            print_status(cli.format, &report, use_color)?;
        }
        Some(Command::Mcp) => {
            let root = resolve_project_root(cli.project.as_deref()).into_diagnostic()?;
            vibe_mcp::server::run_server(root, cli.config.clone())
                .await
                .into_diagnostic()?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "vibe-sync", &mut std::io::stdout());
        }
    }

    Ok(())
}
