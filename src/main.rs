use anyhow::{Context, Result};
use arxiv_search::config::{
    get_config, render_config, write_default_config, Config, LogFormat, StoreBackend, ENV_PREFIX,
};
use arxiv_search::mcp::server::McpServer;
use arxiv_search::models::{AuthorRef, CategoryRef, DetailResponse, SearchResponse};
use arxiv_search::query::{SearchError, SearchService};
use arxiv_search::store::{open_store, StoreStats};
use arxiv_search::utils::{validate_query, TextAnalyzer};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Attribute, Cell, Table};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// arxiv-search - Search a local mirror of arXiv abstracts
#[derive(Parser, Debug)]
#[command(name = "arxiv-search")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search a local mirror of arXiv abstracts", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v debug, -vv trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend (overrides the configuration)
    #[arg(long, value_enum, global = true)]
    store: Option<BackendArg>,

    /// Data file: JSON-lines snapshot (memory) or database (sqlite)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if std::io::stdout().is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum BackendArg {
    Memory,
    Sqlite,
}

impl From<BackendArg> for StoreBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Memory => StoreBackend::Memory,
            BackendArg::Sqlite => StoreBackend::Sqlite,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search abstracts, e.g. 'emcee cat:astro-ph.IM since:2010 au:"hogg, david"'
    #[command(alias = "s")]
    Search {
        /// Query string with optional author:, category:, from:, to: modifiers
        query: String,

        /// Page number
        #[arg(long, short, default_value_t = 1)]
        page: i64,

        /// Results per page (default from configuration)
        #[arg(long)]
        per_page: Option<i64>,
    },

    /// Show the full abstract for an arXiv id
    Show {
        /// arXiv identifier (e.g., 1202.3665)
        arxiv_id: String,
    },

    /// Suggest author names for a partial name
    Authors {
        /// Partial name
        prefix: String,

        /// Maximum suggestions
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// Suggest categories for a prefix
    Categories {
        /// Category prefix (e.g., astro-ph)
        prefix: String,

        /// Maximum suggestions
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// Import abstracts from a JSON-lines file into the store
    Import {
        /// File with one abstract per line
        input: PathBuf,
    },

    /// Show row counts of the configured store
    Stats,

    /// Run the MCP server
    #[command(alias = "mcp")]
    Serve {
        /// Run in stdio mode (for MCP clients)
        #[arg(long, default_value_t = true)]
        stdio: bool,

        /// Run in streamable HTTP mode (overrides --stdio)
        #[arg(long)]
        http: bool,

        /// Port for HTTP mode
        #[arg(long, short, default_value_t = 3000)]
        port: u16,

        /// Host to bind to for HTTP mode
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Print the effective configuration
    Config {
        /// Write a default configuration file to this path instead
        #[arg(long)]
        init: Option<PathBuf>,
    },
}

/// Install the tracing subscriber; logs go to stderr so stdout stays clean for
/// results and the stdio transport
fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("arxiv_search={}", level)));

    let (json, text) = match config.logging.format {
        LogFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
            None,
        ),
        LogFormat::Text => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, config_path) =
        get_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(backend) = cli.store {
        config.store.backend = backend.into();
    }
    if let Some(data) = &cli.data {
        config.store.path = Some(data.clone());
    }

    init_tracing(&cli, &config);
    if let Some(path) = &config_path {
        tracing::debug!("Using config file: {}", path.display());
    }

    let format = cli.output.resolve();

    let command = match cli.command {
        Some(command) => command,
        None => {
            eprintln!("No command given. Run 'arxiv-search --help' for usage.");
            return Ok(());
        }
    };

    // These commands never touch a store
    if let Commands::Config { init } = &command {
        match init {
            Some(path) => {
                write_default_config(path)?;
                println!("Wrote default configuration to {}", path.display());
            }
            None => {
                if let Some(path) = &config_path {
                    println!("# Loaded from {}", path.display());
                }
                println!("# Environment overrides use the {}_ prefix", ENV_PREFIX);
                print!("{}", render_config(&config)?);
            }
        }
        return Ok(());
    }

    let analyzer = Arc::new(TextAnalyzer::english());
    let store = open_store(&config.store, analyzer)
        .await
        .with_context(|| format!("Failed to open {} store", config.store.backend))?;
    let service = SearchService::from_config(store, &config.search);

    match command {
        Commands::Search {
            query,
            page,
            per_page,
        } => {
            let query = checked_query(&query)?;
            let page = service.page(Some(page), per_page);
            let response = service.search(query, &page).await?;
            if let Some(message) = &response.message {
                eprintln!("{}", message);
            }
            output_results(&response, format)?;
        }

        Commands::Show { arxiv_id } => {
            let detail = service.detail(&arxiv_id).await?;
            output_detail(&detail, format)?;
        }

        Commands::Authors { prefix, limit } => {
            let authors = service.complete_authors(&prefix, limit).await?;
            output_authors(&authors, format)?;
        }

        Commands::Categories { prefix, limit } => {
            let categories = service.complete_categories(&prefix, limit).await?;
            output_categories(&categories, format)?;
        }

        Commands::Import { input } => {
            if config.store.backend == StoreBackend::Memory {
                tracing::warn!(
                    "The memory store is not persisted; use --store sqlite --data <db> to keep imported abstracts"
                );
            }
            let imported = service
                .import_jsonl(&input)
                .await
                .with_context(|| format!("Failed to import {}", input.display()))?;
            if !cli.quiet {
                println!("Imported {} abstracts", imported);
            }
        }

        Commands::Stats => {
            let stats = service.stats().await?;
            output_stats(service.store().name(), &stats, format)?;
        }

        Commands::Serve {
            stdio,
            http,
            port,
            host,
        } => {
            let server = McpServer::new(Arc::new(service))?;

            if http || !stdio {
                let addr = format!("{}:{}", host, port);
                let (bound_addr, handle) = server.run_http(&addr).await?;
                tracing::info!("MCP server listening on {}", bound_addr);

                handle
                    .await
                    .map_err(|e| anyhow::anyhow!("Server task failed: {}", e))?;
            } else {
                server.run().await?;
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Shorten to `max` characters, marking the cut with "..."
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn output_results(response: &SearchResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Auto => print_json(response)?,
        OutputFormat::Plain => {
            for result in &response.results {
                println!("{} - {} ({})", result.arxiv_id, result.title, result.updated);
                println!("  Authors: {}", result.authors.join(", "));
                println!("  Categories: {}", result.categories.join(" "));
                println!("  URL: {}", result.url);
                println!();
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["arXiv ID", "Title", "Authors", "Categories", "Updated"]);

            for result in &response.results {
                table.add_row(vec![
                    Cell::new(&result.arxiv_id),
                    Cell::new(truncate(&result.title, 50)).add_attribute(Attribute::Bold),
                    Cell::new(truncate(&result.authors.join(", "), 30)),
                    Cell::new(result.categories.join(" ")),
                    Cell::new(result.updated.to_string()),
                ]);
            }
            println!("{table}");
            println!(
                "Page {} ({} per page): {} results",
                response.page, response.per_page, response.count
            );
        }
    }
    Ok(())
}

fn output_detail(detail: &DetailResponse, format: OutputFormat) -> Result<()> {
    let record = &detail.result;
    match format {
        OutputFormat::Json | OutputFormat::Auto => print_json(detail)?,
        OutputFormat::Plain | OutputFormat::Table => {
            println!("{}", record.summary.title);
            println!("  arXiv: {}", record.summary.arxiv_id);
            println!("  Updated: {}", record.summary.updated);
            println!("  Authors: {}", record.summary.authors.join(", "));
            println!("  Categories: {}", record.summary.categories.join(" "));
            if let Some(license) = &record.license {
                println!("  License: {}", license);
            }
            println!("  URL: {}", record.summary.url);
            println!();
            println!("{}", record.r#abstract);
        }
    }
    Ok(())
}

fn output_authors(authors: &[AuthorRef], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Auto => print_json(authors)?,
        OutputFormat::Plain => authors.iter().for_each(|a| println!("{}", a.full_name)),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["ID", "Author"]);
            for author in authors {
                table.add_row(vec![Cell::new(author.id), Cell::new(&author.full_name)]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

fn output_categories(categories: &[CategoryRef], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Auto => print_json(categories)?,
        OutputFormat::Plain => categories.iter().for_each(|c| println!("{}", c.raw)),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Category", "Archive", "Subject"]);
            for category in categories {
                let parsed = category.parsed();
                table.add_row(vec![
                    Cell::new(&category.raw).add_attribute(Attribute::Bold),
                    Cell::new(parsed.archive),
                    Cell::new(parsed.subject.unwrap_or_default()),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

fn output_stats(store: &str, stats: &StoreStats, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Auto => print_json(&serde_json::json!({
            "store": store,
            "abstracts": stats.abstracts,
            "authors": stats.authors,
            "categories": stats.categories,
        }))?,
        OutputFormat::Plain | OutputFormat::Table => {
            println!("Store: {}", store);
            println!("  Abstracts:  {}", stats.abstracts);
            println!("  Authors:    {}", stats.authors);
            println!("  Categories: {}", stats.categories);
        }
    }
    Ok(())
}

/// Apply the serving-edge query checks before the service sees the text
fn checked_query(raw: &str) -> Result<&str> {
    Ok(validate_query(raw)?.ok_or(SearchError::EmptyQuery)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arxiv_search::utils::ValidationError;

    #[test]
    fn test_checked_query() {
        assert_eq!(checked_query("  galaxy au:bovy ").unwrap(), "galaxy au:bovy");
        let err = checked_query("   ").unwrap_err();
        assert_eq!(err.downcast_ref::<SearchError>(), Some(&SearchError::EmptyQuery));

        let err = checked_query("galaxy\0").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::InvalidQuery(_))
        ));
        assert!(checked_query(&"a".repeat(2000)).is_err());
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["arxiv-search"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert!(cli.store.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["arxiv-search", "-vv", "stats"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Some(Commands::Stats)));
    }

    #[test]
    fn test_cli_search_command() {
        let cli = Cli::parse_from([
            "arxiv-search",
            "search",
            "emcee au:\"hogg, david\"",
            "--page",
            "2",
            "--per-page",
            "20",
            "--store",
            "sqlite",
        ]);
        match cli.command {
            Some(Commands::Search {
                query,
                page,
                per_page,
            }) => {
                assert_eq!(query, "emcee au:\"hogg, david\"");
                assert_eq!(page, 2);
                assert_eq!(per_page, Some(20));
            }
            _ => panic!("Expected Search command"),
        }
        assert_eq!(cli.store, Some(BackendArg::Sqlite));
    }

    #[test]
    fn test_cli_serve_command() {
        let cli = Cli::parse_from(["arxiv-search", "serve"]);
        match &cli.command {
            Some(Commands::Serve {
                stdio, port, host, ..
            }) => {
                assert!(*stdio);
                assert_eq!(*port, 3000);
                assert_eq!(host, "127.0.0.1");
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_config_init() {
        let cli = Cli::parse_from(["arxiv-search", "config", "--init", "arxiv-search.toml"]);
        match cli.command {
            Some(Commands::Config { init }) => {
                assert_eq!(init, Some(PathBuf::from("arxiv-search.toml")))
            }
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_output_format_resolve() {
        assert_eq!(OutputFormat::Json.resolve(), OutputFormat::Json);
        assert_ne!(OutputFormat::Auto.resolve(), OutputFormat::Auto);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Ångström résolution", 8), "Ångst...");
    }
}
