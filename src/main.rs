use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use comfy_table::{Attribute, Cell, Table};
use manuscript_tools::bibtex::{self, KeyConvention};
use manuscript_tools::config::{
    default_config_path, load_config, Config, ConfigFile, LoggingConfig, MAILTO_ENV,
};
use manuscript_tools::mcp::{McpServer, ToolRegistry, Toolset};
use manuscript_tools::models::{Citation, Dialect, Work, WorkQuery};
use manuscript_tools::scanner::scan_bare_citations;
use manuscript_tools::sources::{find_published_version, CrossRefSource, Source};
use manuscript_tools::ui::{self, Spinner, Status};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// manuscript-tools - find bare citations, manage BibTeX, and query CrossRef
#[derive(Parser, Debug)]
#[command(name = "manuscript-tools")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Citation tooling for Quarto and LaTeX manuscripts", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
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

    /// Request timeout in seconds (overrides the config file)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
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

/// Target document type for citation replacements
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DocType {
    /// Quarto / Markdown (`@key`)
    Qmd,
    /// LaTeX (`\citet` / `\textcite`)
    Tex,
}

/// Which tools the MCP server exposes
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ServeToolset {
    Bibtex,
    Crossref,
    All,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a manuscript for bare (written-out) citations
    Scan {
        /// Path to the .qmd or .tex file
        path: PathBuf,
    },

    /// Index a .bib file by first-author surname and year
    #[command(name = "parse-bib")]
    ParseBib {
        /// Path to the .bib file
        path: PathBuf,
    },

    /// Rewrite the key of a BibTeX entry to {firstauthor}{year}{titleword}
    Rekey {
        /// File containing the entry, or '-' for stdin
        #[arg(default_value = "-")]
        entry: String,

        /// .bib file whose keys must not be reused
        #[arg(long, short)]
        bib: Option<PathBuf>,

        /// Additional key that must not be reused (repeatable)
        #[arg(long = "existing", short = 'k')]
        existing: Vec<String>,

        /// Key convention: 'auto' or a template using {firstauthor}, {year}, {titleword}
        #[arg(long, default_value = "auto")]
        convention: String,
    },

    /// Append a BibTeX entry to a .bib file
    #[command(name = "add-entry")]
    AddEntry {
        /// Path to the .bib file
        bib: PathBuf,

        /// File containing the entry, or '-' for stdin
        #[arg(default_value = "-")]
        entry: String,
    },

    /// Suggest the citation command replacing a bare citation
    Suggest {
        /// The bare citation text, e.g. "Conley and Udry (2010)"
        citation: String,

        /// The resolved BibTeX key
        #[arg(long, short)]
        key: String,

        /// Target document type
        #[arg(long, value_enum, default_value_t = DocType::Qmd)]
        doc_type: DocType,

        /// For LaTeX, use biblatex (\textcite/\parencite) instead of natbib
        #[arg(long)]
        biblatex: bool,
    },

    /// Normalise a .bib file for journal submission
    Clean {
        /// Path to the .bib file
        path: PathBuf,

        /// Print the cleaned file instead of rewriting it
        #[arg(long, short = 'n')]
        dry_run: bool,
    },

    /// Search CrossRef for scholarly works
    #[command(alias = "s")]
    Search {
        /// Free-text bibliographic query
        query: Option<String>,

        /// Author name filter
        #[arg(long, short)]
        author: Option<String>,

        /// Title filter
        #[arg(long, short)]
        title: Option<String>,

        /// Publication year (exact)
        #[arg(long, short)]
        year: Option<i32>,

        /// Work type, e.g. journal-article
        #[arg(long = "type")]
        work_type: Option<String>,

        /// Maximum number of results
        #[arg(long, short, default_value_t = 5)]
        rows: usize,
    },

    /// Show the full CrossRef metadata record for a DOI
    Metadata {
        /// Digital Object Identifier
        doi: String,
    },

    /// Fetch the BibTeX entry for a DOI
    Bibtex {
        /// Digital Object Identifier
        doi: String,
    },

    /// Find the published journal version of a working paper
    #[command(name = "find-published")]
    FindPublished {
        /// Title of the working paper
        title: String,

        /// Primary author
        #[arg(long, short)]
        author: Option<String>,

        /// Year the working paper was released
        #[arg(long, short)]
        year: Option<i32>,
    },

    /// Run the MCP server
    #[command(alias = "mcp")]
    Serve {
        /// Tools to expose
        #[arg(long, value_enum, default_value_t = ServeToolset::All)]
        toolset: ServeToolset,

        /// Run in HTTP mode instead of stdio
        #[arg(long)]
        http: bool,

        /// Port for HTTP mode
        #[arg(long, short, default_value_t = 3000)]
        port: u16,

        /// Host to bind to for HTTP mode
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },

    /// Show the effective configuration
    Show,

    /// Print the configuration file location
    Path,
}

fn init_logging(cli: &Cli, logging: &LoggingConfig) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("manuscript_tools={}", level)));

    // Logs go to stderr so stdio MCP transport and JSON output stay clean
    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.is_json() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        // `config init` must work even when the existing file is broken
        Err(e) if matches!(cli.command, Commands::Config(_)) => {
            eprintln!("Ignoring unreadable configuration: {}", e);
            Config::default()
        }
        Err(e) => return Err(e).context("Failed to load configuration"),
    };
    if let Some(timeout) = cli.timeout {
        config.crossref.timeout_secs = timeout;
    }

    init_logging(&cli, &config.logging);

    let format = cli.output.resolve();

    match cli.command {
        Commands::Scan { path } => {
            let citations = scan_bare_citations(&path)?;
            output_citations(&citations, format, cli.quiet)?;
        }

        Commands::ParseBib { path } => {
            let index = bibtex::parse_bib(&path)?;
            match format {
                OutputFormat::Json => print_json(&index)?,
                _ => {
                    let mut table = new_table(vec!["Author-Year", "Key", "Type", "Title"]);
                    for (author_year, entries) in &index {
                        for entry in entries {
                            table.add_row(vec![
                                Cell::new(author_year).add_attribute(Attribute::Bold),
                                Cell::new(&entry.key),
                                Cell::new(&entry.entry_type),
                                Cell::new(ui::truncate_with_ellipsis(&entry.title, 60)),
                            ]);
                        }
                    }
                    println!("{table}");
                }
            }
        }

        Commands::Rekey {
            entry,
            bib,
            mut existing,
            convention,
        } => {
            let entry = read_input(&entry)?;
            if let Some(bib) = bib {
                let content = std::fs::read_to_string(&bib)
                    .with_context(|| format!("Failed to read {}", bib.display()))?;
                existing.extend(bibtex::existing_keys(&content));
            }
            let convention: KeyConvention = convention.parse().unwrap_or_default();
            println!("{}", bibtex::rekey_entry(&entry, &existing, &convention)?);
        }

        Commands::AddEntry { bib, entry } => {
            let entry = read_input(&entry)?;
            let message = bibtex::add_entry(&bib, &entry)?;
            match format {
                OutputFormat::Json => {
                    print_json(&serde_json::json!({ "status": "success", "message": message }))?
                }
                _ if !cli.quiet => ui::print_status(Status::Success, &message),
                _ => {}
            }
        }

        Commands::Suggest {
            citation,
            key,
            doc_type,
            biblatex,
        } => {
            let dialect = match doc_type {
                DocType::Qmd => Dialect::Quarto,
                DocType::Tex if biblatex => Dialect::Biblatex,
                DocType::Tex => Dialect::Natbib,
            };
            let replacement =
                bibtex::suggest_replacement(&Citation::from_text(&citation), &key, dialect);
            match format {
                OutputFormat::Json => print_json(&replacement)?,
                _ => {
                    println!("{}", replacement.replacement);
                    if !replacement.notes.is_empty() && !cli.quiet {
                        eprintln!("{}", replacement.notes.dimmed());
                    }
                }
            }
        }

        Commands::Clean { path, dry_run } => {
            let report = bibtex::clean_bib(&path)?;
            if format == OutputFormat::Json {
                print_json(&report)?;
            } else if dry_run {
                print!("{}", report.output);
            }

            if !dry_run {
                let backup = bibtex::write_cleaned(&path, &report)?;
                if format != OutputFormat::Json && !cli.quiet {
                    ui::print_status(
                        Status::Success,
                        &format!(
                            "Cleaned {} entries in {} (backup: {})",
                            report.entries,
                            path.display(),
                            backup.display()
                        ),
                    );
                }
            }

            if format != OutputFormat::Json {
                for warning in &report.warnings {
                    eprintln!("{} {}", ui::status_icon(Status::Warning).yellow(), warning);
                }
            }
        }

        Commands::Search {
            query,
            author,
            title,
            year,
            work_type,
            rows,
        } => {
            let mut work_query = WorkQuery::new(query.unwrap_or_default()).rows(rows);
            if let Some(author) = author {
                work_query = work_query.author(author);
            }
            if let Some(title) = title {
                work_query = work_query.title(title);
            }
            if let Some(year) = year {
                work_query = work_query.year(year);
            }
            if let Some(work_type) = work_type {
                work_query = work_query.work_type(work_type);
            }
            if !work_query.has_terms() {
                anyhow::bail!("At least one of query, --author, or --title is required.");
            }

            let source = crossref(&config)?;
            let spinner = spinner(format, "Searching CrossRef...");
            let works = match source.search(&work_query).await {
                Ok(works) => {
                    spinner.clear();
                    works
                }
                Err(e) => {
                    spinner.finish_with_error("Search failed");
                    return Err(e.into());
                }
            };
            output_works(&works, format)?;
        }

        Commands::Metadata { doi } => {
            let source = crossref(&config)?;
            let metadata = source.get_metadata(&doi).await?;
            print_json(&metadata)?;
        }

        Commands::Bibtex { doi } => {
            let source = crossref(&config)?;
            let spinner = spinner(format, "Fetching BibTeX...");
            let bibtex = source.get_bibtex(&doi).await;
            spinner.clear();
            println!("{}", bibtex?.trim());
        }

        Commands::FindPublished {
            title,
            author,
            year,
        } => {
            let source = crossref(&config)?;
            let spinner = spinner(format, "Looking for a published version...");
            let found = find_published_version(&source, &title, author.as_deref(), year).await;
            spinner.clear();

            match (found?, format) {
                (found, OutputFormat::Json) => print_json(&found)?,
                (None, _) => ui::print_status(Status::Info, "No confident match found"),
                (Some(found), _) => {
                    output_works(std::slice::from_ref(&found.work), format)?;
                    println!("Title similarity: {:.2}", found.similarity);
                    if let Some(bibtex) = &found.bibtex {
                        ui::print_source_block("BibTeX", bibtex.trim());
                    }
                }
            }
        }

        Commands::Serve {
            toolset,
            http,
            port,
            host,
        } => {
            let registry = build_registry(&config, toolset)?;
            tracing::info!(
                "Serving {} tools: {}",
                registry.len(),
                registry
                    .all()
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            let server = McpServer::new(&registry)?;

            if http {
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

        Commands::Config(command) => run_config_command(command, &cli.config, &config)?,

        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "manuscript-tools",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

fn crossref(config: &Config) -> Result<CrossRefSource> {
    config
        .crossref
        .build_source()
        .context("CrossRef is not configured")
}

fn build_registry(config: &Config, toolset: ServeToolset) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    if matches!(toolset, ServeToolset::Bibtex | ServeToolset::All) {
        registry = registry.with_bibtex_tools();
    }
    if matches!(toolset, ServeToolset::Crossref | ServeToolset::All) {
        match config.crossref.build_source() {
            Ok(source) => {
                registry = registry.with_crossref_tools(Arc::new(source) as Arc<dyn Source>);
            }
            Err(e) if toolset == ServeToolset::All => {
                tracing::warn!(
                    "{} tools disabled: {}",
                    Toolset::Crossref.as_str(),
                    e
                );
            }
            Err(e) => return Err(e).context("CrossRef is not configured"),
        }
    }
    Ok(registry)
}

fn run_config_command(
    command: ConfigCommands,
    explicit_path: &Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    let path = explicit_path
        .clone()
        .or_else(default_config_path)
        .context("Could not determine the configuration directory")?;

    match command {
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            ConfigFile::create_default(&path).save()?;
            ui::print_status(
                Status::Success,
                &format!("Wrote default configuration to {}", path.display()),
            );
            println!(
                "Set [crossref] mailto there, or export {}, before using the CrossRef tools.",
                MAILTO_ENV
            );
        }
        ConfigCommands::Show => {
            let file = ConfigFile {
                path,
                config: config.clone(),
            };
            print!("{}", file.to_toml()?);
            match config.crossref.mailto() {
                Some(mailto) => eprintln!("# effective mailto: {}", mailto),
                None => eprintln!("# mailto is not set"),
            }
        }
        ConfigCommands::Path => {
            let exists = if path.exists() { "" } else { " (not created)" };
            println!("{}{}", path.display(), exists);
        }
    }
    Ok(())
}

/// Read a whole file, or stdin for `-`
fn read_input(arg: &str) -> Result<String> {
    if arg == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(Path::new(arg)).with_context(|| format!("Failed to read {}", arg))
    }
}

fn spinner(format: OutputFormat, msg: &str) -> Spinner {
    if format == OutputFormat::Table {
        Spinner::new(msg)
    } else {
        Spinner::hidden()
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(header);
    table
}

fn output_citations(citations: &[Citation], format: OutputFormat, quiet: bool) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(citations)?,
        OutputFormat::Plain => {
            for c in citations {
                println!(
                    "{}:{}\t{}\t{}",
                    c.line, c.column, c.citation_type, c.text
                );
            }
        }
        _ => {
            if citations.is_empty() {
                if !quiet {
                    ui::print_status(Status::Success, "No bare citations found");
                }
                return Ok(());
            }
            let text_width = ui::terminal_width().saturating_sub(60).max(20);
            let mut table = new_table(vec!["Line", "Col", "Type", "Citation", "Authors", "Year"]);
            for c in citations {
                table.add_row(vec![
                    Cell::new(c.line),
                    Cell::new(c.column),
                    Cell::new(c.citation_type),
                    Cell::new(ui::truncate_with_ellipsis(&c.text, text_width))
                        .add_attribute(Attribute::Bold),
                    Cell::new(c.authors.join(", ")),
                    Cell::new(&c.year),
                ]);
            }
            println!("{table}");
            if !quiet {
                ui::print_status(
                    Status::Search,
                    &format!("{} bare citations", citations.len()),
                );
            }
        }
    }
    Ok(())
}

fn output_works(works: &[Work], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(works)?,
        OutputFormat::Plain => {
            for work in works {
                println!(
                    "{} ({}) {}",
                    work.family_names().join(", "),
                    work.year.map(|y| y.to_string()).unwrap_or_default(),
                    work.title
                );
                if let Some(doi) = &work.doi {
                    println!("  DOI: {}", doi);
                }
                println!("  Confidence: {}", work.confidence_score);
                println!();
            }
        }
        _ => {
            let mut table = new_table(vec!["Title", "Authors", "Year", "Journal", "DOI", "Score"]);
            for work in works {
                table.add_row(vec![
                    Cell::new(ui::truncate_with_ellipsis(&work.title, 50))
                        .add_attribute(Attribute::Bold),
                    Cell::new(ui::truncate_with_ellipsis(&work.family_names().join(", "), 30)),
                    Cell::new(work.year.map(|y| y.to_string()).unwrap_or_default()),
                    Cell::new(ui::truncate_with_ellipsis(&work.journal, 30)),
                    Cell::new(work.doi.as_deref().unwrap_or_default()),
                    Cell::new(work.confidence_score),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
