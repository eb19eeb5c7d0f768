//! Command-line front end for quad repositories stored in JSON snapshots.
#![forbid(unsafe_code)]

#[path = "quads/config.rs"]
mod config;
#[path = "quads/ui.rs"]
mod ui;

use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::Serialize;
use sombra_quads::codec::{format_nquads_line, parse_nquads_line};
use sombra_quads::index::IndexDef;
use sombra_quads::logging::init_logging;
use sombra_quads::{
    BatchReport, BatchStatus, MemoryStore, NTriplesCodec, Pattern, QuadError, QuadRepository,
    ReadOptions, Staleness, Statement, TermCodec,
};
use tracing::debug;

use config::CliConfig;
use ui::{Theme, Ui};

const DEFAULT_STORE: &str = "quads.json";

#[derive(Parser, Debug)]
#[command(
    name = "quads",
    version,
    about = "Query and maintain quad repositories",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "QUADS_STORE",
        value_name = "FILE",
        help = "JSON snapshot holding the repository (default: quads.json)"
    )]
    store: Option<PathBuf>,

    #[arg(long, global = true, value_name = "FILE", help = "Configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = Theme::Auto,
        help = "Color theme for text output"
    )]
    theme: Theme,

    #[arg(
        long,
        global = true,
        env = "QUADS_LOG",
        value_name = "FILTER",
        help = "Tracing filter, e.g. info or sombra_quads=debug"
    )]
    log_level: Option<String>,

    #[arg(
        long,
        global = true,
        help = "Allow reads from indexes that lag recent writes"
    )]
    stale: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Create the snapshot and persist index definitions")]
    Init {
        #[arg(long, help = "Rewrite index definitions even when they match")]
        force: bool,
    },

    #[command(about = "Insert statements from an N-Quads file")]
    Import {
        #[arg(value_name = "NQUADS")]
        file: PathBuf,
    },

    #[command(about = "Print statements matching a pattern")]
    Query(PatternArgs),

    #[command(about = "Count statements matching a pattern")]
    Count(PatternArgs),

    #[command(about = "Delete statements matching a pattern")]
    Delete(PatternArgs),

    #[command(about = "Delete every statement")]
    Clear,

    #[command(about = "Show the index access a pattern resolves to")]
    Explain(PatternArgs),

    #[command(about = "List index definitions and subset coverage")]
    Indexes,

    #[command(about = "Check every record is reachable through the full-scan index")]
    Audit,

    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Command {
    /// Whether the command's writes belong in the snapshot. Read-only
    /// commands still verify index definitions, but only in memory.
    fn persists(&self) -> bool {
        matches!(
            self,
            Command::Init { .. } | Command::Import { .. } | Command::Delete(_) | Command::Clear
        )
    }
}

#[derive(Args, Debug, Default)]
struct PatternArgs {
    #[arg(short = 's', long, value_name = "TERM", help = "Subject in N-Triples syntax")]
    subject: Option<String>,

    #[arg(short = 'p', long, value_name = "TERM", help = "Predicate in N-Triples syntax")]
    predicate: Option<String>,

    #[arg(short = 'o', long, value_name = "TERM", help = "Object in N-Triples syntax")]
    object: Option<String>,

    #[arg(
        short = 'c',
        long,
        value_name = "TERM",
        help = "Graph context in N-Triples syntax; an empty value selects the default graph"
    )]
    context: Option<String>,
}

impl PatternArgs {
    fn to_pattern(&self, codec: &NTriplesCodec) -> Result<Pattern, QuadError> {
        let mut pattern = Pattern::any();
        if let Some(term) = &self.subject {
            pattern = pattern.subject(codec.decode(term)?);
        }
        if let Some(term) = &self.predicate {
            pattern = pattern.predicate(codec.decode(term)?);
        }
        if let Some(term) = &self.object {
            pattern = pattern.object(codec.decode(term)?);
        }
        if let Some(term) = &self.context {
            pattern = pattern.context(codec.decode(term)?);
        }
        Ok(pattern)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct InitReport {
    store: PathBuf,
    design_id: String,
    indexes: usize,
    fingerprint: String,
    created: bool,
    updated: Vec<String>,
}

#[derive(Serialize)]
struct ImportReport {
    file: PathBuf,
    parsed: usize,
    inserted: usize,
    failed: usize,
    status: BatchStatus,
}

#[derive(Serialize)]
struct StatementRow {
    identity: Option<String>,
    nquads: String,
}

#[derive(Serialize)]
struct CountReport {
    count: u64,
}

#[derive(Serialize)]
struct RemovalReport {
    deleted: usize,
    failed: usize,
    skipped: usize,
    status: BatchStatus,
}

impl From<&BatchReport> for RemovalReport {
    fn from(report: &BatchReport) -> Self {
        Self {
            deleted: report.succeeded(),
            failed: report.failures().count(),
            skipped: report.skipped.len(),
            status: report.status(),
        }
    }
}

#[derive(Serialize)]
struct CoverageRow {
    subset: String,
    index: String,
    order: Vec<String>,
}

#[derive(Serialize)]
struct IndexesReport<'a> {
    fingerprint: String,
    indexes: &'a [IndexDef],
    coverage: Vec<CoverageRow>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    if let Command::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "quads", &mut io::stdout());
        return Ok(());
    }

    let config = CliConfig::load(cli.config.clone())?;
    if let Some(level) = cli.log_level.as_deref().or(config.log_level()) {
        init_logging(level)?;
    }
    if let Some(path) = config.path() {
        debug!(path = %path.display(), "cli.config.resolved");
    }
    let ui = Ui::new(cli.theme);
    let store_path = cli
        .store
        .clone()
        .or_else(|| config.store().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE));

    let store = Arc::new(open_store(&store_path)?);
    let mut options = config.repository().clone();
    if cli.stale {
        options.staleness = Staleness::Ok;
    }
    if matches!(cli.command, Command::Init { force: true }) {
        options.force_index_refresh = true;
    }
    let repo = QuadRepository::open(store.clone(), options)?;
    let codec = NTriplesCodec::new();
    let reads = ReadOptions::with_staleness(repo.options().staleness);

    match &cli.command {
        Command::Init { .. } => {
            let maintenance = repo.last_maintenance().clone();
            let report = InitReport {
                store: store_path.clone(),
                design_id: repo.options().design_id.clone(),
                indexes: repo.catalog().definitions().len(),
                fingerprint: format!("{:016x}", maintenance.fingerprint),
                created: maintenance.created,
                updated: maintenance.updated,
            };
            emit(cli.format, &report, || {
                ui.success(&format!("repository ready at {}", report.store.display()));
                ui.section(
                    "Indexes",
                    [
                        ("design", report.design_id.clone()),
                        ("definitions", report.indexes.to_string()),
                        ("fingerprint", report.fingerprint.clone()),
                    ],
                );
            })?;
        }
        Command::Import { file } => {
            let mut statements = read_nquads(file)?;
            let batch = repo.insert(&mut statements)?;
            let report = ImportReport {
                file: file.clone(),
                parsed: statements.len(),
                inserted: batch.succeeded(),
                failed: batch.failures().count(),
                status: batch.status(),
            };
            emit(cli.format, &report, || {
                ui.success(&format!(
                    "imported {} of {} statements from {}",
                    report.inserted,
                    report.parsed,
                    report.file.display()
                ));
                if report.failed > 0 {
                    ui.warn(&format!("{} statements were rejected", report.failed));
                }
            })?;
        }
        Command::Query(args) => {
            let statements = repo.query_with(&args.to_pattern(&codec)?, reads)?;
            let rows: Vec<StatementRow> = statements
                .iter()
                .map(|statement| StatementRow {
                    identity: statement.identity().map(|id| id.to_string()),
                    nquads: format_nquads_line(statement.quad()),
                })
                .collect();
            emit(cli.format, &rows, || {
                for row in &rows {
                    println!("{}", row.nquads);
                }
            })?;
        }
        Command::Count(args) => {
            let report = CountReport {
                count: repo.count_with(&args.to_pattern(&codec)?, reads)?,
            };
            emit(cli.format, &report, || println!("{}", report.count))?;
        }
        Command::Delete(args) => {
            let mut matched = repo.query_with(&args.to_pattern(&codec)?, ReadOptions::default())?;
            let batch = repo.delete(&mut matched)?;
            print_removal(cli.format, &ui, "deleted", &batch)?;
        }
        Command::Clear => {
            let batch = repo.clear()?;
            print_removal(cli.format, &ui, "cleared", &batch)?;
        }
        Command::Explain(args) => {
            let resolved = repo.explain(&args.to_pattern(&codec)?)?;
            emit(cli.format, &resolved, || println!("{resolved}"))?;
        }
        Command::Indexes => {
            let catalog = repo.catalog();
            let report = IndexesReport {
                fingerprint: format!("{:016x}", catalog.fingerprint()),
                indexes: catalog.definitions(),
                coverage: catalog
                    .coverage_table()
                    .map(|(subset, coverage)| CoverageRow {
                        subset: subset.to_string(),
                        index: coverage.index.name.clone(),
                        order: coverage.order.iter().map(|f| f.to_string()).collect(),
                    })
                    .collect(),
            };
            emit(cli.format, &report, || {
                ui.list(
                    "Definitions",
                    report.indexes.iter().map(|def| {
                        let fields: Vec<String> =
                            def.fields().iter().map(|f| f.to_string()).collect();
                        let reduce = if def.supports_count() { " +count" } else { "" };
                        format!("{} [{}]{reduce}", def.name, fields.join(", "))
                    }),
                );
                ui.list(
                    "Coverage",
                    report.coverage.iter().map(|row| {
                        format!("{} -> {} [{}]", row.subset, row.index, row.order.join(", "))
                    }),
                );
                ui.info(&format!("fingerprint {}", report.fingerprint));
            })?;
        }
        Command::Audit => {
            let report = repo.audit()?;
            emit(cli.format, &report, || {
                ui.section(
                    "Audit",
                    [
                        ("records", report.records.to_string()),
                        ("indexed", report.indexed.to_string()),
                    ],
                );
                if report.is_consistent() {
                    ui.success("every record is indexed");
                } else {
                    ui.list(
                        "Unindexed",
                        report.unindexed.iter().map(|id| id.to_string()),
                    );
                }
            })?;
        }
        Command::Completions { .. } => {}
    }

    if cli.command.persists() && store.stats().write_requests() > 0 {
        store.save(&store_path)?;
        debug!(path = %store_path.display(), "cli.store.saved");
    }
    Ok(())
}

fn open_store(path: &Path) -> Result<MemoryStore, QuadError> {
    if path.exists() {
        MemoryStore::load(path)
    } else {
        Ok(MemoryStore::new())
    }
}

fn read_nquads(path: &Path) -> Result<Vec<Statement>, Box<dyn Error>> {
    let reader = BufReader::new(File::open(path)?);
    let mut statements = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let parsed = parse_nquads_line(&line)
            .map_err(|err| format!("{}:{}: {err}", path.display(), index + 1))?;
        if let Some(quad) = parsed {
            statements.push(Statement::new(quad));
        }
    }
    Ok(statements)
}

fn print_removal(
    format: OutputFormat,
    ui: &Ui,
    verb: &str,
    batch: &BatchReport,
) -> Result<(), Box<dyn Error>> {
    let report = RemovalReport::from(batch);
    emit(format, &report, || {
        ui.success(&format!("{verb} {} statements", report.deleted));
        if report.failed > 0 {
            ui.warn(&format!("{} deletions failed", report.failed));
        }
    })
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}
