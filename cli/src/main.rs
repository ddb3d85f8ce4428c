//! Alchemist CLI - Binary entry point.
//!
//! # Architecture
//!
//! The CLI wires [`alchemist_config`] (preferences), [`alchemist_engine`]
//! (catalog, ledger, orchestration) and [`alchemist_workbench`] (surface
//! state) together for one command per invocation.
//!
//! ```text
//! main() -> Cli::parse() -> Runtime::open() -> fetch catalog + seed basics -> command
//! ```
//!
//! `play` drives a headless workbench: both elements are dropped onto the
//! surface, and the workbench is ticked until the result has materialized.

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use alchemist_config::{AlchemistConfig, SessionKey, persist_session_value};
use alchemist_engine::alchemist_oracle::retry::RetryConfig;
use alchemist_engine::{
    CombinationResult, DiscoveryLedger, Element, ElementId, FallbackPolicy, HttpOracle, Language,
    LibraryQuery, LibrarySort, OracleSettings, Orchestrator, PlayerName, SessionContext, Store,
};
use alchemist_types::{Bounds, Offset, Position, Size, sanitize_display_text};
use alchemist_workbench::{Workbench, WorkbenchNotice, WorkbenchSettings};

const TICK_INTERVAL: Duration = Duration::from_millis(50);

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: prefer no logs over interleaving them with command output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.alchemist/logs/alchemist.log
    if let Some(config_path) = AlchemistConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("alchemist.log"));
    }

    // Fallback: ./.alchemist/logs/alchemist.log
    candidates.push(PathBuf::from(".alchemist").join("logs").join("alchemist.log"));

    candidates
}

#[derive(Debug, Parser)]
#[command(name = "alchemist", version, about = "Combine elements and discover new ones")]
struct Cli {
    /// Language for this run only (overrides the configured one).
    #[arg(long, global = true)]
    lang: Option<String>,

    /// Player name for this run only.
    #[arg(long, global = true)]
    player: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every element known for the current language.
    Elements,
    /// List your discoveries.
    Discoveries {
        #[arg(long)]
        search: Option<String>,
        /// name, newest or oldest
        #[arg(long, default_value = "name")]
        sort: LibrarySort,
        /// Only the N most recently discovered.
        #[arg(long)]
        recent: Option<usize>,
    },
    /// Combine two elements by id.
    Combine { first: i64, second: i64 },
    /// Forget all discoveries for the current language.
    Reset,
    /// Set the default language.
    Language { code: String },
    /// Set the default player name. An empty name plays anonymously.
    Player { name: String },
    /// Drop two elements on a workbench and watch them combine.
    Play { first: i64, second: i64 },
}

struct Runtime {
    config: AlchemistConfig,
    session: SessionContext,
    store: Arc<Store>,
    orchestrator: Orchestrator<HttpOracle>,
}

impl Runtime {
    fn open(config: AlchemistConfig, session: SessionContext) -> Result<Self> {
        let data_dir = config
            .data_dir()
            .context("could not determine a data directory; set storage.data_dir")?;
        let ledger = DiscoveryLedger::open_in(&data_dir)?;
        let fallback = FallbackPolicy::new().with_persist_placeholders(config.persist_placeholders());
        let store = Arc::new(Store::new(ledger, fallback));

        let oracle = HttpOracle::new(OracleSettings {
            base_url: config.oracle_base_url(),
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            read_retry: RetryConfig::with_max_retries(config.max_read_retries()),
        })?;
        let orchestrator = Orchestrator::new(Arc::new(oracle), Arc::clone(&store))
            .with_page_size(config.page_size());

        Ok(Self {
            config,
            session,
            store,
            orchestrator,
        })
    }

    fn language(&self) -> &Language {
        self.session.language()
    }

    /// Load the catalog and make sure the basics are discovered.
    async fn start(&self) -> Vec<Element> {
        let elements = self.orchestrator.fetch_catalog(self.language()).await;
        self.store.seed_basics(self.language());
        elements
    }

    /// Print and clear the store's warning, if any.
    fn report_warning(&self) {
        if let Some(warning) = self.store.status().warning() {
            eprintln!("warning: {}", sanitize_display_text(&warning.to_string()));
            self.store.status().clear_warning();
        }
    }

    fn workbench_settings(&self) -> WorkbenchSettings {
        let (width, height) = self.config.surface_size();
        let offset = self.config.duplicate_offset();
        WorkbenchSettings {
            bounds: Bounds::new(width, height),
            element_size: Size::square(self.config.element_size()),
            display_interval: self.config.display_interval(),
            duplicate_offset: Offset::new(offset, offset),
            command_capacity: self.config.command_capacity(),
        }
    }
}

fn load_config() -> AlchemistConfig {
    match AlchemistConfig::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("warning: {e}; using defaults");
            tracing::warn!(path = %e.path().display(), "Ignoring unreadable config: {e}");
            AlchemistConfig::default()
        }
    }
}

fn session_from(cli: &Cli, config: &AlchemistConfig) -> Result<SessionContext> {
    let code = cli
        .lang
        .as_deref()
        .or(config.language())
        .unwrap_or(Language::DEFAULT_CODE);
    let language = Language::parse(code)?;
    let player = cli
        .player
        .as_deref()
        .or(config.player_name())
        .map(PlayerName::new)
        .unwrap_or_default();
    Ok(SessionContext::new(language, player))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config();

    match &cli.command {
        Command::Language { code } => {
            let language = Language::parse(code)?;
            persist_session_value(SessionKey::Language, language.as_str())
                .context("failed to save language")?;
            println!("Language set to {language}");
            return Ok(());
        }
        Command::Player { name } => {
            let player = PlayerName::new(name.as_str());
            persist_session_value(SessionKey::PlayerName, player.as_str())
                .context("failed to save player name")?;
            match player.as_option() {
                Some(name) => println!("Playing as {name}"),
                None => println!("Playing anonymously"),
            }
            return Ok(());
        }
        _ => {}
    }

    let session = session_from(&cli, &config)?;
    let runtime = Runtime::open(config, session)?;
    let elements = runtime.start().await;
    runtime.report_warning();

    match cli.command {
        Command::Elements => print_elements(&elements),
        Command::Discoveries {
            search,
            sort,
            recent,
        } => {
            let language = runtime.language();
            let discoveries = match recent {
                Some(n) => runtime.store.ledger().recent(language, n),
                None => {
                    let mut query = LibraryQuery::new().sort(sort);
                    if let Some(term) = search {
                        query = query.search(term);
                    }
                    runtime.store.library(language, &query)
                }
            };
            println!("{} discoveries ({language})", discoveries.len());
            print_elements(&discoveries);
        }
        Command::Combine { first, second } => {
            let result = runtime
                .orchestrator
                .combine(&runtime.session, ElementId::new(first), ElementId::new(second))
                .await;
            print_result(&result);
        }
        Command::Reset => {
            runtime.store.reset(runtime.language());
            println!(
                "Discoveries reset; {} basic elements remain",
                runtime.store.ledger().len(runtime.language())
            );
        }
        Command::Play { first, second } => play(&runtime, first, second).await?,
        Command::Language { .. } | Command::Player { .. } => {}
    }

    runtime.report_warning();
    Ok(())
}

fn print_elements(elements: &[Element]) {
    for element in elements {
        let marker = if element.is_basic() { " (basic)" } else { "" };
        println!("{:>6}  {}{marker}", element.id().value(), element.label());
    }
}

fn print_result(result: &CombinationResult) {
    let Some(element) = result.element() else {
        let error = result.error.as_deref().unwrap_or("nothing happened");
        println!("✗ {}", sanitize_display_text(error));
        return;
    };

    let mut line = format!("= {}", element.label());
    if result.is_fallback() {
        line.push_str("  (oracle unavailable; placeholder)");
    } else if result.is_first_discovery {
        line.push_str("  (first discovery ever!)");
    } else if result.is_new_discovery {
        line.push_str("  (new discovery)");
    }
    println!("{line}");
}

async fn play(runtime: &Runtime, first: i64, second: i64) -> Result<()> {
    let settings = runtime.workbench_settings();
    let mut workbench = Workbench::new(
        runtime.orchestrator.clone(),
        runtime.session.clone(),
        settings,
    );

    let origin = Position::new(settings.bounds.width / 3.0, settings.bounds.height / 3.0);
    let drop = Position::new(origin.x + settings.element_size.width / 4.0, origin.y);
    let a = workbench.drop_element(ElementId::new(first), origin);
    let b = workbench.drop_element(ElementId::new(second), drop);
    println!("placed {} at ({:.0}, {:.0})", a.instance, origin.x, origin.y);
    println!("placed {} at ({:.0}, {:.0})", b.instance, drop.x, drop.y);
    if b.pair.is_none() {
        bail!("the two elements did not land on each other");
    }

    loop {
        for notice in workbench.tick() {
            print_notice(&notice);
        }
        if workbench.is_idle() {
            break;
        }
        tokio::time::sleep(TICK_INTERVAL).await;
    }

    for instance in workbench.instances() {
        let position = instance.position();
        println!(
            "{} {} at ({:.0}, {:.0})",
            instance.id(),
            instance.element().label(),
            position.x,
            position.y
        );
    }
    Ok(())
}

fn print_notice(notice: &WorkbenchNotice) {
    match notice {
        WorkbenchNotice::Combined { result, .. } | WorkbenchNotice::Skipped { result, .. } => {
            print_result(result);
        }
        WorkbenchNotice::Declined { error, .. } => {
            println!("✗ {}", sanitize_display_text(error));
        }
        WorkbenchNotice::Materialized { instance, .. } => {
            println!("{instance} appeared on the workbench");
        }
        WorkbenchNotice::Resolved { element, .. } => {
            println!("resolved {}", element.label());
        }
        WorkbenchNotice::Unresolved { element_id } => {
            println!("element {element_id} is unknown; showing a placeholder");
        }
        WorkbenchNotice::Added { .. } | WorkbenchNotice::Cleared => {}
    }
}
