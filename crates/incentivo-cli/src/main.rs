//! Incentivo CLI - ask questions about the Lei do Bem

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use incentivo_core::answer::AnswerGenerator;
use incentivo_core::config::Config;
use incentivo_core::evidence::{GitFetcher, RepositoryEvidence};
use incentivo_core::graph::{GraphContextLookup, Neo4jGraphStore};
use incentivo_core::llm;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "incentivo")]
#[command(author, version, about = "Answers questions about the Lei do Bem", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Quiet mode (print only the answer)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question (prompts for it when omitted)
    Ask {
        /// The question
        question: Option<String>,
        /// Repository URL to search for supporting evidence
        #[arg(short, long)]
        repo: Option<String>,
        /// Print the composed prompt instead of calling the model
        #[arg(long)]
        dry_run: bool,
    },

    /// Ask questions interactively until EOF or `sair`
    Chat {
        /// Repository URL to search for supporting evidence
        #[arg(short, long)]
        repo: Option<String>,
    },

    /// Check connectivity to the graph store
    Ping,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to load .env: {}", e);
        }
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask {
            question,
            repo,
            dry_run,
        } => cmd_ask(question, repo.as_deref(), dry_run, cli.quiet).await,
        Commands::Chat { repo } => cmd_chat(repo.as_deref(), cli.quiet).await,
        Commands::Ping => cmd_ping(cli.quiet).await,
        Commands::Config { action } => cmd_config(action, cli.quiet),
    }
}

/// Used when `RUST_LOG` is unset, empty or unparsable
const DEFAULT_LOG_DIRECTIVE: &str = "incentivo_core=info";

fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
}

// ============================================================================
// Wiring
// ============================================================================

/// Graph driver plus the generator that borrows it
struct Session {
    store: Arc<Neo4jGraphStore>,
    generator: AnswerGenerator,
}

impl Session {
    async fn open(config: &Config) -> anyhow::Result<Self> {
        let store = Arc::new(
            Neo4jGraphStore::from_config(&config.graph)
                .await
                .context("Failed to open the graph store")?,
        );
        let completion = llm::from_config(&config.llm)?;
        let evidence =
            RepositoryEvidence::new(Arc::new(GitFetcher), config.repository.scan_settings());
        let generator = AnswerGenerator::new(
            GraphContextLookup::new(store.clone()),
            evidence,
            completion,
            config.repository.cache_dir.clone(),
        );
        Ok(Self { store, generator })
    }

    fn close(self) {
        let Session { store, generator } = self;
        drop(generator);
        match Arc::try_unwrap(store) {
            Ok(store) => store.close(),
            Err(_) => debug!("Graph store still shared at shutdown"),
        }
    }
}

fn print_answer(answer: &str, quiet: bool) {
    if quiet {
        println!("{}", answer);
    } else {
        println!("\nResposta:\n{}", answer);
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_ask(
    question: Option<String>,
    repo: Option<&str>,
    dry_run: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let question = match question {
        Some(q) => q,
        None => {
            let mut editor = DefaultEditor::new().context("Failed to initialize line editor")?;
            editor.readline(">> ").context("Failed to read question")?
        }
    };
    if question.trim().is_empty() {
        return Err(incentivo_core::Error::InvalidInput("question cannot be empty".to_string()).into());
    }

    let config = Config::load()?;
    let session = Session::open(&config).await?;

    let result = if dry_run {
        session
            .generator
            .compose_prompt(&question, repo)
            .await
            .map(|prompt| println!("{}", prompt))
    } else {
        session
            .generator
            .answer(&question, repo)
            .await
            .map(|answer| print_answer(&answer, quiet))
    };

    session.close();
    Ok(result?)
}

async fn cmd_chat(repo: Option<&str>, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let session = Session::open(&config).await?;
    let mut editor = DefaultEditor::new().context("Failed to initialize line editor")?;

    if !quiet {
        println!("Pergunte sobre a Lei do Bem. Digite `sair` para encerrar.");
    }

    loop {
        let line = match editor.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Eof) => break,
            Err(ReadlineError::Interrupted) => continue,
            Err(e) => {
                session.close();
                return Err(anyhow::anyhow!("readline error: {}", e));
            }
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "sair" | "exit" | "quit") {
            break;
        }
        if let Err(e) = editor.add_history_entry(question) {
            warn!(error = %e, "Failed to record history entry");
        }

        match session.generator.answer(question, repo).await {
            Ok(answer) => print_answer(&answer, quiet),
            Err(e) => {
                session.close();
                return Err(e.into());
            }
        }
    }

    session.close();
    Ok(())
}

async fn cmd_ping(quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = Neo4jGraphStore::from_config(&config.graph)
        .await
        .context("Failed to open the graph store")?;

    store
        .verify_connectivity()
        .await
        .with_context(|| format!("Graph store at {} is unreachable", store.uri()))?;

    if !quiet {
        println!("[OK] Graph store reachable at {}", store.uri());
    }
    store.close();
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
