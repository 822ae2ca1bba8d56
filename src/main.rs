//! # RAYA CLI (`raya`)
//!
//! ## Usage
//!
//! ```bash
//! raya --config ./config/raya.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `raya ask "<query>"` | Answer one question through the waterfall |
//! | `raya chat` | Interactive session |
//! | `raya news <topic>` | Topic headlines from the configured feeds |
//! | `raya route "<query>"` | Show the routing decision and detected intents |
//! | `raya cache list` | List cached answers |
//! | `raya cache get "<query>"` | Show one cached answer |
//! | `raya sources` | List sources and their status |
//! | `raya completions <shell>` | Print shell completions |
//!
//! Log verbosity follows `RAYA_LOG` (e.g. `RAYA_LOG=raya=debug`), or
//! `--verbose` for debug output. Logs go to stderr.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use raya::cache::{AnswerCache, JsonFileCache, MemoryCache};
use raya::chat::ChatSession;
use raya::config::{self, Config};
use raya::intent::{detect_intents, format_intents, Intent};
use raya::orchestrator::Orchestrator;
use raya::router::Router;
use raya::source_news::NewsSource;
use raya::source_wikipedia::WikipediaSource;
use raya::text::normalize_query;
use raya::traits::AskContext;

const DEFAULT_CONFIG: &str = "./config/raya.toml";

/// RAYA: a personal-assistant answer engine.
///
/// Questions go through a cache, a local model, a pipeline of lookup
/// sources (knowledge file, notes, Wikipedia, web, news, arXiv) and an
/// optional cloud model.
#[derive(Parser)]
#[command(name = "raya", version, about = "RAYA: cache, local model, lookup pipeline and cloud fallback")]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/raya.toml`; built-in defaults are used when
    /// that default file does not exist.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Enable debug logging on stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question.
    Ask {
        /// The question.
        query: String,

        /// Intent tags gating the news and research stages. Detected from
        /// the query when omitted.
        #[arg(long = "intent")]
        intents: Vec<Intent>,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,

        /// Use a throwaway in-memory cache instead of the cache file.
        #[arg(long)]
        no_cache: bool,
    },

    /// Start an interactive chat session.
    Chat,

    /// List headlines about a topic.
    News {
        /// Topic words, e.g. `mars` or `climate change`.
        #[arg(required = true)]
        topic: Vec<String>,
    },

    /// Show how a query would be routed.
    Route {
        query: String,
    },

    /// Inspect the answer cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// List sources and their status.
    Sources,

    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List every cached entry.
    List,
    /// Show the cached entry for a query.
    Get { query: String },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("raya=debug")
    } else {
        EnvFilter::try_from_env("RAYA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load(path: &Path) -> Result<Config> {
    if path == Path::new(DEFAULT_CONFIG) && !path.exists() {
        tracing::debug!("no config file, using built-in defaults");
        return Ok(Config::default());
    }
    config::load_config(path)
}

fn print_result<C: AnswerCache>(
    orchestrator: &mut Orchestrator<C>,
    query: &str,
    ctx: &AskContext,
    json: bool,
) -> Result<()> {
    let result = orchestrator.ask(query, ctx);
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.text());
    }
    Ok(())
}

fn news_source(cfg: &Config) -> Result<Option<NewsSource>> {
    if !cfg.news.enabled {
        return Ok(None);
    }
    let fallback = if cfg.wikipedia.enabled {
        Some(WikipediaSource::new(&cfg.wikipedia)?)
    } else {
        None
    };
    Ok(Some(NewsSource::new(&cfg.news, fallback)?))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "raya", &mut io::stdout());
        return Ok(());
    }

    let cfg = load(&cli.config)?;

    match cli.command {
        Commands::Ask {
            query,
            intents,
            json,
            no_cache,
        } => {
            let ctx = AskContext::with_intents(intents);
            if no_cache {
                let mut orchestrator = Orchestrator::from_config(&cfg, MemoryCache::new())?;
                print_result(&mut orchestrator, &query, &ctx, json)?;
            } else {
                let cache = JsonFileCache::open(&cfg.cache.path);
                let mut orchestrator = Orchestrator::from_config(&cfg, cache)?;
                print_result(&mut orchestrator, &query, &ctx, json)?;
            }
        }
        Commands::Chat => {
            let cache = JsonFileCache::open(&cfg.cache.path);
            let mut orchestrator = Orchestrator::from_config(&cfg, cache)?;
            let news = news_source(&cfg)?;
            let mut session = ChatSession::new(&mut orchestrator, news.as_ref());
            session.run(io::stdin().lock(), io::stdout())?;
        }
        Commands::News { topic } => {
            let topic = topic.join(" ");
            let Some(news) = news_source(&cfg)? else {
                anyhow::bail!("news feeds are disabled in the configuration");
            };
            let headlines = news.topic_headlines(&topic);
            if headlines.is_empty() {
                println!("No headlines found for '{}'.", topic);
            }
            for (i, h) in headlines.iter().enumerate() {
                println!("{}. {}", i + 1, h);
            }
        }
        Commands::Route { query } => {
            let cloud = raya::backend::OpenAIBackend::new(&cfg.cloud)?;
            let router = Router::new(cloud.is_enabled(), &cfg.router);
            let decision = router.explain(&query);
            println!("route:   {}", decision.route);
            println!("reason:  {}", decision.reason);
            println!("intents: {}", format_intents(&detect_intents(&query)));
        }
        Commands::Cache { action } => {
            let cache = JsonFileCache::open(&cfg.cache.path);
            match action {
                CacheAction::List => {
                    let entries = cache.entries();
                    if entries.is_empty() {
                        println!("Cache is empty ({}).", cache.path().display());
                    }
                    for e in entries {
                        let stale = if e.is_stale() { "  [stale]" } else { "" };
                        println!("{:<40} {:<14} {:.2}{}", e.key, e.source, e.confidence, stale);
                    }
                }
                CacheAction::Get { query } => {
                    let key = normalize_query(&query);
                    match cache.entries().into_iter().find(|e| e.key == key) {
                        Some(e) => {
                            println!("key:        {}", e.key);
                            println!("source:     {}", e.source);
                            println!("confidence: {:.2}", e.confidence);
                            if let Some(at) = e.cached_at {
                                println!("cached_at:  {}", at.to_rfc3339());
                            }
                            if e.is_stale() {
                                println!("stale:      true (will be recomputed)");
                            }
                            println!();
                            println!("{}", e.text);
                        }
                        None => println!("No cached answer for '{}'.", key),
                    }
                }
            }
        }
        Commands::Sources => {
            raya::sources::list_sources(&cfg)?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
