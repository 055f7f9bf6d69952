use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::server;
use skillmap_core::config::{self, AppConfig};
use skillmap_core::models::MatchResult;
use skillmap_core::pipeline::{self, validate_top_k};
use skillmap_core::sources;
use skillmap_core::taxonomy::TaxonomyStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => run_serve(cfg, bind).await,
        Commands::Extract {
            text,
            file,
            top_k,
            json,
        } => run_extract(cfg, text, file, top_k, json).await,
        Commands::Match {
            phrase,
            top_k,
            json,
        } => run_match(cfg, phrase, top_k, json).await,
        Commands::Taxonomy { list, json } => run_taxonomy(cfg, list, json),
    }
}

#[derive(Parser)]
#[command(name = "skillmap")]
#[command(about = "Map free text to a canonical skills taxonomy", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index and serve the HTTP API
    Serve {
        /// Override the bind address, e.g. 127.0.0.1:8000
        #[arg(long)]
        bind: Option<String>,
    },
    /// Extract skill phrases from text and map them to the taxonomy
    Extract {
        /// Input text; read from --file or stdin when omitted
        text: Option<String>,
        /// Read input text from a file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Matches per extracted phrase
        #[arg(short = 'k', long)]
        top_k: Option<i64>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Match a single phrase against the taxonomy (no extractor involved)
    Match {
        phrase: String,
        /// Number of matches
        #[arg(short = 'k', long)]
        top_k: Option<i64>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Load the taxonomy sources and report what was built
    Taxonomy {
        /// Print every entry with its identity and codes
        #[arg(long, default_value_t = false)]
        list: bool,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

async fn run_serve(mut cfg: AppConfig, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        cfg.server.bind = bind;
    }
    let service = pipeline::build_service(&cfg).await?;
    server::serve(Arc::new(service), &cfg.server).await
}

async fn run_extract(
    cfg: AppConfig,
    text: Option<String>,
    file: Option<PathBuf>,
    top_k: Option<i64>,
    json: bool,
) -> Result<()> {
    let k = validate_top_k(top_k.unwrap_or(cfg.matching.default_top_k as i64))?;
    let text = match (text, file) {
        (Some(t), _) => t,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))?,
        (None, None) => std::io::read_to_string(std::io::stdin()).context("read stdin")?,
    };

    let service = pipeline::build_service(&cfg).await?;
    let report = service.extract_and_map(&text, k).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("extracted phrases: {}", report.raw_phrases.len());
        for (phrase, matches) in &report.mapping {
            println!("{}", phrase);
            print_matches(matches);
        }
    }
    Ok(())
}

async fn run_match(cfg: AppConfig, phrase: String, top_k: Option<i64>, json: bool) -> Result<()> {
    let k = validate_top_k(top_k.unwrap_or(cfg.matching.default_top_k as i64))?;
    let service = pipeline::build_service(&cfg).await?;
    let matches = service.match_phrase(&phrase, k).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
    } else {
        print_matches(&matches);
    }
    Ok(())
}

fn run_taxonomy(cfg: AppConfig, list: bool, json: bool) -> Result<()> {
    let tables = sources::load_sources(&cfg.taxonomy.sources)?;
    let store = TaxonomyStore::build(tables)?;
    if json {
        let mut summary = serde_json::json!({ "entries": store.len() });
        if list {
            summary["items"] = serde_json::to_value(store.entries())?;
        }
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("taxonomy entries: {}", store.len());
        if list {
            for entry in store.entries() {
                println!(
                    "{}\t{}\t{}",
                    entry.identity,
                    entry.canonical_name,
                    entry.provenance_codes.join(",")
                );
            }
        }
    }
    Ok(())
}

fn print_matches(matches: &[MatchResult]) {
    if matches.is_empty() {
        println!("  (no matches)");
    }
    for m in matches {
        println!(
            "  {:.4}  {}  [{}]  {}",
            m.score,
            m.display_name,
            m.provenance_codes.join(", "),
            m.identity
        );
    }
}
