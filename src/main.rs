use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use claimsearch::{AliasTable, ClaimsSearcher, Filters, SearchConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Search complaint records in a claims spreadsheet or CSV export.
#[derive(Parser, Debug)]
#[command(name = "claimsearch", version)]
struct Args {
    /// Claims file (xlsx, xls, ods, csv); defaults to $COMPLAINTS_XLSX_PATH
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// YAML config file; defaults to $CLAIMSEARCH_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Worksheet name for workbook sources
    #[arg(long, global = true)]
    sheet: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print matching records as JSON
    Search {
        /// Field filter, FIELD=VALUE; repeatable
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,

        /// Exact year on the date column; wins over the range
        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        start_year: Option<i32>,

        #[arg(long)]
        end_year: Option<i32>,
    },
    /// Print the distinct values of one field as JSON
    Options { field: String },
    /// Print the detected header row
    Headers,
}

fn parse_filter(s: &str) -> Result<(String, String)> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected FIELD=VALUE, got {:?}", s))?;
    Ok((field.trim().to_string(), value.trim().to_string()))
}

fn init_logging() {
    let env = EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| {
            let level = std::env::var("LOG_LEVEL").ok()?;
            EnvFilter::try_new(level.to_lowercase()).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// `ENV_FILE` when it names a file, else `.env` in the working directory.
fn load_env() {
    if let Ok(env_file) = std::env::var("ENV_FILE") {
        let path = Path::new(&env_file);
        if path.is_file() {
            if let Err(e) = dotenvy::from_path(path) {
                eprintln!("warning: failed to load {}: {}", path.display(), e);
            }
            return;
        }
    }
    let _ = dotenvy::dotenv();
}

fn main() -> Result<()> {
    load_env();
    init_logging();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SearchConfig::load(path)?,
        None => SearchConfig::from_env()?,
    };
    if args.source.is_some() {
        config.source = args.source.clone();
    }
    if args.sheet.is_some() {
        config.sheet = args.sheet.clone();
    }

    let searcher = ClaimsSearcher::from_config(&config);
    let aliases = AliasTable::new(&config.aliases);
    debug!(source = ?searcher.path(), "searcher ready");

    let output = match args.command {
        Command::Search {
            filters,
            year,
            start_year,
            end_year,
        } => {
            let filters: Filters = filters
                .iter()
                .map(|(field, value)| (aliases.resolve(field).to_string(), value.as_str()))
                .collect();
            info!(?filters, ?year, ?start_year, ?end_year, "search");
            let records = searcher.search(&filters, year, start_year, end_year)?;
            serde_json::to_string_pretty(&records)?
        }
        Command::Options { field } => {
            let values = searcher.unique_values(aliases.resolve(&field))?;
            serde_json::to_string_pretty(&values)?
        }
        Command::Headers => serde_json::to_string_pretty(&searcher.headers()?)?,
    };

    println!("{}", output);
    Ok(())
}
