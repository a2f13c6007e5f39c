//! salesdb CLI - transform, load and query sales-order extracts
//!
//! # Main Commands
//!
//! ```bash
//! salesdb transform sales input.csv                 # input.csv → output.csv
//! salesdb load sales                                # output.csv → sales.db
//! salesdb query sales -f Region=Europe -a 'SUM(UnitsSold)'
//! salesdb run sales input.csv -f Region=Europe -a 'SUM(UnitsSold)'
//! salesdb serve                                     # HTTP server (port 3000)
//! ```
//!
//! # Object Commands
//!
//! ```bash
//! salesdb put sales input.csv ./extract.csv        # upload a local file
//! salesdb get sales output.csv -o ./output.csv     # download an object
//! ```
//!
//! Configuration comes from `SALESDB_*` variables (a `.env` file is read
//! if present). Logs go to stderr, results to stdout.

use clap::{Parser, Subcommand};
use salesdb::{
    load_object, query_object, server, transform_load_query, transform_object, AppState,
    EngineConfig, FsObjectStore, ObjectStore, QueryOutcome, QuerySpec,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "salesdb")]
#[command(about = "Transform, deduplicate, load and query sales-order CSV data", long_about = None)]
struct Cli {
    /// Object store root (overrides SALESDB_OBJECT_ROOT)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform an extract and publish output.csv
    Transform {
        /// Container (bucket) name
        container: String,
        /// Key of the raw extract
        key: String,
    },

    /// Load output.csv into the sales.db snapshot
    Load {
        /// Container (bucket) name
        container: String,
    },

    /// Aggregate over the sales.db snapshot
    Query {
        /// Container (bucket) name
        container: String,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Transform, load and query in one invocation
    Run {
        /// Container (bucket) name
        container: String,
        /// Key of the raw extract
        key: String,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Upload a local file as an object
    Put {
        container: String,
        key: String,
        /// Local file to upload
        file: PathBuf,
    },

    /// Download an object
    Get {
        container: String,
        key: String,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[derive(clap::Args)]
struct QueryArgs {
    /// Equality filter, repeatable (e.g. Region=Europe)
    #[arg(short, long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,

    /// Aggregation expression, repeatable (e.g. 'SUM(UnitsSold)')
    #[arg(short, long = "agg")]
    aggregations: Vec<String>,
}

impl QueryArgs {
    fn into_spec(self) -> QuerySpec {
        QuerySpec {
            filters: self.filters.into_iter().collect(),
            aggregations: self.aggregations,
        }
    }
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((column, value)) if !column.is_empty() => Ok((column.to_string(), value.to_string())),
        _ => Err(format!("expected COLUMN=VALUE, got '{}'", raw)),
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match setup(cli.root) {
        Ok((config, store)) => match cli.command {
            Commands::Transform { container, key } => cmd_transform(&store, &config, &container, &key),
            Commands::Load { container } => cmd_load(&store, &config, &container),
            Commands::Query { container, query } => cmd_query(&store, &config, &container, query.into_spec()),
            Commands::Run { container, key, query } => {
                cmd_run(&store, &config, &container, &key, query.into_spec())
            }
            Commands::Put { container, key, file } => cmd_put(&store, &container, &key, &file),
            Commands::Get { container, key, output } => cmd_get(&store, &container, &key, output.as_deref()),
            Commands::Serve { port } => cmd_serve(port, store, config).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("✗ Error: {}", e);
        std::process::exit(1);
    }
}

fn setup(root: Option<PathBuf>) -> Result<(EngineConfig, FsObjectStore), Box<dyn std::error::Error>> {
    let mut config = EngineConfig::from_env()?;
    if let Some(root) = root {
        config = config.with_object_root(root);
    }
    let store = FsObjectStore::with_root(&config.object_root);
    Ok((config, store))
}

fn cmd_transform(store: &FsObjectStore, config: &EngineConfig, container: &str, key: &str) -> CliResult {
    let output = transform_object(store, config, container, key)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_load(store: &FsObjectStore, config: &EngineConfig, container: &str) -> CliResult {
    let output = load_object(store, config, container)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_query(store: &FsObjectStore, config: &EngineConfig, container: &str, spec: QuerySpec) -> CliResult {
    let outcome = query_object(store, config, container, &spec)?;
    print_outcome(outcome)
}

fn cmd_run(
    store: &FsObjectStore,
    config: &EngineConfig,
    container: &str,
    key: &str,
    spec: QuerySpec,
) -> CliResult {
    let run = transform_load_query(store, config, container, key, &spec)?;
    eprintln!(
        "   transformed {} rows, loaded {}, store holds {}",
        run.transform.rows_written, run.load.summary.rows_inserted, run.load.total_orders
    );
    print_outcome(run.query)
}

/// Print the values read, then fail if the query did.
fn print_outcome(outcome: QueryOutcome) -> CliResult {
    println!("{}", serde_json::to_string_pretty(&outcome.values)?);
    outcome.into_result()?;
    Ok(())
}

fn cmd_put(store: &FsObjectStore, container: &str, key: &str, file: &Path) -> CliResult {
    let bytes = fs::read(file)?;
    let receipt = store.put(container, key, &bytes)?;
    eprintln!("✓ Stored {}/{} ({} bytes)", receipt.container, receipt.key, receipt.size);
    Ok(())
}

fn cmd_get(store: &FsObjectStore, container: &str, key: &str, output: Option<&Path>) -> CliResult {
    let bytes = store.get(container, key)?;
    match output {
        Some(path) => {
            fs::write(path, &bytes)?;
            eprintln!("✓ Written to: {}", path.display());
        }
        None => {
            use std::io::Write;
            std::io::stdout().write_all(&bytes)?;
        }
    }
    Ok(())
}

async fn cmd_serve(port: u16, store: FsObjectStore, config: EngineConfig) -> CliResult {
    let state = AppState::new(Arc::new(store), config);
    server::start_server(port, state).await
}
