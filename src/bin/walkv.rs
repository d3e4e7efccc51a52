//! walkv command-line tool
//!
//! Runs the store in-process against a local WAL file: each invocation
//! recovers, performs one operation, and shuts down cleanly.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use walkv::wal::WalRecovery;
use walkv::{Config, KvError, Store};

/// walkv CLI
#[derive(Parser, Debug)]
#[command(name = "walkv")]
#[command(about = "WAL-backed key-value store")]
#[command(version)]
struct Args {
    /// Path of the write-ahead log
    #[arg(short, long, default_value = "wal.log")]
    wal_path: PathBuf,

    /// Background fsync interval in milliseconds
    #[arg(short, long, default_value = "5000")]
    flush_interval_ms: u64,

    /// Read size in bytes used when replaying the log
    #[arg(short, long, default_value = "100")]
    chunk_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Print every recovered key=value, sorted by key
    Dump,

    /// Scan the log and report what recovery would see
    Verify,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,walkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!("walkv v{}", walkv::VERSION);

    let config = Config::builder()
        .wal_path(&args.wal_path)
        .flush_interval_ms(args.flush_interval_ms)
        .recovery_chunk_size(args.chunk_size)
        .build();

    match run(config, args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(KvError::NotFound) => {
            println!("not found");
            ExitCode::from(1)
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(2)
        }
    }
}

fn run(config: Config, command: Commands) -> walkv::Result<()> {
    match command {
        Commands::Get { key } => with_store(config, |store| {
            println!("{}", store.get(&key)?);
            Ok(())
        }),
        Commands::Set { key, value } => with_store(config, |store| store.set(&key, &value)),
        Commands::Dump => with_store(config, |store| {
            for (key, value) in store.snapshot() {
                println!("{}={}", key, value);
            }
            Ok(())
        }),
        Commands::Verify => verify(&config),
    }
}

/// Start a store, run `op`, and always shut down afterwards
fn with_store(
    config: Config,
    op: impl FnOnce(&Store) -> walkv::Result<()>,
) -> walkv::Result<()> {
    let store = Store::open(config)?;
    let outcome = op(&store);

    // Shutdown errors are already logged; the operation's outcome wins
    let closed = store.shutdown();
    outcome.and(closed)
}

fn verify(config: &Config) -> walkv::Result<()> {
    config.validate()?;
    let result = WalRecovery::verify(&config.wal_path, config.recovery_chunk_size)?;

    println!("bytes read:        {}", result.bytes_read);
    println!("records:           {}", result.records_recovered);
    println!("malformed records: {}", result.records_malformed);
    println!("torn tail bytes:   {}", result.discarded_tail_bytes);
    Ok(())
}
