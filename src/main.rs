use crawl_state_redis::cli::{Cli, Commands};
use crawl_state_redis::logging::init_logging;
use crawl_state_redis::{CancelScope, RedisStore, Storage, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use url::Url;

#[derive(Error, Debug)]
pub enum MainError {
    #[error("Invalid argument: {0}")]
    Usage(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Output error: {0}")]
    Output(String),
}

impl MainError {
    fn exit_code(&self) -> i32 {
        match self {
            MainError::Usage(_) | MainError::Storage(StorageError::MissingHost(_)) => 2,
            MainError::Logging(_) | MainError::Storage(StorageError::MissingClient) => 3,
            MainError::Storage(_) => 4,
            MainError::Output(_) => 1,
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, MainError> {
    Url::parse(raw).map_err(|e| MainError::Usage(format!("{}: {}", raw, e)))
}

/// Wire Redis, the cancellation scope and the storage controller together.
async fn build_storage(cli: &Cli, shutdown: watch::Receiver<bool>) -> Result<Storage, MainError> {
    let config = cli.storage_config();

    let mut scope = CancelScope::background().with_shutdown(shutdown);
    if let Some(timeout) = config.timeout() {
        scope = scope.with_timeout(timeout);
    }

    let store = scope
        .guard(async { RedisStore::open(&config.redis_url).await.map_err(StorageError::Connection) })
        .await?;

    let storage = Storage::builder()
        .client(Arc::new(store))
        .prefix(config.prefix.clone())
        .expiration(config.expiration())
        .scope(scope)
        .init()
        .await?;
    Ok(storage)
}

async fn run(cli: Cli, shutdown: watch::Receiver<bool>) -> Result<(), MainError> {
    if let Commands::Clear { yes: false } = cli.command {
        return Err(MainError::Usage("clear is irreversible, pass --yes".to_string()));
    }

    let storage = build_storage(&cli, shutdown).await?;

    match cli.command {
        Commands::Ping => {
            println!("PONG ({})", cli.redis_url);
        }

        Commands::Stats { json } => {
            let stats = storage.stats().await?;
            if json {
                let out = serde_json::to_string_pretty(&stats)
                    .map_err(|e| MainError::Output(e.to_string()))?;
                println!("{}", out);
            } else {
                println!(
                    "prefix {}: {} queued, {} cookie records, {} visited markers",
                    stats.prefix, stats.queue_len, stats.cookie_records, stats.visited_markers
                );
            }
        }

        Commands::Clear { .. } => {
            let removed = storage.clear().await?;
            println!("Removed {} keys under prefix {}", removed, storage.prefix());
        }

        Commands::Push { payloads } => {
            let batch: Vec<Vec<u8>> = payloads.into_iter().map(String::into_bytes).collect();
            let len = storage.queue().add_requests(&batch).await?;
            println!("Queued {} requests, queue length {}", batch.len(), len);
        }

        Commands::Pop { count } => {
            for _ in 0..count {
                match storage.queue().get_request().await {
                    Ok(payload) => println!("{}", String::from_utf8_lossy(&payload)),
                    Err(StorageError::QueueEmpty) => {
                        eprintln!("Queue is empty");
                        break;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        Commands::MarkVisited { id } => {
            storage.visited().mark_visited(id).await?;
            println!("Marked {} as visited", id);
        }

        Commands::IsVisited { id } => {
            let visited = storage.visited().is_visited(id).await?;
            println!("{}", visited);
        }

        Commands::GetCookies { url } => {
            let url = parse_url(&url)?;
            println!("{}", storage.cookies().try_cookies(&url).await?);
        }

        Commands::SetCookies { url, cookies } => {
            let url = parse_url(&url)?;
            storage.cookies().try_set_cookies(&url, &cookies).await?;
            println!("Stored cookies for {}", url.host_str().unwrap_or_default());
        }
    }

    Ok(())
}

/// Log a failed command and turn the outcome into a process exit code.
fn report(result: Result<(), MainError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            e.exit_code()
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let log_dir = cli.log_dir.as_ref().map(std::path::PathBuf::from);
    let _log_guard = match init_logging(log_dir.as_deref(), cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            let err = MainError::Logging(e.to_string());
            eprintln!("{}", err);
            std::process::exit(err.exit_code());
        }
    };

    // Ctrl+C cancels whatever store call is in flight.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl+C, cancelling...");
            let _ = shutdown_tx.send(true);
        }
    });

    let code = report(run(cli, shutdown_rx).await);

    // exit() skips destructors; flush the JSON writer first.
    drop(_log_guard);
    if code != 0 {
        std::process::exit(code);
    }
}
