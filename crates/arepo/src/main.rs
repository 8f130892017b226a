use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arepo::cache::MemoryCache;
use arepo::cached::CachedRepository;
use arepo::repository::StoreRepository;
use arepo::storage::SqliteStore;
use arepo::{Cache, CacheKey, Config, ObjectId, Repository};
use arepo_core::storage::Document;

/// arepo - Typed document repositories with a cache-aside overlay
#[derive(Parser, Debug)]
#[command(name = "arepo")]
#[command(version, about, long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, default_value = "arepo.db", env = "SQLITE_PATH")]
    db: String,

    /// Collection to operate on
    #[arg(long, short, default_value = "documents", env = "AREPO_COLLECTION")]
    collection: String,

    /// Use the Redis cache at REDIS_URL instead of the in-memory cache.
    /// Cache writes are best effort: the process may exit before they land.
    #[cfg(feature = "redis")]
    #[arg(long)]
    redis: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert a JSON document and print its identifier
    Insert { document: String },
    /// Print the document with the given identifier
    Get { id: String },
    /// Print every document matching a JSON filter
    Find {
        #[arg(default_value = "{}")]
        filter: String,
    },
    /// Apply a JSON update to the document with the given identifier
    Update { id: String, update: String },
    /// Delete the document with the given identifier
    Delete { id: String },
}

type Documents = StoreRepository<SqliteStore, Document>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env();
    config.sqlite_path = cli.db.clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arepo=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let store = SqliteStore::open(&config.sqlite_path, &cli.collection)
        .await
        .with_context(|| format!("opening {}", config.sqlite_path))?;

    let mut repository: Documents = StoreRepository::new(Arc::new(store));
    if let Some(timeout) = config.store_timeout() {
        repository = repository.with_timeout(timeout);
    }

    let cache = open_cache(&cli, &config).await;
    let radical = CacheKey::new(config.cache_radical_key.as_str()).add(&cli.collection);
    let documents: CachedRepository<Documents, dyn Cache, Document> =
        CachedRepository::new(Arc::new(repository), cache, radical, config.cache_ttl());

    tracing::debug!(
        db = %config.sqlite_path,
        collection = %cli.collection,
        radical = %documents.radical(),
        "Repository ready"
    );

    match cli.command {
        Command::Insert { document } => {
            let document: Document = parse_json(&document)?;
            let result = documents.insert_one(&document).await?;
            println!("{}", result.inserted_id);
        }
        Command::Get { id } => {
            let id = ObjectId::parse_str(&id)?;
            print_json(&documents.get_by_id(id).await?)?;
        }
        Command::Find { filter } => {
            let filter: Value = parse_json(&filter)?;
            let found = documents.with_custom_filter().find(&filter).await?;
            print_json(&found)?;
        }
        Command::Update { id, update } => {
            let id = ObjectId::parse_str(&id)?;
            let update: Value = parse_json(&update)?;
            documents.update_one_by_id(id, &update).await?;
        }
        Command::Delete { id } => {
            let id = ObjectId::parse_str(&id)?;
            documents.delete_one_by_id(id).await?;
        }
    }

    // Best effort only: detached cache writes may still be in flight when
    // the runtime shuts down.
    tokio::task::yield_now().await;

    Ok(())
}

/// Picks the cache backend. A cache that cannot be reached falls back to
/// memory, since cache failures never fail an operation.
async fn open_cache(cli: &Cli, config: &Config) -> Arc<dyn Cache> {
    #[cfg(feature = "redis")]
    if cli.redis {
        match arepo::cache::RedisCache::connect(&config.redis_url).await {
            Ok(cache) => return Arc::new(cache),
            Err(err) => {
                tracing::warn!(error = %err, "Redis cache unavailable, using in-memory cache")
            }
        }
    }

    #[cfg(not(feature = "redis"))]
    let _ = cli;

    Arc::new(MemoryCache::new(config.cache_max_entries))
}

fn parse_json<T: serde::de::DeserializeOwned>(input: &str) -> Result<T> {
    serde_json::from_str(input).with_context(|| format!("invalid JSON: {input}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
