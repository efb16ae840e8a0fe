use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use zenn_loader::config::Config;
use zenn_loader::storage::{Database, DatabaseError};
use zenn_loader::ZennLoader;

/// Get the config directory path (~/.config/zenn-loader/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("zenn-loader"))
}

#[derive(Parser, Debug)]
#[command(
    name = "zenn-loader",
    version,
    about = "Refresh a Zenn user's feed into a local SQLite store"
)]
struct Args {
    /// Zenn user name whose feed is loaded
    name: String,

    /// Config file (defaults to ~/.config/zenn-loader/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite database to publish into (overrides `database_path`)
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Print the stored records as JSON after the refresh
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let db_path = match args.db.clone().or_else(|| config.database_path.clone()) {
        Some(path) => path,
        None => {
            std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
            config_dir.join("zenn.db")
        }
    };
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: {} is locked by another process.", db_path.display());
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    let loader = ZennLoader::new(args.name.as_str())
        .with_endpoint(config.endpoint()?)
        .with_limits(config.fetch_limits())
        .with_client(config.http_client()?);

    let mut store = db.store(loader.name());
    let summary = loader
        .load(&mut store)
        .await
        .with_context(|| format!("Failed to refresh feed for '{}'", loader.name()))?;

    if args.json {
        let records: Vec<_> = db
            .items(loader.name())
            .await
            .context("Failed to read stored items")?
            .into_iter()
            .map(|stored| stored.item)
            .collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        println!(
            "Loaded {} items for '{}' into {} ({} rejected)",
            summary.succeeded,
            loader.name(),
            db_path.display(),
            summary.failed
        );
    }

    Ok(())
}
