//! Builds a `ConfigSource`/`ConfigSink` from `--dir`/`--db-url`-style flags.
//! Exactly one of the two must be set.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use gateway_core::source::{ConfigSink, ConfigSource, DbLoader, FileLoader};

/// Single-source flags, used where a command only reads one source
/// (`export`, `status`).
#[derive(Args, Clone)]
pub struct SourceArgs {
    /// YAML config directory to read
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Postgres metadata-store connection string to read
    #[arg(long)]
    pub db_url: Option<String>,
}

impl SourceArgs {
    pub fn label(&self) -> String {
        label(&self.dir, &self.db_url)
    }

    pub async fn build_source(&self) -> Result<Arc<dyn ConfigSource>> {
        build_source(&self.dir, &self.db_url).await
    }
}

/// The "from" side of a two-source command (`migrate`, `compare`).
#[derive(Args, Clone)]
pub struct FromArgs {
    /// YAML config directory to read from
    #[arg(long = "from-dir")]
    pub from_dir: Option<PathBuf>,

    /// Postgres metadata-store connection string to read from
    #[arg(long = "from-db-url")]
    pub from_db_url: Option<String>,
}

impl FromArgs {
    pub fn label(&self) -> String {
        label(&self.from_dir, &self.from_db_url)
    }

    pub async fn build_source(&self) -> Result<Arc<dyn ConfigSource>> {
        build_source(&self.from_dir, &self.from_db_url).await
    }
}

/// The "to" side of a two-source command (`migrate`, `compare`).
#[derive(Args, Clone)]
pub struct ToArgs {
    /// YAML config directory to write into / read
    #[arg(long = "to-dir")]
    pub to_dir: Option<PathBuf>,

    /// Postgres metadata-store connection string to write into / read
    #[arg(long = "to-db-url")]
    pub to_db_url: Option<String>,
}

impl ToArgs {
    pub fn label(&self) -> String {
        label(&self.to_dir, &self.to_db_url)
    }

    pub async fn build_source(&self) -> Result<Arc<dyn ConfigSource>> {
        build_source(&self.to_dir, &self.to_db_url).await
    }

    pub async fn build_sink(&self) -> Result<Arc<dyn ConfigSink>> {
        build_sink(&self.to_dir, &self.to_db_url).await
    }
}

fn label(dir: &Option<PathBuf>, db_url: &Option<String>) -> String {
    match (dir, db_url) {
        (Some(dir), None) => format!("yaml:{}", dir.display()),
        (None, Some(url)) => format!("db:{url}"),
        _ => "unset".to_string(),
    }
}

fn file_loader(dir: &Path) -> FileLoader {
    FileLoader::new(
        vec![dir.to_path_buf()],
        vec!["*-database.yml".into(), "*-databases.yml".into()],
        vec!["*-query.yml".into(), "*-queries.yml".into()],
        vec!["*-endpoint.yml".into(), "*-endpoints.yml".into()],
    )
}

async fn build_source(dir: &Option<PathBuf>, db_url: &Option<String>) -> Result<Arc<dyn ConfigSource>> {
    match (dir, db_url) {
        (Some(dir), None) => Ok(Arc::new(file_loader(dir))),
        (None, Some(url)) => Ok(Arc::new(DbLoader::new(connect(url).await?))),
        (Some(_), Some(_)) => bail!("pass only one of --dir or --db-url"),
        (None, None) => bail!("pass --dir or --db-url"),
    }
}

async fn build_sink(dir: &Option<PathBuf>, db_url: &Option<String>) -> Result<Arc<dyn ConfigSink>> {
    match (dir, db_url) {
        (Some(dir), None) => Ok(Arc::new(file_loader(dir))),
        (None, Some(url)) => Ok(Arc::new(DbLoader::new(connect(url).await?))),
        (Some(_), Some(_)) => bail!("pass only one of --dir or --db-url"),
        (None, None) => bail!("pass --dir or --db-url"),
    }
}

async fn connect(url: &str) -> Result<sqlx::PgPool> {
    Ok(sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(url)
        .await?)
}
