//! agora-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), layers `AGORA_*`
//! environment variables on top, opens the SQLite store and serves the JSON
//! API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for an `[[accounts]]` entry:
//!
//! ```text
//! cargo run -p agora-server -- --hash-password
//! ```

use std::{path::PathBuf, sync::Arc};

use agora_core::Agora;
use agora_server::{FsMediaStore, LocalIdentityGateway, ServerConfig, config::expand_tilde, identity};
use agora_store_sqlite::SqliteStore;
use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Agora social backend")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    println!("{}", identity::hash_password(&password)?);
    return Ok(());
  }

  let settings = ::config::Config::builder()
    .add_source(::config::File::from(cli.config).required(false))
    .add_source(
      ::config::Environment::with_prefix("AGORA")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.validate()?;
  tracing::debug!(config = ?server_cfg, "configuration loaded");

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let gateway = LocalIdentityGateway::new(&server_cfg.accounts)?;
  if gateway.is_empty() {
    tracing::warn!("no accounts configured; every login will be refused");
  }

  let media_dir = expand_tilde(&server_cfg.media_dir);
  let media = FsMediaStore::new(&media_dir, &server_cfg.media_base_url)
    .await
    .with_context(|| format!("failed to prepare media dir {media_dir:?}"))?;

  let agora = Arc::new(Agora::new(Arc::new(store), gateway, media, server_cfg.core_config()));
  let app = agora_server::app(agora, &media_dir);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read one line from stdin as the password.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  let password = line.trim_end_matches(['\r', '\n']).to_string();
  anyhow::ensure!(!password.is_empty(), "empty password");
  Ok(password)
}
