//! treecfg CLI
//!
//! Seed, inspect and watch a configuration tree stored in etcd.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use treecfg_core::{
    CommaListDecoder, Decoder, EncodableValue, JsonDecoder, KeyStore, ProviderRegistry,
    RemoteConfigProvider, RemoteProviderDescriptor, response_stream,
    tree::{join_path, normalize_path},
};
use treecfg_etcd::{EtcdConfig, EtcdKeysClient};

#[derive(Parser)]
#[command(name = "treecfg")]
#[command(about = "treecfg - etcd-backed configuration trees", long_about = None)]
struct Cli {
    /// etcd endpoint, e.g. http://127.0.0.1:2379
    #[arg(long, env = "ETCD_ADDR", global = true)]
    endpoint: Option<String>,

    /// Root path of the configuration tree
    #[arg(long, env = "TREECFG_PATH", default_value = "/testconfig", global = true)]
    path: String,

    /// Path to an etcd client config file (YAML or TOML)
    #[arg(long, env = "TREECFG_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// How leaf values are decoded
    #[arg(long, value_enum, default_value = "none", global = true)]
    decoder: DecoderKind,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the sample configuration under the root path
    Seed,
    /// Set a single key relative to the root path
    Set {
        key: String,
        /// Values are comma-joined when more than one is given
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Print the configuration document
    Get,
    /// Print change fragments until interrupted
    Watch,
    /// Recursively delete the root path
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum DecoderKind {
    None,
    Comma,
    Json,
}

impl DecoderKind {
    fn build(self) -> Option<Arc<dyn Decoder>> {
        match self {
            DecoderKind::None => None,
            DecoderKind::Comma => Some(Arc::new(CommaListDecoder)),
            DecoderKind::Json => Some(Arc::new(JsonDecoder)),
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// `RUST_LOG` wins over `--log-level`
fn build_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let level = parse_level(level);

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(build_filter(level))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<EtcdConfig> {
    let mut config = match path {
        Some(path) => EtcdConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EtcdConfig::default(),
    };
    // Environment overrides the file
    config.merge_env();
    Ok(config)
}

/// Keys written by `seed`, relative to the root path
fn sample_config() -> Vec<(&'static str, EncodableValue)> {
    vec![
        ("access/token", "some_token".into()),
        ("redis/addr", "http://0.0.0.0:6379".into()),
        ("redis/password", "veryStrongPassword".into()),
        ("deeply/nested/config/wow", "this_is_value".into()),
        ("providers", vec!["redis", "postgres"].into()),
        ("lucky/numbers", vec![9_i64, 13].into()),
    ]
}

fn print_document(bytes: &[u8]) -> anyhow::Result<()> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Wait for Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let Some(endpoint) = cli.endpoint.clone() else {
        bail!("No etcd endpoint given; pass --endpoint or set ETCD_ADDR");
    };
    let config = load_config(cli.config.as_ref())?;
    let root = normalize_path(&cli.path);

    match cli.command {
        Commands::Seed => {
            let client = EtcdKeysClient::new(&endpoint, &config)?;
            for (key, value) in sample_config() {
                let key = join_path(&root, key);
                client.set(&key, &value.encode()).await?;
                info!(key = %key, value = %value, "Seeded key");
            }
        }
        Commands::Set { key, values } => {
            let client = EtcdKeysClient::new(&endpoint, &config)?;
            let value = EncodableValue::from(values);
            let key = join_path(&root, key.trim_matches('/'));
            client.set(&key, &value.encode()).await?;
            info!(key = %key, "Set key");
        }
        Commands::Clear => {
            let client = EtcdKeysClient::new(&endpoint, &config)?;
            client.delete(&root).await?;
            info!(path = %root, "Cleared configuration tree");
        }
        Commands::Get => {
            let mut registry = ProviderRegistry::new();
            treecfg_etcd::register(&mut registry, config, cli.decoder.build());
            let rp = RemoteProviderDescriptor::new(treecfg_etcd::PROVIDER_KIND, endpoint, &root);

            let document = registry.get(&rp).await?;
            print_document(&document)?;
        }
        Commands::Watch => {
            let mut registry = ProviderRegistry::new();
            treecfg_etcd::register(&mut registry, config, cli.decoder.build());
            let rp = RemoteProviderDescriptor::new(treecfg_etcd::PROVIDER_KIND, endpoint, &root);

            let (events, done) = registry.watch_channel(&rp).await?;
            let mut events = response_stream(events);
            info!(path = %rp.path(), "Watching for changes, press Ctrl+C to stop");

            let shutdown = shutdown_signal();
            tokio::pin!(shutdown);

            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    event = events.next() => match event {
                        Some(Ok(fragment)) => print_document(&fragment)?,
                        Some(Err(e)) => warn!("Watch error: {}", e),
                        None => break,
                    },
                }
            }

            // Receiver may already be gone if the stream ended on its own
            let _ = done.send(false);
        }
    }

    Ok(())
}
