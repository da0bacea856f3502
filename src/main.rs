use clap::Parser;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use tracing::{error, info};
use vault_pki_exporter::config::{Config, CredentialPaths, Settings};
use vault_pki_exporter::logging;
use vault_pki_exporter::metrics::{IssuerMetrics, MetricsCache, MetricsRefresher};
use vault_pki_exporter::server::{self, AppState};
use vault_pki_exporter::vault::VaultClientFactory;

/// Exports the remaining validity of Vault PKI issuers as Prometheus metrics
#[derive(Parser, Debug)]
#[command(name = "Vault PKI Exporter")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print an example configuration file and exit
    #[arg(long)]
    example_config: bool,

    /// Vault server address
    #[arg(long, env = "VAULT_ADDR")]
    vault_addr: Option<String>,

    /// Role used for the Kubernetes service account login
    #[arg(long, env = "VAULT_ROLE")]
    vault_role: Option<String>,

    /// Mount point of the Kubernetes auth method
    #[arg(long, env = "VAULT_MOUNT_POINT")]
    vault_mount_point: Option<String>,

    /// Static Vault token, checked before the token files
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    vault_token: Option<String>,

    /// Seconds a metrics refresh is reused before Vault is queried again
    #[arg(long, env = "METRIC_UPDATE_INTERVAL")]
    metric_update_interval: Option<u64>,

    /// Address to listen on
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_parser = ["json", "text"])]
    log_format: Option<String>,
}

impl Cli {
    fn to_config(&self) -> Config {
        Config {
            vault_addr: self.vault_addr.clone(),
            vault_role: self.vault_role.clone(),
            vault_mount_point: self.vault_mount_point.clone(),
            vault_token: self.vault_token.clone(),
            metric_update_interval: self.metric_update_interval,
            listen: self.listen.clone(),
            log_format: self.log_format.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.example_config {
        println!("{}", Config::example_toml());
        exit(0);
    }

    let mut config = Config::defaults();
    if let Some(path) = &cli.config {
        match Config::from_file(path) {
            Ok(file_config) => config = config.merge_with(file_config),
            Err(e) => {
                eprintln!("Failed to load config file {}: {}", path.display(), e);
                exit(1);
            }
        }
    }

    let settings = match config.merge_with(cli.to_config()).resolve() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    };

    logging::init(settings.log_format);
    info!(
        vault_addr = %settings.vault.address_label(),
        metric_update_interval = settings.metric_update_interval.as_secs(),
        "starting exporter"
    );

    if let Err(e) = run(settings).await {
        error!(error = %e, "exporter stopped");
        exit(1);
    }
}

async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let factory = Arc::new(VaultClientFactory::new(
        settings.vault.clone(),
        CredentialPaths::default(),
    )?);

    let metrics = IssuerMetrics::new()?;
    metrics.register_process_collector()?;

    let refresher = MetricsRefresher::new(factory.clone(), metrics, settings.vault.address_label());
    let cache = Arc::new(MetricsCache::new(refresher, settings.metric_update_interval));

    let listener = tokio::net::TcpListener::bind(settings.listen).await?;
    server::serve(listener, server::router(AppState { factory, cache })).await?;
    Ok(())
}
