use clap::Parser;
use didery_server::config::{AppConfig, LogFormat};
use didery_server::store::{ConflictMode, Store};
use didery_server::server;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "didery-server",
    about = "Didery key rotation history server",
    version
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory for the embedded store (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Conflict resolution mode: method, race or promiscuous
    #[arg(short, long)]
    mode: Option<ConflictMode>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    print_banner();

    let mut config = match AppConfig::load(cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            eprintln!("Specify a config file with:");
            eprintln!("  didery-server --config <path>");
            std::process::exit(1);
        }
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(data_dir) = cli.data_dir {
        config.store.data_dir = data_dir;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    init_tracing(&config);

    let store = match Store::open(&config.store) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: failed to open store at {}: {e}", config.store.data_dir.display());
            std::process::exit(1);
        }
    };

    if let Err(e) = server::run(config, store).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}

fn print_banner() {
    let cyan = "\x1b[36m";
    let magenta = "\x1b[35m";
    let dim = "\x1b[2m";
    let reset = "\x1b[0m";

    eprintln!(
        r#"
{cyan}██████╗ ██╗██████╗ {magenta}███████╗██████╗ ██╗   ██╗{reset}
{cyan}██╔══██╗██║██╔══██╗{magenta}██╔════╝██╔══██╗╚██╗ ██╔╝{reset}
{cyan}██║  ██║██║██║  ██║{magenta}█████╗  ██████╔╝ ╚████╔╝ {reset}
{cyan}██║  ██║██║██║  ██║{magenta}██╔══╝  ██╔══██╗  ╚██╔╝  {reset}
{cyan}██████╔╝██║██████╔╝{magenta}███████╗██║  ██║   ██║   {reset}
{cyan}╚═════╝ ╚═╝╚═════╝ {magenta}╚══════╝╚═╝  ╚═╝   ╚═╝   {reset}
{dim}  Didery Server v{version}{reset}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn init_tracing(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    match config.log.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}
