#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use weather_zk::backend::{BackendLoader, MockBackend, MockLoader, ZokratesConfig, ZokratesLoader};
use weather_zk::core::{ProverConfig, load_config};
use weather_zk::service::WeatherModelService;
use weather_zk::{ProverResult, info_cmd, init_cmd, prove_cmd, verifier_cmd};

const DEFAULT_CONFIG: &str = "weather-zk.toml";

#[derive(Parser, Debug)]
#[command(name = "weather-zk")]
#[command(about = "Zero-knowledge proofs for a radar weather model", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set WEATHER_ZK_LOG)
    #[arg(long)]
    verbose: bool,

    /// Path to configuration file (defaults to ./weather-zk.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Proving backend
    #[arg(long, value_enum, default_value_t = BackendKind::Zokrates)]
    backend: BackendKind,

    /// Path to the zokrates binary (overrides the config file)
    #[arg(long)]
    zokrates_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum BackendKind {
    Zokrates,
    /// Deterministic fake backend, no cryptography
    Mock,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show circuit readiness and host information
    Status {
        /// Write machine-readable JSON report to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Compile and set up the weather circuit if needed
    Init {
        /// Circuit source to install before initializing
        #[arg(long)]
        source: Option<PathBuf>,
    },

    /// Generate proofs for weather feature maps
    Prove {
        /// JSON file with one feature map or an array of them
        #[arg(long)]
        inputs: PathBuf,
        /// Write machine-readable JSON results to this file
        #[arg(long)]
        json: Option<PathBuf>,
        /// Include on-chain verifier calldata in the JSON results
        #[arg(long)]
        calldata: bool,
    },

    /// Validate weather feature maps without proving
    Validate {
        /// JSON file with one feature map or an array of them
        #[arg(long)]
        inputs: PathBuf,
    },

    /// Export the verifier contract
    ExportVerifier {
        /// Output path for the verifier source
        #[arg(long, default_value = "verifier.sol")]
        output: PathBuf,
    },

    /// Describe the weather model and its features
    Info {
        /// List every feature with its group and description
        #[arg(long)]
        features: bool,
        /// Write machine-readable JSON model info to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("WEATHER_ZK_LOG").unwrap_or_else(|_| {
        if verbose { "weather_zk=debug".to_string() } else { "weather_zk=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn resolve_config(path: Option<&Path>) -> ProverResult<ProverConfig> {
    match path {
        Some(p) => load_config(p),
        None if Path::new(DEFAULT_CONFIG).exists() => load_config(Path::new(DEFAULT_CONFIG)),
        None => Ok(ProverConfig::default()),
    }
}

fn build_service(cli: &Cli) -> ProverResult<WeatherModelService> {
    let mut config = resolve_config(cli.config.as_deref())?;
    if let Some(path) = &cli.zokrates_path {
        config.backend.zokrates_path = path.clone();
    }
    let loader: Arc<dyn BackendLoader> = match cli.backend {
        BackendKind::Zokrates => Arc::new(ZokratesLoader::new(ZokratesConfig::from(&config.backend))),
        BackendKind::Mock => Arc::new(MockLoader::new(Arc::new(MockBackend::default_mock()))),
    };
    tracing::debug!(backend = ?cli.backend, circuit = %config.weather.circuit_name, "configuration loaded");
    Ok(WeatherModelService::from_config(config, loader))
}

async fn dispatch(cli: Cli) -> ProverResult<()> {
    let service = build_service(&cli)?;
    match cli.command {
        Commands::Status { json } => info_cmd::run_status(&service, json).await,
        Commands::Init { source } => init_cmd::run(&service, source).await,
        Commands::Prove { inputs, json, calldata } => {
            prove_cmd::run(&service, inputs, json, calldata).await
        }
        Commands::Validate { inputs } => prove_cmd::validate(&service, inputs),
        Commands::ExportVerifier { output } => verifier_cmd::run(&service, output).await,
        Commands::Info { features, json } => info_cmd::run_info(&service, features, json),
    }
}

#[tokio::main]
async fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = dispatch(cli).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
