use anyhow::{anyhow, Context, Result};
use clap::Parser;
use ferry_core::{Config, Shutdown, Supervisor};
use ferry_remote_sftp::SftpConnector;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ferry", version, about = "ferry – SFTP relay/sync daemon")]
struct Cli {
    /// Path to config file (YAML / JSON)
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("failed to initialise logging: {e:#}");
        return ExitCode::FAILURE;
    }
    match run(&cli).await {
        // NoWork is an operator mistake, not a fault; Interrupted is a
        // normal shutdown. Both already logged why.
        Ok(Shutdown::NoWork) | Ok(Shutdown::Interrupted) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<Shutdown> {
    let cfg = load_config(Path::new(&cli.config))?;
    let supervisor = Supervisor::new(cfg, Arc::new(SftpConnector));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    supervisor.run(shutdown).await.map_err(Into::into)
}

fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("read config {} failed: {e}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    let cfg: Config = match ext {
        "json" => serde_json::from_str(&text)?,
        _ => serde_yaml::from_str(&text)?, // default to yaml
    };
    Ok(cfg)
}

fn init_logging(verbosity: u8, log_file: Option<&Path>) -> Result<()> {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "ferry={level},ferry_core={level},ferry_remote_sftp={level}"
        ))
    });
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}
