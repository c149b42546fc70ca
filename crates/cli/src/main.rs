use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "csuite")]
#[command(about = "C-suite agents CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run an agent persona against Slack (Socket Mode). Replies to mentions, direct messages, and strategy talk in the c-suite channel.
    Agent {
        /// Config file path (default: CSUITE_CONFIG_PATH or ~/.csuite/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Roster id of the persona to run (default from config or "ceo")
        #[arg(long, value_name = "ID")]
        persona: Option<String>,
    },

    /// Serve the dashboard API (agent roster and chat messages).
    Dashboard {
        /// Config file path (default: CSUITE_CONFIG_PATH or ~/.csuite/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 3001)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Print the agent roster as JSON.
    Roster,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("csuite {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Agent { config, persona }) => {
            if let Err(e) = run_agent(config, persona).await {
                log::error!("agent failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Dashboard { config, port }) => {
            if let Err(e) = run_dashboard(config, port).await {
                log::error!("dashboard failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Roster) => match serde_json::to_string_pretty(&csuite::roster::roster()) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("roster: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_agent(config_path: Option<PathBuf>, persona: Option<String>) -> anyhow::Result<()> {
    let mut config = load_config_or_exit(config_path);
    if let Some(id) = persona {
        config.agents.active = Some(id);
    }
    csuite::runtime::run_agent(config).await
}

async fn run_dashboard(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = load_config_or_exit(config_path);
    if let Some(p) = port {
        config.dashboard.port = p;
    }
    log::info!(
        "starting dashboard on {}:{}",
        config.dashboard.bind,
        config.dashboard.port
    );
    csuite::dashboard::run_dashboard(config).await
}

/// Load config, then start logging at the configured level (RUST_LOG still wins).
fn load_config_or_exit(path: Option<PathBuf>) -> csuite::config::Config {
    match csuite::config::load_config(path) {
        Ok((config, path)) => {
            init_logging(&csuite::config::resolve_log_level(&config));
            log::debug!("loaded config from {}", path.display());
            config
        }
        Err(e) => {
            init_logging("warn");
            log::error!("config failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}
