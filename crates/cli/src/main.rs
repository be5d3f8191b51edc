mod action_commands;
mod config_commands;

use std::{path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    courier_config::CourierConfig,
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "courier", about = "Courier: message actions across chat channels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/courier/).
    #[arg(long, global = true, env = "COURIER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one message action (send, poll, react, broadcast, ...).
    Action(action_commands::ActionArgs),
    /// Resolve a target the way actions do and print the result.
    Resolve(action_commands::ResolveArgs),
    /// List a channel's directory entries.
    Directory(action_commands::DirectoryArgs),
    /// List every supported action and how it takes its target.
    Actions,
    /// Validate the configuration file.
    Check {
        /// Print the effective configuration after validation.
        #[arg(long)]
        show: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so command output on stdout stays machine-readable.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Arc<CourierConfig>> {
    let config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            courier_config::load_config(path)?
        },
        None => courier_config::discover_and_load(),
    };
    Ok(Arc::new(config))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "courier starting");

    match cli.command {
        Commands::Actions => {
            action_commands::list_actions();
            Ok(())
        },
        Commands::Check { show } => config_commands::check(cli.config.as_ref(), show),
        Commands::Action(args) => {
            let config = load_config(cli.config.as_ref())?;
            action_commands::handle_action(config, args).await
        },
        Commands::Resolve(args) => {
            let config = load_config(cli.config.as_ref())?;
            action_commands::handle_resolve(config, args).await
        },
        Commands::Directory(args) => {
            let config = load_config(cli.config.as_ref())?;
            action_commands::handle_directory(config, args).await
        },
    }
}
