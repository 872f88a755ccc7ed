//! BizPilot CLI, the main entry point.
//!
//! Commands:
//! - `serve`     Start the HTTP gateway
//! - `chat`      Run one assistant turn against a tenant from the terminal
//! - `migrate`   Create the database schema, optionally seed demo data
//! - `knowledge` Show which reference fragments a message would pull in
//! - `config`    Inspect or validate configuration
//! - `doctor`    Diagnose setup problems

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "bizpilot",
    about = "BizPilot: the business assistant backend",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.bizpilot/config.toml
    #[arg(short, long, global = true, env = "BIZPILOT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one message to the assistant as a tenant user
    Chat {
        /// Tenant to act for
        #[arg(short, long)]
        tenant: String,

        /// Acting user id
        #[arg(short, long, default_value = "cli")]
        user: String,

        /// The message
        #[arg(short, long)]
        message: String,

        /// Dashboard page the user is on
        #[arg(long)]
        page: Option<String>,
    },

    /// Create the database schema
    Migrate {
        /// Also load demo products, clients and events for this tenant
        #[arg(long, value_name = "TENANT")]
        seed_demo: Option<String>,
    },

    /// Score the knowledge catalog against a message
    Knowledge {
        /// Message text
        text: String,

        /// Print the selection as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose system health
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate the configuration and print a summary
    Validate,
    /// Print the effective configuration as TOML
    Show,
    /// Write a default config file if none exists
    Init,
    /// Print the default config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Chat {
            tenant,
            user,
            message,
            page,
        } => commands::chat::run(config_path, &tenant, &user, &message, page.as_deref()).await?,
        Commands::Migrate { seed_demo } => {
            commands::migrate::run(config_path, seed_demo.as_deref()).await?
        }
        Commands::Knowledge { text, json } => {
            commands::knowledge::run(config_path, &text, json)?
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate => commands::config_cmd::validate(config_path)?,
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Init => commands::config_cmd::init()?,
            ConfigAction::Path => commands::config_cmd::path(),
        },
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
