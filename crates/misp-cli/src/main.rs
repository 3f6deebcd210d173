//! MISP CLI
//!
//! Command-line host for the MISP connector. Runs the same `execute` and
//! `check_health` entry points an orchestration platform would call.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use misp_connector::{
    attribute_categories, attribute_types, check_health, execute, CleanupReport, ConnectorError,
    HostMacroStore, InMemoryMacroStore, MacroStore, MispConnector, Operation, OperationParams,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "misp")]
#[command(version)]
#[command(about = "Run MISP connector operations from the command line", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", default_value = "misp.yaml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a connector operation
    Execute {
        /// Operation name (see `operations`)
        operation: String,

        /// Operation parameters as JSON
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Check connectivity to the MISP server
    Health,

    /// List available operations
    Operations,

    /// Show the attribute types allowed in a category
    AttributeTypes {
        /// Category name; lists categories when omitted
        category: Option<String>,
    },

    /// Run a lifecycle hook, clearing the configured macros
    Hooks {
        /// Lifecycle event to run
        #[arg(value_enum)]
        event: HookEvent,

        /// Whether the added configuration is active (add-config only)
        #[arg(long)]
        active: bool,

        /// Run against an in-memory store seeded with the configured macros
        #[arg(long)]
        dry_run: bool,
    },

    /// Show current configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HookEvent {
    Activate,
    Deactivate,
    AddConfig,
    DeleteConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Execute { operation, params } => {
            let config = load_config(&cli.config, cli.verbose)?;
            cmd_execute(&config, &operation, &params).await
        }
        Commands::Health => {
            let config = load_config(&cli.config, cli.verbose)?;
            cmd_health(&config).await
        }
        Commands::Hooks {
            event,
            active,
            dry_run,
        } => {
            let config = load_config(&cli.config, cli.verbose)?;
            cmd_hooks(&config, event, active, dry_run).await
        }
        Commands::Config { show_secrets } => {
            let config = AppConfig::load(&cli.config)?;
            cmd_config(&config, show_secrets)
        }
        Commands::Operations => cmd_operations(),
        Commands::AttributeTypes { category } => cmd_attribute_types(category.as_deref()),
    }
}

/// Loads the config file and initializes logging from it.
fn load_config(path: &Path, verbose: bool) -> Result<AppConfig> {
    let config = AppConfig::load(path)?;

    let mut logging = config.logging.clone();
    if verbose {
        logging.level = tracing::Level::DEBUG;
    }
    misp_observability::init_logging_with_config(logging);

    Ok(config)
}

async fn cmd_execute(config: &AppConfig, operation: &str, params: &str) -> Result<()> {
    let params: Value = serde_json::from_str(params).context("Parameters must be valid JSON")?;
    let params = OperationParams::try_from(params)?;

    match execute(&config.misp, operation, &params).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            print_transport_hint(&e);
            std::process::exit(1);
        }
    }
}

async fn cmd_health(config: &AppConfig) -> Result<()> {
    match check_health(&config.misp).await {
        Ok(()) => {
            println!("{}: {}", config.misp.base_url(), "Healthy".green());
            Ok(())
        }
        Err(e) => {
            println!("{}: {}", config.misp.base_url(), "Unhealthy".red());
            eprintln!("  {}", e);
            print_transport_hint(&e);
            std::process::exit(1);
        }
    }
}

fn print_transport_hint(e: &ConnectorError) {
    if e.is_transport() {
        eprintln!(
            "  {}",
            "Check the hostname, network path and TLS settings in the config file".dimmed()
        );
    }
}

async fn cmd_hooks(
    config: &AppConfig,
    event: HookEvent,
    active: bool,
    dry_run: bool,
) -> Result<()> {
    let store: Arc<dyn MacroStore> = if dry_run {
        Arc::new(seeded_store(&config.misp.macros).await)
    } else {
        let host = config
            .host
            .as_ref()
            .context("No `host` section in the config file; use --dry-run")?;
        Arc::new(HostMacroStore::new(host)?)
    };

    let connector = MispConnector::new(config.misp.clone())?.with_macro_store(store);
    if !connector.config().clear_macros {
        println!("{}", "Macro cleanup is disabled (clear_macros: false)".yellow());
        return Ok(());
    }

    let report = run_hook(&connector, event, active).await;
    print_report(&report, dry_run);
    if !report.failed.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

/// In-memory store holding every configured macro.
async fn seeded_store(macros: &[String]) -> InMemoryMacroStore {
    let store = InMemoryMacroStore::new();
    for name in macros {
        store.insert(name).await;
    }
    store
}

async fn run_hook(connector: &MispConnector, event: HookEvent, active: bool) -> CleanupReport {
    match event {
        HookEvent::Activate => connector.on_activate().await,
        HookEvent::Deactivate => connector.on_deactivate().await,
        HookEvent::AddConfig => connector.on_add_config(active).await,
        HookEvent::DeleteConfig => connector.on_delete_config().await,
    }
}

fn print_report(report: &CleanupReport, dry_run: bool) {
    let title = if dry_run {
        "Macro Cleanup (dry run)"
    } else {
        "Macro Cleanup"
    };
    println!("{}", title.bold());
    println!("────────────────────");
    for name in &report.deleted {
        println!("  {} {}", "deleted".green(), name);
    }
    for name in &report.missing {
        println!("  {} {}", "missing".dimmed(), name);
    }
    for name in &report.failed {
        println!("  {} {}", "failed".red(), name);
    }
}

fn cmd_operations() -> Result<()> {
    println!("{}", "Available Operations".bold());
    println!("────────────────────");
    for op in Operation::ALL {
        println!("  {}", op.as_str().cyan());
    }
    Ok(())
}

fn cmd_attribute_types(category: Option<&str>) -> Result<()> {
    match category {
        None => {
            println!("{}", "Attribute Categories".bold());
            println!("────────────────────");
            for category in attribute_categories() {
                println!("  {}", category.cyan());
            }
        }
        Some(category) => match attribute_types(category) {
            Some(types) => {
                println!("{}", category.bold());
                for t in types {
                    println!("  {}", t);
                }
            }
            None => println!("{}", format!("Unknown category: {}", category).yellow()),
        },
    }
    Ok(())
}

fn cmd_config(config: &AppConfig, show_secrets: bool) -> Result<()> {
    let shown = if show_secrets {
        config.clone()
    } else {
        config.redact_secrets()
    };
    print!("{}", serde_yaml::to_string(&shown)?);
    Ok(())
}
