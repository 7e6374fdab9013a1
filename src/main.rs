//! Fleet CLI entrypoint.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use fleet_orchestrator::cli::{Cli, Commands, NodeCommands, OutputFormatter};
use fleet_orchestrator::config::{
    find_config_file, ConfigParser, ConfigValidator, OrchestratorConfig,
};
use fleet_orchestrator::controller::{channel_update_needed, CharmRef};
use fleet_orchestrator::error::{ConfigError, OrchestratorError, Result};
use fleet_orchestrator::membership::{ClusterNode, LocalMembershipStore, MembershipStore};
use fleet_orchestrator::plugins::PluginManager;

use clap::Parser;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system. `RUST_LOG` wins when set.
fn init_logging(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Validate { warnings } => cmd_validate(cli.config.as_ref(), warnings, &formatter),
        Commands::Nodes { command } => cmd_nodes(cli.config.as_ref(), command, &formatter).await,
        Commands::Plugins { names } => cmd_plugins(cli.config.as_ref(), &names, &formatter).await,
        Commands::Channel { deployed, target } => {
            let needed = channel_update_needed(&deployed, &target);
            print!("{}", formatter.format_channel_check(&deployed, &target, needed));
            Ok(())
        }
        Commands::Charm { url } => {
            print!("{}", formatter.format_charm(&CharmRef::parse(&url)));
            Ok(())
        }
    }
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let config = load_config(&config_file)?;
    let result = ConfigValidator::new().validate(&config)?;

    print!("{}", formatter.format_validation(&result, &config, show_warnings));
    Ok(())
}

/// Membership commands.
async fn cmd_nodes(
    config_path: Option<&PathBuf>,
    command: NodeCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let store = open_store(config_path)?;

    match command {
        NodeCommands::List => {
            let nodes = store.list_nodes().await?;
            print!("{}", formatter.format_nodes(&nodes));
        }
        NodeCommands::Add { name, machine_id } => {
            store.add_node(ClusterNode { name, machine_id }).await?;
            eprintln!("Node added.");
        }
        NodeCommands::Remove { name } => {
            store.remove_node(&name).await?;
            eprintln!("Node removed.");
        }
    }

    Ok(())
}

/// Show stored plugin state.
async fn cmd_plugins(
    config_path: Option<&PathBuf>,
    names: &[String],
    formatter: &OutputFormatter,
) -> Result<()> {
    let store = open_store(config_path)?;
    let manager = PluginManager::new(Arc::new(store));

    let mut plugins = Vec::with_capacity(names.len());
    for name in names {
        plugins.push((name.clone(), manager.plugin_info(name).await?));
    }

    print!("{}", formatter.format_plugins(&plugins));
    Ok(())
}

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Loads `.env`, the configuration file and environment overrides.
fn load_config(config_file: &Path) -> Result<OrchestratorConfig> {
    let base = config_file.parent().unwrap_or_else(|| Path::new("."));
    let parser = ConfigParser::new().with_base_path(base);
    parser.load_dotenv()?;
    parser.load_with_env(config_file)
}

/// Opens the membership store. Without a configuration file, defaults and
/// environment overrides apply.
fn open_store(config_path: Option<&PathBuf>) -> Result<LocalMembershipStore> {
    let config = match resolve_config_path(config_path) {
        Ok(file) => load_config(&file)?,
        Err(OrchestratorError::Config(ConfigError::FileNotFound { .. }))
            if config_path.is_none() =>
        {
            debug!("No configuration file found, using defaults");
            let mut config = OrchestratorConfig::default();
            ConfigParser::apply_overrides(&mut config, |key| std::env::var(key).ok())?;
            config
        }
        Err(e) => return Err(e),
    };
    ConfigValidator::new().validate(&config)?;

    let path = config.store.resolved_path();
    debug!("Using membership store at {}", path.display());
    Ok(LocalMembershipStore::with_path(path))
}
