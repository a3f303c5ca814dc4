use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use ferry_clients::{HttpResourceClient, HttpWorkcellClient};
use ferry_core::config::AppConfig;
use ferry_core::event::{EventBus, TransferEvent};
use ferry_core::types::LocationArgument;
use ferry_gateway::GatewayServer;
use ferry_transfer::{FsWorkflowSource, TransferNode};

#[derive(Parser)]
#[command(name = "ferry", version, about = "Resource transfer node for lab workcells")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "ferry.toml", env = "FERRY_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST gateway
    Serve,
    /// Run a single transfer and print the result as JSON
    Transfer {
        /// Source as LOCATION:RESOURCE_ID
        #[arg(long, value_parser = parse_location)]
        source: LocationArgument,
        /// Target as LOCATION:RESOURCE_ID
        #[arg(long, value_parser = parse_location)]
        target: LocationArgument,
    },
    /// Load every configured workflow and report problems
    Check,
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Parse `LOCATION:RESOURCE_ID`. The resource id may itself contain colons.
fn parse_location(s: &str) -> Result<LocationArgument, String> {
    match s.split_once(':') {
        Some((location, resource)) if !location.is_empty() && !resource.is_empty() => {
            Ok(LocationArgument::new(location, resource))
        }
        _ => Err(format!("expected LOCATION:RESOURCE_ID, got '{}'", s)),
    }
}

/// Relative workflow directories are taken relative to the config file.
fn anchor_workflow_directory(config: &mut AppConfig, config_path: &Path) {
    if config.node.workflow_directory.is_relative() {
        if let Some(parent) = config_path.parent() {
            config.node.workflow_directory = parent.join(&config.node.workflow_directory);
        }
    }
}

fn build_node(config: &AppConfig, event_bus: Arc<EventBus>) -> anyhow::Result<TransferNode> {
    let resources = HttpResourceClient::new(&config.resources)?;
    let workcell = HttpWorkcellClient::new(&config.workcell)?;
    Ok(TransferNode::new(
        config,
        Arc::new(resources),
        Arc::new(workcell),
        Arc::new(FsWorkflowSource::new()),
        event_bus,
    ))
}

/// Log bus events until the bus closes. Returns how many were logged.
async fn log_events(mut events: Receiver<TransferEvent>) -> usize {
    let mut logged = 0;
    loop {
        match events.recv().await {
            Ok(event) => {
                debug!(transfer_id = %event.transfer_id(), ?event, "Transfer event");
                logged += 1;
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event logger lagged, skipped events");
            }
            Err(RecvError::Closed) => {
                debug!("EventBus closed, event logger stopping");
                break;
            }
        }
    }
    logged
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ferry=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "ferry", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = AppConfig::load(&cli.config)?;
    anchor_workflow_directory(&mut config, &cli.config);

    let event_bus = Arc::new(EventBus::default());

    match cli.command {
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config.redacted())?);
        }
        Commands::Check => {
            let node = build_node(&config, event_bus)?;
            let issues = node.validate_workflows().await;
            for issue in &issues {
                println!(
                    "{} -> {} ({}): {}",
                    issue.edge.source,
                    issue.edge.target,
                    issue.edge.workflow.display(),
                    issue.error
                );
            }
            if !issues.is_empty() {
                anyhow::bail!("{} of {} transfers cannot run", issues.len(), node.transfer_map().len());
            }
            println!("{} transfers OK", node.transfer_map().len());
        }
        Commands::Transfer { source, target } => {
            let node = build_node(&config, event_bus)?;
            let result = node.transfer(&source, &target).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.is_succeeded() {
                std::process::exit(1);
            }
        }
        Commands::Serve => {
            let node = Arc::new(build_node(&config, event_bus.clone())?);
            info!(
                node = %node.name(),
                transfers = node.transfer_map().len(),
                "Starting transfer node"
            );

            tokio::spawn(log_events(event_bus.subscribe()));

            let server = GatewayServer::new(config.gateway.clone(), node);
            let cancel = tokio_util::sync::CancellationToken::new();
            let cancel_clone = cancel.clone();

            // Graceful shutdown on Ctrl-C
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutting down gateway...");
                cancel_clone.cancel();
            });

            if let Err(e) = server.run(cancel).await {
                error!(error = %e, "Gateway stopped with an error");
                return Err(e);
            }
        }
        // Handled before config loading
        Commands::Completions { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location() {
        let loc = parse_location("stack:plate-1").unwrap();
        assert_eq!(loc.location_name, "stack");
        assert_eq!(loc.resource_id, "plate-1");

        let loc = parse_location("reader:urn:slot:1").unwrap();
        assert_eq!(loc.resource_id, "urn:slot:1");

        assert!(parse_location("stack").is_err());
        assert!(parse_location(":plate-1").is_err());
        assert!(parse_location("stack:").is_err());
    }

    #[test]
    fn test_cli_parses_transfer() {
        let cli = Cli::try_parse_from([
            "ferry",
            "--config",
            "lab.toml",
            "transfer",
            "--source",
            "stack:plate-1",
            "--target",
            "reader:slot",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("lab.toml"));
        match cli.command {
            Commands::Transfer { source, target } => {
                assert_eq!(source.location_name, "stack");
                assert_eq!(target.resource_id, "slot");
            }
            _ => panic!("expected transfer command"),
        }
    }

    #[tokio::test]
    async fn test_event_logger_survives_lag() {
        let bus = EventBus::new(4);
        let events = bus.subscribe();
        for _ in 0..10 {
            bus.publish(TransferEvent::Finished {
                transfer_id: ferry_core::types::TransferId::new(),
                outcome: None,
            });
        }
        drop(bus);

        // The six oldest events are skipped, the last four still logged.
        assert_eq!(log_events(events).await, 4);
    }

    #[test]
    fn test_workflow_directory_follows_config_file() {
        let mut config: AppConfig = toml::from_str(
            "[resources]\nurl = \"http://r\"\n[workcell]\nurl = \"http://w\"\n",
        )
        .unwrap();
        anchor_workflow_directory(&mut config, Path::new("/etc/ferry/ferry.toml"));
        assert_eq!(
            config.node.workflow_directory,
            PathBuf::from("/etc/ferry/workflows")
        );

        config.node.workflow_directory = PathBuf::from("/srv/wf");
        anchor_workflow_directory(&mut config, Path::new("/etc/ferry/ferry.toml"));
        assert_eq!(config.node.workflow_directory, PathBuf::from("/srv/wf"));
    }
}
