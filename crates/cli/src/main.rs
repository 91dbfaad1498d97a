mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use events::{EventBus, EventEnvelope, LifecycleBus};
use host_client::{HostClient, HostEventStream};
use lifecycle::{
    LifecycleError, ProjectCoordinator, ResetOutcome, SessionCoordinator, Severity,
};
use studio_core::{AgentType, Selection, TerminalPair};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{default_config_path, StudioConfig};

#[derive(Parser)]
#[command(name = "studio")]
#[command(about = "Drive project and terminal lifecycles on a studio host", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Host base URL, overrides the configuration file
    #[arg(long, global = true)]
    host_url: Option<String>,

    /// Configuration file (defaults to ~/.studio/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open project tabs in order; the last one that opens becomes active
    Open {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Close a project tab
    Close {
        path: String,

        /// Other tabs to open first
        #[arg(long = "tab")]
        tabs: Vec<String>,
    },
    /// Restart the agent on the focused terminal
    Reset {
        #[command(flatten)]
        target: TerminalTarget,
    },
    /// Persist a new agent configuration and restart under it
    SwitchModel {
        #[command(flatten)]
        target: TerminalTarget,

        #[arg(long)]
        agent: String,

        #[arg(long)]
        skip_permissions: bool,

        /// Agent type currently running, resumes when unchanged
        #[arg(long)]
        previous: Option<String>,
    },
    /// Stream host lifecycle signals
    Watch,
    /// Print the effective configuration
    Config,
    /// Write the default configuration file
    InitConfig {
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Args)]
struct TerminalTarget {
    /// Top terminal of the focused pane
    #[arg(long)]
    terminal: String,

    /// Bottom terminal base id (defaults to `<terminal>-bottom`)
    #[arg(long)]
    bottom: Option<String>,

    /// Session whose agent runs in the terminal; orchestrator when omitted
    #[arg(long)]
    session: Option<String>,
}

impl TerminalTarget {
    fn selection(&self) -> Selection {
        match &self.session {
            Some(id) => Selection::session(id.clone()),
            None => Selection::Orchestrator,
        }
    }

    fn terminals(&self) -> TerminalPair {
        let bottom = self
            .bottom
            .clone()
            .unwrap_or_else(|| format!("{}-bottom", self.terminal));
        TerminalPair::new(self.terminal.clone(), bottom)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let (config, load_error) = match StudioConfig::load(&config_path) {
        Ok(config) => (config, None),
        Err(err) => (StudioConfig::default(), Some(err)),
    };
    let config = config.with_host_url(cli.host_url.clone());

    init_tracing(&config.logging.filter);
    if let Some(err) = load_error {
        tracing::warn!(error = %format!("{:#}", err), "Using default configuration");
    }

    match cli.command {
        Commands::Open { paths } => open(&config, &paths).await,
        Commands::Close { path, tabs } => close(&config, &path, &tabs).await,
        Commands::Reset { target } => reset(&config, &target).await,
        Commands::SwitchModel {
            target,
            agent,
            skip_permissions,
            previous,
        } => switch_model(&config, &target, &agent, skip_permissions, previous.as_deref()).await,
        Commands::Watch => watch(&config).await,
        Commands::Config => show_config(&config, &config_path),
        Commands::InitConfig { force } => init_config(&config_path, force),
    }
}

async fn open(config: &StudioConfig, paths: &[String]) -> Result<()> {
    let event_bus = EventBus::new();
    let mut events = event_bus.subscribe();
    let projects = ProjectCoordinator::new(Arc::new(HostClient::new(&config.host.url)), event_bus);

    let mut failed = Vec::new();
    for path in paths {
        if !projects.open_project(path).await {
            failed.push(path.as_str());
        }
    }
    print_events(&mut events);
    print_tabs(&projects).await;

    if !failed.is_empty() {
        anyhow::bail!("Failed to open {}", failed.join(", "));
    }
    Ok(())
}

async fn close(config: &StudioConfig, path: &str, tabs: &[String]) -> Result<()> {
    let event_bus = EventBus::new();
    let mut events = event_bus.subscribe();
    let projects = ProjectCoordinator::new(Arc::new(HostClient::new(&config.host.url)), event_bus);

    for tab in tabs.iter().map(String::as_str).chain(std::iter::once(path)) {
        if let Err(err) = projects.select_project(tab).await {
            tracing::warn!(path = %tab, error = %err, "Tab failed to open");
        }
    }

    let outcome = projects.close_project(path).await;
    print_events(&mut events);
    match outcome.next_active_path {
        Some(next) => println!("Active project: {}", next),
        None => println!("No project open"),
    }

    Ok(())
}

/// Session coordinator fed by the host's lifecycle stream.
async fn session_coordinator(
    config: &StudioConfig,
    event_bus: EventBus,
) -> Result<SessionCoordinator> {
    let lifecycle = LifecycleBus::new();
    HostEventStream::new(&config.host.url)
        .spawn(lifecycle.clone())
        .await
        .context("Failed to subscribe to host lifecycle signals")?;

    Ok(SessionCoordinator::new(
        Arc::new(HostClient::new(&config.host.url)),
        lifecycle,
        event_bus,
    ))
}

async fn reset(config: &StudioConfig, target: &TerminalTarget) -> Result<()> {
    let event_bus = EventBus::new();
    let mut events = event_bus.subscribe();
    let sessions = session_coordinator(config, event_bus).await?;

    let outcome = sessions
        .reset_session(&target.selection(), &target.terminals())
        .await?;
    print_events(&mut events);
    print_outcome(outcome);

    Ok(())
}

async fn switch_model(
    config: &StudioConfig,
    target: &TerminalTarget,
    agent: &str,
    skip_permissions: bool,
    previous: Option<&str>,
) -> Result<()> {
    let agent_type = AgentType::new(agent)?;
    let previous = previous.map(AgentType::new).transpose()?;

    let event_bus = EventBus::new();
    let mut events = event_bus.subscribe();
    let sessions = session_coordinator(config, event_bus).await?;

    let outcome = sessions
        .switch_model(
            &agent_type,
            skip_permissions,
            &target.selection(),
            &target.terminals(),
            previous.as_ref(),
        )
        .await?;
    print_events(&mut events);
    print_outcome(outcome);

    Ok(())
}

async fn watch(config: &StudioConfig) -> Result<()> {
    let mut receiver = HostEventStream::new(&config.host.url)
        .connect()
        .await
        .context("Failed to connect to host event stream")?;

    println!("Watching {} (Ctrl+C to stop)", config.host.url);
    while let Some(next) = receiver.next_event().await {
        let event = next?;
        println!(
            "{:<24} {}",
            event.kind().as_str().cyan(),
            event.terminal_id()
        );
    }

    Ok(())
}

fn show_config(config: &StudioConfig, path: &std::path::Path) -> Result<()> {
    println!("# {}", path.display());
    print!("{}", config.to_toml()?);
    Ok(())
}

fn init_config(path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Configuration already exists at {}", path.display());
        return Ok(());
    }

    StudioConfig::default().save(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn print_events(events: &mut broadcast::Receiver<EventEnvelope>) {
    while let Ok(envelope) = events.try_recv() {
        match serde_json::to_string(&envelope.event) {
            Ok(json) => println!("{} {}", "event".dimmed(), json),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize event"),
        }
    }
}

async fn print_tabs(projects: &ProjectCoordinator) {
    let active = projects.active_path().await;
    for tab in projects.tabs().await {
        let marker = if active.as_deref() == Some(tab.project_path.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:<12} {:<20} {}",
            marker,
            tab.status.as_str(),
            tab.project_name,
            tab.project_path
        );
    }
}

fn print_outcome(outcome: ResetOutcome) {
    match outcome {
        ResetOutcome::Completed => println!("Terminal reset complete"),
        ResetOutcome::Skipped => eprintln!(
            "{} another reset is already running, request ignored",
            "note:".yellow().bold()
        ),
    }
}

fn report_failure(err: &anyhow::Error) {
    let advisory = err
        .downcast_ref::<LifecycleError>()
        .is_some_and(|e| e.severity() == Severity::Advisory);

    if advisory {
        eprintln!("{} {:#}", "note:".yellow().bold(), err);
    } else {
        eprintln!("{} {:#}", "error:".red().bold(), err);
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
