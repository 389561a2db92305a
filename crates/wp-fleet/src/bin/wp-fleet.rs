use std::process;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::json;
use wp_fleet::{CoreError, FleetManager, FleetSettings, logging, serve::ServeArgs};

#[derive(Parser, Debug)]
#[command(
    name = "wp-fleet",
    version,
    about = "Toggle WordPress debug mode and restart deployments across a server fleet"
)]
struct Cli {
    /// Server registry `name:path,...` (fallback env SERVERS).
    #[arg(long, global = true, value_name = "SPEC")]
    servers: Option<String>,
    /// Shell command run inside a server directory to restart it (fallback env RESTART_COMMAND).
    #[arg(long, global = true, value_name = "COMMAND")]
    restart_command: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP control surface.
    Serve(ServeArgs),
    /// Show the debug status of every server.
    Status(StatusArgs),
    /// Flip a server's debug flag, or force it with --on/--off.
    Debug(DebugArgs),
    /// Run the restart command for a server.
    Restart(RestartArgs),
}

#[derive(Args, Debug)]
struct StatusArgs {
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Args, Debug)]
struct DebugArgs {
    #[arg(value_name = "NAME")]
    name: String,
    #[arg(long, conflicts_with = "off")]
    on: bool,
    #[arg(long)]
    off: bool,
}

#[derive(Args, Debug)]
struct RestartArgs {
    #[arg(value_name = "NAME")]
    name: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = resolve_settings(&cli)?;
    match cli.command {
        Command::Serve(args) => wp_fleet::serve::run(settings, args).await,
        command => {
            let _guard = logging::init_tracing(None, "warn")?;
            let manager = FleetManager::new(settings.servers, settings.restart_command);
            tokio::task::spawn_blocking(move || run_local(&manager, command))
                .await
                .context("command task failed")?
        }
    }
}

fn resolve_settings(cli: &Cli) -> Result<FleetSettings> {
    let mut settings = FleetSettings::from_env()?;
    if let Some(spec) = cli.servers.as_deref() {
        settings.servers = wp_fleet::ServerRegistry::load(spec);
    }
    if let Some(command) = cli.restart_command.clone() {
        settings.restart_command = Some(command);
    }
    Ok(settings)
}

fn run_local(manager: &FleetManager, command: Command) -> Result<()> {
    match command {
        Command::Status(args) => handle_status(manager, args),
        Command::Debug(args) => handle_debug(manager, args),
        Command::Restart(args) => handle_restart(manager, args),
        Command::Serve(_) => bail!("serve must run on the async runtime"),
    }
}

fn handle_status(manager: &FleetManager, args: StatusArgs) -> Result<()> {
    let statuses = manager.all_statuses()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&json!({ "servers": statuses }))?);
        return Ok(());
    }
    if statuses.is_empty() {
        println!("No servers registered.");
        return Ok(());
    }
    let width = statuses.iter().map(|status| status.name.len()).max().unwrap_or(0).max(4);
    println!("{:<width$}  DEBUG", "NAME");
    for status in statuses {
        println!("{:<width$}  {}", status.name, status.status);
    }
    Ok(())
}

fn handle_debug(manager: &FleetManager, args: DebugArgs) -> Result<()> {
    let status = match (args.on, args.off) {
        (true, _) => manager.set_debug(&args.name, true)?,
        (_, true) => manager.set_debug(&args.name, false)?,
        _ => manager.flip_debug(&args.name)?,
    };
    println!("{}: debug {status}", args.name);
    Ok(())
}

fn handle_restart(manager: &FleetManager, args: RestartArgs) -> Result<()> {
    match manager.restart_server(&args.name) {
        Ok(()) => {
            println!("{}: server restarted successfully", args.name);
            Ok(())
        }
        Err(err @ CoreError::RestartFailed { .. }) => {
            Err(err).with_context(|| format!("restart of '{}' failed", args.name))
        }
        Err(err) => Err(err.into()),
    }
}
