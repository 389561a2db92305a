//! HTTP control surface entry point.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Args;
use tokio::signal;
use tracing::{error, info, warn};

use crate::{
    audit::AuditSink,
    config::FleetSettings,
    fleet::FleetManager,
    logging,
    web::{
        http::{self, HttpState},
        session::SessionStore,
    },
};

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Bind address for the HTTP API (fallback env WP_FLEET_BIND, default 127.0.0.1:3000).
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,
    /// Also write JSON logs, rotated hourly, into this directory.
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
    /// Append a JSON line per debug toggle and restart to this file.
    #[arg(long, value_name = "FILE")]
    pub audit_log: Option<PathBuf>,
    /// Keep sign-in sessions in this JSON file so they survive a restart.
    #[arg(long, value_name = "FILE")]
    pub session_file: Option<PathBuf>,
}

pub async fn run(settings: FleetSettings, args: ServeArgs) -> Result<()> {
    let _tracing_guard = logging::init_tracing(args.log_dir.as_deref(), "info")?;

    if let Err(err) = run_impl(settings, args).await {
        error!(error = ?err, "server terminated with error");
        return Err(err);
    }
    info!("server exited cleanly");
    Ok(())
}

async fn run_impl(settings: FleetSettings, args: ServeArgs) -> Result<()> {
    let FleetSettings { servers, users, restart_command, bind } = settings;
    let addr = args.bind.unwrap_or(bind);

    if users.is_empty() {
        warn!("no operator accounts configured (USERS); nobody will be able to sign in");
    }
    if restart_command.is_none() {
        warn!("no restart command configured (RESTART_COMMAND); restarts will fail");
    }

    let audit = match args.audit_log {
        Some(path) => Some(AuditSink::open(path).await?),
        None => None,
    };

    let sessions = match args.session_file {
        Some(path) => SessionStore::persistent(path)?,
        None => SessionStore::new(),
    };

    let manager = Arc::new(FleetManager::new(servers, restart_command));
    let state = HttpState {
        manager: manager.clone(),
        users: Arc::new(users),
        sessions: sessions.clone(),
        audit: audit.clone(),
    };
    let handle = http::spawn_http_server(state, addr).await?;

    info!(
        servers = manager.server_count(),
        http_addr = %handle.addr(),
        audit_log = audit.as_ref().map(|sink| sink.path().display().to_string()),
        session_file = sessions.file().map(|path| path.display().to_string()),
        "ready"
    );

    match signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(err) => warn!(error = ?err, "failed to listen for Ctrl+C"),
    }

    handle.shutdown();
    Ok(())
}
