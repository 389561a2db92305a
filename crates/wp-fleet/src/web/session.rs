use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use anyhow::{Context, Result};
use axum::http::{HeaderMap, header};
use tracing::warn;
use uuid::Uuid;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "wp_fleet_session";

/// Signed-in operators keyed by opaque session token.
///
/// In-memory by default. A store opened with [`SessionStore::persistent`] rewrites its JSON
/// file after every change so sessions survive a restart.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, String>>>,
    file: Option<Arc<PathBuf>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load sessions from `path`, starting empty when the file does not exist yet.
    pub fn persistent(path: PathBuf) -> Result<Self> {
        let sessions = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => HashMap::new(),
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("failed to parse session file {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read session file {}", path.display()));
            }
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        Ok(Self { sessions: Arc::new(RwLock::new(sessions)), file: Some(Arc::new(path)) })
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref().map(PathBuf::as_path)
    }

    /// Start a session for `username` and return its token.
    pub fn create(&self, username: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut sessions = self.sessions.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        sessions.insert(token.clone(), username.to_string());
        self.persist(&sessions);
        token
    }

    pub fn username(&self, token: &str) -> Option<String> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(token)
            .cloned()
    }

    pub fn remove(&self, token: &str) -> Option<String> {
        let mut sessions = self.sessions.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let removed = sessions.remove(token);
        if removed.is_some() {
            self.persist(&sessions);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Called with the write lock held so concurrent changes land in order.
    fn persist(&self, sessions: &HashMap<String, String>) {
        let Some(path) = self.file.as_deref() else {
            return;
        };
        let written = serde_json::to_vec(sessions)
            .context("failed to serialise sessions")
            .and_then(|bytes| {
                fs::write(path, bytes)
                    .with_context(|| format!("failed to write session file {}", path.display()))
            });
        if let Err(err) = written {
            warn!(error = ?err, "session kept in memory only");
        }
    }
}

/// Session token from the request's `Cookie` headers, if present.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
