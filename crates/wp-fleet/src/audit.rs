use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

/// Append-only JSON-lines record of operator actions.
#[derive(Clone)]
pub struct AuditSink {
    inner: Arc<AuditSinkInner>,
}

struct AuditSinkInner {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl AuditSink {
    pub async fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create audit directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open audit log {}", path.display()))?;
        Ok(Self { inner: Arc::new(AuditSinkInner { path, file: Mutex::new(file) }) })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.inner.path
    }

    pub async fn append(&self, record: &AuditEntry) -> Result<()> {
        let mut buffer = serde_json::to_vec(record).context("failed to serialise audit record")?;
        buffer.push(b'\n');
        let mut file = self.inner.file.lock().await;
        file.write_all(&buffer).await.context("failed to write audit record")?;
        file.flush().await.context("failed to flush audit log")?;
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Debug,
    Restart,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Failure,
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub action: AuditAction,
    pub server: String,
    pub outcome: AuditOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, server: &str, outcome: AuditOutcome) -> Self {
        Self {
            timestamp: now_timestamp(),
            action,
            server: server.to_string(),
            outcome,
            user: None,
            message: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

pub fn now_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
