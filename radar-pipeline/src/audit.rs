//! Append-only audit log of raw stage outputs
//!
//! Founder units run concurrently, so entries go through a channel to a single writer task
//! and are written one JSON line at a time.

use chrono::{DateTime, Utc};
use radar_core::{ErrorContext, RadarError, RadarResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One line of the audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub run_id: String,
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founder: Option<String>,
    pub content: serde_json::Value,
}

/// Cheap, cloneable handle used by the stages to record entries
#[derive(Debug, Clone)]
pub struct AuditLog {
    run_id: String,
    tx: Option<mpsc::UnboundedSender<AuditEntry>>,
}

/// Owner of the writer task; `finish` waits until every entry is on disk
#[derive(Debug)]
pub struct AuditWriter {
    handle: Option<JoinHandle<()>>,
}

impl AuditLog {
    /// A log that drops every entry
    pub fn disabled(run_id: impl Into<String>) -> (Self, AuditWriter) {
        (
            Self {
                run_id: run_id.into(),
                tx: None,
            },
            AuditWriter { handle: None },
        )
    }

    /// Open (append) `path` and start the writer task
    pub async fn open(
        path: impl AsRef<Path>,
        run_id: impl Into<String>,
    ) -> RadarResult<(Self, AuditWriter)> {
        let run_id = run_id.into();
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| RadarError::Config {
                message: format!("Failed to open audit log {}: {}", path.display(), e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("audit_log")
                    .with_operation("open")
                    .with_suggestion("Check audit.path or disable the audit log"),
            })?;

        let header = serde_json::json!({
            "audit_log": "radar",
            "run_id": run_id,
            "opened_at": Utc::now(),
        });
        file.write_all(format!("{}\n", header).as_bytes()).await?;

        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEntry>();
        let handle = tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                let line = match serde_json::to_string(&entry) {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(stage = %entry.stage, error = %e, "Skipping unserializable audit entry");
                        continue;
                    }
                };
                if let Err(e) = file.write_all(format!("{}\n", line).as_bytes()).await {
                    warn!(error = %e, "Failed to write audit entry");
                }
            }
            if let Err(e) = file.flush().await {
                warn!(error = %e, "Failed to flush audit log");
            }
        });

        debug!(path = %path.display(), "Audit log opened");

        Ok((
            Self {
                run_id,
                tx: Some(tx),
            },
            AuditWriter {
                handle: Some(handle),
            },
        ))
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Queue an entry; never blocks and never fails the caller
    pub fn record(&self, stage: &str, founder: Option<&str>, content: serde_json::Value) {
        let Some(tx) = &self.tx else {
            return;
        };

        let entry = AuditEntry {
            timestamp: Utc::now(),
            run_id: self.run_id.clone(),
            stage: stage.to_string(),
            founder: founder.map(str::to_string),
            content,
        };
        if tx.send(entry).is_err() {
            warn!(stage = stage, "Audit writer is gone, entry dropped");
        }
    }
}

impl AuditWriter {
    /// Wait for the writer to drain. Every `AuditLog` clone must be dropped first.
    pub async fn finish(self) {
        if let Some(handle) = self.handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Audit writer task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entries_are_written_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("audit.jsonl");

        let (log, writer) = AuditLog::open(&path, "run-1").await.unwrap();
        let mut handles = Vec::new();
        for i in 0..20 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                log.record(
                    "Assessment/business",
                    Some(&format!("founder-{}", i)),
                    serde_json::json!({"line": "x".repeat(512)}),
                );
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        drop(log);
        writer.finish().await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 21);
        assert!(lines[0].contains("\"audit_log\":\"radar\""));
        for line in &lines[1..] {
            let entry: AuditEntry = serde_json::from_str(line).unwrap();
            assert_eq!(entry.run_id, "run-1");
            assert_eq!(entry.stage, "Assessment/business");
        }
    }

    #[tokio::test]
    async fn test_disabled_log_is_a_no_op() {
        let (log, writer) = AuditLog::disabled("run-2");
        assert!(!log.is_enabled());
        log.record("Synthesis/synergy", None, serde_json::json!({}));
        drop(log);
        writer.finish().await;
    }
}
