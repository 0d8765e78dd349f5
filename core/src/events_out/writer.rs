use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Local;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::EventsOutConfig;
use crate::runner::RunEvent;

const STDOUT_TARGET: &str = "stdout:";

/// Sender half of the JSONL run-event sink. Cheap to clone.
#[derive(Clone)]
pub struct EventsOutTx {
    tx: mpsc::Sender<String>,
    dropped: Arc<AtomicU64>,
    drop_when_full: bool,
}

impl EventsOutTx {
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// One JSON object per line: `ts`, `project`, then the event's own fields.
    pub async fn send_event(&self, project: &Path, event: &RunEvent) {
        let mut value = match serde_json::to_value(event) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(target: "egrun.events_out", error = %e, "event not serializable");
                return;
            }
        };
        if let serde_json::Value::Object(map) = &mut value {
            map.insert("ts".into(), serde_json::Value::String(Local::now().to_rfc3339()));
            map.insert(
                "project".into(),
                serde_json::Value::String(project.display().to_string()),
            );
        }
        self.send_line(value.to_string()).await;
    }

    pub async fn send_line(&self, line: String) {
        if self.drop_when_full {
            if self.tx.try_send(line).is_err() {
                let count = self.dropped.fetch_add(1, Ordering::Relaxed);
                // Log every 100 dropped events to avoid log spam
                if count % 100 == 0 {
                    tracing::warn!(
                        target: "egrun.events_out",
                        dropped_total = count,
                        "events_out channel full, events are being dropped"
                    );
                }
            }
        } else if self.tx.send(line).await.is_err() {
            tracing::debug!(target: "egrun.events_out", "events_out writer closed, send failed");
        }
    }
}

/// Starts the writer task. The task ends once every `EventsOutTx` clone is
/// dropped; await the handle to make sure the file is flushed.
pub async fn start_events_out(
    cfg: &EventsOutConfig,
) -> std::io::Result<Option<(EventsOutTx, JoinHandle<()>)>> {
    if !cfg.enabled {
        return Ok(None);
    }
    if cfg.path.trim().is_empty() {
        tracing::warn!(
            target: "egrun.events_out",
            "events_out path is empty in config, run events will not be recorded"
        );
        return Ok(None);
    }

    let mut writer: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = if cfg.path == STDOUT_TARGET {
        Box::new(tokio::io::stdout())
    } else {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&cfg.path)
            .await?;
        Box::new(file)
    };

    tracing::info!(
        target: "egrun.events_out",
        path = %cfg.path,
        channel_capacity = cfg.channel_capacity,
        drop_when_full = cfg.drop_when_full,
        "events_out writer started"
    );

    let (tx, mut rx) = mpsc::channel::<String>(cfg.channel_capacity);
    let dropped = Arc::new(AtomicU64::new(0));

    let handle = tokio::spawn(async move {
        while let Some(mut line) = rx.recv().await {
            if !line.ends_with('\n') {
                line.push('\n');
            }
            if writer.write_all(line.as_bytes()).await.is_err() {
                tracing::error!(
                    target: "egrun.events_out",
                    "failed to write to events_out, writer task exiting"
                );
                return;
            }
        }
        if writer.flush().await.is_err() {
            tracing::error!(target: "egrun.events_out", "failed to flush events_out");
        }
    });

    Ok(Some((
        EventsOutTx {
            tx,
            dropped,
            drop_when_full: cfg.drop_when_full,
        },
        handle,
    )))
}
