//! Progress events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// One progress message from a running job.
///
/// Events carry the job id so an external broadcaster can fan out
/// interleaved jobs to the right listeners.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub job_id: Uuid,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(job_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            job_id,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Consumer of progress events. Fan-out and persistence are the
/// consumer's business; the pipeline only emits.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, event: ProgressEvent);
}

/// Sink that writes events to the log.
pub struct TracingProgressSink;

#[async_trait]
impl ProgressSink for TracingProgressSink {
    async fn emit(&self, event: ProgressEvent) {
        info!(job = %event.job_id, "{}", event.message);
    }
}

/// Sink that forwards events over a channel to an external broadcaster.
pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgressSink {
    /// Create a sink and the receiving half for the broadcaster.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ProgressSink for ChannelProgressSink {
    async fn emit(&self, event: ProgressEvent) {
        // A gone receiver only means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelProgressSink::new();
        let job = Uuid::new_v4();

        sink.emit(ProgressEvent::new(job, "first")).await;
        sink.emit(ProgressEvent::new(job, "second")).await;

        assert_eq!(rx.recv().await.unwrap().message, "first");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.message, "second");
        assert_eq!(second.job_id, job);
    }

    #[tokio::test]
    async fn test_channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelProgressSink::new();
        drop(rx);
        sink.emit(ProgressEvent::new(Uuid::new_v4(), "ignored")).await;
    }
}
