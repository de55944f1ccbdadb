//! ProgressSink trait: where the workflow engine sends progress updates.
//!
//! A sink may fail (the receiver is gone, a registry is unavailable); the
//! engine logs such failures and carries on.

use async_trait::async_trait;
use tokio::sync::mpsc;
use crate::error::ProgressError;

/// One progress update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Percentage in `0..=100`
    pub progress: u8,
    pub step: String,
}

#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, progress: u8, step: &str) -> std::result::Result<(), ProgressError>;
}

/// A sink that forwards to a plain closure.
pub struct FnSink<F>(pub F);

#[async_trait]
impl<F> ProgressSink for FnSink<F>
where
    F: Fn(u8, &str) + Send + Sync,
{
    async fn report(&self, progress: u8, step: &str) -> std::result::Result<(), ProgressError> {
        (self.0)(progress, step);
        Ok(())
    }
}

/// A sink that pushes updates into an unbounded channel.
///
/// Reports fail once the receiving half has been dropped.
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn report(&self, progress: u8, step: &str) -> std::result::Result<(), ProgressError> {
        self.sender
            .send(ProgressUpdate {
                progress,
                step: step.to_string(),
            })
            .map_err(|_| ProgressError("progress receiver dropped".into()))
    }
}
