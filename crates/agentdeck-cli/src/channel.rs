//! Client channel writing one JSON event per line.

use std::sync::atomic::{AtomicBool, Ordering};

use agentdeck_core::{ChannelError, ClientChannel, ClientEvent};
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, Notify};

/// Writes every [`ClientEvent`] as a JSON line to `W`.
pub(crate) struct JsonLinesChannel<W> {
    writer: Mutex<W>,
    terminated: AtomicBool,
    terminal_written: Notify,
}

impl<W> JsonLinesChannel<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            terminated: AtomicBool::new(false),
            terminal_written: Notify::new(),
        }
    }

    /// Resolves once a `claude-complete` or `claude-error` line was written.
    pub(crate) async fn terminated(&self) {
        loop {
            let notified = self.terminal_written.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.terminated.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> ClientChannel for JsonLinesChannel<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, event: ClientEvent) -> Result<(), ChannelError> {
        let terminal = event.is_terminal();
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))?;

        if terminal {
            self.terminated.store(true, Ordering::Release);
            self.terminal_written.notify_waiters();
        }
        Ok(())
    }

    fn set_session_id(&self, session_id: &str) {
        tracing::debug!(session_id, "Channel bound to session");
    }
}
