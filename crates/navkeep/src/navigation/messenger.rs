//! Requests to the higher-privileged context.
//!
//! The only request is "reset the portal's loading guard", sent once before
//! replay activates the first level. Transport is up to the embedder; the
//! channel-backed [`ChannelMessenger`] pairs with a receiver the privileged
//! side drains.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::result::{NavkeepError, NavkeepResult};

/// Privileged-context request kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrivilegedRequestKind {
    /// Clear the portal's internal "already loading" guard
    ResetLoadingGuard,
}

/// A request awaiting confirmation
#[derive(Debug)]
pub struct PrivilegedRequest {
    /// What is requested
    pub kind: PrivilegedRequestKind,
    reply: oneshot::Sender<()>,
}

impl PrivilegedRequest {
    /// Confirm completion to the requester
    pub fn confirm(self) {
        // requester may have timed out already
        let _ = self.reply.send(());
    }
}

/// Round-trip messaging with the privileged context
#[async_trait(?Send)]
pub trait PrivilegedChannel {
    /// Ask for the loading guard reset and wait for confirmation
    async fn reset_loading_guard(&self) -> NavkeepResult<()>;
}

/// Channel that confirms every request immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopChannel;

#[async_trait(?Send)]
impl PrivilegedChannel for NoopChannel {
    async fn reset_loading_guard(&self) -> NavkeepResult<()> {
        Ok(())
    }
}

/// mpsc/oneshot backed channel
#[derive(Debug, Clone)]
pub struct ChannelMessenger {
    sender: mpsc::Sender<PrivilegedRequest>,
}

impl ChannelMessenger {
    /// Messenger plus the receiving end for the privileged side
    #[must_use]
    pub fn pair(buffer: usize) -> (Self, mpsc::Receiver<PrivilegedRequest>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { sender }, receiver)
    }

    async fn request(&self, kind: PrivilegedRequestKind) -> NavkeepResult<()> {
        let (reply, confirmed) = oneshot::channel();
        self.sender
            .send(PrivilegedRequest { kind, reply })
            .await
            .map_err(|_| NavkeepError::channel("privileged context is not listening"))?;
        confirmed
            .await
            .map_err(|_| NavkeepError::channel("privileged context dropped the request"))
    }
}

#[async_trait(?Send)]
impl PrivilegedChannel for ChannelMessenger {
    async fn reset_loading_guard(&self) -> NavkeepResult<()> {
        self.request(PrivilegedRequestKind::ResetLoadingGuard).await
    }
}
