use clap::Args;

use crate::client::ClientError;
use crate::op::{Op, OpContext};

/// Synchronize between a remote folder and a local directory; exactly
/// one side must be remote.
#[derive(Args, Debug, Clone)]
pub struct Sync {
    /// Source, e.g. mega:/foo/ or /tmp/foo
    pub src: String,
    /// Destination, e.g. /tmp/foo or mega:/foo
    pub dst: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("unable to sync ({0})")]
    Client(#[from] ClientError),
}

#[async_trait::async_trait]
impl Op for Sync {
    type Error = SyncError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        ctx.client.sync(&self.src, &self.dst).await?;
        Ok(format!("Successfully synced {} to {}", self.src, self.dst))
    }
}
