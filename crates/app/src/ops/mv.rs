use clap::Args;

use crate::client::ClientError;
use crate::op::{Op, OpContext};

/// Move or rename a remote file or folder.
#[derive(Args, Debug, Clone)]
pub struct Move {
    /// Source resource, e.g. mega:/foo/file.txt
    pub src: String,
    /// Destination resource, e.g. mega:/bar/ or mega:/bar/renamed.txt
    pub dst: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    #[error("unable to move ({0})")]
    Client(#[from] ClientError),
}

#[async_trait::async_trait]
impl Op for Move {
    type Error = MoveError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        ctx.client.move_to(&self.src, &self.dst).await?;
        Ok(format!("Successfully moved {} to {}", self.src, self.dst))
    }
}
