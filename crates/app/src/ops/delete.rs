use clap::Args;

use crate::client::ClientError;
use crate::op::{Op, OpContext};

/// Delete a remote file or folder. Without --force it is moved to the
/// trash.
#[derive(Args, Debug, Clone)]
pub struct Delete {
    /// Resource to delete, e.g. mega:/foo/bar
    pub resource: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("unable to delete ({0})")]
    Client(#[from] ClientError),
}

#[async_trait::async_trait]
impl Op for Delete {
    type Error = DeleteError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        ctx.client.delete(&self.resource).await?;
        Ok(format!("Successfully deleted {}", self.resource))
    }
}
