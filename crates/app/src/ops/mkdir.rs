use clap::Args;

use crate::client::ClientError;
use crate::op::{Op, OpContext};

/// Create a remote directory, including missing intermediates.
#[derive(Args, Debug, Clone)]
pub struct Mkdir {
    /// Directory to create, e.g. mega:/foo/bar
    pub resource: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MkdirError {
    #[error("unable to create directory ({0})")]
    Client(#[from] ClientError),
}

#[async_trait::async_trait]
impl Op for Mkdir {
    type Error = MkdirError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        ctx.client.mkdir(&self.resource).await?;
        Ok(format!(
            "Successfully created directory at {}",
            self.resource
        ))
    }
}
