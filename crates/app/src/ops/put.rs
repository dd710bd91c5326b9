use clap::Args;

use crate::client::ClientError;
use crate::op::{Op, OpContext};

/// Upload a local file.
#[derive(Args, Debug, Clone)]
pub struct Put {
    /// Local file to upload
    pub local: String,
    /// Remote destination, e.g. mega:/bar/
    pub remote: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PutError {
    #[error("uploading failed ({0})")]
    Client(#[from] ClientError),
}

#[async_trait::async_trait]
impl Op for Put {
    type Error = PutError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        ctx.client.put(&self.local, &self.remote).await?;
        Ok(format!(
            "Successfully uploaded file {} to {}",
            self.local, self.remote
        ))
    }
}
