use clap::Args;

use crate::client::ClientError;
use crate::op::{Op, OpContext};

/// Download a remote file.
#[derive(Args, Debug, Clone)]
pub struct Get {
    /// Remote file, e.g. mega:/foo/file.txt
    pub remote: String,
    /// Local destination file or directory; defaults to the remote
    /// file's name in the current directory
    pub local: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GetError {
    #[error("downloading failed ({0})")]
    Client(#[from] ClientError),
}

#[async_trait::async_trait]
impl Op for Get {
    type Error = GetError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let local = match &self.local {
            Some(local) => local.clone(),
            None => self
                .remote
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        ctx.client.get(&self.remote, &local).await?;
        Ok(format!(
            "Successfully downloaded file {} to {}",
            self.remote, local
        ))
    }
}
