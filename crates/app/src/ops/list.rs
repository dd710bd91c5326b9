use clap::Args;

use crate::client::ClientError;
use crate::op::{Op, OpContext};

/// List a remote file or the contents of a remote folder.
#[derive(Args, Debug, Clone)]
pub struct List {
    /// Resource to list, e.g. mega:/foo/
    pub resource: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("list failed ({0})")]
    Client(#[from] ClientError),
}

#[async_trait::async_trait]
impl Op for List {
    type Error = ListError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        match ctx.client.list(&self.resource).await {
            Ok(paths) => Ok(paths
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n")),
            // a missing path lists as nothing, matching lookups being
            // an ordinary control value
            Err(ClientError::NotFound) => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}
