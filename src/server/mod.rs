pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;

use crate::store::GithubStore;

pub async fn start(addr: SocketAddr, store: Arc<GithubStore>) -> Result<()> {
    api::serve(addr, store).await
}
