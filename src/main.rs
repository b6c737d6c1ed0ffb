use std::net::SocketAddr;
use std::sync::Arc;

use backoff::ExponentialBackoff;
use k8s_openapi::api::core::v1 as corev1;
use kube::api::ListParams;
use kube::{
    Api,
    Client,
};
use tracing::*;

use extender_scheduler::extender::Extender;
use extender_scheduler::node_cache::{
    self,
    NodeCache,
    RESYNC_INTERVAL,
};
use extender_scheduler::{
    transport,
    Result,
};

const LISTEN_ADDR_ENV: &str = "EXTENDER_LISTEN_ADDR";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:32080";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    let client = Client::try_default()
        .await
        .expect("failed to create kube client");
    let nodes: Api<corev1::Node> = Api::all(client.clone());

    // Prime the cache before taking traffic so name-based lookups do not
    // start cold; the watch and the periodic resync keep it current.
    let cache = Arc::new(NodeCache::new());
    let initial = backoff::future::retry(ExponentialBackoff::default(), || async {
        Ok::<_, backoff::Error<kube::Error>>(nodes.list(&ListParams::default()).await?)
    })
    .await?;
    cache.replace(initial.items);
    info!("node cache primed with {} nodes", cache.len());

    tokio::spawn(node_cache::run_node_watch(nodes.clone(), cache.clone()));
    tokio::spawn(node_cache::run_node_resync(nodes, cache.clone(), RESYNC_INTERVAL));

    let addr: SocketAddr = std::env::var(LISTEN_ADDR_ENV)
        .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string())
        .parse()?;

    let extender = Arc::new(Extender::new(cache));
    return transport::serve(addr, extender).await;
}
