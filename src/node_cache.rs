use std::collections::HashMap;
use std::sync::{
    Arc,
    RwLock,
};

use futures::StreamExt;
use k8s_openapi::api::core::v1 as corev1;
use kube::api::ListParams;
use kube::runtime::watcher;
use kube::{
    Api,
    ResourceExt,
};
use tokio::time::{
    Duration,
    MissedTickBehavior,
};
use tracing::*;

/// Cadence of the periodic full relist layered on top of the watch stream,
/// bounding how stale the cache can get if watch events are missed.
pub const RESYNC_INTERVAL: Duration = Duration::from_secs(30);

/// In-memory mirror of the cluster's node set, keyed by node name. Readers
/// are the request handlers; the single writer is the watch event loop.
/// Eventually consistent with the control plane, bounded by watch latency.
#[derive(Default)]
pub struct NodeCache {
    nodes: RwLock<HashMap<String, corev1::Node>>,
}

impl NodeCache {
    pub fn new() -> NodeCache {
        return NodeCache::default();
    }

    /// Idempotent; last write wins on update events.
    pub fn put(&self, node: corev1::Node) {
        let mut nodes = self.nodes.write().expect("node cache lock poisoned");
        nodes.insert(node.name_any(), node);
    }

    pub fn get(&self, name: &str) -> Option<corev1::Node> {
        let nodes = self.nodes.read().expect("node cache lock poisoned");
        return nodes.get(name).cloned();
    }

    pub fn remove(&self, name: &str) {
        let mut nodes = self.nodes.write().expect("node cache lock poisoned");
        nodes.remove(name);
    }

    /// Swap in a freshly listed node set, dropping entries that no longer
    /// exist in the control plane.
    pub fn replace(&self, listed: Vec<corev1::Node>) {
        let mut fresh = HashMap::with_capacity(listed.len());
        for node in listed {
            fresh.insert(node.name_any(), node);
        }
        let mut nodes = self.nodes.write().expect("node cache lock poisoned");
        *nodes = fresh;
    }

    pub fn len(&self) -> usize {
        let nodes = self.nodes.read().expect("node cache lock poisoned");
        return nodes.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }
}

/// Apply incremental watch events to the cache. A dropped watch leaves the
/// cache stale until the stream recovers; the watcher handles reconnection.
pub async fn run_node_watch(api: Api<corev1::Node>, cache: Arc<NodeCache>) {
    let mut events = watcher(api, watcher::Config::default()).boxed();
    while let Some(event) = events.next().await {
        match event {
            Ok(watcher::Event::Applied(node)) => cache.put(node),
            Ok(watcher::Event::Deleted(node)) => cache.remove(&node.name_any()),
            Ok(watcher::Event::Restarted(nodes)) => {
                debug!("node watch restarted with {} nodes", nodes.len());
                cache.replace(nodes);
            },
            Err(err) => warn!("node watch interrupted, cache may be stale: {err}"),
        }
    }
}

/// Periodic full resynchronization of the node set at a fixed interval.
pub async fn run_node_resync(api: Api<corev1::Node>, cache: Arc<NodeCache>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match api.list(&ListParams::default()).await {
            Ok(nodes) => {
                debug!("node resync listed {} nodes", nodes.items.len());
                cache.replace(nodes.items);
            },
            Err(err) => warn!("node resync failed: {err}"),
        }
    }
}

#[cfg(test)]
mod test;
