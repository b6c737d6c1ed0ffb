use std::collections::HashMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1 as corev1;
use kube::ResourceExt;
use tracing::*;

use crate::node_cache::NodeCache;
use crate::protocol::{
    ExtenderArgs,
    ExtenderFilterResult,
    HostPriority,
    HostPriorityList,
    NodeList,
};
use crate::util::full_name;

/// Node label gating eligibility; its value is also the raw score used by
/// the exclusive filter mode.
pub const CAPABILITY_LABEL: &str = "nvidia.GPU";

/// Presence of this label forces maximum priority regardless of the
/// capability label.
pub const PRIORITY_OVERRIDE_LABEL: &str = "test-label";
pub const PRIORITY_OVERRIDE_SCORE: i64 = 100000;

struct NodeScore {
    node: corev1::Node,
    score: i64,
}

/// The decision service the default scheduler calls at its extender hooks.
/// Constructed once at startup and handed to the transport by reference; all
/// operations are pure with respect to request-scoped input.
pub struct Extender {
    node_cache: Arc<NodeCache>,
}

impl Extender {
    pub fn new(node_cache: Arc<NodeCache>) -> Extender {
        return Extender { node_cache };
    }

    /// Retain candidate nodes carrying the capability label. If nothing
    /// survives, the *original, unfiltered* set is returned with no name
    /// list so the scheduler falls back to its default policy; "no label
    /// match" is never a hard rejection.
    pub fn filter(&self, args: ExtenderArgs) -> ExtenderFilterResult {
        info!("begin to schedule pod {}", full_name(&args.pod));

        if args.nodes.is_none() && args.node_names.is_none() {
            return ExtenderFilterResult {
                nodes: args.nodes,
                node_names: Some(Vec::new()),
                failed_nodes: HashMap::new(),
                error: String::new(),
            };
        }

        // Name-list mode (NodeCacheCapable): resolve names through the local
        // node cache; names the cache has not seen yet drop out.
        let candidates = match &args.node_names {
            Some(names) => NodeList {
                metadata: Default::default(),
                items: names.iter().filter_map(|n| self.node_cache.get(n)).collect(),
            },
            None => args.nodes.clone().unwrap_or_default(),
        };

        let mut nodes = Vec::new();
        let mut node_names = Vec::new();
        for node in candidates.items {
            if !has_capability_label(&node) {
                debug!("node {}: no {CAPABILITY_LABEL} label, skip", node.name_any());
                continue;
            }
            node_names.push(node.name_any());
            nodes.push(node);
        }

        if nodes.is_empty() {
            warn!("no valid node for {CAPABILITY_LABEL}, turn to default scheduler");
            return ExtenderFilterResult {
                nodes: args.nodes,
                node_names: None,
                failed_nodes: HashMap::new(),
                error: String::new(),
            };
        }

        return ExtenderFilterResult {
            nodes: Some(NodeList { metadata: candidates.metadata, items: nodes }),
            node_names: Some(node_names),
            failed_nodes: HashMap::new(),
            error: String::new(),
        };
    }

    /// Exclusive filter: score every labeled candidate and return only the
    /// highest-scoring node, so the extender fully controls placement. Ties
    /// break toward the lexicographically greatest node name. Zero labeled
    /// candidates falls back to the full original set, same as `filter`.
    pub fn filter_only_one(&self, args: ExtenderArgs) -> ExtenderFilterResult {
        info!("begin to schedule pod {} exclusively", full_name(&args.pod));

        let node_list = match args.nodes {
            Some(ref list) => list,
            None => {
                return ExtenderFilterResult {
                    nodes: args.nodes,
                    node_names: Some(Vec::new()),
                    failed_nodes: HashMap::new(),
                    error: String::new(),
                };
            },
        };

        let mut scored = Vec::new();
        for node in &node_list.items {
            if !has_capability_label(node) {
                continue;
            }
            scored.push(NodeScore { score: compute_score(node), node: node.clone() });
        }

        scored.sort_by_key(|ns| (ns.score, ns.node.name_any()));
        let best = match scored.pop() {
            Some(best) => best,
            None => {
                warn!("no valid node for {CAPABILITY_LABEL}, turn to default scheduler");
                return ExtenderFilterResult {
                    nodes: args.nodes,
                    node_names: None,
                    failed_nodes: HashMap::new(),
                    error: String::new(),
                };
            },
        };

        info!("node {} wins with score {}", best.node.name_any(), best.score);
        return ExtenderFilterResult {
            nodes: Some(NodeList {
                metadata: node_list.metadata.clone(),
                items: vec![best.node.clone()],
            }),
            node_names: Some(vec![best.node.name_any()]),
            failed_nodes: HashMap::new(),
            error: String::new(),
        };
    }

    /// Score candidate nodes in input order. Override-labeled nodes get the
    /// fixed maximum; nodes without the capability label are omitted from
    /// the result; known hardware classes map to their table score, unknown
    /// classes score 0. The scheduler merges these with other plugin scores,
    /// so this cannot fully control placement on its own.
    pub fn prioritize(&self, args: ExtenderArgs) -> HostPriorityList {
        let items = args.nodes.map(|l| l.items).unwrap_or_default();

        let mut result = Vec::with_capacity(items.len());
        for node in &items {
            let name = node.name_any();

            let labels = match &node.metadata.labels {
                Some(labels) => labels,
                None => {
                    warn!("node {name:?} does not have label {CAPABILITY_LABEL}");
                    continue;
                },
            };

            if labels.contains_key(PRIORITY_OVERRIDE_LABEL) {
                debug!("node {name}: {PRIORITY_OVERRIDE_LABEL} set, forcing max score");
                result.push(HostPriority { host: name, score: PRIORITY_OVERRIDE_SCORE });
                continue;
            }

            let class = match labels.get(CAPABILITY_LABEL) {
                Some(class) => class,
                None => {
                    warn!("node {name:?} does not have label {CAPABILITY_LABEL}");
                    continue;
                },
            };

            result.push(HostPriority { host: name, score: hardware_class_score(class) });
        }

        return result;
    }
}

fn has_capability_label(node: &corev1::Node) -> bool {
    if let Some(labels) = &node.metadata.labels {
        return labels.contains_key(CAPABILITY_LABEL);
    }
    return false;
}

/// Parse the capability label's value as a non-negative integer score.
/// A missing label or unparseable value is a policy violation, not a fatal
/// error: it is logged and the node scores 0.
pub fn compute_score(node: &corev1::Node) -> i64 {
    let name = node.name_any();
    let value = match node.metadata.labels.as_ref().and_then(|l| l.get(CAPABILITY_LABEL)) {
        Some(value) => value,
        None => {
            warn!("node {name:?} does not have label {CAPABILITY_LABEL}");
            return 0;
        },
    };

    return match value.parse::<i64>() {
        Ok(score) if score >= 0 => score,
        _ => {
            warn!("node {name:?} has invalid priority {value:?}");
            0
        },
    };
}

/// Fixed mapping from known hardware-class identifiers to scores; unknown
/// classes deliberately score 0.
fn hardware_class_score(class: &str) -> i64 {
    return match class {
        "tesla-t4" => 50,
        "ampere-a100" => 80,
        _ => 0,
    };
}

#[cfg(test)]
mod test;
