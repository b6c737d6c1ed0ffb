use std::collections::HashMap;

use k8s_openapi::api::core::v1 as corev1;
use kube::{
    Client,
    ResourceExt,
};
use tracing::*;

use crate::error::{
    Error,
    Result,
};
use crate::framework::{
    CycleState,
    Status,
};
use crate::owner::{
    controlling_owner,
    OwnerResolver,
    ReplicaSetResolver,
    StatefulSetResolver,
};
use crate::util::full_name;

pub const PLUGIN_NAME: &str = "StickyPod";

/// Fixed key under which the sticky state lives in the cycle-scoped store.
pub const STATE_KEY: &str = "StickyPodStateKey";

/// Annotation on the pod's owning controller; value is a comma-separated,
/// ordered list of node names.
pub const STICKY_ANNOTATION_KEY: &str = "sticky-nodes";

/// Per-pod, per-cycle sticky record. Written exactly once at PreFilter exit
/// and immutable for the remainder of the cycle. The node-name order is as
/// declared on the owner; it carries no meaning.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StickyState {
    pub node_exists: bool,
    pub node_names: Vec<String>,
}

/// Three-phase scheduling-cycle extension that pins a pod to the node set
/// declared on its owning controller.
pub struct StickyPod {
    resolvers: HashMap<&'static str, Box<dyn OwnerResolver>>,
}

impl StickyPod {
    pub fn new(client: Client) -> StickyPod {
        return StickyPod::with_resolvers(vec![
            Box::new(StatefulSetResolver::new(client.clone())),
            Box::new(ReplicaSetResolver::new(client)),
        ]);
    }

    pub fn with_resolvers(resolvers: Vec<Box<dyn OwnerResolver>>) -> StickyPod {
        let mut by_kind = HashMap::new();
        for resolver in resolvers {
            by_kind.insert(resolver.kind(), resolver);
        }
        return StickyPod { resolvers: by_kind };
    }

    pub fn name(&self) -> &'static str {
        return PLUGIN_NAME;
    }

    /// Derive the pod's sticky constraint from its owning controller and
    /// record it in the cycle state. State is written on every successful
    /// path; an owner fetch error aborts the cycle with no state written.
    pub async fn pre_filter(&self, state: &mut CycleState, pod: &corev1::Pod) -> Result<()> {
        info!("PreFilter unscheduled pod: {}", full_name(pod));

        let owner = match controlling_owner(pod) {
            Some(owner) => owner,
            None => {
                info!("PreFilter: pod owner ref not found, skip sticky operations");
                state.write(STATE_KEY, StickyState::default());
                return Ok(());
            },
        };

        let ns = pod.namespace().unwrap_or_default();
        info!("PreFilter: parent is {} {} in {} namespace", owner.kind, owner.name, ns);

        let resolver = match self.resolvers.get(owner.kind.as_str()) {
            Some(resolver) => resolver,
            None => {
                info!("PreFilter: owner kind {} not supported, skip sticky operations", owner.kind);
                state.write(STATE_KEY, StickyState::default());
                return Ok(());
            },
        };

        let annotation = resolver.annotation(&ns, &owner.name, STICKY_ANNOTATION_KEY).await?;
        let value = match annotation {
            Some(value) => value,
            None => {
                info!("PreFilter: pod does not stick to nodes");
                state.write(STATE_KEY, StickyState::default());
                return Ok(());
            },
        };

        let node_names: Vec<String> = value.split(',').map(str::to_string).collect();
        info!("PreFilter: pod has sticky nodes {node_names:?}, write to scheduling context");
        state.write(STATE_KEY, StickyState { node_exists: true, node_names });
        return Ok(());
    }

    /// Enforce the constraint recorded by `pre_filter` for one candidate
    /// node. Absent or mistyped cycle state is a caller-contract violation
    /// and fails the cycle; it is never silently tolerated.
    pub fn filter(&self, state: &CycleState, pod: &corev1::Pod, node: &corev1::Node) -> Result<Status> {
        let s = read_sticky_state(state, pod)?;

        if !s.node_exists {
            debug!("Filter {}: no sticky constraint, return success", full_name(pod));
            return Ok(Status::Success);
        }

        let node_name = node.name_any();
        if s.node_names.iter().any(|n| *n == node_name) {
            debug!("Filter {}: node {node_name} is a sticky node", full_name(pod));
            return Ok(Status::Success);
        }

        let status = Status::Unschedulable { node_name, pinned: s.node_names.clone() };
        info!("Filter {}: {status}", full_name(pod));
        return Ok(status);
    }

    /// Reserved for writing the chosen node back onto the owner as a new
    /// sticky declaration when none was set; intentionally not implemented
    /// yet, so both paths are no-ops beyond logging.
    pub fn post_bind(&self, state: &CycleState, pod: &corev1::Pod, node_name: &str) {
        let s = match read_sticky_state(state, pod) {
            Ok(s) => s,
            Err(err) => {
                warn!("PostBind {}: {err}", full_name(pod));
                return;
            },
        };

        if s.node_exists {
            debug!("PostBind {}: pod already has sticky nodes, return", full_name(pod));
            return;
        }

        info!("PostBind {}: bound to {node_name}, sticky write-back not implemented", full_name(pod));
    }
}

fn read_sticky_state<'a>(state: &'a CycleState, pod: &corev1::Pod) -> Result<&'a StickyState> {
    return state
        .read::<StickyState>(STATE_KEY)
        .ok_or_else(|| Error::CycleStateMissing { pod: full_name(pod) });
}
