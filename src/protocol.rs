//! Wire types for the scheduler extender webhook, matching the upstream
//! extender v1 JSON contract (PascalCase field names, lowercase list metadata).

use std::collections::HashMap;

use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ListMeta;
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeList {
    #[serde(default)]
    pub metadata: ListMeta,
    pub items: Vec<corev1::Node>,
}

/// Arguments the default scheduler sends to every extender hook. `nodes` is
/// populated when NodeCacheCapable is false, `node_names` when it is true;
/// the two modes are mutually exclusive.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtenderArgs {
    pub pod: corev1::Pod,
    pub nodes: Option<NodeList>,
    pub node_names: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtenderFilterResult {
    pub nodes: Option<NodeList>,
    pub node_names: Option<Vec<String>>,
    pub failed_nodes: HashMap<String, String>,
    pub error: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostPriority {
    pub host: String,
    pub score: i64,
}

pub type HostPriorityList = Vec<HostPriority>;
