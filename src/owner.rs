use async_trait::async_trait;
use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{
    Api,
    Client,
};

use crate::error::{
    Error,
    Result,
};

const KIND_NODE: &str = "Node";

/// Find the controlling owner reference of a pod. Owner references of kind
/// `Node` are never treated as controllers.
pub fn controlling_owner(pod: &corev1::Pod) -> Option<&OwnerReference> {
    let refs = pod.metadata.owner_references.as_ref()?;
    return refs.iter().find(|r| r.controller == Some(true) && r.kind != KIND_NODE);
}

/// Fetches a single annotation from one supported controller kind. One
/// implementation per kind; adding a controller kind means adding an
/// implementation, not another dispatch branch.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OwnerResolver: Send + Sync {
    fn kind(&self) -> &'static str;

    /// A fetch error here is fatal for the caller's scheduling cycle; no
    /// retry is attempted at this layer.
    async fn annotation(&self, namespace: &str, name: &str, key: &str) -> Result<Option<String>>;
}

pub struct StatefulSetResolver {
    client: Client,
}

impl StatefulSetResolver {
    pub fn new(client: Client) -> StatefulSetResolver {
        return StatefulSetResolver { client };
    }
}

#[async_trait]
impl OwnerResolver for StatefulSetResolver {
    fn kind(&self) -> &'static str {
        return "StatefulSet";
    }

    async fn annotation(&self, namespace: &str, name: &str, key: &str) -> Result<Option<String>> {
        let api: Api<appsv1::StatefulSet> = Api::namespaced(self.client.clone(), namespace);
        let sts = api.get(name).await.map_err(|source| Error::OwnerFetch {
            kind: self.kind().to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            source,
        })?;
        return Ok(sts.metadata.annotations.as_ref().and_then(|a| a.get(key)).cloned());
    }
}

pub struct ReplicaSetResolver {
    client: Client,
}

impl ReplicaSetResolver {
    pub fn new(client: Client) -> ReplicaSetResolver {
        return ReplicaSetResolver { client };
    }
}

#[async_trait]
impl OwnerResolver for ReplicaSetResolver {
    fn kind(&self) -> &'static str {
        return "ReplicaSet";
    }

    async fn annotation(&self, namespace: &str, name: &str, key: &str) -> Result<Option<String>> {
        let api: Api<appsv1::ReplicaSet> = Api::namespaced(self.client.clone(), namespace);
        let rs = api.get(name).await.map_err(|source| Error::OwnerFetch {
            kind: self.kind().to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            source,
        })?;
        return Ok(rs.metadata.annotations.as_ref().and_then(|a| a.get(key)).cloned());
    }
}
