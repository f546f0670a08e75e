//! Kubernetes platform adapter
//!
//! Talks to the API server through `kube`. Translates the server's 409 and 404
//! answers into the conflict and not-found signals the lifecycle logic is
//! built on; every other failure passes through untouched.

use crate::domain::ports::{ClusterResourceApi, ResourceKind};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// HTTP status the API server uses for "already exists"
const HTTP_CONFLICT: u16 = 409;

/// HTTP status the API server uses for "not found"
const HTTP_NOT_FOUND: u16 = 404;

/// Adapter for a live Kubernetes cluster
#[derive(Clone)]
pub struct KubeResourceApi {
    client: Client,
}

impl KubeResourceApi {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using in-cluster config or the local kubeconfig
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn create_typed<K>(
        &self,
        kind: ResourceKind,
        namespace: &str,
        manifest: &serde_json::Value,
    ) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Debug + Serialize + DeserializeOwned,
        <K as Resource>::DynamicType: Default,
    {
        let object: K = serde_json::from_value(manifest.clone())?;
        let name = object.meta().name.clone().unwrap_or_default();

        debug!("POST {} {}/{}", kind, namespace, name);
        self.api::<K>(namespace)
            .create(&PostParams::default(), &object)
            .await
            .map(|_| ())
            .map_err(|e| classify(e, kind, &name))
    }

    async fn delete_typed<K>(&self, kind: ResourceKind, name: &str, namespace: &str) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Debug + DeserializeOwned,
        <K as Resource>::DynamicType: Default,
    {
        debug!("DELETE {} {}/{}", kind, namespace, name);
        self.api::<K>(namespace)
            .delete(name, &DeleteParams::background())
            .await
            .map(|_| ())
            .map_err(|e| classify(e, kind, name))
    }
}

#[async_trait]
impl ClusterResourceApi for KubeResourceApi {
    async fn create(
        &self,
        kind: ResourceKind,
        namespace: &str,
        manifest: &serde_json::Value,
    ) -> Result<()> {
        match kind {
            ResourceKind::Deployment => {
                self.create_typed::<Deployment>(kind, namespace, manifest)
                    .await
            }
            ResourceKind::Service => self.create_typed::<Service>(kind, namespace, manifest).await,
        }
    }

    async fn delete(&self, kind: ResourceKind, name: &str, namespace: &str) -> Result<()> {
        match kind {
            ResourceKind::Deployment => {
                self.delete_typed::<Deployment>(kind, name, namespace).await
            }
            ResourceKind::Service => self.delete_typed::<Service>(kind, name, namespace).await,
        }
    }

    async fn read_deployment(&self, name: &str, namespace: &str) -> Result<Deployment> {
        debug!("GET Deployment {}/{}", namespace, name);
        self.api::<Deployment>(namespace)
            .get(name)
            .await
            .map_err(|e| classify(e, ResourceKind::Deployment, name))
    }
}

/// Map an API error onto the conflict / not-found signals
fn classify(error: kube::Error, kind: ResourceKind, name: &str) -> Error {
    match error {
        kube::Error::Api(response) if response.code == HTTP_CONFLICT => Error::ResourceConflict {
            kind: kind.to_string(),
            name: name.to_string(),
        },
        kube::Error::Api(response) if response.code == HTTP_NOT_FOUND => Error::ResourceNotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        },
        other => Error::Kube(other),
    }
}
