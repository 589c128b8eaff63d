//! HTTP Resource Client
//!
//! Implements ResourceClient against the Kubernetes core REST API.
//!
//! - list:   `GET   {api}/api/v1/{plural}`
//! - update: `PUT   {api}/api/v1/namespaces/{ns}/{plural}/{name}`
//! - patch:  `PATCH {api}/api/v1/namespaces/{ns}/{plural}/{name}` (JSON patch)
//!
//! Fields the engine does not own (labels, owner references, `type`, ...)
//! are kept in [`ManagedResource::extra`] and sent back unchanged on PUT.

use crate::domain::entities::ManagedResource;
use crate::domain::errors::ReplicationError;
use crate::domain::ports::ResourceClient;
use crate::domain::value_objects::{PatchOperation, ResourceKey, ResourceKind};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

const JSON_PATCH: &str = "application/json-patch+json";

/// Connection settings for the API server.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL, e.g. "http://127.0.0.1:8001" for `kubectl proxy`
    pub api_url: String,
    /// Bearer token sent with every request, if any
    pub bearer_token: Option<String>,
    pub request_timeout: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8001".to_string(),
            bearer_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct HttpResourceClient {
    config: ApiClientConfig,
    client: reqwest::Client,
}

impl HttpResourceClient {
    pub fn new(config: ApiClientConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, client })
    }

    fn collection_url(&self, kind: ResourceKind) -> String {
        format!(
            "{}/api/v1/{}",
            self.config.api_url.trim_end_matches('/'),
            kind.plural()
        )
    }

    fn object_url(&self, kind: ResourceKind, key: &ResourceKey) -> String {
        format!(
            "{}/api/v1/namespaces/{}/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            key.namespace,
            kind.plural(),
            key.name
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode the JSON body, mapping failures onto
    /// read or write errors for `key`.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        key: &str,
        write: bool,
    ) -> Result<Value, ReplicationError> {
        let fail = |message: String| {
            if write {
                ReplicationError::StoreWrite {
                    key: key.to_string(),
                    message,
                }
            } else {
                ReplicationError::StoreRead {
                    key: key.to_string(),
                    message,
                }
            }
        };

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ReplicationError::NotFound {
                key: key.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fail(format!("{} - {}", status, body)));
        }

        response.json().await.map_err(|e| fail(e.to_string()))
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn list(&self, kind: ResourceKind) -> Result<Vec<ManagedResource>, ReplicationError> {
        let scope = kind.plural();
        let body = self
            .send(self.client.get(self.collection_url(kind)), scope, false)
            .await?;

        let items = body
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| ReplicationError::StoreRead {
                key: scope.to_string(),
                message: "list response has no items array".to_string(),
            })?;

        items
            .iter()
            .map(|item| from_wire(kind, item.clone()))
            .collect()
    }

    async fn update(&self, resource: &ManagedResource) -> Result<ManagedResource, ReplicationError> {
        let key = resource.key();
        let request = self
            .client
            .put(self.object_url(resource.kind, &key))
            .json(&to_wire(resource));

        let body = self.send(request, &key.to_string(), true).await?;
        from_wire(resource.kind, body)
    }

    async fn patch(
        &self,
        kind: ResourceKind,
        key: &ResourceKey,
        ops: &[PatchOperation],
    ) -> Result<ManagedResource, ReplicationError> {
        let payload = serde_json::to_vec(ops).map_err(|e| ReplicationError::InvalidPatch {
            path: String::new(),
            reason: e.to_string(),
        })?;
        let request = self
            .client
            .patch(self.object_url(kind, key))
            .header(CONTENT_TYPE, JSON_PATCH)
            .body(payload);

        let body = self.send(request, &key.to_string(), true).await?;
        from_wire(kind, body)
    }
}

/// Decode an API object into a [`ManagedResource`].
pub fn from_wire(kind: ResourceKind, value: Value) -> Result<ManagedResource, ReplicationError> {
    let malformed = |message: &str| ReplicationError::StoreRead {
        key: kind.plural().to_string(),
        message: message.to_string(),
    };

    let Value::Object(mut object) = value else {
        return Err(malformed("object is not a JSON object"));
    };
    let Some(Value::Object(mut metadata)) = object.remove("metadata") else {
        return Err(malformed("object has no metadata"));
    };

    let name = take_string(&mut metadata, "name").ok_or_else(|| malformed("object has no name"))?;
    let namespace = take_string(&mut metadata, "namespace")
        .ok_or_else(|| malformed("object has no namespace"))?;
    let version = take_string(&mut metadata, "resourceVersion").unwrap_or_default();
    let annotations = metadata
        .remove("annotations")
        .map(|v| string_map(&v))
        .transpose()
        .map_err(|_| malformed("annotations must be strings"))?
        .unwrap_or_default();
    let data = object
        .remove("data")
        .filter(|v| !v.is_null())
        .map(|v| string_map(&v))
        .transpose()
        .map_err(|_| malformed("data values must be strings"))?;

    object.remove("apiVersion");
    object.remove("kind");
    if !metadata.is_empty() {
        object.insert("metadata".to_string(), Value::Object(metadata));
    }

    Ok(ManagedResource {
        kind,
        namespace,
        name,
        version,
        annotations,
        data,
        extra: object,
    })
}

/// Encode a [`ManagedResource`] as an API object.
pub fn to_wire(resource: &ManagedResource) -> Value {
    let mut object = resource.extra.clone();
    let mut metadata = match object.remove("metadata") {
        Some(Value::Object(m)) => m,
        _ => Map::new(),
    };

    metadata.insert("name".to_string(), Value::from(resource.name.as_str()));
    metadata.insert(
        "namespace".to_string(),
        Value::from(resource.namespace.as_str()),
    );
    if !resource.version.is_empty() {
        metadata.insert(
            "resourceVersion".to_string(),
            Value::from(resource.version.as_str()),
        );
    }
    if !resource.annotations.is_empty() {
        metadata.insert(
            "annotations".to_string(),
            Value::Object(to_object(&resource.annotations)),
        );
    }

    object.insert("apiVersion".to_string(), Value::from("v1"));
    object.insert("kind".to_string(), Value::from(resource.kind.api_kind()));
    object.insert("metadata".to_string(), Value::Object(metadata));
    if let Some(data) = &resource.data {
        object.insert("data".to_string(), Value::Object(to_object(data)));
    }

    Value::Object(object)
}

fn take_string(map: &mut Map<String, Value>, field: &str) -> Option<String> {
    match map.remove(field) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn string_map(value: &Value) -> Result<BTreeMap<String, String>, ()> {
    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())).ok_or(()))
            .collect(),
        _ => Err(()),
    }
}

fn to_object(map: &BTreeMap<String, String>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
        .collect()
}
