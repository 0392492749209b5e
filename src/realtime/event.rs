//! Change events delivered by the push channel, and how they map to cache keys.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of server-side mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Created,
    Updated,
    Deleted,
}

/// One pushed change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub resource_type: String,
    pub resource_id: String,
    pub operation: Operation,
    /// New representation of the resource, when the server sends one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Version of `payload`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl ChangeEvent {
    pub fn new(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        operation: Operation,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            operation,
            payload: None,
            version: None,
        }
    }

    /// Attaches a pushed payload and its version.
    #[must_use]
    pub fn with_payload(mut self, payload: Value, version: u64) -> Self {
        self.payload = Some(payload);
        self.version = Some(version);
        self
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}/{}", self.operation, self.resource_type, self.resource_id)
    }
}

// == Resource Routes ==
/// Where a resource type lives in the key space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRoute {
    /// Key of one resource is `{prefix}/{resource_id}`
    pub prefix: String,
    /// Listing keys that change when a resource is created or deleted
    pub collection_keys: Vec<String>,
}

/// Resource type to key mapping used by the reconciler.
#[derive(Debug, Clone, Default)]
pub struct ResourceRoutes {
    routes: HashMap<String, ResourceRoute>,
}

impl ResourceRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes for the blog, media and user endpoints.
    pub fn standard() -> Self {
        Self::new()
            .route("post", "api/blog/post", ["api/blog/all"])
            .route("media", "api/media", ["api/media/all"])
            .route("user", "api/user", ["api/user/all"])
    }

    #[must_use]
    pub fn route<I, S>(mut self, resource_type: impl Into<String>, prefix: impl Into<String>, collection_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.routes.insert(
            resource_type.into(),
            ResourceRoute {
                prefix: prefix.into(),
                collection_keys: collection_keys.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    /// Cache key of the resource the event is about.
    ///
    /// Unknown types fall back to `api/{resource_type}/{resource_id}`.
    pub fn key_for(&self, event: &ChangeEvent) -> String {
        match self.routes.get(&event.resource_type) {
            Some(route) => format!("{}/{}", route.prefix, event.resource_id),
            None => format!("api/{}/{}", event.resource_type, event.resource_id),
        }
    }

    /// Listing keys affected by a create or delete of this resource type.
    pub fn collection_keys(&self, resource_type: &str) -> &[String] {
        self.routes
            .get(resource_type)
            .map(|route| route.collection_keys.as_slice())
            .unwrap_or(&[])
    }
}
