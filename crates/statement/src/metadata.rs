//! Entity metadata, partitioned by entity type.
//!
//! An entity configuration may describe the entity under several entity-type
//! tags at once (a federation entity that is also an OpenID provider, say).
//! Only the `federation_entity` partition has claims the resolver itself
//! reads — the fetch endpoint in particular — so that partition is typed;
//! every other partition is carried as raw JSON and only touched by metadata
//! policies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::set_ops;

/// Entity type tag for federation metadata.
pub const FEDERATION_ENTITY: &str = "federation_entity";
/// Entity type tag for OpenID providers.
pub const OPENID_PROVIDER: &str = "openid_provider";
/// Entity type tag for OpenID relying parties.
pub const OPENID_RELYING_PARTY: &str = "openid_relying_party";
/// Entity type tag for OAuth authorization servers.
pub const OAUTH_AUTHORIZATION_SERVER: &str = "oauth_authorization_server";
/// Entity type tag for OAuth clients.
pub const OAUTH_CLIENT: &str = "oauth_client";
/// Entity type tag for OAuth protected resources.
pub const OAUTH_RESOURCE: &str = "oauth_resource";

/// Metadata of a federation entity, keyed by entity type tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// The `federation_entity` partition, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub federation_entity: Option<FederationEntityMetadata>,

    /// Every other entity-type partition, keyed by tag.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Metadata {
    /// Returns true iff no partition is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.federation_entity.is_none() && self.rest.is_empty()
    }

    /// Returns the entity type tags present in this metadata.
    #[must_use]
    pub fn partition_tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        if self.federation_entity.is_some() {
            tags.push(FEDERATION_ENTITY.to_string());
        }
        tags.extend(self.rest.keys().cloned());
        tags
    }

    /// Clears every partition whose entity type tag is not in `types`.
    ///
    /// An empty `types` list means "all types" and leaves the metadata
    /// untouched.
    pub fn retain_types(&mut self, types: &[String]) {
        if types.is_empty() {
            return;
        }
        if !set_ops::contains(&FEDERATION_ENTITY.to_string(), types) {
            self.federation_entity = None;
        }
        self.rest.retain(|tag, _| set_ops::contains(tag, types));
    }

    /// Returns the federation fetch endpoint, if one is advertised.
    #[must_use]
    pub fn federation_fetch_endpoint(&self) -> Option<&str> {
        self.federation_entity
            .as_ref()
            .and_then(|fe| fe.federation_fetch_endpoint.as_deref())
            .filter(|e| !e.is_empty())
    }

    /// Serialises all partitions into a tag-keyed JSON map.
    ///
    /// Used by policy application, which operates uniformly on raw JSON.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Rebuilds metadata from a tag-keyed JSON map.
    ///
    /// The inverse of [`to_map`](Self::to_map); unknown tags land in `rest`.
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(map)).unwrap_or_default()
    }
}

/// The typed claims of the `federation_entity` partition.
///
/// Only the claims the resolver consumes are typed; everything else is
/// preserved in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FederationEntityMetadata {
    /// Endpoint for fetching subordinate statements issued by this entity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub federation_fetch_endpoint: Option<String>,

    /// Endpoint listing this entity's subordinates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub federation_list_endpoint: Option<String>,

    /// Endpoint resolving trust chains on behalf of callers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub federation_resolve_endpoint: Option<String>,

    /// Human-readable organization name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,

    /// Every other `federation_entity` claim, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
