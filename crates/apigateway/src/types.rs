//! Route declarations and Swagger 2.0 type definitions
//!
//! The swagger types come in two flavours: the in-progress document built from
//! routes, whose integration URIs and credentials are still [`Output`]s, and
//! the resolved document that is serialized once every output is known.

use aws_serverless_common::resources::LambdaFunction;
use aws_serverless_common::{Handler, Output, ServerlessError};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Method token API Gateway uses for "any HTTP method"
pub const ANY_METHOD: &str = "x-amazon-apigateway-any-method";

/// String-keyed map that keeps insertion order
///
/// Re-inserting an existing key replaces the value in place, so the key keeps
/// its original position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the one it replaced
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Default> OrderedMap<V> {
    /// The value at `key`, inserting a default one if absent
    pub fn entry_or_default(&mut self, key: &str) -> &mut V {
        let index = match self.entries.iter().position(|(k, _)| k == key) {
            Some(index) => index,
            None => {
                self.entries.push((key.to_string(), V::default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// HTTP method of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Method {
    Any,
    Get,
    Put,
    Post,
    Delete,
    Patch,
    Options,
    Head,
}

impl Method {
    /// Method key used in the swagger `paths` object
    pub fn swagger_token(&self) -> &'static str {
        match self {
            Method::Any => ANY_METHOD,
            Method::Get => "get",
            Method::Put => "put",
            Method::Post => "post",
            Method::Delete => "delete",
            Method::Patch => "patch",
            Method::Options => "options",
            Method::Head => "head",
        }
    }
}

impl FromStr for Method {
    type Err = ServerlessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" => Ok(Method::Any),
            "get" => Ok(Method::Get),
            "put" => Ok(Method::Put),
            "post" => Ok(Method::Post),
            "delete" => Ok(Method::Delete),
            "patch" => Ok(Method::Patch),
            "options" => Ok(Method::Options),
            "head" => Ok(Method::Head),
            _ => Err(ServerlessError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for Method {
    type Error = ServerlessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Any => "ANY",
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
            Method::Head => "HEAD",
        };
        f.write_str(name)
    }
}

/// A lambda-backed route
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub method: Method,
    pub handler: Handler,
}

impl Route {
    pub fn new(method: Method, path: &str, handler: impl Into<Handler>) -> Self {
        Self {
            path: path.to_string(),
            method,
            handler: handler.into(),
        }
    }
}

/// Which file a directory route serves at its own path
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "IndexSetting")]
pub enum IndexPolicy {
    Disabled,
    File(String),
}

impl Default for IndexPolicy {
    fn default() -> Self {
        IndexPolicy::File("index.html".to_string())
    }
}

impl IndexPolicy {
    pub fn file_name(&self) -> Option<&str> {
        match self {
            IndexPolicy::Disabled => None,
            IndexPolicy::File(name) => Some(name),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IndexSetting {
    Enabled(bool),
    File(String),
}

impl From<IndexSetting> for IndexPolicy {
    fn from(setting: IndexSetting) -> Self {
        match setting {
            IndexSetting::Enabled(false) => IndexPolicy::Disabled,
            IndexSetting::Enabled(true) => IndexPolicy::default(),
            IndexSetting::File(name) => IndexPolicy::File(name),
        }
    }
}

/// A route served from a local file or directory through S3
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StaticRoute {
    pub path: String,
    pub local_path: PathBuf,
    /// Overrides the content type inferred from a file route's extension
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub index: IndexPolicy,
}

impl StaticRoute {
    pub fn new(path: &str, local_path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.to_string(),
            local_path: local_path.into(),
            content_type: None,
            index: IndexPolicy::default(),
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn with_index(mut self, index: IndexPolicy) -> Self {
        self.index = index;
        self
    }
}

/// Swagger document under construction
#[derive(Debug, Clone)]
pub struct SwaggerSpec {
    pub swagger: String,
    pub info: SwaggerInfo,
    pub paths: OrderedMap<OrderedMap<SwaggerOperation>>,
    pub binary_media_types: Vec<String>,
}

impl SwaggerSpec {
    pub fn operation(&self, path: &str, method: &str) -> Option<&SwaggerOperation> {
        self.paths.get(path).and_then(|methods| methods.get(method))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwaggerInfo {
    pub title: String,
    pub version: String,
}

/// One method of one path, possibly waiting on resource outputs
#[derive(Debug, Clone)]
pub struct SwaggerOperation {
    pub parameters: Option<Vec<SwaggerParameter>>,
    pub responses: Option<OrderedMap<SwaggerResponse>>,
    pub integration: Integration,
    /// Function backing the operation, used to grant invoke permissions
    pub lambda: Option<LambdaFunction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwaggerParameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub param_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwaggerResponse {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SwaggerSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<OrderedMap<SwaggerHeader>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwaggerSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwaggerHeader {
    #[serde(rename = "type")]
    pub header_type: String,
}

/// Backend an operation is forwarded to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationType {
    /// Lambda proxy integration
    AwsProxy,
    /// Direct AWS service integration (S3)
    Aws,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: String,
    #[serde(rename = "responseParameters", skip_serializing_if = "Option::is_none")]
    pub response_parameters: Option<OrderedMap<String>>,
}

/// `x-amazon-apigateway-integration` block whose target is not known yet
#[derive(Debug, Clone)]
pub struct Integration {
    pub request_parameters: Option<OrderedMap<String>>,
    pub passthrough_behavior: Option<String>,
    pub http_method: String,
    pub integration_type: IntegrationType,
    pub responses: Option<OrderedMap<IntegrationResponse>>,
    pub connection_type: Option<String>,
    pub uri: Output<String>,
    pub credentials: Option<Output<String>>,
    pub connection_id: Option<Output<String>>,
}

/// `x-amazon-apigateway-integration` block with every output resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedIntegration {
    #[serde(rename = "requestParameters", skip_serializing_if = "Option::is_none")]
    pub request_parameters: Option<OrderedMap<String>>,
    #[serde(rename = "passthroughBehavior", skip_serializing_if = "Option::is_none")]
    pub passthrough_behavior: Option<String>,
    #[serde(rename = "httpMethod")]
    pub http_method: String,
    #[serde(rename = "type")]
    pub integration_type: IntegrationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<OrderedMap<IntegrationResponse>>,
    #[serde(rename = "connectionType", skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    #[serde(rename = "connectionId", skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOperation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<SwaggerParameter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<OrderedMap<SwaggerResponse>>,
    #[serde(rename = "x-amazon-apigateway-integration")]
    pub integration: ResolvedIntegration,
}

/// Gateway-level response override
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(rename = "responseTemplates")]
    pub response_templates: OrderedMap<String>,
}

/// The final document handed to the REST API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwaggerDocument {
    pub swagger: String,
    pub info: SwaggerInfo,
    pub paths: OrderedMap<OrderedMap<ResolvedOperation>>,
    #[serde(rename = "x-amazon-apigateway-binary-media-types")]
    pub binary_media_types: Vec<String>,
    #[serde(rename = "x-amazon-apigateway-gateway-responses")]
    pub gateway_responses: OrderedMap<GatewayResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_map_replaces_in_place() {
        let mut map = OrderedMap::new();
        map.insert("/b", 1);
        map.insert("/a", 2);
        assert_eq!(map.insert("/b", 3), Some(1));

        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["/b", "/a"]);
        assert_eq!(map.get("/b"), Some(&3));
    }

    #[test]
    fn test_ordered_map_serializes_in_insertion_order() {
        let map: OrderedMap<u32> = vec![("z", 1), ("a", 2)].into_iter().collect();
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn test_ordered_map_equality_follows_order() {
        fn assert_eq_impl<T: Eq>(_: &T) {}

        let forward: OrderedMap<u32> = vec![("a", 1), ("b", 2)].into_iter().collect();
        let backward: OrderedMap<u32> = vec![("b", 2), ("a", 1)].into_iter().collect();
        assert_eq_impl(&forward);
        assert_eq!(forward, forward.clone());
        assert_ne!(forward, backward);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("any".parse::<Method>().unwrap().swagger_token(), ANY_METHOD);
        assert!(matches!(
            "TRACE".parse::<Method>(),
            Err(ServerlessError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_index_disabled() {
        let route: StaticRoute = serde_json::from_str(
            r#"{"path": "/assets/", "local_path": "./www", "index": false}"#,
        )
        .unwrap();
        assert_eq!(route.index, IndexPolicy::Disabled);
        assert_eq!(route.index.file_name(), None);
    }

    #[test]
    fn test_index_policy_variants() {
        let named: StaticRoute = serde_json::from_str(
            r#"{"path": "/", "local_path": "www", "index": "home.html"}"#,
        )
        .unwrap();
        assert_eq!(named.index.file_name(), Some("home.html"));

        let default: StaticRoute =
            serde_json::from_str(r#"{"path": "/", "local_path": "www"}"#).unwrap();
        assert_eq!(default.index.file_name(), Some("index.html"));
    }

    #[test]
    fn test_method_deserialize_rejects_unknown() {
        let result: Result<Method, _> = serde_json::from_str(r#""TRACE""#);
        assert!(result.is_err());
    }
}
