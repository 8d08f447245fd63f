//! The resource graph contract
//!
//! Provisioning is owned by the engine behind [`ResourceGraph`]. This crate
//! only needs to declare resources whose inputs may still be unknown, express
//! parent and dependency relationships, and read attributes back as
//! [`Output`] values.

use crate::output::{Output, OutputError};
use crate::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Attributes assigned to a resource by the engine once it exists
pub type Attributes = Arc<BTreeMap<String, Value>>;

/// Unique identity of a declared resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Urn(String);

impl Urn {
    pub fn new(type_token: &str, name: &str) -> Self {
        Self(format!("urn:{}::{}", type_token, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parent and dependency relationships of a declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceOptions {
    pub parent: Option<Urn>,
    pub depends_on: Vec<Urn>,
}

impl ResourceOptions {
    pub fn parent(parent: &Resource) -> Self {
        Self {
            parent: Some(parent.urn().clone()),
            depends_on: Vec::new(),
        }
    }

    pub fn depends_on<'a>(mut self, resources: impl IntoIterator<Item = &'a Resource>) -> Self {
        self.depends_on
            .extend(resources.into_iter().map(|r| r.urn().clone()));
        self
    }
}

/// Conversion of plain and asynchronous values into resource inputs
pub trait IntoInput {
    fn into_input(self) -> Output<Value>;
}

impl IntoInput for Output<Value> {
    fn into_input(self) -> Output<Value> {
        self
    }
}

impl IntoInput for Output<String> {
    fn into_input(self) -> Output<Value> {
        self.apply(Value::String)
    }
}

impl IntoInput for Output<Option<String>> {
    fn into_input(self) -> Output<Value> {
        self.apply(|value| value.map(Value::String).unwrap_or(Value::Null))
    }
}

impl IntoInput for Value {
    fn into_input(self) -> Output<Value> {
        Output::known(self)
    }
}

impl IntoInput for &str {
    fn into_input(self) -> Output<Value> {
        Output::known(Value::String(self.to_string()))
    }
}

impl IntoInput for String {
    fn into_input(self) -> Output<Value> {
        Output::known(Value::String(self))
    }
}

impl IntoInput for bool {
    fn into_input(self) -> Output<Value> {
        Output::known(Value::Bool(self))
    }
}

impl IntoInput for u32 {
    fn into_input(self) -> Output<Value> {
        Output::known(Value::from(self))
    }
}

/// A resource declaration handed to the engine
#[derive(Debug, Clone)]
pub struct ResourceSpec {
    pub type_token: String,
    pub name: String,
    pub inputs: Vec<(String, Output<Value>)>,
    pub options: ResourceOptions,
}

impl ResourceSpec {
    pub fn new(type_token: &str, name: &str) -> Self {
        Self {
            type_token: type_token.to_string(),
            name: name.to_string(),
            inputs: Vec::new(),
            options: ResourceOptions::default(),
        }
    }

    pub fn input(mut self, key: &str, value: impl IntoInput) -> Self {
        self.inputs.push((key.to_string(), value.into_input()));
        self
    }

    /// Add an input only when a value is present
    pub fn optional_input<V: IntoInput>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.input(key, value),
            None => self,
        }
    }

    pub fn options(mut self, options: ResourceOptions) -> Self {
        self.options = options;
        self
    }
}

/// Engine that materializes declared resources
pub trait ResourceGraph {
    /// Declare a resource and receive a handle to its future attributes
    fn declare(&self, spec: ResourceSpec) -> Result<Resource>;
}

/// Handle to a declared resource
#[derive(Debug, Clone)]
pub struct Resource {
    urn: Urn,
    type_token: String,
    name: String,
    state: Output<Attributes>,
}

impl Resource {
    pub fn new(urn: Urn, type_token: &str, name: &str, state: Output<Attributes>) -> Self {
        Self {
            urn,
            type_token: type_token.to_string(),
            name: name.to_string(),
            state,
        }
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn type_token(&self) -> &str {
        &self.type_token
    }

    /// Logical name the resource was declared with
    pub fn name(&self) -> &str {
        &self.name
    }

    /// An attribute assigned by the engine
    pub fn attribute(&self, key: &str) -> Output<Value> {
        let key = key.to_string();
        let urn = self.urn.clone();
        self.state.try_apply(move |attributes| {
            attributes.get(&key).cloned().ok_or_else(|| {
                OutputError::new(format!("{} has no attribute '{}'", urn, key))
            })
        })
    }

    /// A string attribute assigned by the engine
    pub fn string_attribute(&self, key: &str) -> Output<String> {
        let key = key.to_string();
        self.attribute(&key).try_apply(move |value| match value {
            Value::String(s) => Ok(s),
            other => Err(OutputError::new(format!(
                "attribute '{}' is not a string: {}",
                key, other
            ))),
        })
    }

    pub fn id(&self) -> Output<String> {
        self.string_attribute("id")
    }

    pub fn arn(&self) -> Output<String> {
        self.string_attribute("arn")
    }

    /// Physical name assigned by the engine
    pub fn name_output(&self) -> Output<String> {
        self.string_attribute("name")
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.urn == other.urn
    }
}

impl Eq for Resource {}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource_with(attributes: BTreeMap<String, Value>) -> Resource {
        let urn = Urn::new("aws:sns/topic:Topic", "t");
        Resource::new(urn, "aws:sns/topic:Topic", "t", Output::known(Arc::new(attributes)))
    }

    #[test]
    fn test_urn_format() {
        let urn = Urn::new("aws:s3/bucket:Bucket", "site");
        assert_eq!(urn.as_str(), "urn:aws:s3/bucket:Bucket::site");
    }

    #[test]
    fn test_string_attribute() {
        let mut attrs = BTreeMap::new();
        attrs.insert("arn".to_string(), Value::String("arn:aws:sns:t".to_string()));
        let resource = resource_with(attrs);

        assert_eq!(resource.arn().now(), Some(Ok("arn:aws:sns:t".to_string())));
    }

    #[test]
    fn test_missing_attribute_fails() {
        let resource = resource_with(BTreeMap::new());
        let err = resource.id().now().unwrap().unwrap_err();
        assert!(err.message().contains("no attribute 'id'"));
    }

    #[test]
    fn test_spec_builder_collects_inputs() {
        let spec = ResourceSpec::new("aws:sqs/queue:Queue", "q")
            .input("fifo", false)
            .optional_input::<u32>("delay", None)
            .optional_input("batchSize", Some(10u32));

        let keys: Vec<&str> = spec.inputs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["fifo", "batchSize"]);
    }
}
