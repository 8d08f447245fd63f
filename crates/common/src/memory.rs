//! In-memory resource graph
//!
//! Records every declaration and hands out pending attributes that are only
//! resolved when the graph is materialized. Used by the CLI to synthesize a
//! plan without touching a cloud account, and by tests to control the order in
//! which outputs resolve.

use crate::graph::{Attributes, Resource, ResourceGraph, ResourceOptions, ResourceSpec, Urn};
use crate::output::{Output, Resolver};
use crate::{Result, ServerlessError};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Account id used in synthesized ARNs
const DEFAULT_ACCOUNT_ID: &str = "123456789012";

/// A declaration as recorded by [`InMemoryGraph`]
#[derive(Debug, Clone)]
pub struct DeclaredResource {
    pub urn: Urn,
    pub type_token: String,
    pub name: String,
    pub inputs: Vec<(String, Output<Value>)>,
    pub options: ResourceOptions,
}

impl DeclaredResource {
    pub fn input(&self, key: &str) -> Option<&Output<Value>> {
        self.inputs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }
}

#[derive(Default)]
struct GraphState {
    declared: Vec<DeclaredResource>,
    urns: HashSet<Urn>,
    pending: Vec<(Urn, Resolver<Attributes>)>,
}

/// Resource graph that keeps everything in memory
pub struct InMemoryGraph {
    region: String,
    account_id: String,
    state: RefCell<GraphState>,
}

impl InMemoryGraph {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
            state: RefCell::new(GraphState::default()),
        }
    }

    pub fn with_account_id(mut self, account_id: &str) -> Self {
        self.account_id = account_id.to_string();
        self
    }

    /// Every declaration so far, in declaration order
    pub fn resources(&self) -> Vec<DeclaredResource> {
        self.state.borrow().declared.clone()
    }

    /// Declarations of one resource type
    pub fn resources_of_type(&self, type_token: &str) -> Vec<DeclaredResource> {
        self.state
            .borrow()
            .declared
            .iter()
            .filter(|r| r.type_token == type_token)
            .cloned()
            .collect()
    }

    pub fn find(&self, type_token: &str, name: &str) -> Option<DeclaredResource> {
        let urn = Urn::new(type_token, name);
        self.state
            .borrow()
            .declared
            .iter()
            .find(|r| r.urn == urn)
            .cloned()
    }

    /// URNs of resources whose attributes are still unresolved
    pub fn pending_urns(&self) -> Vec<Urn> {
        self.state
            .borrow()
            .pending
            .iter()
            .map(|(urn, _)| urn.clone())
            .collect()
    }

    /// Resolve the attributes of every pending resource in declaration order
    pub fn materialize(&self) {
        let pending = std::mem::take(&mut self.state.borrow_mut().pending);
        for (urn, resolver) in pending {
            self.resolve(&urn, resolver);
        }
    }

    /// Resolve every pending resource, newest declaration first
    pub fn materialize_reversed(&self) {
        let pending = std::mem::take(&mut self.state.borrow_mut().pending);
        for (urn, resolver) in pending.into_iter().rev() {
            self.resolve(&urn, resolver);
        }
    }

    /// Resolve a single resource; returns false if it was not pending
    pub fn materialize_resource(&self, urn: &Urn) -> bool {
        let entry = {
            let mut state = self.state.borrow_mut();
            let index = state.pending.iter().position(|(pending, _)| pending == urn);
            index.map(|i| state.pending.remove(i))
        };

        match entry {
            Some((urn, resolver)) => {
                self.resolve(&urn, resolver);
                true
            }
            None => false,
        }
    }

    fn resolve(&self, urn: &Urn, resolver: Resolver<Attributes>) {
        let declared = self.state.borrow().declared.iter().find(|r| &r.urn == urn).cloned();
        if let Some(declared) = declared {
            debug!(urn = %urn, "materializing resource");
            resolver.resolve(self.synthesize_attributes(&declared.type_token, &declared.name));
        }
    }

    /// Attributes a real provider would assign to a freshly created resource
    fn synthesize_attributes(&self, type_token: &str, name: &str) -> Attributes {
        let mut attributes = BTreeMap::new();
        attributes.insert("id".to_string(), Value::String(name.to_string()));
        attributes.insert("name".to_string(), Value::String(name.to_string()));

        let (service, kind) = parse_type_token(type_token);
        let arn = match (service, kind) {
            ("s3", _) => format!("arn:aws:s3:::{}", name),
            ("sns", "topic") | ("sqs", "queue") => {
                format!("arn:aws:{}:{}:{}:{}", service, self.region, self.account_id, name)
            }
            _ => format!(
                "arn:aws:{}:{}:{}:{}:{}",
                service, self.region, self.account_id, kind, name
            ),
        };
        attributes.insert("arn".to_string(), Value::String(arn.clone()));

        match (service, kind) {
            ("s3", "bucket") => {
                attributes.insert("bucket".to_string(), Value::String(name.to_string()));
            }
            ("sqs", "queue") => {
                attributes.insert(
                    "id".to_string(),
                    Value::String(format!(
                        "https://sqs.{}.amazonaws.com/{}/{}",
                        self.region, self.account_id, name
                    )),
                );
            }
            ("sns", "topic") => {
                attributes.insert("id".to_string(), Value::String(arn));
            }
            ("dynamodb", "table") => {
                attributes.insert(
                    "stream_arn".to_string(),
                    Value::String(format!(
                        "arn:aws:dynamodb:{}:{}:table/{}/stream/1970-01-01T00:00:00.000",
                        self.region, self.account_id, name
                    )),
                );
            }
            ("apigateway", "deployment") => {
                attributes.insert(
                    "invoke_url".to_string(),
                    Value::String(format!(
                        "https://{}.execute-api.{}.amazonaws.com/",
                        name, self.region
                    )),
                );
                attributes.insert(
                    "execution_arn".to_string(),
                    Value::String(format!(
                        "arn:aws:execute-api:{}:{}:{}/",
                        self.region, self.account_id, name
                    )),
                );
            }
            _ => {}
        }

        Arc::new(attributes)
    }
}

impl ResourceGraph for InMemoryGraph {
    fn declare(&self, spec: ResourceSpec) -> Result<Resource> {
        let urn = Urn::new(&spec.type_token, &spec.name);
        let mut state = self.state.borrow_mut();

        if !state.urns.insert(urn.clone()) {
            return Err(ServerlessError::Resource(format!(
                "Duplicate resource URN '{}'",
                urn
            )));
        }

        debug!(urn = %urn, inputs = spec.inputs.len(), "declared resource");

        let (resolver, attributes) = Output::pending();
        state.pending.push((urn.clone(), resolver));
        state.declared.push(DeclaredResource {
            urn: urn.clone(),
            type_token: spec.type_token.clone(),
            name: spec.name.clone(),
            inputs: spec.inputs,
            options: spec.options,
        });

        Ok(Resource::new(urn, &spec.type_token, &spec.name, attributes))
    }
}

/// Split `aws:lambda/function:Function` into `("lambda", "function")`
fn parse_type_token(type_token: &str) -> (&str, &str) {
    let module = type_token.split(':').nth(1).unwrap_or_default();
    let mut parts = module.splitn(2, '/');
    let service = parts.next().unwrap_or_default();
    let kind = parts.next().unwrap_or(service);
    (service, kind)
}
