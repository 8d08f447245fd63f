//! Application manifest
//!
//! A YAML description of the functions, event sources, APIs and subscriptions
//! of one application. Handlers are referenced by name, either a function
//! listed under `functions` (created from its code) or one listed under
//! `existing_functions` (assumed to be declared already).

use anyhow::{bail, Context, Result};
use aws_serverless_apigateway::{Method, StaticRoute};
use aws_serverless_common::{FunctionCode, ProgramConfig};
use aws_serverless_events::codecommit::RepositoryEventType;
use aws_serverless_events::StartingPosition;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Falls back to the AWS environment variables when absent
    #[serde(default)]
    pub config: Option<ProgramConfig>,
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionCode>,
    #[serde(default)]
    pub existing_functions: Vec<String>,
    #[serde(default)]
    pub apis: BTreeMap<String, ApiManifest>,
    #[serde(default)]
    pub buckets: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub queues: Vec<String>,
    #[serde(default)]
    pub log_groups: Vec<String>,
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub streams: Vec<String>,
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionManifest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiManifest {
    #[serde(default)]
    pub routes: Vec<RouteManifest>,
    #[serde(default)]
    pub static_routes: Vec<StaticRoute>,
    /// Swagger document used verbatim instead of the routes
    #[serde(default)]
    pub swagger_spec: Option<PathBuf>,
    #[serde(default)]
    pub stage_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteManifest {
    pub path: String,
    pub method: Method,
    pub handler: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubscriptionManifest {
    Bucket {
        name: String,
        bucket: String,
        handler: String,
        events: Vec<String>,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        suffix: Option<String>,
    },
    Topic {
        name: String,
        topic: String,
        handler: String,
    },
    Queue {
        name: String,
        queue: String,
        handler: String,
        #[serde(default)]
        batch_size: Option<u32>,
    },
    Schedule {
        name: String,
        schedule: String,
        handler: String,
    },
    LogGroup {
        name: String,
        log_group: String,
        handler: String,
        #[serde(default)]
        filter_pattern: Option<String>,
    },
    Table {
        name: String,
        table: String,
        handler: String,
        starting_position: StartingPosition,
        #[serde(default)]
        batch_size: Option<u32>,
    },
    Stream {
        name: String,
        stream: String,
        handler: String,
        starting_position: StartingPosition,
        #[serde(default)]
        batch_size: Option<u32>,
    },
    Repository {
        name: String,
        repository: String,
        handler: String,
        events: Vec<RepositoryEventType>,
        #[serde(default)]
        branches: Vec<String>,
    },
}

impl SubscriptionManifest {
    pub fn name(&self) -> &str {
        match self {
            SubscriptionManifest::Bucket { name, .. }
            | SubscriptionManifest::Topic { name, .. }
            | SubscriptionManifest::Queue { name, .. }
            | SubscriptionManifest::Schedule { name, .. }
            | SubscriptionManifest::LogGroup { name, .. }
            | SubscriptionManifest::Table { name, .. }
            | SubscriptionManifest::Stream { name, .. }
            | SubscriptionManifest::Repository { name, .. } => name,
        }
    }

    pub fn handler(&self) -> &str {
        match self {
            SubscriptionManifest::Bucket { handler, .. }
            | SubscriptionManifest::Topic { handler, .. }
            | SubscriptionManifest::Queue { handler, .. }
            | SubscriptionManifest::Schedule { handler, .. }
            | SubscriptionManifest::LogGroup { handler, .. }
            | SubscriptionManifest::Table { handler, .. }
            | SubscriptionManifest::Stream { handler, .. }
            | SubscriptionManifest::Repository { handler, .. } => handler,
        }
    }

    /// The declared source this subscription listens to, as (section, name)
    fn source(&self) -> Option<(&'static str, &str)> {
        match self {
            SubscriptionManifest::Bucket { bucket, .. } => Some(("buckets", bucket)),
            SubscriptionManifest::Topic { topic, .. } => Some(("topics", topic)),
            SubscriptionManifest::Queue { queue, .. } => Some(("queues", queue)),
            SubscriptionManifest::Schedule { .. } => None,
            SubscriptionManifest::LogGroup { log_group, .. } => Some(("log_groups", log_group)),
            SubscriptionManifest::Table { table, .. } => Some(("tables", table)),
            SubscriptionManifest::Stream { stream, .. } => Some(("streams", stream)),
            SubscriptionManifest::Repository { repository, .. } => {
                Some(("repositories", repository))
            }
        }
    }
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let mut manifest = Self::from_yaml(&content)
            .with_context(|| format!("Invalid manifest {}", path.display()))?;

        // Relative paths are relative to the manifest, not the working directory.
        if let Some(base) = path.parent() {
            manifest.rebase(base);
        }
        Ok(manifest)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let manifest: Self = serde_yaml::from_str(content).context("Failed to parse manifest")?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Program configuration from the manifest or the environment
    pub fn program_config(&self) -> Result<ProgramConfig> {
        match &self.config {
            Some(config) => Ok(config.clone()),
            None => ProgramConfig::from_env().context("Manifest has no config section"),
        }
    }

    fn section(&self, section: &str) -> &[String] {
        match section {
            "buckets" => &self.buckets,
            "topics" => &self.topics,
            "queues" => &self.queues,
            "log_groups" => &self.log_groups,
            "tables" => &self.tables,
            "streams" => &self.streams,
            "repositories" => &self.repositories,
            _ => &[],
        }
    }

    fn has_handler(&self, handler: &str) -> bool {
        self.functions.contains_key(handler) || self.existing_functions.iter().any(|f| f == handler)
    }

    fn validate(&self) -> Result<()> {
        if let Some(config) = &self.config {
            if config.region.trim().is_empty() {
                bail!("config.region must not be empty");
            }
        }

        for name in &self.existing_functions {
            if self.functions.contains_key(name) {
                bail!("Function '{}' is listed both as code and as existing", name);
            }
        }

        for (api, spec) in &self.apis {
            for route in &spec.routes {
                if !self.has_handler(&route.handler) {
                    bail!(
                        "Route {} {} of API '{}' references unknown function '{}'",
                        route.method,
                        route.path,
                        api,
                        route.handler
                    );
                }
            }
        }

        let mut names = BTreeSet::new();
        for subscription in &self.subscriptions {
            let name = subscription.name();
            if !names.insert(name) {
                bail!("Duplicate subscription name '{}'", name);
            }
            if !self.has_handler(subscription.handler()) {
                bail!(
                    "Subscription '{}' references unknown function '{}'",
                    name,
                    subscription.handler()
                );
            }
            if let Some((section, source)) = subscription.source() {
                if !self.section(section).iter().any(|s| s == source) {
                    bail!(
                        "Subscription '{}' references '{}', which is not listed under {}",
                        name,
                        source,
                        section
                    );
                }
            }
        }

        Ok(())
    }

    fn rebase(&mut self, base: &Path) {
        for code in self.functions.values_mut() {
            code.code = base.join(&code.code);
        }
        for api in self.apis.values_mut() {
            for route in &mut api.static_routes {
                route.local_path = base.join(&route.local_path);
            }
            if let Some(spec) = &mut api.swagger_spec {
                *spec = base.join(&*spec);
            }
        }
    }
}
