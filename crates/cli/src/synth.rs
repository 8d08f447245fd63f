//! Evaluate a manifest against an in-memory resource graph

use crate::manifest::{ApiManifest, Manifest, SubscriptionManifest};
use anyhow::{anyhow, bail, Context, Result};
use aws_serverless_apigateway::{Api, ApiArgs, Route};
use aws_serverless_common::resources::{
    Bucket, LambdaFunction, LogGroup, Queue, Repository, Stream, Table, Topic,
};
use aws_serverless_common::{
    DeclaredResource, Handler, InMemoryGraph, Output, Program, ResourceOptions,
};
use aws_serverless_events::bucket::{self, BucketFilter, BucketSubscriptionArgs};
use aws_serverless_events::{
    on_schedule, EventRuleSubscriptionArgs, LogGroupSubscriptionArgs, OnEvent,
    QueueSubscriptionArgs, RepositorySubscriptionArgs, StreamSubscriptionArgs,
    TopicSubscriptionArgs,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use tracing::{debug, info};

/// Result of evaluating a manifest
pub struct Synthesis {
    pub graph: InMemoryGraph,
    pub apis: BTreeMap<String, SynthesizedApi>,
}

pub struct SynthesizedApi {
    pub swagger: Output<String>,
    pub url: Output<String>,
}

/// One declared resource with every input resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedResource {
    pub urn: String,
    #[serde(rename = "type")]
    pub type_token: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    pub inputs: Map<String, Value>,
}

/// Declare everything a manifest describes and resolve the resulting graph
pub fn synthesize(manifest: &Manifest) -> Result<Synthesis> {
    let config = manifest.program_config()?;
    let graph = InMemoryGraph::new(&config.region);

    let apis = {
        let program = Program::new(&graph, config);
        let handlers = Handlers::declare(&program, manifest)?;
        let sources = Sources::declare(&program, manifest)?;

        let mut apis = BTreeMap::new();
        for (name, spec) in &manifest.apis {
            let api = declare_api(&program, name, spec, &handlers)
                .with_context(|| format!("Failed to declare API '{}'", name))?;
            apis.insert(
                name.clone(),
                SynthesizedApi {
                    swagger: api.swagger,
                    url: api.url,
                },
            );
        }

        for subscription in &manifest.subscriptions {
            declare_subscription(&program, subscription, &handlers, &sources).with_context(
                || format!("Failed to declare subscription '{}'", subscription.name()),
            )?;
        }

        program.finish()?;
        apis
    };

    graph.materialize();
    info!(resources = graph.resources().len(), "synthesized graph");
    Ok(Synthesis { graph, apis })
}

impl Synthesis {
    /// Every declaration with resolved inputs, in declaration order
    pub fn plan(&self) -> Result<Vec<PlannedResource>> {
        self.graph.resources().iter().map(planned_resource).collect()
    }

    pub fn swagger(&self, api: &str) -> Result<String> {
        let synthesized = self
            .apis
            .get(api)
            .ok_or_else(|| anyhow!("Manifest declares no API named '{}'", api))?;
        resolved(&synthesized.swagger)
    }
}

fn planned_resource(declared: &DeclaredResource) -> Result<PlannedResource> {
    let mut inputs = Map::new();
    for (key, value) in &declared.inputs {
        let value = resolved(value)
            .with_context(|| format!("Input '{}' of {}", key, declared.urn))?;
        inputs.insert(key.clone(), value);
    }

    Ok(PlannedResource {
        urn: declared.urn.to_string(),
        type_token: declared.type_token.clone(),
        name: declared.name.clone(),
        parent: declared.options.parent.as_ref().map(|p| p.to_string()),
        depends_on: declared
            .options
            .depends_on
            .iter()
            .map(|d| d.to_string())
            .collect(),
        inputs,
    })
}

fn resolved<T>(output: &Output<T>) -> Result<T>
where
    T: Clone + Send + Sync + 'static,
{
    match output.now() {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(anyhow!("{}", e.message())),
        None => bail!("value is still unresolved"),
    }
}

/// Handlers referenced by name from routes and subscriptions
struct Handlers {
    handlers: BTreeMap<String, Handler>,
}

impl Handlers {
    fn declare(program: &Program<'_>, manifest: &Manifest) -> Result<Self> {
        let mut handlers = BTreeMap::new();
        for (name, code) in &manifest.functions {
            handlers.insert(name.clone(), Handler::from(code.clone()));
        }
        for name in &manifest.existing_functions {
            let function = LambdaFunction::declare(program, name, ResourceOptions::default())?;
            handlers.insert(name.clone(), Handler::from(function));
        }
        Ok(Self { handlers })
    }

    fn get(&self, name: &str) -> Result<Handler> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown function '{}'", name))
    }
}

/// Event sources listed in the manifest, by name
struct Sources {
    buckets: BTreeMap<String, Bucket>,
    topics: BTreeMap<String, Topic>,
    queues: BTreeMap<String, Queue>,
    log_groups: BTreeMap<String, LogGroup>,
    tables: BTreeMap<String, Table>,
    streams: BTreeMap<String, Stream>,
    repositories: BTreeMap<String, Repository>,
}

fn declare_all<T>(
    program: &Program<'_>,
    names: &[String],
    declare: fn(&Program<'_>, &str, ResourceOptions) -> aws_serverless_common::Result<T>,
) -> Result<BTreeMap<String, T>> {
    names
        .iter()
        .map(|name| Ok((name.clone(), declare(program, name, ResourceOptions::default())?)))
        .collect()
}

impl Sources {
    fn declare(program: &Program<'_>, manifest: &Manifest) -> Result<Self> {
        Ok(Self {
            buckets: declare_all(program, &manifest.buckets, Bucket::declare)?,
            topics: declare_all(program, &manifest.topics, Topic::declare)?,
            queues: declare_all(program, &manifest.queues, Queue::declare)?,
            log_groups: declare_all(program, &manifest.log_groups, LogGroup::declare)?,
            tables: declare_all(program, &manifest.tables, Table::declare)?,
            streams: declare_all(program, &manifest.streams, Stream::declare)?,
            repositories: declare_all(program, &manifest.repositories, Repository::declare)?,
        })
    }
}

fn lookup<'a, T>(sources: &'a BTreeMap<String, T>, name: &str) -> Result<&'a T> {
    sources
        .get(name)
        .ok_or_else(|| anyhow!("Unknown event source '{}'", name))
}

fn declare_api(
    program: &Program<'_>,
    name: &str,
    spec: &ApiManifest,
    handlers: &Handlers,
) -> Result<Api> {
    let mut args = match &spec.swagger_spec {
        Some(path) => {
            let document = fs::read_to_string(path)
                .with_context(|| format!("Failed to read swagger spec {}", path.display()))?;
            ApiArgs::with_swagger_spec(Output::known(document))
        }
        None => {
            let routes = spec
                .routes
                .iter()
                .map(|route| Ok(Route::new(route.method, &route.path, handlers.get(&route.handler)?)))
                .collect::<Result<Vec<_>>>()?;
            ApiArgs::with_routes(routes).static_routes(spec.static_routes.clone())
        }
    };
    if let Some(stage_name) = &spec.stage_name {
        args = args.stage_name(stage_name);
    }

    debug!(api = name, routes = spec.routes.len(), "declaring API");
    Ok(Api::new(program, name, args)?)
}

fn declare_subscription(
    program: &Program<'_>,
    subscription: &SubscriptionManifest,
    handlers: &Handlers,
    sources: &Sources,
) -> Result<()> {
    let handler = handlers.get(subscription.handler())?;
    let options = ResourceOptions::default();

    match subscription {
        SubscriptionManifest::Bucket {
            name,
            bucket: bucket_name,
            events,
            prefix,
            suffix,
            ..
        } => {
            let args = BucketSubscriptionArgs {
                events: events.clone(),
                filter: BucketFilter {
                    prefix: prefix.clone(),
                    suffix: suffix.clone(),
                },
            };
            bucket::subscribe(
                program,
                name,
                lookup(&sources.buckets, bucket_name)?,
                handler,
                args,
                options,
            )?;
        }
        SubscriptionManifest::Topic { name, topic, .. } => {
            lookup(&sources.topics, topic)?.on_event(
                program,
                name,
                handler,
                TopicSubscriptionArgs::default(),
                options,
            )?;
        }
        SubscriptionManifest::Queue {
            name,
            queue,
            batch_size,
            ..
        } => {
            lookup(&sources.queues, queue)?.on_event(
                program,
                name,
                handler,
                QueueSubscriptionArgs {
                    batch_size: *batch_size,
                },
                options,
            )?;
        }
        SubscriptionManifest::Schedule { name, schedule, .. } => {
            on_schedule(
                program,
                name,
                schedule,
                handler,
                EventRuleSubscriptionArgs::default(),
                options,
            )?;
        }
        SubscriptionManifest::LogGroup {
            name,
            log_group,
            filter_pattern,
            ..
        } => {
            lookup(&sources.log_groups, log_group)?.on_event(
                program,
                name,
                handler,
                LogGroupSubscriptionArgs {
                    filter_pattern: filter_pattern.clone(),
                },
                options,
            )?;
        }
        SubscriptionManifest::Table {
            name,
            table,
            starting_position,
            batch_size,
            ..
        } => {
            lookup(&sources.tables, table)?.on_event(
                program,
                name,
                handler,
                StreamSubscriptionArgs {
                    batch_size: *batch_size,
                    starting_position: *starting_position,
                },
                options,
            )?;
        }
        SubscriptionManifest::Stream {
            name,
            stream,
            starting_position,
            batch_size,
            ..
        } => {
            lookup(&sources.streams, stream)?.on_event(
                program,
                name,
                handler,
                StreamSubscriptionArgs {
                    batch_size: *batch_size,
                    starting_position: *starting_position,
                },
                options,
            )?;
        }
        SubscriptionManifest::Repository {
            name,
            repository,
            events,
            branches,
            ..
        } => {
            lookup(&sources.repositories, repository)?.on_event(
                program,
                name,
                handler,
                RepositorySubscriptionArgs::new(events, branches.clone()),
                options,
            )?;
        }
    }

    Ok(())
}
