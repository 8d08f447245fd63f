//! Event subscription base
//!
//! Every event source follows the same pattern: resolve the handler to a
//! function, group the subscription under a component, grant the source's
//! service principal permission to invoke the function, then create the
//! source-specific trigger. [`EventSource`] captures what differs per source.

use aws_serverless_common::resources::{
    types, EventRule, LambdaFunction, LogGroup, Queue, Repository, Stream, Table, Topic,
};
use aws_serverless_common::{
    create_lambda_function, FunctionArgs, Handler, Output, Program, Resource, ResourceOptions,
    ResourceSpec, Result,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A function wired to one event source
#[derive(Debug, Clone)]
pub struct EventSubscription {
    /// Component the permission and trigger are parented to
    pub component: Resource,
    pub func: LambdaFunction,
    pub permission: Resource,
    /// Source-specific resource that delivers events to the function
    pub trigger: Resource,
}

/// A resource that can deliver events to a lambda function
pub trait EventSource {
    /// Source-specific subscription settings
    type Args;

    /// Component type of subscriptions to this source
    const COMPONENT_TYPE: &'static str;
    /// Appended to the subscription name to name a function created inline
    const FUNCTION_SUFFIX: &'static str;
    /// Action granted to the service principal
    const ACTION: &'static str = "lambda:invokeFunction";

    /// Service principal allowed to invoke the function
    fn principal(&self, program: &Program<'_>) -> String;

    /// ARN the invoke permission is scoped to
    fn source_arn(&self) -> Output<String>;

    /// Policies for a function created inline, if not the program's defaults
    fn policies(&self) -> Option<Vec<String>> {
        None
    }

    /// Reject invalid settings before anything is declared
    fn validate(_name: &str, _args: &Self::Args) -> Result<()> {
        Ok(())
    }

    /// Declare the resource that routes events to `func`
    fn create_trigger(
        &self,
        program: &Program<'_>,
        name: &str,
        func: &LambdaFunction,
        args: &Self::Args,
        options: ResourceOptions,
    ) -> Result<Resource>;
}

/// Subscribe a handler to an event source
pub fn subscribe<S: EventSource>(
    program: &Program<'_>,
    name: &str,
    source: &S,
    handler: impl Into<Handler>,
    args: S::Args,
    options: ResourceOptions,
) -> Result<EventSubscription> {
    S::validate(name, &args)?;

    let func = create_lambda_function(
        program,
        &format!("{}{}", name, S::FUNCTION_SUFFIX),
        &handler.into(),
        FunctionArgs {
            policies: source.policies(),
            options: options.clone(),
        },
    )?;

    let component = program.declare(ResourceSpec::new(S::COMPONENT_TYPE, name).options(options))?;
    let children = ResourceOptions::parent(&component);

    let permission = program.declare(
        ResourceSpec::new(types::PERMISSION, name)
            .input("action", S::ACTION)
            .input("function", func.arn())
            .input("principal", source.principal(program))
            .input("sourceArn", source.source_arn())
            .options(children.clone()),
    )?;

    let trigger = source.create_trigger(
        program,
        name,
        &func,
        &args,
        children.depends_on([&permission]),
    )?;

    info!(
        subscription = name,
        source = S::COMPONENT_TYPE,
        function = func.name(),
        "subscribed to events"
    );

    Ok(EventSubscription {
        component,
        func,
        permission,
        trigger,
    })
}

/// `on_event` on the resource types that produce events
pub trait OnEvent {
    type Args;
    type Subscription;

    fn on_event(
        &self,
        program: &Program<'_>,
        name: &str,
        handler: impl Into<Handler>,
        args: Self::Args,
        options: ResourceOptions,
    ) -> Result<Self::Subscription>;
}

macro_rules! on_event_via_source {
    ($($source:ty),* $(,)?) => {
        $(
            impl OnEvent for $source {
                type Args = <$source as EventSource>::Args;
                type Subscription = EventSubscription;

                fn on_event(
                    &self,
                    program: &Program<'_>,
                    name: &str,
                    handler: impl Into<Handler>,
                    args: Self::Args,
                    options: ResourceOptions,
                ) -> Result<EventSubscription> {
                    subscribe(program, name, self, handler, args, options)
                }
            }
        )*
    };
}

on_event_via_source!(Topic, Queue, EventRule, LogGroup, Table, Stream, Repository);

/// Where a stream subscription starts reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StartingPosition {
    TrimHorizon,
    Latest,
}

impl StartingPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            StartingPosition::TrimHorizon => "TRIM_HORIZON",
            StartingPosition::Latest => "LATEST",
        }
    }
}

/// Settings of a DynamoDB or Kinesis stream subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSubscriptionArgs {
    /// Largest number of records retrieved per invocation
    #[serde(default)]
    pub batch_size: Option<u32>,
    pub starting_position: StartingPosition,
}

impl StreamSubscriptionArgs {
    pub fn new(starting_position: StartingPosition) -> Self {
        Self {
            batch_size: None,
            starting_position,
        }
    }

    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}

/// Mapping that polls a queue or stream and invokes `func` with batches
pub(crate) fn create_event_source_mapping(
    program: &Program<'_>,
    name: &str,
    func: &LambdaFunction,
    event_source_arn: Output<String>,
    batch_size: Option<u32>,
    starting_position: Option<StartingPosition>,
    options: ResourceOptions,
) -> Result<Resource> {
    program.declare(
        ResourceSpec::new(types::EVENT_SOURCE_MAPPING, name)
            .optional_input("batchSize", batch_size)
            .input("enabled", true)
            .input("eventSourceArn", event_source_arn)
            .input("functionName", func.name_output())
            .optional_input("startingPosition", starting_position.map(|p| p.as_str()))
            .options(options),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_position_serialization() {
        let args: StreamSubscriptionArgs =
            serde_json::from_str(r#"{"starting_position": "TRIM_HORIZON", "batch_size": 50}"#)
                .unwrap();
        assert_eq!(args.starting_position, StartingPosition::TrimHorizon);
        assert_eq!(args.batch_size, Some(50));

        let invalid: std::result::Result<StreamSubscriptionArgs, _> =
            serde_json::from_str(r#"{"starting_position": "AT_TIMESTAMP"}"#);
        assert!(invalid.is_err());
    }
}
