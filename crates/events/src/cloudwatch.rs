//! CloudWatch event rule and log group subscriptions

use crate::subscription::{subscribe, EventSource, EventSubscription};
use aws_serverless_common::resources::{types, EventRule, LambdaFunction, LogGroup};
use aws_serverless_common::{
    Handler, Output, Program, Resource, ResourceOptions, ResourceSpec, Result,
};
use serde::{Deserialize, Serialize};

/// Event rule subscriptions take no settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRuleSubscriptionArgs {}

impl EventSource for EventRule {
    type Args = EventRuleSubscriptionArgs;

    const COMPONENT_TYPE: &'static str = "aws-serverless:cloudwatch:EventRuleEventSubscription";
    const FUNCTION_SUFFIX: &'static str = "-cloudwatch-event";

    fn principal(&self, _program: &Program<'_>) -> String {
        "events.amazonaws.com".to_string()
    }

    fn source_arn(&self) -> Output<String> {
        self.arn()
    }

    fn create_trigger(
        &self,
        program: &Program<'_>,
        name: &str,
        func: &LambdaFunction,
        _args: &EventRuleSubscriptionArgs,
        options: ResourceOptions,
    ) -> Result<Resource> {
        program.declare(
            ResourceSpec::new(types::EVENT_TARGET, name)
                .input("rule", self.name_output())
                .input("arn", func.arn())
                .input("targetId", name)
                .options(options),
        )
    }
}

/// Run a handler on a schedule such as `rate(5 minutes)` or `cron(0 12 * * ? *)`
pub fn on_schedule(
    program: &Program<'_>,
    name: &str,
    schedule: &str,
    handler: impl Into<Handler>,
    args: EventRuleSubscriptionArgs,
    options: ResourceOptions,
) -> Result<EventSubscription> {
    let rule = EventRule::schedule(program, name, schedule, options.clone())?;
    subscribe(program, name, &rule, handler, args, options)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogGroupSubscriptionArgs {
    /// Only log events matching this pattern are delivered; all when absent
    #[serde(default)]
    pub filter_pattern: Option<String>,
}

impl EventSource for LogGroup {
    type Args = LogGroupSubscriptionArgs;

    const COMPONENT_TYPE: &'static str = "aws-serverless:cloudwatch:LogGroupEventSubscription";
    const FUNCTION_SUFFIX: &'static str = "-log-group-event";

    fn principal(&self, program: &Program<'_>) -> String {
        format!("logs.{}.amazonaws.com", program.region())
    }

    fn source_arn(&self) -> Output<String> {
        self.arn()
    }

    fn create_trigger(
        &self,
        program: &Program<'_>,
        name: &str,
        func: &LambdaFunction,
        args: &LogGroupSubscriptionArgs,
        options: ResourceOptions,
    ) -> Result<Resource> {
        let filter_pattern = args.filter_pattern.as_deref().unwrap_or_default();
        program.declare(
            ResourceSpec::new(types::LOG_SUBSCRIPTION_FILTER, name)
                .input("logGroup", self.name_output())
                .input("destinationArn", func.arn())
                .input("filterPattern", filter_pattern)
                .options(options),
        )
    }
}
