//! SNS topic subscriptions

use crate::subscription::EventSource;
use aws_serverless_common::resources::{types, LambdaFunction, Topic};
use aws_serverless_common::{Output, Program, Resource, ResourceOptions, ResourceSpec, Result};

/// Topic subscriptions take no settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicSubscriptionArgs {}

impl EventSource for Topic {
    type Args = TopicSubscriptionArgs;

    const COMPONENT_TYPE: &'static str = "aws-serverless:topic:TopicEventSubscription";
    const FUNCTION_SUFFIX: &'static str = "-topic-event";

    fn principal(&self, _program: &Program<'_>) -> String {
        "sns.amazonaws.com".to_string()
    }

    fn source_arn(&self) -> Output<String> {
        self.id()
    }

    fn create_trigger(
        &self,
        program: &Program<'_>,
        name: &str,
        func: &LambdaFunction,
        _args: &TopicSubscriptionArgs,
        options: ResourceOptions,
    ) -> Result<Resource> {
        program.declare(
            ResourceSpec::new(types::TOPIC_SUBSCRIPTION, name)
                .input("topic", self.arn())
                .input("protocol", "lambda")
                .input("endpoint", func.arn())
                .options(options),
        )
    }
}
