//! Kinesis stream subscriptions

use crate::subscription::{create_event_source_mapping, EventSource, StreamSubscriptionArgs};
use aws_serverless_common::resources::{LambdaFunction, Stream};
use aws_serverless_common::{Output, Program, Resource, ResourceOptions, Result};

impl EventSource for Stream {
    type Args = StreamSubscriptionArgs;

    const COMPONENT_TYPE: &'static str = "aws-serverless:kinesis:StreamEventSubscription";
    const FUNCTION_SUFFIX: &'static str = "-stream-event";

    fn principal(&self, _program: &Program<'_>) -> String {
        "kinesis.amazonaws.com".to_string()
    }

    fn source_arn(&self) -> Output<String> {
        self.arn()
    }

    fn create_trigger(
        &self,
        program: &Program<'_>,
        name: &str,
        func: &LambdaFunction,
        args: &StreamSubscriptionArgs,
        options: ResourceOptions,
    ) -> Result<Resource> {
        create_event_source_mapping(
            program,
            name,
            func,
            self.arn(),
            args.batch_size,
            Some(args.starting_position),
            options,
        )
    }
}
