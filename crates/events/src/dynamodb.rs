//! DynamoDB stream subscriptions

use crate::subscription::{create_event_source_mapping, EventSource, StreamSubscriptionArgs};
use aws_serverless_common::resources::{LambdaFunction, Table};
use aws_serverless_common::{Output, Program, Resource, ResourceOptions, Result};

impl EventSource for Table {
    type Args = StreamSubscriptionArgs;

    const COMPONENT_TYPE: &'static str = "aws-serverless:dynamodb:TableEventSubscription";
    const FUNCTION_SUFFIX: &'static str = "-table-event";

    fn principal(&self, _program: &Program<'_>) -> String {
        "dynamodb.amazonaws.com".to_string()
    }

    fn source_arn(&self) -> Output<String> {
        self.stream_arn()
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
            self.stream_arn(),
            args.batch_size,
            Some(args.starting_position),
            options,
        )
    }
}
