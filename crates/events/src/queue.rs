//! SQS queue subscriptions

use crate::subscription::{create_event_source_mapping, EventSource};
use aws_serverless_common::function::{AMAZON_SQS_FULL_ACCESS, AWS_LAMBDA_FULL_ACCESS};
use aws_serverless_common::resources::{LambdaFunction, Queue};
use aws_serverless_common::{Output, Program, Resource, ResourceOptions, Result, ServerlessError};
use serde::{Deserialize, Serialize};

/// SQS delivers at most this many messages per batch
pub const MAX_QUEUE_BATCH_SIZE: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSubscriptionArgs {
    /// Largest number of messages retrieved per invocation (1 to 10)
    #[serde(default)]
    pub batch_size: Option<u32>,
}

impl EventSource for Queue {
    type Args = QueueSubscriptionArgs;

    const COMPONENT_TYPE: &'static str = "aws-serverless:queue:QueueEventSubscription";
    const FUNCTION_SUFFIX: &'static str = "-queue-event";
    const ACTION: &'static str = "lambda:*";

    fn principal(&self, _program: &Program<'_>) -> String {
        "sqs.amazonaws.com".to_string()
    }

    fn source_arn(&self) -> Output<String> {
        self.arn()
    }

    fn policies(&self) -> Option<Vec<String>> {
        Some(vec![
            AWS_LAMBDA_FULL_ACCESS.to_string(),
            AMAZON_SQS_FULL_ACCESS.to_string(),
        ])
    }

    fn validate(name: &str, args: &QueueSubscriptionArgs) -> Result<()> {
        match args.batch_size {
            Some(size) if size == 0 || size > MAX_QUEUE_BATCH_SIZE => {
                Err(ServerlessError::Config(format!(
                    "Queue subscription {} has batch size {}; expected 1 to {}",
                    name, size, MAX_QUEUE_BATCH_SIZE
                )))
            }
            _ => Ok(()),
        }
    }

    fn create_trigger(
        &self,
        program: &Program<'_>,
        name: &str,
        func: &LambdaFunction,
        args: &QueueSubscriptionArgs,
        options: ResourceOptions,
    ) -> Result<Resource> {
        create_event_source_mapping(
            program,
            name,
            func,
            self.arn(),
            args.batch_size,
            None,
            options,
        )
    }
}
