//! Typed handles for the AWS resources this crate wires together

use crate::graph::{Resource, ResourceOptions, ResourceSpec, Urn};
use crate::output::Output;
use crate::program::Program;
use crate::{Result, ServerlessError};

/// Type tokens of resources that are only declared, never handed back to callers
pub mod types {
    pub const PERMISSION: &str = "aws:lambda/permission:Permission";
    pub const EVENT_SOURCE_MAPPING: &str = "aws:lambda/eventSourceMapping:EventSourceMapping";
    pub const ROLE: &str = "aws:iam/role:Role";
    pub const ROLE_POLICY_ATTACHMENT: &str = "aws:iam/rolePolicyAttachment:RolePolicyAttachment";
    pub const BUCKET_OBJECT: &str = "aws:s3/bucketObject:BucketObject";
    pub const BUCKET_NOTIFICATION: &str = "aws:s3/bucketNotification:BucketNotification";
    pub const REST_API: &str = "aws:apigateway/restApi:RestApi";
    pub const DEPLOYMENT: &str = "aws:apigateway/deployment:Deployment";
    pub const STAGE: &str = "aws:apigateway/stage:Stage";
    pub const TOPIC_SUBSCRIPTION: &str = "aws:sns/topicSubscription:TopicSubscription";
    pub const EVENT_TARGET: &str = "aws:cloudwatch/eventTarget:EventTarget";
    pub const LOG_SUBSCRIPTION_FILTER: &str =
        "aws:cloudwatch/logSubscriptionFilter:LogSubscriptionFilter";
    pub const REPOSITORY_TRIGGER: &str = "aws:codecommit/trigger:Trigger";
}

macro_rules! aws_resource {
    ($(#[$meta:meta])* $name:ident => $token:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(Resource);

        impl $name {
            pub const TYPE: &'static str = $token;

            /// Declare a new instance without inputs
            pub fn declare(program: &Program<'_>, name: &str, options: ResourceOptions) -> Result<Self> {
                Self::declare_spec(program, ResourceSpec::new(Self::TYPE, name).options(options))
            }

            /// Declare a new instance from a full spec
            pub fn declare_spec(program: &Program<'_>, spec: ResourceSpec) -> Result<Self> {
                Self::from_resource(program.declare(spec)?)
            }

            /// Wrap a resource declared elsewhere
            pub fn from_resource(resource: Resource) -> Result<Self> {
                if resource.type_token() != Self::TYPE {
                    return Err(ServerlessError::Resource(format!(
                        "Expected a {} but got {}",
                        Self::TYPE,
                        resource.urn()
                    )));
                }
                Ok(Self(resource))
            }

            pub fn resource(&self) -> &Resource {
                &self.0
            }

            pub fn urn(&self) -> &Urn {
                self.0.urn()
            }

            /// Logical name the resource was declared with
            pub fn name(&self) -> &str {
                self.0.name()
            }

            pub fn id(&self) -> Output<String> {
                self.0.id()
            }

            pub fn arn(&self) -> Output<String> {
                self.0.arn()
            }

            /// Physical name assigned by the engine
            pub fn name_output(&self) -> Output<String> {
                self.0.name_output()
            }
        }
    };
}

aws_resource!(
    /// An AWS Lambda function
    LambdaFunction => "aws:lambda/function:Function"
);
aws_resource!(
    /// An S3 bucket
    Bucket => "aws:s3/bucket:Bucket"
);
aws_resource!(
    /// An SNS topic
    Topic => "aws:sns/topic:Topic"
);
aws_resource!(
    /// An SQS queue
    Queue => "aws:sqs/queue:Queue"
);
aws_resource!(
    /// A CloudWatch event rule
    EventRule => "aws:cloudwatch/eventRule:EventRule"
);
aws_resource!(
    /// A CloudWatch log group
    LogGroup => "aws:cloudwatch/logGroup:LogGroup"
);
aws_resource!(
    /// A DynamoDB table
    Table => "aws:dynamodb/table:Table"
);
aws_resource!(
    /// A Kinesis stream
    Stream => "aws:kinesis/stream:Stream"
);
aws_resource!(
    /// A CodeCommit repository
    Repository => "aws:codecommit/repository:Repository"
);
aws_resource!(
    /// A Cognito user pool
    UserPool => "aws:cognito/userPool:UserPool"
);

impl Bucket {
    /// The bucket name assigned by S3
    pub fn bucket_name(&self) -> Output<String> {
        self.0.string_attribute("bucket")
    }
}

impl Table {
    /// ARN of the table's DynamoDB stream
    pub fn stream_arn(&self) -> Output<String> {
        self.0.string_attribute("stream_arn")
    }
}

impl EventRule {
    /// Declare a rule that fires on a schedule expression such as `rate(5 minutes)`
    pub fn schedule(
        program: &Program<'_>,
        name: &str,
        schedule_expression: &str,
        options: ResourceOptions,
    ) -> Result<Self> {
        Self::declare_spec(
            program,
            ResourceSpec::new(Self::TYPE, name)
                .input("scheduleExpression", schedule_expression)
                .options(options),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProgramConfig;
    use crate::memory::InMemoryGraph;

    #[test]
    fn test_from_resource_checks_type() {
        let graph = InMemoryGraph::new("us-east-1");
        let program = Program::new(&graph, ProgramConfig::new("us-east-1"));

        let topic = Topic::declare(&program, "events", ResourceOptions::default()).unwrap();
        let err = Queue::from_resource(topic.resource().clone()).unwrap_err();
        assert!(err.to_string().contains("Expected a aws:sqs/queue:Queue"));
    }

    #[test]
    fn test_schedule_rule_records_expression() {
        let graph = InMemoryGraph::new("us-east-1");
        let program = Program::new(&graph, ProgramConfig::new("us-east-1"));

        EventRule::schedule(&program, "hourly", "rate(60 minutes)", ResourceOptions::default())
            .unwrap();

        let declared = graph.find(EventRule::TYPE, "hourly").unwrap();
        let expression = declared.input("scheduleExpression").unwrap().now();
        assert_eq!(
            expression,
            Some(Ok(serde_json::Value::String("rate(60 minutes)".to_string())))
        );
    }
}
