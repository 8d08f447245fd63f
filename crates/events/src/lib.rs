//! Event subscriptions
//!
//! Wires lambda handlers to AWS event sources. Every source except S3 goes
//! through the generic [`subscribe`] builder, which grants the source's
//! service principal permission to invoke the function and declares the
//! source-specific trigger. S3 notifications are batched per bucket by
//! [`bucket::BucketNotificationRegistrar`] and declared when the program
//! finishes.
//!
//! # Example
//!
//! ```no_run
//! use aws_serverless_common::resources::{Bucket, Topic};
//! use aws_serverless_common::{FunctionCode, InMemoryGraph, Program, ProgramConfig, ResourceOptions};
//! use aws_serverless_events::{bucket, OnEvent, TopicSubscriptionArgs};
//!
//! # fn main() -> aws_serverless_common::Result<()> {
//! let graph = InMemoryGraph::new("us-east-1");
//! let program = Program::new(&graph, ProgramConfig::new("us-east-1"));
//!
//! let images = Bucket::declare(&program, "images", ResourceOptions::default())?;
//! let thumbnailer = FunctionCode::new("./dist/thumbnailer.zip");
//! bucket::on_put(&program, "thumbnail", &images, thumbnailer, Default::default(), ResourceOptions::default())?;
//!
//! let alerts = Topic::declare(&program, "alerts", ResourceOptions::default())?;
//! alerts.on_event(
//!     &program,
//!     "pager",
//!     FunctionCode::new("./dist/pager.zip"),
//!     TopicSubscriptionArgs::default(),
//!     ResourceOptions::default(),
//! )?;
//!
//! // Declares the bucket notification.
//! program.finish()?;
//! # Ok(())
//! # }
//! ```

pub mod bucket;
pub mod cloudfront;
pub mod cloudwatch;
pub mod codecommit;
pub mod cognito;
mod dynamodb;
mod kinesis;
pub mod payload;
mod queue;
mod subscription;
mod topic;

pub use cloudwatch::{on_schedule, EventRuleSubscriptionArgs, LogGroupSubscriptionArgs};
pub use codecommit::{RepositoryEventType, RepositorySubscriptionArgs};
pub use queue::{QueueSubscriptionArgs, MAX_QUEUE_BATCH_SIZE};
pub use subscription::{
    subscribe, EventSource, EventSubscription, OnEvent, StartingPosition, StreamSubscriptionArgs,
};
pub use topic::TopicSubscriptionArgs;
