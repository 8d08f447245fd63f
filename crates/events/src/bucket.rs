//! S3 bucket notifications
//!
//! S3 accepts a single notification configuration per bucket, so subscriptions
//! are not turned into notifications as they are made. Each one is recorded
//! with the program's [`BucketNotificationRegistrar`], which emits one
//! aggregated notification per bucket when the program finishes.

use crate::subscription::OnEvent;
use aws_serverless_common::resources::{types, Bucket, LambdaFunction};
use aws_serverless_common::{
    create_lambda_function, ExitHook, FunctionArgs, Handler, Output, Program, Resource,
    ResourceOptions, ResourceSpec, Result, ServerlessError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use tracing::{debug, info};

pub const BUCKET_SUBSCRIPTION_TYPE: &str = "aws-serverless:bucket:BucketSubscription";

pub const OBJECT_CREATED: &str = "s3:ObjectCreated:*";
pub const OBJECT_REMOVED: &str = "s3:ObjectRemoved:*";

/// Optional key filters of a notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketFilter {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
}

impl BucketFilter {
    pub fn prefix(prefix: &str) -> Self {
        Self {
            prefix: Some(prefix.to_string()),
            suffix: None,
        }
    }

    pub fn suffix(suffix: &str) -> Self {
        Self {
            prefix: None,
            suffix: Some(suffix.to_string()),
        }
    }
}

/// Events and filters of one bucket subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSubscriptionArgs {
    /// S3 event types, e.g. `s3:ObjectCreated:*`; must not be empty
    pub events: Vec<String>,
    #[serde(default, flatten)]
    pub filter: BucketFilter,
}

impl BucketSubscriptionArgs {
    pub fn new(events: &[&str], filter: BucketFilter) -> Self {
        Self {
            events: events.iter().map(|e| e.to_string()).collect(),
            filter,
        }
    }
}

/// A function invoked by bucket notifications
#[derive(Debug, Clone)]
pub struct BucketSubscription {
    pub component: Resource,
    pub func: LambdaFunction,
    pub permission: Resource,
}

/// A subscription waiting for its bucket's notification to be emitted
#[derive(Debug, Clone)]
struct SubscriptionInfo {
    name: String,
    events: Vec<String>,
    filter: BucketFilter,
    lambda_function_arn: Output<String>,
    permission: Resource,
}

impl SubscriptionInfo {
    fn notification_entry(&self) -> Output<Value> {
        let events: Vec<Value> = self.events.iter().cloned().map(Value::String).collect();
        let filter = self.filter.clone();
        self.lambda_function_arn.apply(move |arn| {
            let mut entry = Map::new();
            entry.insert("events".to_string(), Value::Array(events));
            if let Some(prefix) = filter.prefix {
                entry.insert("filterPrefix".to_string(), Value::String(prefix));
            }
            if let Some(suffix) = filter.suffix {
                entry.insert("filterSuffix".to_string(), Value::String(suffix));
            }
            entry.insert("lambdaFunctionArn".to_string(), Value::String(arn));
            Value::Object(entry)
        })
    }
}

/// Collects bucket subscriptions until the program finishes
///
/// Obtain the program's instance with `program.service::<BucketNotificationRegistrar>()`.
#[derive(Debug, Default)]
pub struct BucketNotificationRegistrar {
    pending: RefCell<Vec<(Bucket, Vec<SubscriptionInfo>)>>,
}

impl BucketNotificationRegistrar {
    fn register(&self, bucket: &Bucket, info: SubscriptionInfo) {
        let mut pending = self.pending.borrow_mut();
        match pending.iter_mut().find(|(b, _)| b.urn() == bucket.urn()) {
            Some((_, infos)) => infos.push(info),
            None => pending.push((bucket.clone(), vec![info])),
        }
    }

    /// Number of buckets with subscriptions not yet emitted
    pub fn pending_buckets(&self) -> usize {
        self.pending.borrow().len()
    }

    fn emit(program: &Program<'_>, bucket: &Bucket, infos: &[SubscriptionInfo]) -> Result<()> {
        let Some(first) = infos.first() else {
            return Ok(());
        };

        let lambda_functions = Output::all(infos.iter().map(SubscriptionInfo::notification_entry))
            .apply(Value::Array);

        program.declare(
            ResourceSpec::new(types::BUCKET_NOTIFICATION, &first.name)
                .input("bucket", bucket.id())
                .input("lambdaFunctions", lambda_functions)
                .options(
                    ResourceOptions::parent(bucket.resource())
                        .depends_on(infos.iter().map(|info| &info.permission)),
                ),
        )?;

        info!(
            bucket = bucket.name(),
            subscriptions = infos.len(),
            "declared bucket notification"
        );
        Ok(())
    }
}

impl ExitHook for BucketNotificationRegistrar {
    fn before_exit(&self, program: &Program<'_>) -> Result<bool> {
        // Registrations made while emitting land in the fresh map for the next pass.
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        debug!(buckets = pending.len(), "flushing bucket notifications");

        for (bucket, infos) in &pending {
            Self::emit(program, bucket, infos)?;
        }
        Ok(!pending.is_empty())
    }
}

/// Invoke a handler whenever an object is created in `bucket`
pub fn on_put(
    program: &Program<'_>,
    name: &str,
    bucket: &Bucket,
    handler: impl Into<Handler>,
    filter: BucketFilter,
    options: ResourceOptions,
) -> Result<BucketSubscription> {
    subscribe(
        program,
        &format!("{}-put", name),
        bucket,
        handler,
        BucketSubscriptionArgs::new(&[OBJECT_CREATED], filter),
        options,
    )
}

/// Invoke a handler whenever an object is removed from `bucket`
pub fn on_delete(
    program: &Program<'_>,
    name: &str,
    bucket: &Bucket,
    handler: impl Into<Handler>,
    filter: BucketFilter,
    options: ResourceOptions,
) -> Result<BucketSubscription> {
    subscribe(
        program,
        &format!("{}-delete", name),
        bucket,
        handler,
        BucketSubscriptionArgs::new(&[OBJECT_REMOVED], filter),
        options,
    )
}

/// Invoke a handler for arbitrary bucket events
///
/// The notification itself is declared when the program finishes.
pub fn subscribe(
    program: &Program<'_>,
    name: &str,
    bucket: &Bucket,
    handler: impl Into<Handler>,
    args: BucketSubscriptionArgs,
    options: ResourceOptions,
) -> Result<BucketSubscription> {
    if args.events.is_empty() {
        return Err(ServerlessError::Config(format!(
            "Bucket subscription {} must list at least one event",
            name
        )));
    }

    let func = create_lambda_function(
        program,
        &format!("{}-bucket-subscription", name),
        &handler.into(),
        FunctionArgs::with_options(options.clone()),
    )?;

    let component = program.declare(
        ResourceSpec::new(BUCKET_SUBSCRIPTION_TYPE, name)
            .input("bucket", bucket.id())
            .options(options),
    )?;

    let permission = program.declare(
        ResourceSpec::new(types::PERMISSION, name)
            .input("function", func.arn())
            .input("action", "lambda:InvokeFunction")
            .input("principal", "s3.amazonaws.com")
            .input(
                "sourceArn",
                bucket.id().apply(|id| format!("arn:aws:s3:::{}", id)),
            )
            .options(ResourceOptions::parent(&component)),
    )?;

    program
        .service::<BucketNotificationRegistrar>()
        .register(
            bucket,
            SubscriptionInfo {
                name: name.to_string(),
                events: args.events,
                filter: args.filter,
                lambda_function_arn: func.arn(),
                permission: permission.clone(),
            },
        );

    debug!(subscription = name, bucket = bucket.name(), "registered bucket subscription");
    Ok(BucketSubscription {
        component,
        func,
        permission,
    })
}

impl OnEvent for Bucket {
    type Args = BucketSubscriptionArgs;
    type Subscription = BucketSubscription;

    fn on_event(
        &self,
        program: &Program<'_>,
        name: &str,
        handler: impl Into<Handler>,
        args: BucketSubscriptionArgs,
        options: ResourceOptions,
    ) -> Result<BucketSubscription> {
        subscribe(program, name, self, handler, args, options)
    }
}
