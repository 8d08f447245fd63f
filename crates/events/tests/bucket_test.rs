//! Integration tests for deferred bucket notifications

use aws_serverless_common::resources::{types, Bucket, LambdaFunction};
use aws_serverless_common::{
    ExitHook, FunctionCode, InMemoryGraph, Program, ProgramConfig, ResourceOptions, Result,
    ServerlessError, Urn,
};
use aws_serverless_events::bucket::{
    self, BucketFilter, BucketNotificationRegistrar, BucketSubscriptionArgs, OBJECT_CREATED,
    OBJECT_REMOVED,
};
use aws_serverless_events::OnEvent;
use futures::executor::block_on;
use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;

const REGION: &str = "us-east-1";

fn code(name: &str) -> FunctionCode {
    FunctionCode::new(format!("./dist/{}.zip", name))
}

fn input(graph: &InMemoryGraph, type_token: &str, name: &str, key: &str) -> Value {
    graph
        .find(type_token, name)
        .and_then(|declared| declared.input(key).cloned())
        .map(|value| value.now().unwrap().unwrap())
        .unwrap_or(Value::Null)
}

#[test]
fn test_subscriptions_share_one_notification() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));
    let images = Bucket::declare(&program, "images", ResourceOptions::default()).unwrap();

    let put = bucket::on_put(
        &program,
        "thumbnail",
        &images,
        code("thumbnail"),
        BucketFilter::suffix(".png"),
        ResourceOptions::default(),
    )
    .unwrap();
    let delete = bucket::on_delete(
        &program,
        "cleanup",
        &images,
        code("cleanup"),
        BucketFilter::default(),
        ResourceOptions::default(),
    )
    .unwrap();
    let audit = images
        .on_event(
            &program,
            "audit",
            code("audit"),
            BucketSubscriptionArgs::new(&[OBJECT_CREATED, OBJECT_REMOVED], BucketFilter::prefix("logs/")),
            ResourceOptions::default(),
        )
        .unwrap();

    // Nothing is emitted before the program finishes.
    assert!(graph.resources_of_type(types::BUCKET_NOTIFICATION).is_empty());
    assert_eq!(program.service::<BucketNotificationRegistrar>().pending_buckets(), 1);

    program.finish().unwrap();

    let notifications = graph.resources_of_type(types::BUCKET_NOTIFICATION);
    assert_eq!(notifications.len(), 1);

    let notification = &notifications[0];
    assert_eq!(notification.name, "thumbnail-put");
    assert_eq!(notification.options.parent.as_ref(), Some(images.urn()));
    assert_eq!(
        notification.options.depends_on,
        vec![
            put.permission.urn().clone(),
            delete.permission.urn().clone(),
            audit.permission.urn().clone(),
        ]
    );

    graph.materialize();
    let account = "123456789012";
    let put_arn = block_on(put.func.arn().resolve()).unwrap();
    assert_eq!(
        put_arn,
        format!(
            "arn:aws:lambda:{}:{}:function:thumbnail-put-bucket-subscription",
            REGION, account
        )
    );
    assert_eq!(
        input(&graph, types::BUCKET_NOTIFICATION, "thumbnail-put", "lambdaFunctions"),
        json!([
            {
                "events": ["s3:ObjectCreated:*"],
                "filterSuffix": ".png",
                "lambdaFunctionArn": format!(
                    "arn:aws:lambda:{}:{}:function:thumbnail-put-bucket-subscription",
                    REGION, account
                ),
            },
            {
                "events": ["s3:ObjectRemoved:*"],
                "lambdaFunctionArn": format!(
                    "arn:aws:lambda:{}:{}:function:cleanup-delete-bucket-subscription",
                    REGION, account
                ),
            },
            {
                "events": ["s3:ObjectCreated:*", "s3:ObjectRemoved:*"],
                "filterPrefix": "logs/",
                "lambdaFunctionArn": format!(
                    "arn:aws:lambda:{}:{}:function:audit-bucket-subscription",
                    REGION, account
                ),
            },
        ])
    );
    assert_eq!(
        input(&graph, types::BUCKET_NOTIFICATION, "thumbnail-put", "bucket"),
        json!("images")
    );
}

#[test]
fn test_one_notification_per_bucket() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));
    let images = Bucket::declare(&program, "images", ResourceOptions::default()).unwrap();
    let videos = Bucket::declare(&program, "videos", ResourceOptions::default()).unwrap();

    for (name, target) in [("images-put", &images), ("videos-put", &videos)] {
        bucket::on_put(
            &program,
            name,
            target,
            code(name),
            BucketFilter::default(),
            ResourceOptions::default(),
        )
        .unwrap();
    }

    program.finish().unwrap();

    let parents: Vec<Option<Urn>> = graph
        .resources_of_type(types::BUCKET_NOTIFICATION)
        .into_iter()
        .map(|n| n.options.parent)
        .collect();
    assert_eq!(
        parents,
        vec![Some(images.urn().clone()), Some(videos.urn().clone())]
    );
}

#[test]
fn test_permission_grants_s3() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));
    let images = Bucket::declare(&program, "images", ResourceOptions::default()).unwrap();

    let subscription = bucket::on_put(
        &program,
        "thumbnail",
        &images,
        code("thumbnail"),
        BucketFilter::default(),
        ResourceOptions::default(),
    )
    .unwrap();

    assert_eq!(subscription.component.type_token(), bucket::BUCKET_SUBSCRIPTION_TYPE);
    assert_eq!(subscription.func.name(), "thumbnail-put-bucket-subscription");

    let permission = graph.find(types::PERMISSION, "thumbnail-put").unwrap();
    assert_eq!(permission.options.parent.as_ref(), Some(subscription.component.urn()));

    graph.materialize();
    assert_eq!(
        input(&graph, types::PERMISSION, "thumbnail-put", "principal"),
        json!("s3.amazonaws.com")
    );
    assert_eq!(
        input(&graph, types::PERMISSION, "thumbnail-put", "action"),
        json!("lambda:InvokeFunction")
    );
    assert_eq!(
        input(&graph, types::PERMISSION, "thumbnail-put", "sourceArn"),
        json!("arn:aws:s3:::images")
    );
}

#[test]
fn test_existing_function_is_reused() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));
    let images = Bucket::declare(&program, "images", ResourceOptions::default()).unwrap();
    let existing =
        LambdaFunction::declare(&program, "resizer", ResourceOptions::default()).unwrap();

    let subscription = bucket::on_put(
        &program,
        "thumbnail",
        &images,
        existing.clone(),
        BucketFilter::default(),
        ResourceOptions::default(),
    )
    .unwrap();

    assert_eq!(subscription.func, existing);
    assert_eq!(graph.resources_of_type(LambdaFunction::TYPE).len(), 1);
    assert!(graph.resources_of_type(types::ROLE).is_empty());
}

#[test]
fn test_subscription_without_events_is_rejected() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));
    let images = Bucket::declare(&program, "images", ResourceOptions::default()).unwrap();

    let err = bucket::subscribe(
        &program,
        "nothing",
        &images,
        code("nothing"),
        BucketSubscriptionArgs::new(&[], BucketFilter::default()),
        ResourceOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, ServerlessError::Config(_)));
    assert_eq!(graph.resources().len(), 1);
}

/// Subscribes to a second bucket the first time the program finishes
struct LateSubscriber {
    bucket: Bucket,
    done: Cell<bool>,
}

impl ExitHook for LateSubscriber {
    fn before_exit(&self, program: &Program<'_>) -> Result<bool> {
        if self.done.replace(true) {
            return Ok(false);
        }
        bucket::on_put(
            program,
            "late",
            &self.bucket,
            code("late"),
            BucketFilter::default(),
            ResourceOptions::default(),
        )?;
        Ok(true)
    }
}

#[test]
fn test_subscription_made_during_finish_is_emitted() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));
    let images = Bucket::declare(&program, "images", ResourceOptions::default()).unwrap();
    let archive = Bucket::declare(&program, "archive", ResourceOptions::default()).unwrap();

    bucket::on_put(
        &program,
        "thumbnail",
        &images,
        code("thumbnail"),
        BucketFilter::default(),
        ResourceOptions::default(),
    )
    .unwrap();
    program.on_before_exit(Rc::new(LateSubscriber {
        bucket: archive.clone(),
        done: Cell::new(false),
    }));

    program.finish().unwrap();

    let notifications = graph.resources_of_type(types::BUCKET_NOTIFICATION);
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[1].name, "late-put");
    assert_eq!(notifications[1].options.parent.as_ref(), Some(archive.urn()));
    assert_eq!(program.service::<BucketNotificationRegistrar>().pending_buckets(), 0);
}

#[test]
fn test_finish_twice_declares_nothing_new() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));
    let images = Bucket::declare(&program, "images", ResourceOptions::default()).unwrap();

    bucket::on_put(
        &program,
        "thumbnail",
        &images,
        code("thumbnail"),
        BucketFilter::default(),
        ResourceOptions::default(),
    )
    .unwrap();

    program.finish().unwrap();
    let declared = graph.resources().len();
    program.finish().unwrap();

    assert_eq!(graph.resources().len(), declared);
    assert_eq!(graph.resources_of_type(types::BUCKET_NOTIFICATION).len(), 1);
}
