//! Event payloads delivered to subscribed functions
//!
//! Field names follow the JSON each service sends, so these deserialize
//! straight from the lambda event.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// S3

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketNotificationEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<BucketNotificationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketNotificationRecord {
    pub event_version: String,
    pub event_source: String,
    pub aws_region: String,
    pub event_time: String,
    pub event_name: String,
    pub user_identity: PrincipalIdentity,
    pub request_parameters: BucketRequestParameters,
    pub response_elements: HashMap<String, String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalIdentity {
    pub principal_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRequestParameters {
    #[serde(rename = "sourceIPAddress")]
    pub source_ip_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Entity {
    pub s3_schema_version: String,
    pub configuration_id: String,
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Bucket {
    pub name: String,
    pub owner_identity: PrincipalIdentity,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Object {
    pub key: String,
    /// Absent for delete events
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub e_tag: Option<String>,
    #[serde(default)]
    pub version_id: Option<String>,
    pub sequencer: String,
}

// SNS

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<TopicRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TopicRecord {
    pub event_version: String,
    pub event_subscription_arn: String,
    pub event_source: String,
    pub sns: SnsMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnsMessage {
    pub signature_version: String,
    pub timestamp: String,
    pub signature: String,
    pub signing_cert_url: String,
    pub message_id: String,
    pub message: String,
    #[serde(default)]
    pub message_attributes: HashMap<String, SnsMessageAttribute>,
    #[serde(rename = "Type")]
    pub message_type: String,
    pub unsubscribe_url: String,
    pub topic_arn: String,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnsMessageAttribute {
    #[serde(rename = "Type")]
    pub attribute_type: String,
    #[serde(rename = "Value")]
    pub value: String,
}

// SQS

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<QueueRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRecord {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    pub attributes: QueueRecordAttributes,
    #[serde(default)]
    pub message_attributes: HashMap<String, Value>,
    pub md5_of_body: String,
    pub event_source: String,
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    pub aws_region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueueRecordAttributes {
    pub approximate_receive_count: String,
    pub sent_timestamp: String,
    pub sender_id: String,
    pub approximate_first_receive_timestamp: String,
}

// CloudWatch

/// Event delivered by an event rule, including scheduled rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRuleEvent {
    #[serde(default)]
    pub version: Option<String>,
    pub id: String,
    #[serde(rename = "detail-type")]
    pub detail_type: String,
    pub source: String,
    pub account: String,
    pub time: String,
    pub region: String,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub detail: Value,
}

/// Decoded log group subscription batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogGroupEvent {
    pub owner: String,
    pub log_group: String,
    pub log_stream: String,
    pub subscription_filters: Vec<String>,
    pub message_type: String,
    pub log_events: Vec<LogGroupEventRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogGroupEventRecord {
    pub id: String,
    pub timestamp: i64,
    pub message: String,
}

// DynamoDB

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<TableEventRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableEventName {
    Insert,
    Modify,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableEventRecord {
    pub aws_region: String,
    pub dynamodb: TableStreamRecord,
    #[serde(rename = "eventID")]
    pub event_id: String,
    pub event_name: TableEventName,
    pub event_source: String,
    pub event_version: String,
    #[serde(default)]
    pub user_identity: Option<TableUserIdentity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableStreamRecord {
    #[serde(default)]
    pub approximate_creation_date_time: Option<f64>,
    pub keys: HashMap<String, Value>,
    #[serde(default)]
    pub new_image: Option<HashMap<String, Value>>,
    #[serde(default)]
    pub old_image: Option<HashMap<String, Value>>,
    pub sequence_number: String,
    pub size_bytes: u64,
    pub stream_view_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableUserIdentity {
    pub principal_id: String,
    #[serde(rename = "Type")]
    pub identity_type: String,
}

// Kinesis

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StreamEventRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEventRecord {
    #[serde(rename = "eventID")]
    pub event_id: String,
    pub event_version: String,
    pub kinesis: KinesisRecord,
    pub invoke_identity_arn: String,
    pub event_name: String,
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    pub event_source: String,
    pub aws_region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KinesisRecord {
    pub partition_key: String,
    /// Base64-encoded record data
    pub data: String,
    pub kinesis_schema_version: String,
    pub sequence_number: String,
}

// CodeCommit

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryEvent {
    pub version: String,
    pub id: String,
    #[serde(rename = "detail-type")]
    pub detail_type: String,
    pub source: String,
    pub account: String,
    pub time: String,
    pub region: String,
    #[serde(default)]
    pub resources: Vec<String>,
    pub detail: RepositoryEventDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryEventDetail {
    /// `referenceCreated`, `referenceUpdated` or `referenceDeleted`
    pub event: String,
    pub repository_name: String,
    pub repository_id: String,
    pub reference_type: String,
    pub reference_name: String,
    pub reference_full_name: String,
    #[serde(default)]
    pub commit_id: Option<String>,
    #[serde(default)]
    pub old_commit_id: Option<String>,
}

// Cognito

/// Fields shared by every user pool trigger; trigger-specific parts stay raw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPoolTriggerEvent {
    pub version: String,
    pub trigger_source: String,
    pub region: String,
    pub user_pool_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    pub caller_context: CallerContext,
    #[serde(default)]
    pub request: Value,
    #[serde(default)]
    pub response: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerContext {
    pub aws_sdk_version: String,
    pub client_id: String,
}
