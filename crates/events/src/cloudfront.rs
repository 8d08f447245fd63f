//! CloudFront lambda function associations
//!
//! Not supported yet: every entry point fails with
//! [`ServerlessError::NotImplemented`].

use aws_serverless_common::{Handler, Output, Program, ResourceOptions, Result, ServerlessError};
use serde::{Deserialize, Serialize};

/// Point in the CloudFront request cycle a function runs at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LambdaEventType {
    ViewerRequest,
    OriginRequest,
    ViewerResponse,
    OriginResponse,
}

/// A function attached to a distribution cache behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaFunctionAssociation {
    pub event_type: LambdaEventType,
    /// Qualified ARN of a published function version
    pub lambda_arn: String,
}

/// Create the function for a cache behavior association
pub fn create_lambda_function_association(
    _program: &Program<'_>,
    _name: &str,
    _event_type: LambdaEventType,
    _handler: impl Into<Handler>,
    _options: ResourceOptions,
) -> Result<Output<LambdaFunctionAssociation>> {
    Err(ServerlessError::NotImplemented(
        "CloudFront lambda function associations",
    ))
}
