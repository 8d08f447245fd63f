//! Lambda handler adapter
//!
//! Every helper that wires an event source to code accepts a [`Handler`]:
//! either a function that already exists in the graph, or deployment code from
//! which a new function is created.

use crate::graph::{ResourceOptions, ResourceSpec};
use crate::naming::short_hash;
use crate::program::Program;
use crate::resources::{types, LambdaFunction};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// Provides wide access to "serverless" services (Dynamo, S3, etc.)
pub const AWS_LAMBDA_FULL_ACCESS: &str = "arn:aws:iam::aws:policy/AWSLambdaFullAccess";
/// Required for lambda compute to be able to run tasks
pub const AMAZON_EC2_CONTAINER_SERVICE_FULL_ACCESS: &str =
    "arn:aws:iam::aws:policy/AmazonEC2ContainerServiceFullAccess";
pub const AMAZON_SQS_FULL_ACCESS: &str = "arn:aws:iam::aws:policy/AmazonSQSFullAccess";

/// Policies attached to functions created from inline code
pub const DEFAULT_COMPUTE_POLICIES: &[&str] = &[
    AWS_LAMBDA_FULL_ACCESS,
    AMAZON_EC2_CONTAINER_SERVICE_FULL_ACCESS,
];

fn default_runtime() -> String {
    "provided.al2023".to_string()
}

fn default_entry_point() -> String {
    "bootstrap".to_string()
}

/// Deployment package for a function created on the fly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCode {
    /// Path to the packaged code (a zip archive or a directory)
    pub code: PathBuf,
    /// Lambda runtime identifier
    #[serde(default = "default_runtime")]
    pub runtime: String,
    /// Handler entry point within the package
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    #[serde(default)]
    pub timeout: Option<u32>,
    #[serde(default)]
    pub memory_size: Option<u32>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl FunctionCode {
    pub fn new(code: impl Into<PathBuf>) -> Self {
        Self {
            code: code.into(),
            runtime: default_runtime(),
            entry_point: default_entry_point(),
            timeout: None,
            memory_size: None,
            environment: BTreeMap::new(),
        }
    }
}

/// Code to run in response to an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handler {
    /// Create a new function from this code
    Inline(FunctionCode),
    /// Use a function declared elsewhere
    Existing(LambdaFunction),
}

impl From<FunctionCode> for Handler {
    fn from(code: FunctionCode) -> Self {
        Handler::Inline(code)
    }
}

impl From<LambdaFunction> for Handler {
    fn from(function: LambdaFunction) -> Self {
        Handler::Existing(function)
    }
}

/// How a function created from inline code is declared
#[derive(Debug, Clone, Default)]
pub struct FunctionArgs {
    /// Policy ARNs to attach instead of the program's compute policies
    pub policies: Option<Vec<String>>,
    pub options: ResourceOptions,
}

impl FunctionArgs {
    pub fn with_options(options: ResourceOptions) -> Self {
        Self {
            policies: None,
            options,
        }
    }
}

/// Trust policy letting the Lambda service assume a function's role
pub fn lambda_assume_role_policy() -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Action": "sts:AssumeRole",
            "Principal": { "Service": "lambda.amazonaws.com" },
            "Effect": "Allow",
            "Sid": "",
        }],
    })
}

/// Turn a handler into a function resource
///
/// Existing functions are returned unchanged. Inline code creates a role with
/// the compute policies attached and a function named `name`; resolving the
/// same name again within one program returns the function created the first
/// time.
pub fn create_lambda_function(
    program: &Program<'_>,
    name: &str,
    handler: &Handler,
    args: FunctionArgs,
) -> Result<LambdaFunction> {
    let code = match handler {
        Handler::Existing(function) => return Ok(function.clone()),
        Handler::Inline(code) => code,
    };

    if let Some(function) = program.cached_function(name) {
        debug!(function = name, "reusing function");
        return Ok(function);
    }

    let policies = args
        .policies
        .unwrap_or_else(|| program.config().compute_policies.clone());

    let role = program.declare(
        ResourceSpec::new(types::ROLE, name)
            .input("assumeRolePolicy", lambda_assume_role_policy().to_string())
            .options(args.options.clone()),
    )?;

    for policy in &policies {
        program.declare(
            ResourceSpec::new(
                types::ROLE_POLICY_ATTACHMENT,
                &format!("{}-{}", name, short_hash(policy)),
            )
            .input("role", role.name_output())
            .input("policyArn", policy.as_str())
            .options(args.options.clone()),
        )?;
    }

    let environment = json!({ "variables": code.environment });
    let function = LambdaFunction::declare_spec(
        program,
        ResourceSpec::new(LambdaFunction::TYPE, name)
            .input("code", code.code.display().to_string())
            .input("runtime", code.runtime.as_str())
            .input("handler", code.entry_point.as_str())
            .input("role", role.arn())
            .optional_input("timeout", code.timeout)
            .optional_input("memorySize", code.memory_size)
            .input("environment", environment)
            .options(args.options),
    )?;

    debug!(function = name, policies = policies.len(), "created function");
    program.cache_function(name, function.clone());
    Ok(function)
}
