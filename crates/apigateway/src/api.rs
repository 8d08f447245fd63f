//! The API component
//!
//! Groups the REST API, its deployment and stage, and the permissions that let
//! API Gateway invoke each route's function.

use crate::spec::{build_spec, swagger_string};
use crate::types::{Route, StaticRoute, SwaggerSpec, ANY_METHOD};
use aws_serverless_common::resources::types;
use aws_serverless_common::{
    derived_name, short_hash, Output, Program, Resource, ResourceOptions, ResourceSpec, Result,
    ServerlessError,
};
use serde_json::json;
use tracing::{info, warn};

/// Component type every API resource is parented to
pub const API_TYPE: &str = "aws-serverless:apigateway:API";
pub const DEFAULT_STAGE_NAME: &str = "stage";

/// How an API is built: from routes, or from a ready-made swagger document
#[derive(Debug, Clone, Default)]
pub struct ApiArgs {
    pub routes: Vec<Route>,
    pub static_routes: Vec<StaticRoute>,
    /// Raw document used instead of the routes when present
    pub swagger_spec: Option<Output<String>>,
    pub stage_name: Option<String>,
}

impl ApiArgs {
    pub fn with_routes(routes: Vec<Route>) -> Self {
        Self {
            routes,
            ..Self::default()
        }
    }

    pub fn with_swagger_spec(swagger_spec: Output<String>) -> Self {
        Self {
            swagger_spec: Some(swagger_spec),
            ..Self::default()
        }
    }

    pub fn static_routes(mut self, static_routes: Vec<StaticRoute>) -> Self {
        self.static_routes = static_routes;
        self
    }

    pub fn stage_name(mut self, stage_name: &str) -> Self {
        self.stage_name = Some(stage_name.to_string());
        self
    }
}

/// A deployed REST API
#[derive(Debug, Clone)]
pub struct Api {
    pub component: Resource,
    pub rest_api: Resource,
    pub deployment: Resource,
    pub stage: Resource,
    pub permissions: Vec<Resource>,
    /// Document built from routes; absent for raw swagger documents
    pub spec: Option<SwaggerSpec>,
    /// Serialized document handed to the REST API
    pub swagger: Output<String>,
    /// Invoke URL of the stage, ending in '/'
    pub url: Output<String>,
}

impl Api {
    pub fn new(program: &Program<'_>, name: &str, args: ApiArgs) -> Result<Self> {
        if args.swagger_spec.is_none() && args.routes.is_empty() && args.static_routes.is_empty()
        {
            return Err(ServerlessError::Config(format!(
                "API {} must specify either routes or a swagger spec",
                name
            )));
        }

        let component = program.declare(ResourceSpec::new(API_TYPE, name))?;
        let options = ResourceOptions::parent(&component);

        let (swagger, spec) = match args.swagger_spec {
            Some(raw) => {
                if !args.routes.is_empty() || !args.static_routes.is_empty() {
                    warn!(api = name, "swagger spec given; ignoring routes");
                }
                (raw, None)
            }
            None => {
                let spec = build_spec(program, name, &args.routes, &args.static_routes, &options)?;
                (swagger_string(&spec), Some(spec))
            }
        };

        let rest_api = program.declare(
            ResourceSpec::new(types::REST_API, name)
                .input("body", swagger.clone())
                .options(options.clone()),
        )?;

        // A new version forces a redeployment whenever the document changes.
        let variables = swagger.apply(|body| json!({ "version": short_hash(&body) }));
        let deployment = program.declare(
            ResourceSpec::new(types::DEPLOYMENT, name)
                .input("restApi", rest_api.id())
                .input("stageName", "")
                .input("variables", variables)
                .options(options.clone()),
        )?;

        let permissions = match &spec {
            Some(spec) => create_permissions(program, name, spec, &deployment, &options)?,
            None => Vec::new(),
        };

        let stage_name = args
            .stage_name
            .unwrap_or_else(|| DEFAULT_STAGE_NAME.to_string());
        let stage = program.declare(
            ResourceSpec::new(types::STAGE, name)
                .input("stageName", stage_name.as_str())
                .input("restApi", rest_api.id())
                .input("deployment", deployment.id())
                .options(
                    options
                        .clone()
                        .depends_on(permissions.iter().chain(std::iter::once(&deployment))),
                ),
        )?;

        let url = deployment
            .string_attribute("invoke_url")
            .apply(move |invoke_url| format!("{}{}/", invoke_url, stage_name));

        info!(api = name, permissions = permissions.len(), "declared API");
        Ok(Self {
            component,
            rest_api,
            deployment,
            stage,
            permissions,
            spec,
            swagger,
            url,
        })
    }
}

/// Allow API Gateway to invoke the function behind each lambda operation
fn create_permissions(
    program: &Program<'_>,
    api_name: &str,
    spec: &SwaggerSpec,
    deployment: &Resource,
    options: &ResourceOptions,
) -> Result<Vec<Resource>> {
    let mut permissions = Vec::new();
    for (path, methods) in spec.paths.iter() {
        for (method, operation) in methods.iter() {
            let Some(lambda) = &operation.lambda else {
                continue;
            };

            let permission_method = if method == ANY_METHOD {
                "*".to_string()
            } else {
                method.to_uppercase()
            };
            let source_path = format!("{}{}", permission_method, path);
            let source_arn = deployment
                .string_attribute("execution_arn")
                .apply(move |arn| format!("{}*/{}", arn, source_path));

            let permission = program.declare(
                ResourceSpec::new(
                    types::PERMISSION,
                    &derived_name(api_name, &format!("{}:{}", method, path)),
                )
                .input("action", "lambda:invokeFunction")
                .input("function", lambda.arn())
                .input("principal", "apigateway.amazonaws.com")
                .input("sourceArn", source_arn)
                .options(options.clone()),
            )?;
            permissions.push(permission);
        }
    }
    Ok(permissions)
}
