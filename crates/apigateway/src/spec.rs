//! Swagger document builder
//!
//! Routes are registered into a [`SwaggerSpec`] whose integrations still wait
//! on the functions and buckets behind them. [`swagger_string`] joins every
//! pending value and serializes the document once they are all known.

use crate::static_routes::add_static_routes;
use crate::types::{
    GatewayResponse, Integration, IntegrationType, Method, OrderedMap, ResolvedIntegration,
    ResolvedOperation, Route, StaticRoute, SwaggerDocument, SwaggerInfo, SwaggerOperation,
    SwaggerSpec,
};
use aws_serverless_common::resources::LambdaFunction;
use aws_serverless_common::{
    create_lambda_function, derived_name, output_from_map, FunctionArgs, Output, OutputError,
    Program, ResourceOptions, Result,
};
use tracing::debug;

pub const SWAGGER_VERSION: &str = "2.0";
pub const API_VERSION: &str = "1.0";

/// Gateway errors answered with a plain 404 instead of API Gateway's defaults
const NOT_FOUND_GATEWAY_RESPONSES: &[&str] = &["MISSING_AUTHENTICATION_TOKEN", "ACCESS_DENIED"];
const NOT_FOUND_TEMPLATE: &str = "{\"message\": \"404 Not found\" }";

/// Map a method name to its key in the swagger `paths` object
///
/// Accepts the methods API Gateway supports in any case; "any" maps to the
/// any-method extension token.
pub fn swagger_method(method: &str) -> Result<&'static str> {
    method.parse::<Method>().map(|m| m.swagger_token())
}

/// An empty document for an API
pub fn create_base_spec(api_name: &str) -> SwaggerSpec {
    SwaggerSpec {
        swagger: SWAGGER_VERSION.to_string(),
        info: SwaggerInfo {
            title: api_name.to_string(),
            version: API_VERSION.to_string(),
        },
        paths: OrderedMap::new(),
        binary_media_types: vec!["*/*".to_string()],
    }
}

/// Build the document for an API's lambda and static routes
pub fn build_spec(
    program: &Program<'_>,
    api_name: &str,
    routes: &[Route],
    static_routes: &[StaticRoute],
    options: &ResourceOptions,
) -> Result<SwaggerSpec> {
    let spec = swagger_spec_from_routes(program, api_name, routes, options)?;
    add_static_routes(program, api_name, static_routes, spec, options)
}

/// Build a document with one lambda proxy operation per route
pub fn swagger_spec_from_routes(
    program: &Program<'_>,
    api_name: &str,
    routes: &[Route],
    options: &ResourceOptions,
) -> Result<SwaggerSpec> {
    let mut spec = create_base_spec(api_name);
    register_routes(program, api_name, routes, &mut spec, options)?;
    Ok(spec)
}

/// Add lambda routes to an existing document
///
/// A later route for the same path and method replaces the earlier one.
pub fn register_routes(
    program: &Program<'_>,
    api_name: &str,
    routes: &[Route],
    spec: &mut SwaggerSpec,
    options: &ResourceOptions,
) -> Result<()> {
    for route in routes {
        let method = route.method.swagger_token();
        let function_name = derived_name(api_name, &format!("{}:{}", method, route.path));
        let lambda = create_lambda_function(
            program,
            &function_name,
            &route.handler,
            FunctionArgs::with_options(options.clone()),
        )?;

        debug!(api = api_name, path = %route.path, method, "registered route");
        let replaced = spec
            .paths
            .entry_or_default(&route.path)
            .insert(method, create_path_spec_lambda(program.region(), &lambda));
        if replaced.is_some() {
            debug!(path = %route.path, method, "route replaced an earlier registration");
        }
    }
    Ok(())
}

/// Lambda proxy operation invoking `lambda`
pub fn create_path_spec_lambda(region: &str, lambda: &LambdaFunction) -> SwaggerOperation {
    let region = region.to_string();
    let uri = lambda.arn().apply(move |arn| {
        format!(
            "arn:aws:apigateway:{}:lambda:path/2015-03-31/functions/{}/invocations",
            region, arn
        )
    });

    SwaggerOperation {
        parameters: None,
        responses: None,
        integration: Integration {
            request_parameters: None,
            passthrough_behavior: Some("when_no_match".to_string()),
            http_method: "POST".to_string(),
            integration_type: IntegrationType::AwsProxy,
            responses: None,
            connection_type: None,
            uri,
            credentials: None,
            connection_id: None,
        },
        lambda: Some(lambda.clone()),
    }
}

/// Responses overriding API Gateway's own errors for unknown routes
pub fn gateway_responses() -> OrderedMap<GatewayResponse> {
    NOT_FOUND_GATEWAY_RESPONSES
        .iter()
        .map(|kind| {
            let templates: OrderedMap<String> =
                [("application/json", NOT_FOUND_TEMPLATE.to_string())]
                    .into_iter()
                    .collect();
            (
                *kind,
                GatewayResponse {
                    status_code: 404,
                    response_templates: templates,
                },
            )
        })
        .collect()
}

fn resolve_operation(operation: &SwaggerOperation) -> Output<ResolvedOperation> {
    let integration = &operation.integration;
    let parameters = operation.parameters.clone();
    let responses = operation.responses.clone();
    let request_parameters = integration.request_parameters.clone();
    let passthrough_behavior = integration.passthrough_behavior.clone();
    let http_method = integration.http_method.clone();
    let integration_type = integration.integration_type;
    let integration_responses = integration.responses.clone();
    let connection_type = integration.connection_type.clone();

    integration
        .uri
        .zip(&Output::optional(integration.credentials.as_ref()))
        .zip(&Output::optional(integration.connection_id.as_ref()))
        .apply(move |((uri, credentials), connection_id)| ResolvedOperation {
            parameters,
            responses,
            integration: ResolvedIntegration {
                request_parameters,
                passthrough_behavior,
                http_method,
                integration_type,
                responses: integration_responses,
                connection_type,
                uri,
                credentials,
                connection_id,
            },
        })
}

/// Resolve every pending value of a document
///
/// Path and method order is that of the original registrations, whatever the
/// order in which the underlying resources are created.
pub fn resolve_swagger_document(spec: &SwaggerSpec) -> Output<SwaggerDocument> {
    let paths = output_from_map(
        spec.paths.iter().map(|(path, methods)| (path.clone(), methods)),
        |methods| {
            output_from_map(
                methods.iter().map(|(method, op)| (method.clone(), op)),
                resolve_operation,
            )
        },
    );

    let swagger = spec.swagger.clone();
    let info = spec.info.clone();
    let binary_media_types = spec.binary_media_types.clone();
    paths.apply(move |paths| SwaggerDocument {
        swagger,
        info,
        paths: paths
            .into_iter()
            .map(|(path, methods)| (path, methods.into_iter().collect::<OrderedMap<_>>()))
            .collect(),
        binary_media_types,
        gateway_responses: gateway_responses(),
    })
}

/// Serialize a document as JSON once all of its values are known
pub fn swagger_string(spec: &SwaggerSpec) -> Output<String> {
    let title = spec.info.title.clone();
    resolve_swagger_document(spec).try_apply(move |document| {
        let json = serde_json::to_string(&document).map_err(|e| {
            OutputError::new(format!("Failed to serialize swagger spec for {}: {}", title, e))
        })?;
        debug!(api = %title, bytes = json.len(), "resolved swagger spec");
        Ok(json)
    })
}
