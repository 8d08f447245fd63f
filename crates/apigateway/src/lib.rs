//! API Gateway support
//!
//! Builds a Swagger 2.0 document from lambda and static routes and declares the
//! REST API, deployment, stage and invoke permissions that serve it.
//!
//! # Example
//!
//! ```no_run
//! use aws_serverless_apigateway::{Api, ApiArgs, Method, Route};
//! use aws_serverless_common::{FunctionCode, InMemoryGraph, Program, ProgramConfig};
//!
//! # fn main() -> aws_serverless_common::Result<()> {
//! let graph = InMemoryGraph::new("us-east-1");
//! let program = Program::new(&graph, ProgramConfig::new("us-east-1"));
//!
//! let hello = Route::new(Method::Get, "/hello", FunctionCode::new("./dist/hello.zip"));
//! let api = Api::new(&program, "greeter", ApiArgs::with_routes(vec![hello]))?;
//! program.finish()?;
//! graph.materialize();
//!
//! println!("{:?}", api.url.now());
//! # Ok(())
//! # }
//! ```

mod api;
pub mod request;
mod spec;
mod static_routes;
mod types;

pub use api::{Api, ApiArgs, API_TYPE, DEFAULT_STAGE_NAME};
pub use spec::{
    build_spec, create_base_spec, create_path_spec_lambda, gateway_responses, register_routes,
    resolve_swagger_document, swagger_method, swagger_spec_from_routes, swagger_string,
};
pub use static_routes::{add_static_routes, apigateway_assume_role_policy, AMAZON_S3_READ_ONLY_ACCESS};
pub use types::{
    GatewayResponse, IndexPolicy, Integration, IntegrationResponse, IntegrationType, Method,
    OrderedMap, ResolvedIntegration, ResolvedOperation, Route, StaticRoute, SwaggerDocument,
    SwaggerHeader, SwaggerInfo, SwaggerOperation, SwaggerParameter, SwaggerResponse,
    SwaggerSchema, SwaggerSpec, ANY_METHOD,
};
