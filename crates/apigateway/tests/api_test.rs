//! Integration tests for the API component

use aws_serverless_apigateway::{Api, ApiArgs, Method, Route, API_TYPE};
use aws_serverless_common::resources::{types, LambdaFunction};
use aws_serverless_common::{
    derived_name, short_hash, Attributes, FunctionCode, InMemoryGraph, Output, Program,
    ProgramConfig, Resource, ResourceGraph, ResourceSpec, Result, ServerlessError, Urn,
};
use mockall::mock;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

const REGION: &str = "us-east-1";

mock! {
    pub Graph {}

    impl ResourceGraph for Graph {
        fn declare(&self, spec: ResourceSpec) -> Result<Resource>;
    }
}

fn routes() -> Vec<Route> {
    vec![
        Route::new(Method::Get, "/hello", FunctionCode::new("./dist/hello.zip")),
        Route::new(Method::Any, "/items", FunctionCode::new("./dist/items.zip")),
    ]
}

fn input(graph: &InMemoryGraph, type_token: &str, name: &str, key: &str) -> Value {
    graph
        .find(type_token, name)
        .and_then(|declared| declared.input(key).cloned())
        .map(|value| value.now().unwrap().unwrap())
        .unwrap_or(Value::Null)
}

#[test]
fn test_api_declares_rest_api_deployment_and_stage() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));

    let api = Api::new(&program, "greeter", ApiArgs::with_routes(routes())).unwrap();
    assert_eq!(api.component.type_token(), API_TYPE);

    let rest_api = graph.find(types::REST_API, "greeter").unwrap();
    assert_eq!(rest_api.options.parent.as_ref(), Some(api.component.urn()));
    assert!(graph.find(types::DEPLOYMENT, "greeter").is_some());
    assert!(graph.find(types::STAGE, "greeter").is_some());
    assert_eq!(graph.resources_of_type(LambdaFunction::TYPE).len(), 2);

    graph.materialize();
    assert_eq!(input(&graph, types::STAGE, "greeter", "stageName"), json!("stage"));
    assert_eq!(input(&graph, types::DEPLOYMENT, "greeter", "stageName"), json!(""));
    assert_eq!(
        api.url.now().unwrap().unwrap(),
        format!("https://greeter.execute-api.{}.amazonaws.com/stage/", REGION)
    );
}

#[test]
fn test_custom_stage_name() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));

    let api = Api::new(
        &program,
        "greeter",
        ApiArgs::with_routes(routes()).stage_name("prod"),
    )
    .unwrap();

    graph.materialize();
    assert!(api.url.now().unwrap().unwrap().ends_with("/prod/"));
}

#[test]
fn test_permissions_per_lambda_operation() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));

    let api = Api::new(&program, "greeter", ApiArgs::with_routes(routes())).unwrap();
    assert_eq!(api.permissions.len(), 2);

    graph.materialize();
    let execution_arn = format!("arn:aws:execute-api:{}:123456789012:greeter/", REGION);

    let hello = derived_name("greeter", "get:/hello");
    assert_eq!(
        input(&graph, types::PERMISSION, &hello, "sourceArn"),
        json!(format!("{}*/GET/hello", execution_arn))
    );
    assert_eq!(
        input(&graph, types::PERMISSION, &hello, "principal"),
        json!("apigateway.amazonaws.com")
    );
    assert_eq!(
        input(&graph, types::PERMISSION, &hello, "action"),
        json!("lambda:invokeFunction")
    );

    let items = derived_name("greeter", "x-amazon-apigateway-any-method:/items");
    assert_eq!(
        input(&graph, types::PERMISSION, &items, "sourceArn"),
        json!(format!("{}*/*/items", execution_arn))
    );
}

#[test]
fn test_deployment_version_tracks_document() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));

    let api = Api::new(&program, "greeter", ApiArgs::with_routes(routes())).unwrap();
    graph.materialize();

    let body = api.swagger.now().unwrap().unwrap();
    assert_eq!(input(&graph, types::REST_API, "greeter", "body"), json!(body.clone()));
    assert_eq!(
        input(&graph, types::DEPLOYMENT, "greeter", "variables"),
        json!({ "version": short_hash(&body) })
    );
}

#[test]
fn test_raw_swagger_spec_creates_no_permissions() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));
    let raw = r#"{"swagger":"2.0","info":{"title":"raw","version":"1.0"},"paths":{}}"#;

    let api = Api::new(
        &program,
        "raw",
        ApiArgs::with_swagger_spec(Output::known(raw.to_string())),
    )
    .unwrap();

    assert!(api.spec.is_none());
    assert!(api.permissions.is_empty());
    assert!(graph.resources_of_type(types::PERMISSION).is_empty());
    assert_eq!(input(&graph, types::REST_API, "raw", "body"), json!(raw));
}

#[test]
fn test_api_without_routes_or_spec_is_rejected() {
    let mut graph = MockGraph::new();
    graph.expect_declare().times(0);
    let program = Program::new(&graph, ProgramConfig::new(REGION));

    let err = Api::new(&program, "empty", ApiArgs::default()).unwrap_err();
    assert!(matches!(err, ServerlessError::Config(_)));
}

#[test]
fn test_failed_declaration_aborts_api() {
    let mut graph = MockGraph::new();
    graph.expect_declare().returning(|spec| {
        if spec.type_token == LambdaFunction::TYPE {
            return Err(ServerlessError::Resource(format!(
                "function limit reached for {}",
                spec.name
            )));
        }
        let attributes: Attributes = Arc::new(BTreeMap::new());
        Ok(Resource::new(
            Urn::new(&spec.type_token, &spec.name),
            &spec.type_token,
            &spec.name,
            Output::known(attributes),
        ))
    });
    let program = Program::new(&graph, ProgramConfig::new(REGION));

    let err = Api::new(&program, "greeter", ApiArgs::with_routes(routes())).unwrap_err();
    assert!(err.to_string().contains("function limit reached"));
}
