//! Integration tests for the swagger builder

use aws_serverless_apigateway::{
    create_base_spec, register_routes, resolve_swagger_document, swagger_spec_from_routes,
    swagger_string, Integration, IntegrationType, Method, Route, SwaggerOperation, ANY_METHOD,
};
use aws_serverless_common::resources::LambdaFunction;
use aws_serverless_common::{
    derived_name, FunctionCode, InMemoryGraph, Output, Program, ProgramConfig, ResourceOptions,
};
use futures::executor::block_on;
use serde_json::Value;

const REGION: &str = "us-east-1";

fn code(name: &str) -> FunctionCode {
    FunctionCode::new(format!("./dist/{}.zip", name))
}

fn function_arn(name: &str) -> String {
    format!("arn:aws:lambda:{}:123456789012:function:{}", REGION, name)
}

#[test]
fn test_routes_become_lambda_proxy_operations() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));
    let routes = vec![
        Route::new(Method::Get, "/items", code("list")),
        Route::new(Method::Post, "/items", code("create")),
        Route::new(Method::Any, "/admin", code("admin")),
    ];

    let spec =
        swagger_spec_from_routes(&program, "shop", &routes, &ResourceOptions::default()).unwrap();
    let swagger = swagger_string(&spec);
    assert!(swagger.now().is_none(), "functions are not created yet");

    graph.materialize();
    let json: Value = serde_json::from_str(&swagger.now().unwrap().unwrap()).unwrap();

    assert_eq!(json["swagger"], "2.0");
    assert_eq!(json["info"]["title"], "shop");
    assert_eq!(json["info"]["version"], "1.0");
    assert_eq!(json["x-amazon-apigateway-binary-media-types"][0], "*/*");

    let integration = &json["paths"]["/items"]["post"]["x-amazon-apigateway-integration"];
    let function_name = derived_name("shop", "post:/items");
    assert_eq!(
        integration["uri"],
        format!(
            "arn:aws:apigateway:{}:lambda:path/2015-03-31/functions/{}/invocations",
            REGION,
            function_arn(&function_name)
        )
    );
    assert_eq!(integration["passthroughBehavior"], "when_no_match");
    assert_eq!(integration["httpMethod"], "POST");
    assert_eq!(integration["type"], "aws_proxy");
    assert!(integration.get("credentials").is_none());

    assert!(json["paths"]["/admin"].get(ANY_METHOD).is_some());
    assert_eq!(
        json["x-amazon-apigateway-gateway-responses"]["MISSING_AUTHENTICATION_TOKEN"]["statusCode"],
        404
    );
}

#[test]
fn test_registration_order_is_kept() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));
    let routes = vec![
        Route::new(Method::Get, "/zebra", code("z")),
        Route::new(Method::Put, "/apple", code("a1")),
        Route::new(Method::Get, "/apple", code("a2")),
    ];

    let spec =
        swagger_spec_from_routes(&program, "zoo", &routes, &ResourceOptions::default()).unwrap();
    let document = resolve_swagger_document(&spec);
    graph.materialize();
    let document = document.now().unwrap().unwrap();

    let paths: Vec<&str> = document.paths.keys().collect();
    assert_eq!(paths, vec!["/zebra", "/apple"]);
    let methods: Vec<&str> = document.paths.get("/apple").unwrap().keys().collect();
    assert_eq!(methods, vec!["put", "get"]);

    let json = swagger_string(&spec).now().unwrap().unwrap();
    assert!(json.find("/zebra").unwrap() < json.find("/apple").unwrap());
}

#[test]
fn test_resolution_order_does_not_change_document() {
    let build = |reversed: bool| {
        let graph = InMemoryGraph::new(REGION);
        let program = Program::new(&graph, ProgramConfig::new(REGION));
        let routes = vec![
            Route::new(Method::Get, "/one", code("one")),
            Route::new(Method::Delete, "/two", code("two")),
            Route::new(Method::Head, "/three", code("three")),
        ];
        let spec =
            swagger_spec_from_routes(&program, "api", &routes, &ResourceOptions::default())
                .unwrap();
        let swagger = swagger_string(&spec);
        if reversed {
            graph.materialize_reversed();
        } else {
            graph.materialize();
        }
        block_on(swagger.resolve()).unwrap()
    };

    assert_eq!(build(false), build(true));
}

#[test]
fn test_partial_resolution_stays_pending() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));
    let routes = vec![
        Route::new(Method::Get, "/first", code("first")),
        Route::new(Method::Get, "/second", code("second")),
    ];

    let spec =
        swagger_spec_from_routes(&program, "api", &routes, &ResourceOptions::default()).unwrap();
    let swagger = swagger_string(&spec);

    let first = graph
        .find(LambdaFunction::TYPE, &derived_name("api", "get:/first"))
        .unwrap();
    assert!(graph.materialize_resource(&first.urn));
    assert!(swagger.now().is_none());

    graph.materialize();
    assert!(swagger.now().unwrap().is_ok());
}

#[test]
fn test_later_route_replaces_earlier_one() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));
    let first = LambdaFunction::declare(&program, "first", ResourceOptions::default()).unwrap();
    let second = LambdaFunction::declare(&program, "second", ResourceOptions::default()).unwrap();

    let routes = vec![
        Route::new(Method::Get, "/dup", first),
        Route::new(Method::Get, "/dup", second.clone()),
    ];
    let spec =
        swagger_spec_from_routes(&program, "api", &routes, &ResourceOptions::default()).unwrap();

    assert_eq!(spec.paths.len(), 1);
    assert_eq!(spec.paths.get("/dup").unwrap().len(), 1);
    assert_eq!(spec.operation("/dup", "get").unwrap().lambda, Some(second));

    graph.materialize();
    let json: Value = serde_json::from_str(&swagger_string(&spec).now().unwrap().unwrap()).unwrap();
    let uri = json["paths"]["/dup"]["get"]["x-amazon-apigateway-integration"]["uri"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(uri.contains(&function_arn("second")));
}

#[test]
fn test_same_route_shares_one_function() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));
    let routes = vec![
        Route::new(Method::Get, "/same", code("v1")),
        Route::new(Method::Get, "/same", code("v2")),
    ];

    swagger_spec_from_routes(&program, "api", &routes, &ResourceOptions::default()).unwrap();
    assert_eq!(graph.resources_of_type(LambdaFunction::TYPE).len(), 1);
}

#[test]
fn test_register_routes_extends_existing_spec() {
    let graph = InMemoryGraph::new(REGION);
    let program = Program::new(&graph, ProgramConfig::new(REGION));
    let mut spec = create_base_spec("api");

    register_routes(
        &program,
        "api",
        &[Route::new(Method::Patch, "/items/{id}", code("patch"))],
        &mut spec,
        &ResourceOptions::default(),
    )
    .unwrap();

    assert!(spec.operation("/items/{id}", "patch").is_some());
}

#[test]
fn test_failed_integration_fails_document() {
    let mut spec = create_base_spec("broken");
    spec.paths.entry_or_default("/bad").insert(
        "get",
        SwaggerOperation {
            parameters: None,
            responses: None,
            integration: Integration {
                request_parameters: None,
                passthrough_behavior: None,
                http_method: "POST".to_string(),
                integration_type: IntegrationType::AwsProxy,
                responses: None,
                connection_type: None,
                uri: Output::failed("function creation failed"),
                credentials: None,
                connection_id: None,
            },
            lambda: None,
        },
    );

    let err = block_on(swagger_string(&spec).resolve()).unwrap_err();
    assert_eq!(err.message(), "function creation failed");
}

#[test]
fn test_unsupported_method_in_route_list() {
    let method = "trace".parse::<Method>();
    assert!(method.is_err());
    assert_eq!(method.unwrap_err().to_string(), "Method not supported: trace");
}
