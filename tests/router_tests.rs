#![allow(clippy::unwrap_used, clippy::expect_used)]

use http::Method;
use serde_json::json;
use specrouter::error::{CompileError, SchemaError};
use specrouter::routes::{HandlerRequest, HandlerResponse, HandlerSource, RouteEntry, RouteInfo};
use specrouter::validator::DataProductStandardsValidator;
use specrouter::{RouterConfig, SpecRouter};
use std::path::PathBuf;
use std::sync::Arc;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn tagged(tag: &'static str) -> RouteInfo {
    RouteInfo::new().handler(move |_req| HandlerResponse::json(200, json!({ "handler": tag })))
}

fn handler_tag(entry: &RouteEntry) -> String {
    let response = entry.call(HandlerRequest::new(entry.method.clone(), entry.path.clone()));
    response.body["handler"].as_str().unwrap_or_default().to_string()
}

fn defaults_router(root: PathBuf) -> SpecRouter {
    let mut router = SpecRouter::new(root, Vec::new());
    router
        .default_route(Method::POST, tagged("post-default"))
        .default_route(Method::GET, tagged("get-default"));
    router
}

#[test]
fn test_every_route_resolves_to_method_default() {
    let entries = defaults_router(fixture("valid")).resolve().unwrap();

    let routes: Vec<String> = entries
        .iter()
        .map(|e| format!("{} {}", e.method, e.path))
        .collect();
    assert_eq!(
        routes,
        vec![
            "POST /pet",
            "GET /pet/{petId}",
            "POST /store/order",
            "GET /user",
            "POST /user",
        ]
    );
    for entry in &entries {
        assert_eq!(entry.handler_source, HandlerSource::MethodDefault);
        let expected = if entry.method == Method::POST { "post-default" } else { "get-default" };
        assert_eq!(handler_tag(entry), expected);
    }
}

#[test]
fn test_duplicate_post_pet_across_documents() {
    let err = defaults_router(fixture("duplicate")).resolve().unwrap_err();
    match err {
        CompileError::DuplicateRoute {
            path,
            method,
            first,
            second,
        } => {
            assert_eq!(path, "/pet");
            assert_eq!(method, Method::POST);
            assert!(first.ends_with("a.json"));
            assert!(second.ends_with("b.json"));
        }
        other => panic!("expected DuplicateRoute, got {other}"),
    }
}

#[test]
fn test_reference_cycle_fails_with_circular_reference() {
    let err = defaults_router(fixture("cyclic")).resolve().unwrap_err();
    assert_eq!(err.kind(), "CircularReferenceError");
    match err {
        CompileError::Schema {
            error: SchemaError::CircularReference { chain },
            ..
        } => {
            assert!(chain.len() >= 3, "{chain:?}");
            assert_eq!(chain.first(), chain.last());
            assert!(chain.iter().any(|c| c == "A"));
            assert!(chain.iter().any(|c| c == "B"));
        }
        other => panic!("expected a circular reference, got {other}"),
    }
}

#[test]
fn test_compiling_twice_is_identical() {
    let first = defaults_router(fixture("valid")).resolve().unwrap();
    let second = defaults_router(fixture("valid")).resolve().unwrap();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!((&a.path, &a.method, &a.name), (&b.path, &b.method, &b.name));
        assert_eq!(
            a.request_model.as_ref().map(|m| m.json_schema(false)),
            b.request_model.as_ref().map(|m| m.json_schema(false))
        );
        assert_eq!(
            a.response_model.as_ref().map(|m| m.json_schema(false)),
            b.response_model.as_ref().map(|m| m.json_schema(false))
        );
    }
}

#[test]
fn test_override_wins_only_for_its_route() {
    let mut router = defaults_router(fixture("valid"));
    router.post("/pet", tagged("pet-override"));
    let entries = router.resolve().unwrap();

    for entry in entries.iter().filter(|e| e.method == Method::POST) {
        if entry.path == "/pet" {
            assert_eq!(entry.handler_source, HandlerSource::Override);
            assert_eq!(handler_tag(entry), "pet-override");
        } else {
            assert_eq!(handler_tag(entry), "post-default");
        }
    }
}

#[test]
fn test_all_of_merges_required_and_optional_fields() {
    let mut router = SpecRouter::new(fixture("valid"), Vec::new());
    let order = router
        .response_model("/store/order", &Method::POST)
        .unwrap()
        .unwrap();

    assert_eq!(order.name(), "Order");
    let definition = order.definition();
    assert!(definition.field("a").unwrap().required);
    assert!(!definition.field("b").unwrap().required);

    let validator = order.validator(false).unwrap();
    assert!(validator.is_valid(&json!({"a": "x"})));
    assert!(validator.is_valid(&json!({"a": "x", "b": "y"})));
    assert!(!validator.is_valid(&json!({"b": "y"})));
}

#[test]
fn test_route_metadata_and_models() {
    let entries = defaults_router(fixture("valid")).resolve().unwrap();

    let create = &entries[0];
    assert_eq!(create.name, "post_pet");
    assert_eq!(create.summary, "Add a pet");
    assert_eq!(create.tags, vec!["pets"]);
    assert_eq!(create.response_description, "The stored pet");
    assert_eq!(create.request_model.as_ref().unwrap().name(), "Pet");
    assert!(create.request_required);

    let by_id = &entries[1];
    assert_eq!(by_id.name, "get_pet_by_pet_id");
    assert_eq!(by_id.operation_id.as_deref(), Some("getPetById"));
    assert_eq!(by_id.parameters[0].name, "petId");
    assert_eq!(by_id.responses[&404].description, "Pet not found");

    let place_order = &entries[2];
    assert_eq!(place_order.response_status, 201);

    let list_users = &entries[3];
    let response = list_users.response_model.as_ref().unwrap();
    assert_eq!(response.name(), "GetUserResponse");
    let schema = response.json_schema(false);
    assert!(schema["$defs"].get("UserAccount").is_some(), "{schema}");
}

#[test]
fn test_unbound_route_without_stubs() {
    let mut router = SpecRouter::new(fixture("valid"), Vec::new());
    router.default_route(Method::POST, tagged("post-default"));
    let err = router.resolve().unwrap_err();
    assert_eq!(err.kind(), "UnboundRouteError");

    let mut stubbed = SpecRouter::new(fixture("valid"), Vec::new()).allow_stubs(true);
    stubbed.default_route(Method::POST, tagged("post-default"));
    let entries = stubbed.resolve().unwrap();
    let get = entries.iter().find(|e| e.method == Method::GET).unwrap();
    assert_eq!(get.handler_source, HandlerSource::Stub);
    let response = get.call(HandlerRequest::new(Method::GET, "/user"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({}));
}

#[test]
fn test_custom_validator_blocks_construction() {
    let mut router = SpecRouter::new(
        fixture("valid"),
        vec![Arc::new(DataProductStandardsValidator)],
    )
    .allow_stubs(true);
    let err = router.resolve().unwrap_err();
    match err {
        CompileError::Validation {
            validator, error, ..
        } => {
            assert_eq!(validator, "DataProductStandards");
            assert_eq!(error.kind, "OnlyOneEndpointAllowed");
        }
        other => panic!("expected a validation failure, got {other}"),
    }
}

#[test]
fn test_data_product_tree_serves_validated_requests() {
    let config = RouterConfig {
        specs_path: fixture("data_product"),
        validators: vec!["DataProductStandards".to_string()],
        strict_validation: true,
        ..RouterConfig::default()
    };
    let mut router = SpecRouter::from_config(&config).unwrap();
    router.post(
        "/Company/BasicInfo",
        RouteInfo::new().handler(|req| {
            let id = req.body.as_ref().and_then(|b| b["companyId"].as_str()).unwrap_or_default().to_string();
            HandlerResponse::json(200, json!({"name": "Digital Living", "companyId": id}))
        }),
    );
    let table = router.route_table().unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.entries().next().unwrap().name, "post_company_basic_info");

    let ok = table.dispatch(
        HandlerRequest::new(Method::POST, "/Company/BasicInfo")
            .with_header("Authorization", "Bearer token")
            .with_body(json!({"companyId": "2464491-9"})),
    );
    assert_eq!(ok.status, 200);
    assert_eq!(ok.body["companyId"], "2464491-9");

    let rejected = table.dispatch(
        HandlerRequest::new(Method::POST, "/Company/BasicInfo").with_body(json!({"companyId": 7})),
    );
    assert_eq!(rejected.status, 422);
}

#[test]
fn test_from_config_rejects_unknown_validator() {
    let config = RouterConfig {
        specs_path: fixture("valid"),
        validators: vec!["Nope".to_string()],
        ..RouterConfig::default()
    };
    let err = SpecRouter::from_config(&config).unwrap_err();
    assert!(err.to_string().contains("'Nope'"), "{err}");
}

#[test]
fn test_missing_root_is_a_load_error() {
    let err = defaults_router(fixture("does-not-exist")).resolve().unwrap_err();
    assert_eq!(err.kind(), "LoadError");
}
