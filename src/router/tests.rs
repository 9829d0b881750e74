use super::table::path_to_regex;
use super::*;
use crate::routes::{HandlerRequest, HandlerResponse, RouteEntry, RouteInfo};
use http::Method;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

const PETS: &str = r##"{
  "openapi": "3.0.0",
  "info": {"title": "Pets", "version": "1"},
  "paths": {
    "/pet": {"post": {
      "requestBody": {"required": true, "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}}},
      "responses": {"200": {"description": "ok", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}}}}
    }},
    "/pet/{petId}": {"get": {"responses": {"200": {"description": "ok"}}}}
  },
  "components": {"schemas": {
    "Pet": {"title": "Pet", "type": "object", "properties": {"name": {"type": "string"}, "born": {"type": "string", "format": "date"}}, "required": ["name"]}
  }}
}"##;

fn tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn echo_router(root: &Path) -> SpecRouter {
    let mut router = SpecRouter::new(root, Vec::new());
    router.default_route(
        Method::POST,
        RouteInfo::new().handler(|req| HandlerResponse::json(200, req.body.unwrap_or(json!(null)))),
    );
    router.default_route(
        Method::GET,
        RouteInfo::new().handler(|req| {
            HandlerResponse::json(200, json!({ "petId": req.get_path_param("petId") }))
        }),
    );
    router
}

#[test]
fn test_root_path() {
    let (re, params) = path_to_regex("/").unwrap();
    assert!(re.is_match("/"));
    assert!(!re.is_match("/pet"));
    assert!(params.is_empty());
}

#[test]
fn test_parameterized_path() {
    let (re, params) = path_to_regex("/items/{id}").unwrap();
    assert!(re.is_match("/items/123"));
    assert!(!re.is_match("/items/123/extra"));
    assert_eq!(params, vec!["id"]);
}

#[test]
fn test_nested_path() {
    let (re, params) = path_to_regex("/a/{b}/c").unwrap();
    assert!(re.is_match("/a/1/c"));
    assert_eq!(params, vec!["b"]);
}

#[test]
fn test_literal_segments_are_escaped() {
    let (re, _) = path_to_regex("/v1.0/items").unwrap();
    assert!(re.is_match("/v1.0/items"));
    assert!(!re.is_match("/v1x0/items"));
}

#[test]
fn test_route_table_dispatch() {
    let dir = tree(&[("pets.json", PETS)]);
    let table = echo_router(dir.path()).route_table().unwrap();
    assert_eq!(table.len(), 2);

    let ok = table.dispatch(HandlerRequest::new(Method::POST, "/pet").with_body(json!({"name": "Rex"})));
    assert_eq!(ok.status, 200);
    assert_eq!(ok.body, json!({"name": "Rex"}));

    let by_id = table.dispatch(HandlerRequest::new(Method::GET, "/pet/42?verbose=1"));
    assert_eq!(by_id.status, 200);
    assert_eq!(by_id.body, json!({"petId": "42"}));

    let missing = table.dispatch(HandlerRequest::new(Method::GET, "/owner"));
    assert_eq!(missing.status, 404);

    let wrong_method = table.dispatch(HandlerRequest::new(Method::DELETE, "/pet"));
    assert_eq!(wrong_method.status, 405);
    assert_eq!(wrong_method.get_header("allow"), Some("POST"));
}

#[test]
fn test_query_string_is_form_decoded() {
    let search = r#"{"openapi": "3.0.0", "paths": {"/search": {"get": {"responses": {"200": {"description": "ok"}}}}}}"#;
    let dir = tree(&[("search.json", search)]);
    let mut router = SpecRouter::new(dir.path(), Vec::new());
    router.get(
        "/search",
        RouteInfo::new().handler(|req| {
            HandlerResponse::json(200, json!({ "q": req.get_query_param("q"), "tag": req.get_query_param("tag") }))
        }),
    );
    let table = router.route_table().unwrap();

    let response = table.dispatch(HandlerRequest::new(Method::GET, "/search?q=a%20b+c&tag=%C3%A9t%C3%A9&flag"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"q": "a b c", "tag": "été"}));
}

#[test]
fn test_route_table_rejects_invalid_bodies() {
    let dir = tree(&[("pets.json", PETS)]);
    let table = echo_router(dir.path()).route_table().unwrap();

    let invalid = table.dispatch(HandlerRequest::new(Method::POST, "/pet").with_body(json!({"name": 5})));
    assert_eq!(invalid.status, 422);
    assert_eq!(invalid.body["model"], "Pet");
    assert!(!invalid.body["errors"].as_array().unwrap().is_empty());

    let absent = table.dispatch(HandlerRequest::new(Method::POST, "/pet"));
    assert_eq!(absent.status, 422);
}

#[test]
fn test_strict_table_forbids_unknown_fields() {
    let dir = tree(&[("pets.json", PETS)]);
    let lenient = echo_router(dir.path()).route_table().unwrap();
    let strict = echo_router(dir.path()).strict(true).route_table().unwrap();
    let body = json!({"name": "Rex", "color": "brown"});

    let response = lenient.dispatch(HandlerRequest::new(Method::POST, "/pet").with_body(body.clone()));
    assert_eq!(response.status, 200);
    let response = strict.dispatch(HandlerRequest::new(Method::POST, "/pet").with_body(body));
    assert_eq!(response.status, 422);

    let bad_date = json!({"name": "Rex", "born": "yesterday"});
    let response = strict.dispatch(HandlerRequest::new(Method::POST, "/pet").with_body(bad_date));
    assert_eq!(response.status, 422);
}

#[test]
fn test_assemble_registers_in_loader_order() {
    let other = r#"{"openapi": "3.0.0", "paths": {"/owner": {"post": {"responses": {}}}}}"#;
    let dir = tree(&[("b_pets.json", PETS), ("a_owner.json", other)]);
    let mut registered: Vec<RouteEntry> = Vec::new();
    let count = echo_router(dir.path()).assemble(&mut registered).unwrap();

    assert_eq!(count, 3);
    let routes: Vec<String> = registered
        .iter()
        .map(|e| format!("{} {}", e.method, e.path))
        .collect();
    assert_eq!(routes, vec!["POST /owner", "POST /pet", "GET /pet/{petId}"]);
}

struct Refusing {
    seen: usize,
}

impl RouteRegistrar for Refusing {
    fn register(&mut self, entry: &RouteEntry) -> anyhow::Result<()> {
        self.seen += 1;
        anyhow::bail!("framework refused {}", entry.path)
    }
}

#[test]
fn test_registrar_failure_stops_assembly() {
    let dir = tree(&[("pets.json", PETS)]);
    let mut registrar = Refusing { seen: 0 };
    let err = echo_router(dir.path()).assemble(&mut registrar).unwrap_err();
    assert_eq!(err.kind(), "RegistrationError");
    assert_eq!(registrar.seen, 1);
}

#[test]
fn test_resolution_failure_registers_nothing() {
    let dir = tree(&[("pets.json", PETS)]);
    let mut router = SpecRouter::new(dir.path(), Vec::new());
    router.default_route(Method::POST, RouteInfo::new().handler(|_| HandlerResponse::json(200, json!({}))));

    let mut registrar = Refusing { seen: 0 };
    let err = router.assemble(&mut registrar).unwrap_err();
    assert_eq!(err.kind(), "UnboundRouteError");
    assert_eq!(registrar.seen, 0);
}

#[test]
fn test_model_lookup() {
    let dir = tree(&[("pets.json", PETS)]);
    let mut router = SpecRouter::new(dir.path(), Vec::new());
    let response = router.response_model("/pet", &Method::POST).unwrap();
    assert_eq!(response.unwrap().name(), "Pet");
    let request = router.request_model("/pet", &Method::POST).unwrap();
    assert_eq!(request.unwrap().name(), "Pet");
    assert!(router.response_model("/pet/{petId}", &Method::GET).unwrap().is_none());
    assert!(router.response_model("/nowhere", &Method::GET).unwrap().is_none());
}
