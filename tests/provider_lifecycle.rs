//! Provider lifecycle against a mock Unikraft Cloud API.

mod common;

use common::{MockApi, Reply, TOKEN};
use serde_json::{json, Value};
use unikraft_cloud_provider::testing::{
    assert_error_summary, assert_state_matches_schema, ProviderTester,
};
use unikraft_cloud_provider::{ProviderError, ProviderService, UnikraftCloudProvider};

const VOLUME: &str = "unikraft-cloud_volume";
const INSTANCE: &str = "unikraft-cloud_instance";
const INSTANCES: &str = "unikraft-cloud_instances";

fn volume(uuid: &str, size_mb: i64) -> Value {
    json!({
        "status": "success",
        "uuid": uuid,
        "name": "data",
        "created_at": "2026-10-01T12:00:00Z",
        "state": "available",
        "size_mb": size_mb,
        "persistent": true,
        "attached_to": []
    })
}

#[tokio::test]
async fn test_create_then_read_volume() {
    let api = MockApi::start().await;
    api.route(
        "POST",
        "/volumes",
        Reply::ok("volumes", json!([{"status": "success", "uuid": "vol-1", "name": "data"}])),
    )
    .route("GET", "/volumes/vol-1", Reply::ok("volumes", json!([volume("vol-1", 16)])));

    let tester = ProviderTester::new(api.provider());
    let state = tester
        .lifecycle_create(VOLUME, json!({"name": "data", "size_mb": 16}))
        .await
        .unwrap();

    assert_eq!(state["uuid"], "vol-1");
    assert_eq!(state["size_mb"], 16);
    assert_eq!(state["state"], "available");
    assert!(state["attached_to"].is_null());
    assert_state_matches_schema(&tester.resource_schema(VOLUME).unwrap(), &state);

    let requests = api.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].json(), json!({"name": "data", "size_mb": 16}));
    assert!(requests[1..].iter().all(|r| r.path == "/volumes/vol-1"));
}

#[tokio::test]
async fn test_every_request_carries_the_token() {
    let api = MockApi::start().await;
    api.route("GET", "/volumes/vol-1", Reply::ok("volumes", json!([volume("vol-1", 16)])))
        .route("DELETE", "/volumes/vol-1", Reply::ok("volumes", json!([{"uuid": "vol-1"}])));

    let provider = api.provider();
    provider.read(VOLUME, json!({"uuid": "vol-1"})).await.unwrap();
    provider.delete(VOLUME, json!({"uuid": "vol-1"})).await.unwrap();

    let requests = api.requests();
    assert_eq!(requests.len(), 2);
    let expected = format!("Bearer {}", TOKEN);
    assert!(requests
        .iter()
        .all(|r| r.authorization.as_deref() == Some(expected.as_str())));
}

#[tokio::test]
async fn test_configure_against_mock() {
    let api = MockApi::start().await;
    api.route("GET", "/volumes/vol-1", Reply::ok("volumes", json!([volume("vol-1", 16)])));

    let provider = UnikraftCloudProvider::new().with_env(common::no_env);
    let diagnostics = provider
        .configure(json!({"metro": api.url(), "token": "configured-token"}))
        .await
        .unwrap();
    assert!(diagnostics.is_empty());

    let state = provider.read(VOLUME, json!({"uuid": "vol-1"})).await.unwrap();
    assert_eq!(state["uuid"], "vol-1");
    assert_eq!(
        api.requests()[0].authorization.as_deref(),
        Some("Bearer configured-token")
    );
}

#[tokio::test]
async fn test_read_of_deleted_volume_is_null() {
    let api = MockApi::start().await;
    api.route("GET", "/volumes/vol-gone", Reply::not_found());

    let state = api
        .provider()
        .read(VOLUME, json!({"uuid": "vol-gone", "size_mb": 16}))
        .await
        .unwrap();
    assert!(state.is_null());
}

#[tokio::test]
async fn test_delete_of_deleted_volume_succeeds() {
    let api = MockApi::start().await;
    api.route("DELETE", "/volumes/vol-gone", Reply::not_found());

    api.provider()
        .delete(VOLUME, json!({"uuid": "vol-gone"}))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_api_failure_is_a_client_error() {
    let api = MockApi::start().await;
    api.route("GET", "/volumes/vol-1", Reply::error(500, "database unavailable"));

    let err = api
        .provider()
        .read(VOLUME, json!({"uuid": "vol-1"}))
        .await
        .unwrap_err();
    assert_error_summary(&err, "Client Error");
    let detail = err.to_diagnostic().detail.unwrap();
    assert!(detail.starts_with("Unable to read volume, got error:"), "{}", detail);
    assert!(detail.contains("database unavailable"), "{}", detail);
}

#[tokio::test]
async fn test_item_level_failure_is_a_client_error() {
    let api = MockApi::start().await;
    api.route(
        "POST",
        "/volumes",
        Reply::json(
            200,
            json!({
                "status": "partial_success",
                "data": {"volumes": [{"status": "error", "message": "quota exceeded", "error": 7}]}
            }),
        ),
    );

    let err = api
        .provider()
        .create(VOLUME, json!({"size_mb": 1_000_000}))
        .await
        .unwrap_err();
    assert_error_summary(&err, "Client Error");
    assert!(err.message().contains("quota exceeded"));
}

#[tokio::test]
async fn test_create_without_uuid_is_an_api_error() {
    let api = MockApi::start().await;
    api.route("POST", "/volumes", Reply::ok("volumes", json!([])));

    let err = api
        .provider()
        .create(VOLUME, json!({"size_mb": 16}))
        .await
        .unwrap_err();
    assert_error_summary(&err, "API Error");
}

#[tokio::test]
async fn test_create_keeps_uuid_when_read_back_fails() {
    let api = MockApi::start().await;
    api.route(
        "POST",
        "/volumes",
        Reply::ok("volumes", json!([{"status": "success", "uuid": "vol-1", "name": "data"}])),
    )
    .route("GET", "/volumes/vol-1", Reply::error(500, "internal error"))
    .route("GET", "/volumes/vol-1", Reply::ok("volumes", json!([volume("vol-1", 16)])));

    let provider = api.provider();
    let state = provider
        .create(VOLUME, json!({"name": "data", "size_mb": 16}))
        .await
        .unwrap();

    assert_eq!(state["uuid"], "vol-1");
    assert_eq!(state["name"], "data");
    assert_eq!(state["size_mb"], 16);
    assert!(state["state"].is_null());

    // A later refresh fills in what the API reports.
    let refreshed = provider.read(VOLUME, state).await.unwrap();
    assert_eq!(refreshed["uuid"], "vol-1");
    assert_eq!(refreshed["state"], "available");

    let methods: Vec<_> = api.requests().iter().map(|r| r.method.clone()).collect();
    assert_eq!(methods, ["POST", "GET", "GET"]);
}

#[tokio::test]
async fn test_update_is_rejected() {
    let api = MockApi::start().await;
    let err = api
        .provider()
        .update(VOLUME, json!({"uuid": "vol-1"}), json!({"uuid": "vol-1"}))
        .await
        .unwrap_err();
    assert_error_summary(&err, "Update Not Supported");
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_resize_replaces_the_volume() {
    let api = MockApi::start().await;
    api.route("GET", "/volumes/vol-1", Reply::ok("volumes", json!([volume("vol-1", 16)])))
        .route("DELETE", "/volumes/vol-1", Reply::ok("volumes", json!([{"uuid": "vol-1"}])))
        .route(
            "POST",
            "/volumes",
            Reply::ok("volumes", json!([{"status": "success", "uuid": "vol-2"}])),
        )
        .route("GET", "/volumes/vol-2", Reply::ok("volumes", json!([volume("vol-2", 32)])));

    let tester = ProviderTester::new(api.provider());
    let prior = tester
        .read(VOLUME, json!({"uuid": "vol-1", "name": "data", "size_mb": 16}))
        .await
        .unwrap();

    let mut proposed = prior.clone();
    proposed["size_mb"] = json!(32);
    let state = tester
        .lifecycle_apply_change(VOLUME, prior, proposed)
        .await
        .unwrap();

    assert_eq!(state["uuid"], "vol-2");
    assert_eq!(state["size_mb"], 32);

    let calls: Vec<(String, String)> = api
        .requests()
        .into_iter()
        .map(|r| (r.method, r.path))
        .collect();
    let position = |method: &str, path: &str| {
        calls
            .iter()
            .position(|(m, p)| m == method && p == path)
            .unwrap()
    };
    assert!(position("DELETE", "/volumes/vol-1") < position("POST", "/volumes"));
}

#[tokio::test]
async fn test_import_by_uuid() {
    let api = MockApi::start().await;
    api.route("GET", "/volumes/vol-1", Reply::ok("volumes", json!([volume("vol-1", 16)])))
        .route("GET", "/volumes/vol-gone", Reply::not_found());

    let tester = ProviderTester::new(api.provider());
    let state = tester.lifecycle_import(VOLUME, "vol-1").await.unwrap();
    assert_eq!(state["uuid"], "vol-1");
    assert_eq!(state["size_mb"], 16);
    assert!(state["template"].is_null());

    let err = tester.import_resource(VOLUME, "vol-gone").await.unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(_)));
}

#[tokio::test]
async fn test_volume_data_source_by_name() {
    let api = MockApi::start().await;
    api.route("GET", "/volumes", Reply::ok("volumes", json!([volume("vol-1", 16)])));

    let state = api
        .provider()
        .read_data_source(VOLUME, json!({"name": "data"}))
        .await
        .unwrap();
    assert_eq!(state["uuid"], "vol-1");
    assert_eq!(state["name"], "data");
    assert_eq!(state["size_mb"], 16);

    assert_eq!(api.requests()[0].json(), json!([{"name": "data"}]));
}

#[tokio::test]
async fn test_data_source_without_selector() {
    let api = MockApi::start().await;
    let err = api
        .provider()
        .read_data_source(VOLUME, json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Validation(_)));
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_instances_data_source_filters_by_state() {
    let api = MockApi::start().await;
    api.route(
        "GET",
        "/instances",
        Reply::ok(
            "instances",
            json!([{"uuid": "i-1", "name": "web"}, {"uuid": "i-2", "name": "db"}]),
        ),
    )
    .route(
        "GET",
        "/instances",
        Reply::ok(
            "instances",
            json!([
                {"uuid": "i-1", "name": "web", "state": "running", "image": "nginx:latest",
                 "fqdn": "web.fra0.kraft.host", "private_ip": "10.0.0.2"},
                {"uuid": "i-2", "name": "db", "state": "stopped", "image": "postgres:16"}
            ]),
        ),
    );

    let state = api
        .provider()
        .read_data_source(INSTANCES, json!({"state": "running"}))
        .await
        .unwrap();
    assert_eq!(state["uuids"], json!(["i-1"]));
    assert_eq!(state["instances"][0]["fqdn"], "web.fra0.kraft.host");
    assert_eq!(state["instances"].as_array().unwrap().len(), 1);

    let requests = api.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].json(), json!([{"uuid": "i-1"}, {"uuid": "i-2"}]));
}

#[tokio::test]
async fn test_instance_read_of_missing_instance_is_null() {
    let api = MockApi::start().await;
    api.route("GET", "/instances/i-gone", Reply::not_found());

    let state = api
        .provider()
        .read(INSTANCE, json!({"uuid": "i-gone", "image": "nginx:latest"}))
        .await
        .unwrap();
    assert_eq!(state, Value::Null);
}
