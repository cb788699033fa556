#![allow(clippy::unwrap_used)]
// Integration tests for `RestClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use switchdeck_api::{Error, RestClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

const TOKEN: &str = "test-long-lived-token";

async fn setup() -> (MockServer, RestClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let token = SecretString::from(TOKEN.to_string());
    let client = RestClient::new(base_url, &token, &TransportConfig::default()).unwrap();
    (server, client)
}

// ── API status ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_check_api_sends_bearer_token() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "API running." })))
        .mount(&server)
        .await;

    assert_eq!(client.check_api().await.unwrap(), "API running.");
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/states"))
        .respond_with(ResponseTemplate::new(401).set_body_string("401: Unauthorized"))
        .mount(&server)
        .await;

    let result = client.get_states().await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

// ── States ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_states() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/states"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "entity_id": "switch.core_gi1_0_1",
                "state": "on",
                "attributes": { "Index": 1, "Name": "Gi1/0/1", "friendly_name": "Core Gi1/0/1" },
                "last_changed": "2026-03-01T10:00:00+00:00",
                "last_updated": "2026-03-01T10:00:00+00:00"
            },
            {
                "entity_id": "sun.sun",
                "state": "above_horizon",
                "attributes": {}
            }
        ])))
        .mount(&server)
        .await;

    let states = client.get_states().await.unwrap();
    assert_eq!(states.len(), 2);
    assert_eq!(states[0].entity_id, "switch.core_gi1_0_1");
    assert_eq!(states[0].attributes["Name"], "Gi1/0/1");
    assert_eq!(states[1].state, "above_horizon");
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/states"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy login</html>"))
        .mount(&server)
        .await;

    let result = client.get_states().await;
    match result {
        Err(Error::Deserialization { body, .. }) => assert!(body.contains("proxy login")),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

// ── Services ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_call_service_posts_entity_target() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/services/switch/turn_off"))
        .and(body_json(json!({ "entity_id": "switch.core_gi1_0_1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "entity_id": "switch.core_gi1_0_1", "state": "off", "attributes": {} }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let changed = client
        .call_service("switch", "turn_off", &json!({ "entity_id": "switch.core_gi1_0_1" }))
        .await
        .unwrap();
    assert_eq!(changed[0].state, "off");
}

#[tokio::test]
async fn test_call_service_error_status() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/services/snmp_switch_manager/set_port_description"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "message": "Invalid data" })))
        .mount(&server)
        .await;

    let result = client
        .call_service(
            "snmp_switch_manager",
            "set_port_description",
            &json!({ "entity_id": "switch.core_gi1_0_1", "description": "uplink" }),
        )
        .await;

    match result {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid data");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}
