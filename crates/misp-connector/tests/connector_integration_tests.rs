//! Integration tests for the MISP connector using wiremock.
//!
//! These tests run every operation against a mock MISP server and check the
//! request shape, the response passthrough and the error normalization.

use misp_connector::testing::{assert_healthy, assert_unhealthy, test_config, TEST_API_KEY};
use misp_connector::{
    check_health, execute, Connector, ConnectorError, HostConfig, HostMacroStore, MacroStore,
    MacroStoreError, MispClient, MispConnector, OperationParams,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, body_string, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Test Helpers
// =============================================================================

fn params(value: Value) -> OperationParams {
    OperationParams::try_from(value).unwrap()
}

async fn run(
    server: &MockServer,
    operation: &str,
    value: Value,
) -> Result<Value, ConnectorError> {
    execute(&test_config(&server.uri()), operation, &params(value)).await
}

// =============================================================================
// Client Tests
// =============================================================================

#[tokio::test]
async fn test_requests_carry_auth_and_json_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tags"))
        .and(header("Authorization", TEST_API_KEY))
        .and(header("Accept", "application/json"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Tag": []})))
        .expect(1)
        .mount(&server)
        .await;

    let result = run(&server, "get_tags", json!({})).await.unwrap();
    assert_eq!(result, json!({"Tag": []}));
}

#[tokio::test]
async fn test_not_found_without_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events/999"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = MispClient::new(&test_config(&server.uri())).unwrap();
    let err = client.get("events/999").await.unwrap_err();
    assert_eq!(err.to_string(), "Not Found");
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_unmapped_status_uses_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/users"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "name": "You do not have permission to use this functionality."
        })))
        .mount(&server)
        .await;

    let err = run(&server, "get_users", json!({})).await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert!(err
        .to_string()
        .contains("You do not have permission to use this functionality."));
}

#[tokio::test]
async fn test_unauthorized_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organisations"))
        .respond_with(ResponseTemplate::new(401).set_body_string("denied"))
        .mount(&server)
        .await;

    let err = run(&server, "get_organisations", json!({})).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unauthorized: Invalid credentials provided failed to authorize"
    );
}

#[tokio::test]
async fn test_json_without_json_content_type_is_decoded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organisations"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"[{"Organisation": {"id": "1", "name": "CIRCL"}}]"#)
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let result = run(&server, "get_organisations", json!({})).await.unwrap();
    assert_eq!(result[0]["Organisation"]["name"], json!("CIRCL"));
}

#[tokio::test]
async fn test_non_json_success_body_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organisations"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = run(&server, "get_organisations", json!({})).await.unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_read_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tags"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = test_config(&server.uri()).with_timeouts(2, 1);
    let client = MispClient::new(&config).unwrap();
    let err = client.get("tags").await.unwrap_err();
    assert!(matches!(err, ConnectorError::ReadTimeout), "got {:?}", err);
    assert_eq!(
        err.to_string(),
        "The server did not send any data in the allotted amount of time"
    );
}

#[tokio::test]
async fn test_connection_refused() {
    let client = MispClient::new(&test_config("http://127.0.0.1:1")).unwrap();
    let err = client.get("events").await.unwrap_err();
    assert!(matches!(err, ConnectorError::ConnectionFailed), "got {:?}", err);
    assert_eq!(err.to_string(), "Invalid endpoint or credentials");
}

#[tokio::test]
async fn test_connect_timeout() {
    // TEST-NET-1 is never routed; the SYN is dropped or rejected at once.
    let config = test_config("http://192.0.2.1:81").with_timeouts(1, 5);
    let client = MispClient::new(&config).unwrap();

    let started = Instant::now();
    let err = client.get("events").await.unwrap_err();

    if started.elapsed() >= Duration::from_secs(1) {
        assert!(matches!(err, ConnectorError::ConnectTimeout), "got {:?}", err);
        assert_eq!(
            err.to_string(),
            "The request timed out while trying to connect to the server"
        );
    } else {
        // No route at all in this sandbox.
        assert!(matches!(err, ConnectorError::ConnectionFailed), "got {:?}", err);
    }
}

#[tokio::test]
async fn test_https_to_plain_http_port_is_tls_error() {
    let server = MockServer::start().await;
    let https_uri = server.uri().replacen("http://", "https://", 1);

    let client = MispClient::new(&test_config(&https_uri)).unwrap();
    let err = client.get("events").await.unwrap_err();
    assert!(matches!(err, ConnectorError::Tls), "got {:?}", err);
    assert_eq!(err.to_string(), "SSL certificate validation failed");
}

// =============================================================================
// Event Tests
// =============================================================================

#[tokio::test]
async fn test_create_event_shapes_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/events"))
        .and(body_json(json!({
            "date": "2024-01-15",
            "threat_level_id": "1",
            "info": "Phishing campaign targeting finance",
            "analysis": "0",
            "distribution": "0",
            "published": false,
            "org_id": "2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Event": {"id": "17", "info": "Phishing campaign targeting finance"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = run(
        &server,
        "create_event",
        json!({
            "date": "2024-01-15T10:00:00Z",
            "threat_level": "High",
            "event_info": "Phishing campaign targeting finance",
            "analysis": "Initial",
            "distribution": "Your Organisation Only",
            "published": false,
            "extends_uuid": "",
            "additional_attributes": {"org_id": "2"}
        }),
    )
    .await
    .unwrap();

    assert_eq!(result["Event"]["id"], json!("17"));
}

#[tokio::test]
async fn test_create_event_with_extends_uuid() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/events"))
        .and(body_json(json!({
            "info": "Follow-up",
            "threat_level_id": "2",
            "extends_uuid": "5f1c2a9e-0000-4000-8000-000000000001"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Event": {"id": "18"}})))
        .expect(1)
        .mount(&server)
        .await;

    run(
        &server,
        "create_event",
        json!({
            "event_info": "Follow-up",
            "threat_level": "medium",
            "extends_uuid": "5f1c2a9e-0000-4000-8000-000000000001"
        }),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_create_event_unknown_label_fails_before_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let err = run(
        &server,
        "create_event",
        json!({"event_info": "x", "threat_level": "Severe"}),
    )
    .await
    .unwrap_err();

    let msg = err.to_string();
    assert!(msg.starts_with("Error while creating event in MISP. Error as follows: "));
    assert!(msg.contains("Severe"));
}

#[tokio::test]
async fn test_get_events_passes_search_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/events/index"))
        .and(body_json(json!({"eventinfo": "ransomware", "limit": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "1"}])))
        .expect(1)
        .mount(&server)
        .await;

    let result = run(
        &server,
        "get_events",
        json!({"searchJSONBody": {"eventinfo": "ransomware", "limit": 5}}),
    )
    .await
    .unwrap();
    assert_eq!(result, json!([{"id": "1"}]));
}

#[tokio::test]
async fn test_get_event() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Event": {"id": "42"}})))
        .mount(&server)
        .await;

    let result = run(&server, "get_event", json!({"event_id": 42})).await.unwrap();
    assert_eq!(result["Event"]["id"], json!("42"));
}

#[tokio::test]
async fn test_get_event_not_found_is_wrapped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = run(&server, "get_event", json!({"event_id": "404"}))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error while getting event from MISP. Error as follows: Not Found"
    );
}

#[tokio::test]
async fn test_delete_event_uses_delete_method() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/events/delete/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"saved": true, "message": "Event deleted."})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = run(&server, "delete_event", json!({"event_id": "7"})).await.unwrap();
    assert_eq!(result["message"], json!("Event deleted."));
}

#[tokio::test]
async fn test_event_id_cannot_escape_its_endpoint() {
    let server = MockServer::start().await;

    Mock::given(path("/admin/users/delete/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": "user"})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"^/events/delete/[^/]+$"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = run(
        &server,
        "delete_event",
        json!({"event_id": "../../admin/users/delete/5"}),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_dot_segment_event_id_rejected() {
    let server = MockServer::start().await;
    let err = run(&server, "get_event", json!({"event_id": ".."}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), None);
    assert!(err.to_string().contains("Value .. of event_id parameter is invalid."));
}

// =============================================================================
// Attribute Tests
// =============================================================================

#[tokio::test]
async fn test_add_attribute_to_event() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/attributes/add/42"))
        .and(body_json(json!({
            "value": "198.51.100.7",
            "type": "ip-dst",
            "category": "Network activity",
            "distribution": "5",
            "to_ids": false
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"Attribute": {"id": "900"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = run(
        &server,
        "add_attributes_to_event",
        json!({
            "event_id": "42",
            "value": "198.51.100.7",
            "type": "ip-dst",
            "category": "Network activity",
            "distribution": "Inherit Event",
            "to_ids": false,
            "comment": ""
        }),
    )
    .await
    .unwrap();
    assert_eq!(result["Attribute"]["id"], json!("900"));
}

#[tokio::test]
async fn test_delete_attribute_posts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/attributes/delete/900"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Attribute deleted."})),
        )
        .expect(1)
        .mount(&server)
        .await;

    run(&server, "delete_attribute", json!({"attribute_id": "900"}))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_attribute_requires_id() {
    let server = MockServer::start().await;
    let err = run(&server, "delete_attribute", json!({})).await.unwrap_err();
    assert!(err.to_string().contains("Missing required parameter: attribute_id"));
}

// =============================================================================
// Tag Tests
// =============================================================================

#[tokio::test]
async fn test_add_tag_to_event_saved() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/events/addTag"))
        .and(body_json(json!({"request": {"Event": {"id": "42", "tag": "tlp:amber"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "saved": true,
            "success": "Tag added.",
            "check_publish": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = run(
        &server,
        "add_tag_to_event",
        json!({"event_id": "42", "tag": "tlp:amber"}),
    )
    .await
    .unwrap();
    assert_eq!(result["success"], json!("Tag added."));
}

#[tokio::test]
async fn test_add_tag_to_event_not_saved() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/events/addTag"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"saved": false, "errors": "dup"})),
        )
        .mount(&server)
        .await;

    let err = run(
        &server,
        "add_tag_to_event",
        json!({"event_id": "42", "tag": "tlp:amber"}),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("dup"));
}

#[tokio::test]
async fn test_remove_tag_from_event() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/events/removeTag"))
        .and(body_json(json!({"request": {"Event": {"id": "42", "tag": "7"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"saved": true})))
        .expect(1)
        .mount(&server)
        .await;

    run(
        &server,
        "remove_tag_from_event",
        json!({"event_id": "42", "tag": "7"}),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_add_tag_filters_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tags/add"))
        .and(body_json(json!({
            "name": "campaign:winter-storm",
            "exportable": true,
            "hide_tag": false,
            "colour": "#ff0000"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Tag": {"id": "55"}})))
        .expect(1)
        .mount(&server)
        .await;

    let result = run(
        &server,
        "add_tag",
        json!({
            "name": "campaign:winter-storm",
            "exportable": true,
            "hide_tag": false,
            "org_id": null,
            "user_id": "",
            "colour": "#ff0000"
        }),
    )
    .await
    .unwrap();
    assert_eq!(result["Tag"]["id"], json!("55"));
}

// =============================================================================
// Search Tests
// =============================================================================

#[tokio::test]
async fn test_run_search_basic_events() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/events/restSearch"))
        .and(body_json(json!({
            "page": 1,
            "limit": 10,
            "from": "2024-01-01",
            "to": "2024-01-31"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": []})))
        .expect(1)
        .mount(&server)
        .await;

    run(
        &server,
        "run_search",
        json!({
            "controller": "Events",
            "search_type": "Basic",
            "from": "2024-01-01",
            "to": "2024-01-31"
        }),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_run_search_advanced_attributes() {
    let server = MockServer::start().await;
    let filter = json!({"value": "evil.example", "type": "domain", "includeEventTags": true});

    Mock::given(method("POST"))
        .and(path("/attributes/restSearch"))
        .and(body_json(filter.clone()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"response": {"Attribute": []}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    run(
        &server,
        "run_search",
        json!({
            "controller": "Attributes",
            "search_type": "Advanced",
            "search_filter": filter
        }),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_run_search_rejects_negative_page() {
    let server = MockServer::start().await;

    let err = run(
        &server,
        "run_search",
        json!({"controller": "Events", "search_type": "Basic", "page": -2}),
    )
    .await
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error while searching Events/Attributes in MISP. \
         Error as follows: Value -2 of page parameter is invalid."
    );
}

// =============================================================================
// Generic Call Tests
// =============================================================================

#[tokio::test]
async fn test_generic_rest_api_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sightings/add"))
        .and(query_param("format", "json"))
        .and(body_string(r#"{"value":"198.51.100.7"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Sighting": {"id": "3"}})))
        .expect(1)
        .mount(&server)
        .await;

    let result = run(
        &server,
        "generic_rest_api_call",
        json!({
            "method": "post",
            "endpoint": "sightings/add",
            "query_params": {"format": "json"},
            "payload": r#"{"value":"198.51.100.7"}"#
        }),
    )
    .await
    .unwrap();
    assert_eq!(result["Sighting"]["id"], json!("3"));
}

#[tokio::test]
async fn test_generic_rest_api_call_with_object_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/attributes/restSearch"))
        .and(body_json(json!({"value": "198.51.100.7", "limit": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": []})))
        .expect(1)
        .mount(&server)
        .await;

    let result = run(
        &server,
        "generic_rest_api_call",
        json!({
            "method": "post",
            "endpoint": "attributes/restSearch",
            "payload": {"value": "198.51.100.7", "limit": 5}
        }),
    )
    .await
    .unwrap();
    assert_eq!(result, json!({"response": []}));
}

#[tokio::test]
async fn test_generic_rest_api_call_requires_method() {
    let server = MockServer::start().await;
    let err = run(&server, "generic_rest_api_call", json!({"endpoint": "/events"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::Validation(_)));
}

// =============================================================================
// Host Macro Store Tests
// =============================================================================

fn host_store(server: &MockServer) -> HostMacroStore {
    HostMacroStore::new(&HostConfig::new(server.uri()).with_token("host-token")).unwrap()
}

#[tokio::test]
async fn test_host_store_find_reads_first_member() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/wf/api/dynamic-variable/"))
        .and(query_param("name", "MISP_Event_Id"))
        .and(header("Authorization", "Bearer host-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hydra:member": [{"id": 31, "name": "MISP_Event_Id", "value": "42"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = host_store(&server).find("MISP_Event_Id").await.unwrap();
    assert_eq!(id.as_deref(), Some("31"));
}

#[tokio::test]
async fn test_host_store_find_missing_and_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("name", "Absent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hydra:member": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("name", "Broken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    let store = host_store(&server);
    assert_eq!(store.find("Absent").await.unwrap(), None);
    assert!(matches!(
        store.find("Broken").await,
        Err(MacroStoreError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_host_store_delete() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/wf/api/dynamic-variable/31/"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/wf/api/dynamic-variable/99/"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;

    let store = host_store(&server);
    store.delete("31").await.unwrap();
    let err = store.delete("99").await.unwrap_err();
    assert_eq!(err.to_string(), "Macro store request failed: HTTP 404: missing");
}

#[tokio::test]
async fn test_lifecycle_hook_clears_host_variables() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("name", "MISP_Event_Id"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"hydra:member": [{"id": "7"}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("name", "MISP_Tag"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hydra:member": []})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/wf/api/dynamic-variable/7/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config("https://misp.example.com")
        .with_macro_cleanup(vec!["MISP_Event_Id".to_string(), "MISP_Tag".to_string()]);
    let connector = MispConnector::new(config)
        .unwrap()
        .with_macro_store(Arc::new(host_store(&server)));

    let report = connector.on_deactivate().await;
    assert_eq!(report.deleted, vec!["MISP_Event_Id".to_string()]);
    assert_eq!(report.missing, vec!["MISP_Tag".to_string()]);
    assert!(report.failed.is_empty());
}

// =============================================================================
// Dispatch & Health Tests
// =============================================================================

#[tokio::test]
async fn test_unknown_operation() {
    let server = MockServer::start().await;
    let err = run(&server, "purge_everything", json!({})).await.unwrap_err();
    assert_eq!(err.to_string(), "Unknown operation: purge_everything");
}

#[tokio::test]
async fn test_health_check_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "1"}])))
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    assert!(check_health(&config).await.is_ok());

    let connector = MispConnector::new(config).unwrap();
    assert_healthy(&connector.health_check().await);
    assert!(connector.test_connection().await.unwrap());
}

#[tokio::test]
async fn test_health_check_empty_response_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let err = check_health(&config).await.unwrap_err();
    assert!(matches!(err, ConnectorError::HealthCheck(_)));
    assert!(err.to_string().starts_with("Error connecting to MISP"));

    let connector = MispConnector::new(config).unwrap();
    assert_unhealthy(&connector.health_check().await);
}

#[tokio::test]
async fn test_health_check_auth_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = check_health(&test_config(&server.uri())).await.unwrap_err();
    assert!(err.to_string().contains("Unauthorized"));
}
