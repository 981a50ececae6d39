// Integration tests for HttpExecutor against a real HTTP server.

use std::time::Duration;

use querykit::ApiError;
use querykit::http::{HttpExecutor, Method, RequestDescriptor, Transport};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn executor(server: &MockServer, timeout: Option<Duration>) -> HttpExecutor {
    HttpExecutor::new(&format!("{}/v3.1", server.uri()), timeout).expect("valid base url")
}

#[tokio::test]
async fn test_success_returns_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3.1/all"))
        .and(query_param("fields", "name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "Peru"}])))
        .expect(1)
        .mount(&server)
        .await;

    let response = executor(&server, None)
        .execute(&RequestDescriptor::get("/all?fields=name"))
        .await
        .expect("request succeeds");

    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!([{"name": "Peru"}]));
}

#[tokio::test]
async fn test_non_success_preserves_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3.1/incidents"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"error": {"message": "ERR_X"}})),
        )
        .mount(&server)
        .await;

    let err = executor(&server, None)
        .execute(&RequestDescriptor::get("incidents"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ApiError::Http {
            status: 429,
            body: json!({"error": {"message": "ERR_X"}}),
        }
    );
}

#[tokio::test]
async fn test_plain_text_and_empty_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3.1/text"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v3.1/incidents/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    let executor = executor(&server, None);

    let err = executor
        .execute(&RequestDescriptor::get("text"))
        .await
        .unwrap_err();
    assert_eq!(err.body(), Some(&Value::String("Bad Gateway".to_string())));

    let response = executor
        .execute(&RequestDescriptor::new(Method::Delete, "incidents/1"))
        .await
        .expect("delete succeeds");
    assert_eq!(response.status, 204);
    assert_eq!(response.body, Value::Null);
}

#[tokio::test]
async fn test_sends_json_body_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3.1/auth/refresh"))
        .and(header("authorization", "Bearer a1"))
        .and(body_json(json!({"refreshToken": "r1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let request = RequestDescriptor::post("auth/refresh", json!({"refreshToken": "r1"}))
        .with_header("Authorization", "Bearer a1");
    let response = executor(&server, None)
        .execute(&request)
        .await
        .expect("request matches");
    assert_eq!(response.body, json!({"data": {}}));
}

#[tokio::test]
async fn test_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3.1/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = executor(&server, Some(Duration::from_millis(100)))
        .execute(&RequestDescriptor::get("slow"))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::Timeout);
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // nothing listens on port 9 of the loopback interface
    let executor = HttpExecutor::new("http://127.0.0.1:9/", None).expect("valid base url");
    let err = executor
        .execute(&RequestDescriptor::get("anything"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}
