// Integration tests for notifications emitted by queries and mutations.
// Unit tests for the message selection are in src/notify/bridge.rs

use std::sync::Arc;
use std::time::Duration;

use querykit::ApiError;
use querykit::api::Api;
use querykit::auth::{AuthSession, MemoryStorage};
use querykit::config::ApiConfig;
use querykit::endpoint::{Endpoint, Registry};
use querykit::http::mock::MockTransport;
use querykit::http::{Method, RawResponse, RequestDescriptor};
use querykit::notify::{
    ErrorMessageMap, ExtraOptions, Notification, NotificationCenter, NotifierType,
};
use serde_json::{Value, json};

fn api(mock: &MockTransport, options: ExtraOptions, map: ErrorMessageMap) -> Api {
    let registry = Registry::builder()
        .endpoint(
            Endpoint::query("getIncidentsList", |_| RequestDescriptor::get("/all?fields=name"))
                .provides_tags(["GetIncidentsList"])
                .extra_options(options.clone()),
        )
        .endpoint(
            Endpoint::mutation("createIncident", |args| {
                RequestDescriptor::post("incidents", args.clone())
            })
            .invalidates_tags(["GetIncidentsList"])
            .extra_options(options),
        )
        .build()
        .expect("valid registry");
    Api::with_transport(
        ApiConfig::default(),
        registry,
        Arc::new(mock.clone()),
        AuthSession::new(Arc::new(MemoryStorage::new())),
        map,
    )
}

fn failing(mock: &MockTransport, body: Value) {
    mock.respond(
        Method::Get,
        "/all?fields=name",
        Err(ApiError::Http { status: 429, body }),
    );
}

async fn first_notification(api: &Api) -> Notification {
    let mut notifications = api.notifications();
    let mut list = api
        .query::<Value>("getIncidentsList", &())
        .expect("registered");
    list.settled().await.expect("settles");
    notifications.recv().await.expect("notified")
}

#[tokio::test]
async fn test_mapped_error_code_replaces_failure_text() {
    let mock = MockTransport::new();
    failing(&mock, json!({"error": {"message": "ERR_X"}}));
    let map: ErrorMessageMap = [("ERR_X", "Quota exceeded")].into_iter().collect();
    let api = api(&mock, ExtraOptions::notifier().with_failure("Failed to load"), map);

    assert_eq!(
        first_notification(&api).await,
        Notification {
            message: "Quota exceeded".to_string(),
            kind: NotifierType::Error,
        }
    );
}

#[tokio::test]
async fn test_unmapped_code_falls_back_to_details() {
    let mock = MockTransport::new();
    failing(
        &mock,
        json!({"error": {"message": "ERR_X", "details": ["bad field a", "bad field b"]}}),
    );
    let api = api(
        &mock,
        ExtraOptions::notifier().with_failure("Failed to load"),
        ErrorMessageMap::new(),
    );

    assert_eq!(first_notification(&api).await.message, "bad field a,bad field b");
}

#[tokio::test]
async fn test_custom_message_is_shown_verbatim() {
    let mock = MockTransport::new();
    failing(&mock, json!({"error": {"message": "ERR_X"}}));
    let map: ErrorMessageMap = [("ERR_X", "Quota exceeded")].into_iter().collect();
    let api = api(
        &mock,
        ExtraOptions::notifier()
            .with_failure("Failed to load")
            .with_custom_message(),
        map,
    );

    assert_eq!(first_notification(&api).await.message, "Failed to load");
}

#[tokio::test]
async fn test_mutation_success_notifies_with_custom_type() {
    let mock = MockTransport::new();
    mock.respond(Method::Post, "incidents", Ok(RawResponse::ok(json!({"id": 1}))));
    let options = ExtraOptions {
        success_notifier_type: Some(NotifierType::Info),
        ..ExtraOptions::notifier().with_success("Incident created")
    };
    let api = api(&mock, options, ErrorMessageMap::new());
    let mut notifications = api.notifications();

    api.mutation::<Value>("createIncident")
        .expect("registered")
        .trigger(&json!({"title": "disk full"}))
        .await
        .expect("created");

    assert_eq!(
        notifications.recv().await.expect("notified"),
        Notification {
            message: "Incident created".to_string(),
            kind: NotifierType::Info,
        }
    );
    assert_eq!(mock.calls()[0].body, Some(json!({"title": "disk full"})));
}

#[tokio::test]
async fn test_center_collects_emitted_notifications() {
    let mock = MockTransport::new();
    failing(&mock, json!({"error": {"message": "ERR_X"}}));
    let api = api(
        &mock,
        ExtraOptions::notifier().with_failure("Failed to load"),
        ErrorMessageMap::new(),
    );
    let center = NotificationCenter::new();
    let listener = center.attach(api.notifications());

    let mut list = api
        .query::<Value>("getIncidentsList", &())
        .expect("registered");
    list.settled().await.expect("settles");

    tokio::time::timeout(Duration::from_secs(1), async {
        while center.notices().is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("notice shown");

    let notices = center.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Failed to load");
    assert!(center.hide(&notices[0].id));
    listener.abort();
}
