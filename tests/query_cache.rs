// Integration tests for queries, mutations and the shared cache.
// Unit tests for the store itself are in src/cache/store.rs

use std::sync::Arc;
use std::time::Duration;

use querykit::api::{Api, MutationState};
use querykit::auth::{AuthSession, MemoryStorage};
use querykit::cache::{CacheKey, EntryStatus};
use querykit::config::ApiConfig;
use querykit::endpoint::{Endpoint, Registry, incidents};
use querykit::http::mock::MockTransport;
use querykit::http::{Method, RawResponse};
use querykit::notify::{ErrorMessageMap, ExtraOptions, Notification, NotifierType};
use serde_json::{Value, json};
use tokio::time::timeout;

const LIST_URL: &str = "/all?fields=name";

fn registry_with(options: ExtraOptions) -> Registry {
    let endpoints = incidents::endpoints().into_iter().map(|endpoint| {
        if endpoint.name() == incidents::GET_INCIDENTS_LIST {
            endpoint.extra_options(options.clone())
        } else {
            endpoint
        }
    });
    Registry::builder()
        .tag_types([incidents::INCIDENTS_LIST_TAG])
        .inject(endpoints, false)
        .build()
        .expect("valid registry")
}

fn api(mock: &MockTransport, registry: Registry) -> Api {
    Api::with_transport(
        ApiConfig::default(),
        registry,
        Arc::new(mock.clone()),
        AuthSession::new(Arc::new(MemoryStorage::with_tokens("access", "refresh"))),
        ErrorMessageMap::new(),
    )
}

#[tokio::test]
async fn test_incidents_list_loaded_notification() {
    let mock = MockTransport::new();
    mock.respond(Method::Get, LIST_URL, Ok(RawResponse::ok(json!([{"name": "x"}]))));
    let api = api(&mock, registry_with(ExtraOptions::notifier().with_success("Loaded")));
    let mut notifications = api.notifications();

    let mut list = api
        .query::<Value>(incidents::GET_INCIDENTS_LIST, &())
        .expect("registered");
    let result = list.settled().await.expect("settles");
    assert!(result.is_success());

    let key = CacheKey::new(incidents::GET_INCIDENTS_LIST, &()).expect("key");
    let entry = api.store().entry(&key).expect("entry exists");
    assert_eq!(entry.status, EntryStatus::Fulfilled);

    assert_eq!(
        notifications.recv().await.expect("one notification"),
        Notification {
            message: "Loaded".to_string(),
            kind: NotifierType::Success,
        }
    );
    assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_no_notification_when_notifier_disabled() {
    let mock = MockTransport::new();
    mock.respond(
        Method::Get,
        LIST_URL,
        Err(querykit::ApiError::Http {
            status: 500,
            body: json!({"error": {"message": "ERR_X"}}),
        }),
    );
    let options = ExtraOptions {
        show_notifier: false,
        ..ExtraOptions::default().with_failure("Failed to load")
    };
    let api = api(&mock, registry_with(options));
    let mut notifications = api.notifications();

    let mut list = api
        .query::<Value>(incidents::GET_INCIDENTS_LIST, &())
        .expect("registered");
    let result = list.settled().await.expect("settles");
    assert_eq!(result.error().and_then(querykit::ApiError::status), Some(500));
    assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_concurrent_queries_make_one_call() {
    let mock = MockTransport::new().with_latency(Duration::from_millis(50));
    mock.respond(Method::Get, LIST_URL, Ok(RawResponse::ok(json!([]))));
    let api = api(&mock, registry_with(ExtraOptions::default()));

    let mut a = api
        .query::<Vec<Value>>(incidents::GET_INCIDENTS_LIST, &())
        .expect("registered");
    let mut b = api
        .query::<Vec<Value>>(incidents::GET_INCIDENTS_LIST, &())
        .expect("registered");
    let (a, b) = tokio::join!(a.settled(), b.settled());

    assert!(a.expect("a settles").is_success());
    assert!(b.expect("b settles").is_success());
    assert_eq!(mock.call_count(LIST_URL), 1);
}

#[tokio::test]
async fn test_mutation_refetches_active_queries_once() {
    let mock = MockTransport::new();
    mock.respond_once(Method::Get, LIST_URL, Ok(RawResponse::ok(json!(["open"]))));
    mock.respond(Method::Get, LIST_URL, Ok(RawResponse::ok(json!(["resolved"]))));
    mock.respond(
        Method::Patch,
        "incidents/inc-1",
        Ok(RawResponse::ok(json!({"id": "inc-1", "status": "resolved"}))),
    );
    let api = api(&mock, registry_with(ExtraOptions::default()));

    let mut list = api
        .query::<Vec<String>>(incidents::GET_INCIDENTS_LIST, &())
        .expect("registered");
    let first = list.settled().await.expect("settles");
    assert_eq!(first.data(), Some(&vec!["open".to_string()]));

    let update = api
        .mutation::<Value>(incidents::UPDATE_INCIDENT_STATUS)
        .expect("registered");
    assert!(update.state().is_idle());
    update
        .trigger(&json!({"id": "inc-1", "status": "resolved"}))
        .await
        .expect("mutation succeeds");
    assert!(matches!(update.state().state, MutationState::Success(_)));

    let refreshed = list.settled().await.expect("refetched");
    assert_eq!(refreshed.data(), Some(&vec!["resolved".to_string()]));

    // no further refetch follows
    assert!(timeout(Duration::from_millis(50), list.settled()).await.is_err());
    assert_eq!(mock.call_count(LIST_URL), 2);
}

#[tokio::test]
async fn test_failed_mutation_does_not_invalidate() {
    let mock = MockTransport::new();
    mock.respond(Method::Get, LIST_URL, Ok(RawResponse::ok(json!([]))));
    mock.respond(
        Method::Patch,
        "incidents/inc-1",
        Err(querykit::ApiError::Http {
            status: 422,
            body: json!({"error": {"details": ["status is invalid"]}}),
        }),
    );
    let api = api(&mock, registry_with(ExtraOptions::default()));

    let mut list = api
        .query::<Value>(incidents::GET_INCIDENTS_LIST, &())
        .expect("registered");
    list.settled().await.expect("settles");

    let update = api
        .mutation::<Value>(incidents::UPDATE_INCIDENT_STATUS)
        .expect("registered");
    let err = update
        .trigger(&json!({"id": "inc-1", "status": "bogus"}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(update.state().is_error());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(mock.call_count(LIST_URL), 1);
}

#[tokio::test]
async fn test_invalidating_unknown_tag_is_noop() {
    let mock = MockTransport::new();
    mock.respond(Method::Get, LIST_URL, Ok(RawResponse::ok(json!([]))));
    let api = api(&mock, registry_with(ExtraOptions::default()));

    let mut list = api
        .query::<Value>(incidents::GET_INCIDENTS_LIST, &())
        .expect("registered");
    list.settled().await.expect("settles");

    assert_eq!(api.invalidate(["SomethingElse"]), 0);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(mock.call_count(LIST_URL), 1);
}

#[tokio::test]
async fn test_transform_applies_to_cached_data() {
    let mock = MockTransport::new();
    mock.respond(
        Method::Get,
        "countries",
        Ok(RawResponse::ok(json!({"data": [{"name": "Peru"}], "total": 1}))),
    );
    let registry = Registry::builder()
        .endpoint(
            Endpoint::query("getCountries", |_| "countries".into())
                .provides_tags(["Countries"])
                .transform_response(|body| body["data"].clone()),
        )
        .build()
        .expect("valid registry");
    let api = api(&mock, registry);

    let mut countries = api.query::<Vec<Value>>("getCountries", &()).expect("registered");
    let result = countries.settled().await.expect("settles");
    assert_eq!(result.data(), Some(&vec![json!({"name": "Peru"})]));
}

#[tokio::test]
async fn test_different_args_use_different_entries() {
    let mock = MockTransport::new();
    mock.respond(Method::Get, "incidents/1", Ok(RawResponse::ok(json!({"id": 1}))));
    mock.respond(Method::Get, "incidents/2", Ok(RawResponse::ok(json!({"id": 2}))));
    let registry = Registry::builder()
        .endpoint(Endpoint::query("getIncident", |args| {
            format!("incidents/{}", args["id"]).into()
        }))
        .build()
        .expect("valid registry");
    let api = api(&mock, registry);

    let mut one = api
        .query::<Value>("getIncident", &json!({"id": 1}))
        .expect("registered");
    let mut two = api
        .query::<Value>("getIncident", &json!({"id": 2}))
        .expect("registered");
    let (one, two) = tokio::join!(one.settled(), two.settled());

    assert_eq!(one.expect("settles").data(), Some(&json!({"id": 1})));
    assert_eq!(two.expect("settles").data(), Some(&json!({"id": 2})));
    assert_eq!(api.store().len(), 2);
}
