//! Integration tests for the HTTP session client and the intake flow.
//!
//! Each test spins up an Axum mock session store on a random port and
//! exercises the real `GET`/`PATCH /anonymous-session` contract.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use intake_flow::api::{HttpSessionApi, SessionApi};
use intake_flow::config::RouteConfig;
use intake_flow::error::{ApiError, FlowError};
use intake_flow::intake::{Destination, IntakeFlow, StepId};
use intake_flow::session::{Gender, ProfilePatch, Religion, SessionEntity};
use intake_flow::store::{FlowStore, LibSqlBackend};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// In-memory stand-in for the remote session store.
#[derive(Clone, Default)]
struct MockStore {
    entity: Arc<Mutex<Option<Value>>>,
    cookies: Arc<Mutex<Vec<String>>>,
    fail_with_text: Arc<Mutex<bool>>,
}

impl MockStore {
    fn with_entity(entity: Value) -> Self {
        let store = Self::default();
        *store.entity.lock().unwrap() = Some(entity);
        store
    }

    fn record_cookie(&self, headers: &HeaderMap) {
        if let Some(cookie) = headers.get("cookie").and_then(|v| v.to_str().ok()) {
            self.cookies.lock().unwrap().push(cookie.to_string());
        }
    }
}

async fn get_session(State(store): State<MockStore>, headers: HeaderMap) -> impl IntoResponse {
    store.record_cookie(&headers);
    match store.entity.lock().unwrap().clone() {
        Some(entity) => (StatusCode::OK, Json(entity)),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Anonymous session not found" })),
        ),
    }
}

async fn patch_session(
    State(store): State<MockStore>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> axum::response::Response {
    store.record_cookie(&headers);

    if *store.fail_with_text.lock().unwrap() {
        return (StatusCode::SERVICE_UNAVAILABLE, "upstream down").into_response();
    }
    if let Some(code) = patch.get("postal_code").and_then(Value::as_str) {
        if code.len() < 6 {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": "Invalid Canadian postal code format" })),
            )
                .into_response();
        }
    }

    let mut guard = store.entity.lock().unwrap();
    let entity = guard.get_or_insert_with(|| json!({ "id": "7a7e2ee8-cfa7-4caa-8e4e-97d2e4332d84" }));
    if let (Some(target), Some(fields)) = (entity.as_object_mut(), patch.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    // Extra server-side keys must be tolerated by the client.
    entity["session_id"] = json!("abc123");
    (StatusCode::OK, Json(entity.clone())).into_response()
}

/// Start the mock store on a random port, return its base URL.
async fn start_server(store: MockStore) -> String {
    let app = Router::new()
        .route("/anonymous-session", get(get_session).patch(patch_session))
        .with_state(store);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

fn client(base_url: &str, cookie: Option<&str>) -> HttpSessionApi {
    HttpSessionApi::new(
        base_url,
        cookie.map(|c| SecretString::from(c.to_string())),
        Duration::from_secs(2),
    )
    .unwrap()
}

#[tokio::test]
async fn get_returns_entity_and_sends_cookie() {
    timeout(TEST_TIMEOUT, async {
        let store = MockStore::with_entity(json!({ "age": 27, "gender": "female" }));
        let base = start_server(store.clone()).await;
        let api = client(&base, Some("s3cr3t"));

        let entity = api.current().await.unwrap();
        assert_eq!(entity.age, Some(27));
        assert_eq!(entity.gender, Some(Gender::Female));
        assert_eq!(
            store.cookies.lock().unwrap().as_slice(),
            &["anonymous_session=s3cr3t".to_string()]
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn get_missing_session_is_not_found() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(MockStore::default()).await;
        let api = client(&base, None);

        assert!(matches!(api.current().await, Err(ApiError::NotFound)));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn patch_sends_only_given_fields() {
    timeout(TEST_TIMEOUT, async {
        let store = MockStore::with_entity(json!({ "age": 27, "religion": "sikh" }));
        let base = start_server(store.clone()).await;
        let api = client(&base, None);

        let updated = api
            .patch(&ProfilePatch {
                age: Some(31),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.age, Some(31));
        assert_eq!(updated.religion, Some(Religion::Sikh));
        assert!(updated.id.is_some());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn patch_error_carries_detail() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(MockStore::default()).await;
        let api = client(&base, None);

        let err = api
            .patch(&ProfilePatch {
                postal_code: Some("M5".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        match err {
            ApiError::Status { status, detail } => {
                assert_eq!(status, 422);
                assert_eq!(detail, "Invalid Canadian postal code format");
            }
            other => panic!("unexpected error {other:?}"),
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn patch_error_without_detail_falls_back_to_status() {
    timeout(TEST_TIMEOUT, async {
        let store = MockStore::default();
        *store.fail_with_text.lock().unwrap() = true;
        let base = start_server(store).await;
        let api = client(&base, None);

        let err = api
            .patch(&ProfilePatch {
                age: Some(40),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.detail(), "Error: 503");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unreachable_store_is_request_error() {
    timeout(TEST_TIMEOUT, async {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let api = client(&format!("http://127.0.0.1:{port}"), None);
        assert!(matches!(api.current().await, Err(ApiError::Request(_))));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn flow_end_to_end_over_http() {
    timeout(TEST_TIMEOUT, async {
        let remote = MockStore::default();
        let base = start_server(remote.clone()).await;
        let api: Arc<dyn SessionApi> = Arc::new(client(&base, Some("abc")));
        let store: Arc<dyn FlowStore> = Arc::new(LibSqlBackend::new_memory().await.unwrap());

        let flow = IntakeFlow::open("e2e", api, store, RouteConfig::default())
            .await
            .unwrap();
        flow.enter_landing().await.unwrap();
        assert_eq!(flow.start(), Destination::Step(StepId::Gender));

        let outcome = flow
            .submit(
                "gender",
                ProfilePatch {
                    gender: Some(Gender::NonBinary),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(outcome.written);

        let outcome = flow
            .submit(
                "religion",
                ProfilePatch {
                    religion: Some(Religion::NotApplicable),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.destination, Destination::Step(StepId::LgbtqPreference));

        // Rejected write: cache rolls back, history unchanged, user can retry.
        let err = flow
            .submit(
                "location",
                ProfilePatch {
                    postal_code: Some("M5".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Sync(_)));
        assert!(flow.entity().await.postal_code.is_none());
        assert_eq!(
            flow.history().await.steps(),
            &[StepId::Gender, StepId::Religion]
        );

        let outcome = flow
            .submit(
                "location",
                ProfilePatch {
                    postal_code: Some("M5A 4L1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.destination, Destination::Step(StepId::TherapyNeeds));

        let refreshed: SessionEntity = flow.refresh().await.unwrap();
        assert_eq!(refreshed.gender, Some(Gender::NonBinary));
        assert_eq!(refreshed.postal_code.as_deref(), Some("M5A 4L1"));
        assert!(
            remote
                .cookies
                .lock()
                .unwrap()
                .iter()
                .all(|c| c == "anonymous_session=abc")
        );
    })
    .await
    .expect("test timed out");
}
