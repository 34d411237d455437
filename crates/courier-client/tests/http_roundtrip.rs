//! End-to-end tests: orchestrator + `ReqwestTransport` against a local
//! mockito server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use courier_client::{
    LaneRegistry, Method, Orchestrator, RequestError, RequestSpec, ReqwestTransport, ResponseType,
    RetryPolicy, TransportError, TypedSchema,
};
use mockito::Matcher;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
struct NewUser {
    #[validate(length(min = 1, max = 64))]
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    nickname: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, PartialEq)]
struct User {
    id: u64,
    name: String,
}

fn orchestrator() -> Orchestrator {
    Orchestrator::new(
        Arc::new(ReqwestTransport::new()),
        Arc::new(LaneRegistry::with_default_delay(Duration::ZERO)),
    )
}

// ---------------------------------------------------------------------------
// Test: validated POST with extra body and typed output
// ---------------------------------------------------------------------------

#[tokio::test]
async fn post_sends_validated_body_and_decodes_output() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/users")
        .match_header("content-type", "application/json")
        .match_header("accept", "application/json")
        .match_body(Matcher::Json(json!({"name": "x", "source": "import"})))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 7, "name": "x"}"#)
        .create_async()
        .await;

    let spec = RequestSpec::new(Method::POST, "/users")
        .base_url(server.url())
        .data(json!({"name": "x", "nickname": null}))
        .remove_nulls(true)
        .data_schema(TypedSchema::<NewUser>::new())
        .extra_body(json!({"source": "import"}))
        .output_schema(TypedSchema::<User>::new());

    let user: User = orchestrator().execute_as(&spec).await.unwrap();

    assert_eq!(
        user,
        User {
            id: 7,
            name: "x".into()
        }
    );
    mock.assert_async().await;
}

// ---------------------------------------------------------------------------
// Test: params become the query string
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_encodes_params_as_query() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "rust lang".into()),
            Matcher::UrlEncoded("page".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"hits": []}"#)
        .create_async()
        .await;

    let spec = RequestSpec::new(Method::GET, "search")
        .base_url(format!("{}/", server.url()))
        .params(json!({"q": "rust lang"}))
        .extra_params(json!({"page": 2}));

    let out = orchestrator().execute(&spec).await.unwrap();

    assert_eq!(out, json!({"hits": []}));
    mock.assert_async().await;
}

// ---------------------------------------------------------------------------
// Test: non-2xx responses
// ---------------------------------------------------------------------------

#[tokio::test]
async fn error_status_carries_decoded_body_to_handler() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/users/9")
        .with_status(404)
        .with_body(r#"{"error": "not found"}"#)
        .create_async()
        .await;

    let spec = RequestSpec::new(Method::GET, "/users/9")
        .base_url(server.url())
        .error_handler(|e| match e {
            TransportError::Status { status: 404, body } => Ok(json!({"missing": body["error"]})),
            other => Err(other),
        });

    let out = orchestrator().execute(&spec).await.unwrap();

    assert_eq!(out, json!({"missing": "not found"}));
}

#[tokio::test]
async fn retry_gives_up_after_four_attempts() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/flaky")
        .with_status(503)
        .expect(4)
        .create_async()
        .await;

    let spec = RequestSpec::new(Method::GET, "/flaky")
        .base_url(server.url())
        .retry_policy(RetryPolicy {
            retries: 3,
            base_delay: Duration::from_millis(1),
        });

    let result = orchestrator().execute(&spec).await;

    assert_matches!(
        result,
        Err(RequestError::Transport(TransportError::Status { status: 503, .. }))
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn post_is_not_retried_on_server_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/orders")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let spec = RequestSpec::new(Method::POST, "/orders")
        .base_url(server.url())
        .data(json!({"sku": "a"}))
        .retry(true);

    assert!(orchestrator().execute(&spec).await.is_err());
    mock.assert_async().await;
}

// ---------------------------------------------------------------------------
// Test: response decoding modes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn text_response_type_skips_json_parsing() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/raw")
        .with_status(200)
        .with_body(r#"{"a":1}"#)
        .create_async()
        .await;

    let spec = RequestSpec::new(Method::GET, "/raw")
        .base_url(server.url())
        .response_type(ResponseType::Text);

    let out = orchestrator().execute(&spec).await.unwrap();

    assert_eq!(out, Value::String(r#"{"a":1}"#.into()));
}

#[tokio::test]
async fn empty_json_response_is_null() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", "/users/1")
        .with_status(204)
        .create_async()
        .await;

    let spec = RequestSpec::new(Method::DELETE, "/users/1").base_url(server.url());

    assert_eq!(orchestrator().execute(&spec).await.unwrap(), Value::Null);
}

// ---------------------------------------------------------------------------
// Test: queued requests are throttled
// ---------------------------------------------------------------------------

/// Two concurrent calls on the same key are serialized with the lane delay
/// between them.
#[tokio::test]
async fn queued_requests_share_a_lane() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rate-limited")
        .with_status(200)
        .with_body("{}")
        .expect(2)
        .create_async()
        .await;

    let orchestrator = orchestrator();
    let spec = RequestSpec::new(Method::GET, "/rate-limited")
        .base_url(server.url())
        .queue("partner-api", Some(Duration::from_millis(60)));

    let started = Instant::now();
    let (first, second) = tokio::join!(orchestrator.execute(&spec), orchestrator.execute(&spec));

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert!(started.elapsed() >= Duration::from_millis(60));
    assert_eq!(orchestrator.lanes().len(), 1);
    mock.assert_async().await;
}
