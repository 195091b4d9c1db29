//! Integration tests for `HyperTransport` and the full client using wiremock.

use std::time::Duration;

use assert2::{check, let_assert};
use bytes::Bytes;
use serde_json::{Value, json};
use tether::{
    ApiCall, Client, Error, HyperTransport, Method, Request, Transport, TransportConfig,
    filters::{LoggingFilter, TimeoutFilter},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_bytes, body_json, header, method, path, query_param},
};

#[tokio::test]
async fn test_transport_get() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/ping"))
        .and(header("X-Trace", "abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Served-By", "mock")
                .set_body_json(json!({"ok": true})),
        )
        .mount(&mock_server)
        .await;

    let transport = HyperTransport::new();
    let url = url::Url::parse(&format!("{}/api/ping", mock_server.uri())).expect("url");
    let request = Request::builder(Method::GET, url)
        .header("X-Trace", "abc")
        .build();

    let response = transport.send(request).await.expect("response");

    check!(response.status() == 200);
    check!(response.header("x-served-by") == Some("mock"));
    let body: Value = response.json().expect("json");
    check!(body == json!({"ok": true}));
}

#[tokio::test]
async fn test_client_ping() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/ping"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).expect("client");
    let outcome = client
        .invoke_json::<Value>(ApiCall::new("ping", "GET"), None)
        .await;

    check!(outcome.response().map(|meta| meta.status()) == Some(200));
    let_assert!(Ok(value) = outcome.into_result());
    check!(value == json!({"ok": true}));
}

#[tokio::test]
async fn test_client_post_json_with_key_and_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/todo/items"))
        .and(query_param("complete", "false"))
        .and(header("X-ZUMO-APPLICATION", "app-key"))
        .and(header("X-ZUMO-AUTH", "user-token"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"text": "milk"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1, "text": "milk"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::with_application_key(mock_server.uri(), "app-key")
        .expect("client")
        .with_filter(LoggingFilter::debug());
    client.set_current_user(Some(tether::User::new("Google:1").with_token("user-token")));

    let call = ApiCall::new("todo/items", "POST").parameter("complete", "false");
    let outcome = client
        .invoke_json::<Value>(call, Some(json!({"text": "milk"})))
        .await;

    check!(outcome.response().map(|meta| meta.status()) == Some(201));
    check!(outcome.value() == Some(&json!({"id": 1, "text": "milk"})));
}

#[tokio::test]
async fn test_client_raw_data() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/blobs"))
        .and(header("Content-Type", "application/octet-stream"))
        .and(body_bytes(b"\x00\x01\x02".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x03\x04".to_vec()))
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).expect("client");
    let call = ApiCall::new("blobs", "PUT").header("Content-Type", "application/octet-stream");
    let outcome = client
        .invoke_data(call, Some(Bytes::from_static(b"\x00\x01\x02")))
        .await;

    let_assert!(Ok(data) = outcome.into_result());
    check!(data.as_ref() == b"\x03\x04");
}

#[tokio::test]
async fn test_client_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "no such api"})))
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).expect("client");
    let outcome = client
        .invoke_json::<Value>(ApiCall::new("missing", "GET"), None)
        .await;

    check!(outcome.response().map(|meta| meta.status()) == Some(404));
    let_assert!(Some(Error::Http { status: 404, message, .. }) = outcome.error());
    check!(message == "no such api");
}

#[tokio::test]
async fn test_login_through_service() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login/facebook"))
        .and(body_json(json!({"access_token": "fb-token"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"userId": "Facebook:42"},
            "authenticationToken": "zumo-token"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("X-ZUMO-AUTH", "zumo-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "Facebook:42"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).expect("client");
    let user = client
        .login_with_token("facebook", json!({"access_token": "fb-token"}))
        .await
        .expect("login");
    check!(user.user_id() == "Facebook:42");

    let outcome = client
        .invoke_json::<Value>(ApiCall::new("me", "GET"), None)
        .await;
    check!(outcome.value() == Some(&json!({"id": "Facebook:42"})));
}

#[tokio::test]
async fn test_transport_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let client = Client::builder(mock_server.uri())
        .transport_config(
            TransportConfig::default()
                .with_timeout(Duration::from_millis(100))
                .with_connect_timeout(Duration::from_millis(100)),
        )
        .build()
        .expect("client");

    let outcome = client.invoke_data(ApiCall::new("slow", "GET"), None).await;

    check!(outcome.error().is_some_and(Error::is_timeout));
    check!(outcome.response().is_none());
}

#[tokio::test]
async fn test_timeout_filter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri())
        .expect("client")
        .with_filter(TimeoutFilter::new(Duration::from_millis(100)));

    let outcome = client.invoke_data(ApiCall::new("slow", "GET"), None).await;

    check!(outcome.error().is_some_and(Error::is_timeout));
}

#[tokio::test]
async fn test_tower_layer_under_chain() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(1)))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = Client::builder(mock_server.uri())
        .transport_layer(tower::limit::ConcurrencyLimitLayer::new(1))
        .build()
        .expect("client");

    let (a, b, c) = tokio::join!(
        client.invoke_json::<u8>(ApiCall::new("ping", "GET"), None),
        client.invoke_json::<u8>(ApiCall::new("ping", "GET"), None),
        client.invoke_json::<u8>(ApiCall::new("ping", "GET"), None),
    );

    for outcome in [a, b, c] {
        check!(outcome.value() == Some(&1));
    }
}

#[tokio::test]
async fn test_connection_refused() {
    let client = Client::new("http://127.0.0.1:1").expect("client");

    let outcome = client.invoke_data(ApiCall::new("ping", "GET"), None).await;

    let_assert!(Some(error) = outcome.error());
    check!(error.is_network());
}
