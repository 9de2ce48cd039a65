//! End-to-end tests over the reqwest transport against a mock server.

use std::time::Duration;

use graphql_fetch::{
    CancellationToken, Executor, GraphQLRequest, RequestOptions, Response, execute,
};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn graphql_server(response: ResponseTemplate) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(response)
        .mount(&mock_server)
        .await;
    mock_server
}

fn executor_for(server: &MockServer) -> Executor {
    Executor::builder()
        .endpoint(format!("{}/graphql", server.uri()))
        .build()
        .expect("Failed to build executor")
}

#[tokio::test]
async fn test_post_query_and_variables() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "query": "query($id: ID!) { user(id: $id) { name } }",
            "variables": {"id": "7"}
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"user": {"name": "Ada"}}})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let response: Response<Value> = executor_for(&mock_server)
        .execute(
            GraphQLRequest::new("query($id: ID!) { user(id: $id) { name } }").variable("id", "7"),
            RequestOptions::new(),
        )
        .await;

    assert_eq!(response.error, None);
    assert_eq!(response.data, Some(json!({"name": "Ada"})));
}

#[tokio::test]
async fn test_graphql_errors() {
    let mock_server = graphql_server(
        ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{"message": "bad query", "locations": [{"line": 1, "column": 2}]}]
        })),
    )
    .await;

    let response: Response<Value> = executor_for(&mock_server)
        .execute(GraphQLRequest::new("{ nope }"), RequestOptions::new())
        .await;

    assert_eq!(response, Response { data: None, error: Some("bad query".into()) });
}

#[tokio::test]
async fn test_bad_request_with_graphql_errors() {
    let mock_server = graphql_server(
        ResponseTemplate::new(400)
            .set_body_json(json!({"errors": [{"message": "Syntax Error: Unexpected <EOF>."}]})),
    )
    .await;

    let response: Response<Value> = executor_for(&mock_server)
        .execute(GraphQLRequest::new("{ user"), RequestOptions::new())
        .await;

    assert_eq!(response.error.as_deref(), Some("Syntax Error: Unexpected <EOF>."));
}

#[tokio::test]
async fn test_non_graphql_error_status() {
    let mock_server = graphql_server(ResponseTemplate::new(502).set_body_string("Bad Gateway")).await;

    let response: Response<Value> = executor_for(&mock_server)
        .execute(GraphQLRequest::new("{ foo }"), RequestOptions::new())
        .await;

    assert_eq!(response.error.as_deref(), Some("HTTP 502: Bad Gateway"));
}

#[tokio::test]
async fn test_invalid_json_body() {
    let mock_server = graphql_server(ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;

    let response: Response<Value> = executor_for(&mock_server)
        .execute(GraphQLRequest::new("{ foo }"), RequestOptions::new())
        .await;

    assert!(response.error.unwrap().starts_with("JSON error"));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let mock_server = graphql_server(
        ResponseTemplate::new(200)
            .set_body_json(json!({"data": {"foo": 1}}))
            .set_delay(Duration::from_secs(5)),
    )
    .await;

    let response: Response<Value> = executor_for(&mock_server)
        .execute(
            GraphQLRequest::new("{ foo }"),
            RequestOptions::new().timeout(Duration::from_millis(200)),
        )
        .await;

    assert_eq!(response.error.as_deref(), Some("Request Timeout"));
}

#[tokio::test]
async fn test_cancel_in_flight_request() {
    let mock_server = graphql_server(
        ResponseTemplate::new(200)
            .set_body_json(json!({"data": {"foo": 1}}))
            .set_delay(Duration::from_secs(5)),
    )
    .await;

    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        })
    };

    let started = std::time::Instant::now();
    let response: Response<Value> = executor_for(&mock_server)
        .execute(
            GraphQLRequest::new("{ foo }"),
            RequestOptions::new().cancellation(token),
        )
        .await;
    canceller.await.unwrap();

    assert_eq!(response.error.as_deref(), Some("Request was aborted"));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_connection_refused() {
    // Bind and drop a listener to get a port nothing is listening on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let executor = Executor::builder()
        .endpoint(format!("http://127.0.0.1:{port}/graphql"))
        .build()
        .unwrap();

    let response: Response<Value> = executor
        .execute(GraphQLRequest::new("{ foo }"), RequestOptions::new())
        .await;

    assert_eq!(response.data, None);
    assert!(!response.error.unwrap().is_empty());
}

#[tokio::test]
async fn test_configured_and_per_call_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("x-client-name", "inventory"))
        .and(header("x-request-id", "abc-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"ok": true}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let executor = Executor::builder()
        .endpoint(format!("{}/graphql", mock_server.uri()))
        .header("X-Client-Name", "inventory")
        .build()
        .unwrap();

    let response: Response<bool> = executor
        .execute(
            GraphQLRequest::new("{ ok }"),
            RequestOptions::new().header("X-Request-Id", "abc-123"),
        )
        .await;

    assert_eq!(response.data, Some(true));
}

#[tokio::test]
async fn test_default_executor_with_endpoint_override() {
    let mock_server = graphql_server(
        ResponseTemplate::new(200).set_body_json(json!({"data": {"userCount": 12}})),
    )
    .await;

    let response = execute::<u64>(
        GraphQLRequest::new("{ userCount }"),
        RequestOptions::new().endpoint(format!("{}/graphql", mock_server.uri())),
    )
    .await;

    assert_eq!(response, Response { data: Some(12), error: None });
}
