//! Queue client integration tests against a mock HTTP server.

use std::collections::BTreeMap;
use std::time::Duration;

use rust_decimal_macros::dec;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use backtest_worker::queue::{HttpQueueClient, QueueConfig, QueueError, RetryConfig, TaskQueue};
use backtest_worker::result::BacktestResult;
use backtest_worker::task::Task;

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        backoff_multiplier: 2.0,
        jitter: 0.0,
    }
}

fn client_for(server: &MockServer) -> HttpQueueClient {
    let config = QueueConfig::new(server.uri(), "worker_test").with_retry(fast_retry());
    HttpQueueClient::new(config).unwrap()
}

fn task_json() -> serde_json::Value {
    serde_json::json!({
        "task_id": "t-42",
        "symbol": "000858.SZ",
        "strategy_key": "turtle",
        "start_date": "20230101",
        "end_date": "20231231",
        "initial_cash": 500000
    })
}

fn sample_result() -> BacktestResult {
    let task = Task {
        task_id: "t-42".to_string(),
        symbol: "000858.SZ".to_string(),
        strategy_key: "turtle".to_string(),
        start_date: "20230101".to_string(),
        end_date: "20231231".to_string(),
        initial_cash: dec!(500000),
        strategy_params: BTreeMap::new(),
        preset_name: None,
    };
    let params = backtest_worker::params::resolve("turtle", None, &task.strategy_params).unwrap();
    let mut result = BacktestResult::no_data(&task.symbol, &task.strategy_key, params);
    result.task_id = Some(task.task_id);
    result
}

#[tokio::test]
async fn poll_returns_none_on_204() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/pending/poll"))
        .and(query_param("worker_id", "worker_test"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let task = client_for(&server).poll().await.unwrap();
    assert!(task.is_none());
}

#[tokio::test]
async fn poll_parses_single_object_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/pending/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json()))
        .mount(&server)
        .await;

    let task = client_for(&server).poll().await.unwrap().unwrap();
    assert_eq!(task.task_id, "t-42");
    assert_eq!(task.initial_cash, dec!(500000));
}

#[tokio::test]
async fn poll_takes_first_task_from_list_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/pending/poll"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([task_json()])),
        )
        .mount(&server)
        .await;

    let task = client_for(&server).poll().await.unwrap().unwrap();
    assert_eq!(task.task_id, "t-42");
}

#[tokio::test]
async fn poll_treats_null_body_as_no_task() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/pending/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    assert!(client_for(&server).poll().await.unwrap().is_none());
}

#[tokio::test]
async fn poll_retries_transient_errors_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/pending/poll"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/pending/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json()))
        .mount(&server)
        .await;

    let task = client_for(&server).poll().await.unwrap().unwrap();
    assert_eq!(task.task_id, "t-42");
}

#[tokio::test]
async fn poll_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/pending/poll"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = client_for(&server).poll().await.unwrap_err();
    assert!(matches!(err, QueueError::RetriesExhausted { attempts: 3 }));
}

#[tokio::test]
async fn poll_auth_failure_is_fatal_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/pending/poll"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).poll().await.unwrap_err();
    assert!(matches!(err, QueueError::Auth));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn bearer_token_is_sent_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/pending/poll"))
        .and(header("authorization", "Bearer sekrit"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = QueueConfig::new(server.uri(), "worker_test")
        .with_token("sekrit")
        .with_retry(fast_retry());
    let client = HttpQueueClient::new(config).unwrap();
    assert!(client.poll().await.unwrap().is_none());
}

#[tokio::test]
async fn claim_success_wins_the_race() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/t-42/claim"))
        .and(query_param("worker_id", "worker_test"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client_for(&server).claim("t-42").await.unwrap());
}

#[tokio::test]
async fn claim_conflict_is_a_lost_race_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/t-42/claim"))
        .respond_with(ResponseTemplate::new(409))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!client_for(&server).claim("t-42").await.unwrap());
}

#[tokio::test]
async fn claim_is_never_retried_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/t-42/claim"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).claim("t-42").await.unwrap_err();
    assert!(matches!(err, QueueError::Api { status: 500, .. }));
}

#[tokio::test]
async fn claim_auth_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/t-42/claim"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client_for(&server).claim("t-42").await.unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn report_posts_result_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/t-42/report"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .report("t-42", &sample_result())
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_result_goes_to_the_fail_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/t-42/fail"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut result = sample_result();
    result.status = backtest_worker::result::ResultStatus::Error;
    result.error_message = Some("strategy exploded".to_string());
    client_for(&server).report("t-42", &result).await.unwrap();
}

#[tokio::test]
async fn report_retries_until_the_queue_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/t-42/report"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tasks/t-42/report"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .report("t-42", &sample_result())
        .await
        .unwrap();
}

#[tokio::test]
async fn duplicate_report_is_accepted() {
    // The queue overwrites on duplicate delivery; from the client's side
    // both calls simply succeed.
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/t-42/report"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = sample_result();
    client.report("t-42", &result).await.unwrap();
    client.report("t-42", &result).await.unwrap();
}
