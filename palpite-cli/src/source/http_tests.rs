//! Testes do cliente contra um servidor HTTP simulado.
//!
//! O cliente é bloqueante: é criado e usado em `spawn_blocking`, fora da
//! thread do runtime.

use super::*;
use palpite_db::db::{count_draws, migrate};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(contest: u32) -> Value {
    let first = contest % 50 + 1;
    let dezenas: Vec<String> = (0..6).map(|i| format!("{:02}", first + i * 2)).collect();
    json!({
        "loteria": "megasena",
        "concurso": contest,
        "data": format!("{:02}/03/2024", contest % 28 + 1),
        "dezenas": dezenas,
    })
}

fn history(last: u32) -> Value {
    Value::Array((1..=last).map(record).collect())
}

fn client_for(uri: String) -> ResultsClient {
    let config = AppConfig {
        api_base_url: uri,
        timeout_secs: 5,
        ..AppConfig::default()
    };
    ResultsClient::new(&config).unwrap()
}

fn memory_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    migrate(&conn).unwrap();
    conn
}

async fn mount_history(server: &MockServer, body: Value, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/megasena"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_latest(server: &MockServer, contest: u32) {
    Mock::given(method("GET"))
        .and(path("/megasena/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record(contest)))
        .mount(server)
        .await;
}

/// Roda o sync numa thread bloqueante e devolve a base para as verificações.
async fn run_sync(server: &MockServer, conn: Connection, force: bool) -> (Connection, SyncOutcome) {
    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let client = client_for(uri);
        let outcome = sync_lottery(&conn, &client, Lottery::MegaSena, force).unwrap();
        (conn, outcome)
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_fetch_all_success() {
    let server = MockServer::start().await;
    mount_history(&server, history(3), 1).await;

    let uri = server.uri();
    let draws = tokio::task::spawn_blocking(move || client_for(uri).fetch_all(Lottery::MegaSena))
        .await
        .unwrap()
        .unwrap();

    let contests: Vec<u32> = draws.iter().map(|d| d.contest).collect();
    assert_eq!(contests, vec![3, 2, 1]);
    assert_eq!(draws[2].numbers, vec![2, 4, 6, 8, 10, 12]);
}

#[tokio::test]
async fn test_fetch_all_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/megasena"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let uri = server.uri();
    let (result, fallback) = tokio::task::spawn_blocking(move || {
        let client = client_for(uri);
        let result = client.fetch_all(Lottery::MegaSena);
        let fallback = load_draws(&client, Lottery::MegaSena);
        (result, fallback)
    })
    .await
    .unwrap();

    match result {
        Err(SourceError::Status { status, url }) => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/megasena"));
        }
        other => panic!("esperado SourceError::Status, obtido {:?}", other.map(|d| d.len())),
    }
    assert_eq!(fallback.1, Origin::Mock);
}

#[tokio::test]
async fn test_fetch_latest() {
    let server = MockServer::start().await;
    mount_latest(&server, 42).await;

    let uri = server.uri();
    let draw = tokio::task::spawn_blocking(move || client_for(uri).fetch_latest(Lottery::MegaSena))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(draw.contest, 42);
    assert_eq!(draw.numbers.len(), 6);
}

#[tokio::test]
async fn test_malformed_record_is_skipped() {
    let server = MockServer::start().await;
    let mut body = history(3);
    body.as_array_mut().unwrap().push(json!({
        "concurso": 4, "data": "05/03/2024", "dezenas": null
    }));
    mount_history(&server, body, 1).await;

    let (conn, outcome) = run_sync(&server, memory_db(), true).await;
    assert_eq!(outcome.origin, Origin::Live);
    assert_eq!(outcome.received, 3);
    assert_eq!(count_draws(&conn, Lottery::MegaSena).unwrap(), 3);
}

#[tokio::test]
async fn test_sync_persists_live_history() {
    let server = MockServer::start().await;
    mount_history(&server, history(5), 1).await;

    let (conn, outcome) = run_sync(&server, memory_db(), false).await;
    assert_eq!(outcome.origin, Origin::Live);
    assert_eq!(outcome.received, 5);
    assert_eq!(outcome.inserted, 5);
    assert_eq!(count_draws(&conn, Lottery::MegaSena).unwrap(), 5);
    assert!(last_sync(&conn, Lottery::MegaSena).unwrap().is_some());
}

#[tokio::test]
async fn test_sync_skips_download_when_up_to_date() {
    let seed = MockServer::start().await;
    mount_history(&seed, history(5), 1).await;
    let (conn, _) = run_sync(&seed, memory_db(), false).await;

    let server = MockServer::start().await;
    mount_latest(&server, 5).await;
    mount_history(&server, history(5), 0).await;

    let (conn, outcome) = run_sync(&server, conn, false).await;
    assert_eq!(outcome.origin, Origin::Live);
    assert_eq!(outcome.inserted, 0);
    assert_eq!(count_draws(&conn, Lottery::MegaSena).unwrap(), 5);
}

#[tokio::test]
async fn test_forced_sync_downloads_history() {
    let seed = MockServer::start().await;
    mount_history(&seed, history(5), 1).await;
    let (conn, _) = run_sync(&seed, memory_db(), false).await;

    let server = MockServer::start().await;
    mount_latest(&server, 5).await;
    mount_history(&server, history(6), 1).await;

    let (conn, outcome) = run_sync(&server, conn, true).await;
    assert_eq!(outcome.received, 6);
    assert_eq!(outcome.inserted, 1);
    assert_eq!(count_draws(&conn, Lottery::MegaSena).unwrap(), 6);
}

#[tokio::test]
async fn test_sync_backfills_gaps() {
    // Só o último concurso foi digitado à mão.
    let conn = memory_db();
    let latest = convert_records(Lottery::MegaSena, vec![record(5)]);
    insert_draw(&conn, &latest[0]).unwrap();

    let server = MockServer::start().await;
    mount_latest(&server, 5).await;
    mount_history(&server, history(5), 1).await;

    let (conn, outcome) = run_sync(&server, conn, false).await;
    assert_eq!(outcome.inserted, 4);
    assert_eq!(count_draws(&conn, Lottery::MegaSena).unwrap(), 5);
}
