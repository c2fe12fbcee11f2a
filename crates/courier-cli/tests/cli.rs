//! End-to-end tests running the `courier` binary against mock servers.

use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn courier() -> Command {
    let mut cmd = Command::cargo_bin("courier").unwrap();
    cmd.env_remove("COURIER_CONFIG")
        .env_remove("COURIER_PROXY")
        .env_remove("RUST_LOG");
    cmd
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_prints_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello from courier"))
        .mount(&server)
        .await;

    courier()
        .args(["get", server.uri().as_str(), "-p", "hello"])
        .assert()
        .success()
        .stdout("hello from courier");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_include_prints_status_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("x-reason", "gone")
                .set_body_string("missing"),
        )
        .mount(&server)
        .await;

    courier()
        .args(["GET", server.uri().as_str(), "-i"])
        .assert()
        .success()
        .stdout(
            predicate::str::starts_with("HTTP/1.1 404 Not Found\r\n")
                .and(predicate::str::contains("x-reason: gone\r\n"))
                .and(predicate::str::ends_with("\r\n\r\nmissing")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_request_options_reach_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/items"))
        .and(query_param("draft", "true"))
        .and(header("x-trace", "abc"))
        .and(header("content-type", "application/json"))
        .and(header("authorization", "Bearer t0ken"))
        .and(body_string(r#"{"name":"courier"}"#))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .mount(&server)
        .await;

    courier()
        .args([
            "post",
            server.uri().as_str(),
            "-p",
            "api",
            "-p",
            "items",
            "-Q",
            "draft=true",
            "-H",
            "X-Trace: abc",
            "--bearer",
            "t0ken",
            "--json",
            r#"{"name":"courier"}"#,
        ])
        .assert()
        .success()
        .stdout("created");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_data_from_file() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(body_string("from a file"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "from a file").unwrap();
    let data = format!("@{}", file.path().display());

    courier()
        .args(["put", server.uri().as_str(), "-d", data.as_str()])
        .assert()
        .success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_data_file_exits_with_io_error() {
    courier()
        .args(["post", "http://127.0.0.1:9", "-d", "@/no/such/body.json"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("failed to read request body"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_upload_exits_with_io_error() {
    courier()
        .args(["post", "http://127.0.0.1:9", "-F", "f=@/no/such/upload.bin"])
        .assert()
        .code(3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_url_exits_with_config_error() {
    courier()
        .args(["get", "ftp://example.com/file"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error[E001]"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_server_exits_with_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let url = format!("http://{addr}");

    courier()
        .args(["get", url.as_str(), "--retries", "2"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("request failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_config_file_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("authorized"))
        .mount(&server)
        .await;

    let config = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(config.path(), "headers:\n  X-Api-Key: secret\n").unwrap();

    courier()
        .args(["get", server.uri().as_str()])
        .arg("-c")
        .arg(config.path())
        .assert()
        .success()
        .stdout("authorized");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_debug_dumps_go_to_stderr() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("body"))
        .mount(&server)
        .await;

    courier()
        .args(["get", server.uri().as_str(), "--debug"])
        .assert()
        .success()
        .stdout("body")
        .stderr(predicate::str::contains("GET / HTTP/1.1"));
}
