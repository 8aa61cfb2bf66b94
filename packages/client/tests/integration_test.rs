//! Integration tests for the realtime chat workspace using process-based testing.

use std::io::Write;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use std::time::Duration;

/// Helper struct to manage server process lifecycle
struct TestServer {
    process: Child,
    port: u16,
}

impl TestServer {
    /// Start a test server on the specified port
    fn start(port: u16) -> Self {
        let process = Command::new("cargo")
            .args([
                "run",
                "-p",
                "tsunagi-server",
                "--bin",
                "tsunagi-server",
                "--",
                "--port",
                &port.to_string(),
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to start server");

        // Give server time to start
        thread::sleep(Duration::from_millis(1500));

        TestServer { process, port }
    }

    /// Get the WebSocket URL for this server
    fn url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    /// Get the HTTP base URL for this server
    fn http_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Kill the server process when the test ends
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// Helper struct to manage client process lifecycle
struct TestClient {
    process: Child,
    stdin: Option<ChildStdin>,
}

impl TestClient {
    /// Start a test client with the given URL, token and room
    fn start(url: &str, token: &str, room: &str) -> Self {
        Self::start_with_delay(url, token, room, Duration::from_millis(800))
    }

    /// Start a test client with custom delay
    fn start_with_delay(url: &str, token: &str, room: &str, delay: Duration) -> Self {
        let mut args = vec![
            "run",
            "-p",
            "tsunagi-client",
            "--bin",
            "tsunagi-client",
            "--",
            "--url",
            url,
            "--token",
            token,
        ];
        if !room.is_empty() {
            args.push("--room");
            args.push(room);
        }
        let mut process = Command::new("cargo")
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::piped())
            .spawn()
            .expect("Failed to start client");

        // Take stdin for sending messages
        let stdin = process.stdin.take();

        // Give client time to connect if requested
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        TestClient { process, stdin }
    }

    /// Send a message to the client's stdin
    fn send_message(&mut self, message: &str) -> Result<(), std::io::Error> {
        if let Some(stdin) = &mut self.stdin {
            writeln!(stdin, "{}", message)?;
            stdin.flush()?;
        }
        Ok(())
    }

    /// Check if the client process is still running (not crashed)
    fn is_running(&mut self) -> bool {
        matches!(self.process.try_wait(), Ok(None))
    }

    /// Wait for the client process to exit with timeout
    /// Returns Ok(ExitStatus) if process exits within timeout, Err otherwise
    fn wait_for_exit(&mut self, timeout: Duration) -> Result<std::process::ExitStatus, String> {
        use std::io::Read;

        let start = std::time::Instant::now();
        loop {
            // Check if process has exited
            if let Ok(Some(status)) = self.process.try_wait() {
                return Ok(status);
            }
            // Check timeout
            if start.elapsed() > timeout {
                // Try to read stderr for debugging
                let mut stderr_output = String::new();
                if let Some(ref mut stderr) = self.process.stderr {
                    let _ = stderr.read_to_string(&mut stderr_output);
                }
                return Err(format!(
                    "Timeout waiting for process to exit after {:?}. Stderr: {}",
                    timeout,
                    if stderr_output.is_empty() {
                        "(empty)"
                    } else {
                        &stderr_output
                    }
                ));
            }
            // Sleep briefly before checking again
            thread::sleep(Duration::from_millis(50));
        }
    }
}

impl Drop for TestClient {
    fn drop(&mut self) {
        // Kill the client process when done
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

#[test]
fn test_server_starts_successfully() {
    // テスト項目: サーバーが正常に起動する
    // given (前提条件):
    let port = 18080;

    // when (操作):
    let _server = TestServer::start(port);

    // then (期待する結果):
    // Server started successfully (no panic)
    thread::sleep(Duration::from_millis(100));
    // If we reach here, the server started successfully
}

#[tokio::test]
async fn test_health_endpoint_responds() {
    // テスト項目: ヘルスチェックエンドポイントが応答する
    // given (前提条件):
    let port = 18081;
    let server = TestServer::start(port);

    // when (操作): サーバーのビルド待ちを考慮してリトライしながら問い合わせる
    let url = format!("{}/api/health", server.http_url());
    let mut response = None;
    for _ in 0..30 {
        match reqwest::get(&url).await {
            Ok(r) => {
                response = Some(r);
                break;
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(1000)).await,
        }
    }

    // then (期待する結果):
    let response = response.expect("health endpoint should be reachable");
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("health body should be JSON");
    assert_eq!(body["status"], "ok");
}

#[test]
fn test_client_connects_and_joins_room() {
    // テスト項目: クライアントがサーバーに接続してルームに参加できる
    // given (前提条件):
    let port = 18082;
    let server = TestServer::start(port);

    // when (操作):
    let mut client = TestClient::start(&server.url(), "alice", "lounge");

    // then (期待する結果):
    thread::sleep(Duration::from_millis(300));
    assert!(
        client.is_running(),
        "Client should stay connected after joining a room"
    );
}

#[test]
fn test_same_user_can_connect_twice() {
    // テスト項目: 同一ユーザーの複数接続（マルチデバイス）が両方とも維持される
    // given (前提条件):
    let port = 18083;
    let server = TestServer::start(port);
    let mut client1 = TestClient::start(&server.url(), "alice", "lounge");

    // when (操作): 同じトークンでもう 1 本接続する
    let mut client2 = TestClient::start(&server.url(), "alice", "lounge");

    // then (期待する結果): どちらの接続も拒否されない
    thread::sleep(Duration::from_millis(300));
    assert!(
        client1.is_running() && client2.is_running(),
        "Both connections of the same user should stay alive"
    );
}

#[test]
fn test_message_exchange_between_clients() {
    // テスト項目: メッセージ送受信が正常に動作する（クラッシュしない）
    // given (前提条件):
    let port = 18084;
    let server = TestServer::start(port);

    let mut client_alice = TestClient::start(&server.url(), "alice", "lounge");
    let mut client_bob = TestClient::start(&server.url(), "bob", "lounge");

    // when (操作):
    // alice sends a message
    client_alice
        .send_message("Hello from alice!")
        .expect("Failed to send message from alice");

    // Give time for message to be dispatched
    thread::sleep(Duration::from_millis(500));

    // then (期待する結果):
    // Both clients should still be running (not crashed)
    assert!(
        client_alice.is_running(),
        "Alice's client should still be running after sending message"
    );
    assert!(
        client_bob.is_running(),
        "Bob's client should still be running after receiving message"
    );

    // Send another message from bob to alice
    client_bob
        .send_message("Hello from bob!")
        .expect("Failed to send message from bob");

    thread::sleep(Duration::from_millis(300));

    // Both clients should still be running
    assert!(
        client_alice.is_running() && client_bob.is_running(),
        "Both clients should remain stable during message exchange"
    );

    // Note: Actual delivery content verification is done in unit tests of the
    // dispatcher; this test exercises the real transport end to end
}

#[test]
fn test_empty_token_is_rejected() {
    // テスト項目: 空のトークンでのハンドシェイクが拒否され、クライアントが終了する
    // given (前提条件):
    let port = 18085;
    let server = TestServer::start(port);

    // when (操作): 空のトークンで接続を試みる（再接続はしない）
    let mut client = TestClient::start_with_delay(&server.url(), "", "lounge", Duration::ZERO);

    // then (期待する結果):
    // Client should exit due to the rejected handshake. The generous timeout
    // covers a cold cargo build of the client binary
    let exit_result = client.wait_for_exit(Duration::from_secs(60));
    assert!(
        exit_result.is_ok(),
        "Client should have exited within timeout: {:?}",
        exit_result
    );
    let exit_status = exit_result.unwrap();
    assert!(
        !exit_status.success(),
        "Client should have exited with error code (got: {:?})",
        exit_status
    );
}

#[test]
fn test_integration_test_infrastructure() {
    // テスト項目: 統合テストのインフラストラクチャが正しく機能する
    // given (前提条件):
    let has_cargo = Command::new("cargo").arg("--version").output().is_ok();

    // when (操作):

    // then (期待する結果):
    assert!(has_cargo, "Cargo must be available for integration tests");
}
