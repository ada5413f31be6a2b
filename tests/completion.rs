//! Completion client tests against a local stub endpoint that speaks just
//! enough HTTP + SSE for one request/response exchange.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use charla::app::App;
use charla::client::CompletionClient;
use charla::config::Settings;
use charla::conversation::Message;
use charla::error::ChatError;

fn sse_body(fragments: &[&str]) -> String {
    let mut body = String::from("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n");
    for fragment in fragments {
        body.push_str(&format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{}\"}}}}]}}\n\n",
            fragment
        ));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Read one full HTTP request (headers plus Content-Length body).
async fn read_request(socket: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        if let Some(pos) = find_subslice(&data, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&data[..pos]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() - (pos + 4) >= content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}

/// Serve exactly one canned response; the received request body is sent
/// back over the channel for assertions.
async fn spawn_stub(status_line: &'static str, body: String) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let request = read_request(&mut socket).await;
            let _ = tx.send(request).await;

            let response = format!(
                "{}\r\nContent-Type: text/event-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}", addr), rx)
}

#[tokio::test]
async fn streamed_fragments_concatenate_into_one_answer() {
    let (base, mut rx) = spawn_stub("HTTP/1.1 200 OK", sse_body(&["Hel", "lo", " there"])).await;

    let client = CompletionClient::new();
    let conversation = vec![Message::user("say hello")];
    let answer = client
        .complete("sk-test", &base, "test-model", &conversation)
        .await
        .unwrap();

    assert_eq!(answer, "Hello there");

    // The request carried the full conversation, the model, and stream mode
    let request = rx.recv().await.unwrap();
    assert!(request.contains("POST /chat/completions"));
    assert!(request.contains("Bearer sk-test"));
    assert!(request.contains("\"model\":\"test-model\""));
    assert!(request.contains("\"role\":\"user\""));
    assert!(request.contains("\"stream\":true"));
}

#[tokio::test]
async fn error_status_surfaces_as_transport_failure() {
    let (base, _rx) = spawn_stub(
        "HTTP/1.1 401 Unauthorized",
        "{\"error\":{\"message\":\"bad key\"}}".to_string(),
    )
    .await;

    let client = CompletionClient::new();
    let conversation = vec![Message::user("hi")];
    let err = client
        .complete("sk-bad", &base, "test-model", &conversation)
        .await
        .unwrap_err();

    match err {
        ChatError::Transport(msg) => {
            assert!(msg.contains("401"), "message was: {}", msg);
        }
        other => panic!("expected Transport, got {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_failure() {
    // Reserved port with no listener
    let client = CompletionClient::new();
    let conversation = vec![Message::user("hi")];
    let err = client
        .complete("sk-test", "http://127.0.0.1:1", "test-model", &conversation)
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Transport(_)));
}

async fn drain_pending(app: &mut App) {
    for _ in 0..200 {
        app.poll_completion().await;
        if app.pending.is_none() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("completion task never finished");
}

#[tokio::test]
async fn successful_send_appends_user_then_assistant() {
    let (base, _rx) = spawn_stub("HTTP/1.1 200 OK", sse_body(&["Hi", "!"])).await;

    let mut app = App::new();
    app.input = "Hi".to_string();
    app.submit_with_settings(Settings::new("sk-test", &base, "test-model"));
    assert!(app.pending.is_some());

    drain_pending(&mut app).await;

    assert_eq!(app.conversation.messages().len(), 2);
    assert_eq!(app.conversation.messages()[0], Message::user("Hi"));
    assert_eq!(app.conversation.messages()[1], Message::assistant("Hi!"));
    assert!(app.status.is_none());
}

#[tokio::test]
async fn failed_send_keeps_user_message_and_appends_nothing() {
    let (base, _rx) = spawn_stub(
        "HTTP/1.1 500 Internal Server Error",
        "{\"error\":{\"message\":\"overloaded\"}}".to_string(),
    )
    .await;

    let mut app = App::new();
    app.input = "Hi".to_string();
    app.submit_with_settings(Settings::new("sk-test", &base, "test-model"));

    drain_pending(&mut app).await;

    assert_eq!(app.conversation.messages().len(), 1);
    assert_eq!(app.conversation.last(), Some(&Message::user("Hi")));
    let status = app.status.expect("failure should be reported");
    assert!(status.contains("completion request failed"), "{}", status);
}

#[tokio::test]
async fn second_send_is_ignored_while_one_is_in_flight() {
    let (base, _rx) = spawn_stub("HTTP/1.1 200 OK", sse_body(&["ok"])).await;

    let mut app = App::new();
    app.input = "first".to_string();
    app.submit_with_settings(Settings::new("sk-test", &base, "test-model"));
    assert_eq!(app.conversation.messages().len(), 1);

    // submit_prompt refuses while a task is pending
    app.input = "second".to_string();
    app.submit_prompt();
    assert_eq!(app.conversation.messages().len(), 1);
    assert_eq!(app.input, "second");

    drain_pending(&mut app).await;
    assert_eq!(app.conversation.messages().len(), 2);
}
