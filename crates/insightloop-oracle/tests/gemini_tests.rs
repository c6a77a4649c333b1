//! Gemini backend against a throwaway local HTTP responder.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use insightloop_oracle::{
    DecisionOracle, DecisionRequest, ExtractionOracle, ExtractionSource, GeminiConfig,
    GeminiOracle, OracleError, QuestionOutline,
};

/// Read one request, returning its head and body
async fn read_request(socket: &mut TcpStream) -> (String, String) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                return (
                    text[..header_end].to_string(),
                    text[header_end + 4..].to_string(),
                );
            }
        }
    }

    (String::new(), String::new())
}

/// Serve exactly one request with `status` and `body`, capturing the request head
async fn serve_once(status: &'static str, body: String) -> (String, Arc<Mutex<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(String::new()));
    let sink = Arc::clone(&captured);

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let (head, _) = read_request(&mut socket).await;
        *sink.lock().await = head;

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    (format!("http://{}/v1beta", addr), captured)
}

/// Accept one request and never answer it
async fn serve_silence() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    format!("http://{}/v1beta", addr)
}

/// A `generateContent` response whose first candidate says `text`
fn candidate(text: &str) -> String {
    serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
    .to_string()
}

fn oracle(base_url: String) -> GeminiOracle {
    GeminiOracle::new(
        GeminiConfig::new("test-key")
            .with_model("test-model")
            .with_base_url(base_url)
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap()
}

fn request() -> DecisionRequest {
    DecisionRequest {
        goal: "Understand commuting".into(),
        core_questions: vec![QuestionOutline::new("How do you commute?")],
        history: vec![],
    }
}

#[tokio::test]
async fn test_decision_success() {
    let (base_url, head) = serve_once(
        "200 OK",
        candidate(r#"{"nextQuestion":"Why the bike?","isProbe":true,"topicExhausted":false,"reasoning":"shallow"}"#),
    )
    .await;

    let decision = oracle(base_url).decide(&request()).await.unwrap();
    assert_eq!(decision.next_question, "Why the bike?");
    assert!(decision.is_probe);

    let head = head.lock().await;
    assert!(head.contains("/v1beta/models/test-model:generateContent"));
    assert!(head.contains("key=test-key"));
}

#[tokio::test]
async fn test_auth_failure_is_unavailable() {
    for status in ["401 Unauthorized", "403 Forbidden"] {
        let (base_url, _) = serve_once(status, r#"{"error":"bad key"}"#.to_string()).await;
        match oracle(base_url).decide(&request()).await {
            Err(OracleError::Unavailable(msg)) => assert!(msg.contains("Authentication")),
            other => panic!("expected Unavailable for {}, got {:?}", status, other),
        }
    }
}

#[tokio::test]
async fn test_rate_limit_is_unavailable() {
    let (base_url, _) = serve_once("429 Too Many Requests", "{}".to_string()).await;
    match oracle(base_url).decide(&request()).await {
        Err(OracleError::Unavailable(msg)) => assert!(msg.contains("Rate limited")),
        other => panic!("expected Unavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let (base_url, _) = serve_once("503 Service Unavailable", "overloaded".to_string()).await;
    match oracle(base_url).decide(&request()).await {
        Err(OracleError::Unavailable(msg)) => {
            assert!(msg.contains("Server error"));
            assert!(msg.contains("overloaded"));
        }
        other => panic!("expected Unavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_no_candidate_text_is_response_invalid() {
    let (base_url, _) = serve_once("200 OK", r#"{"candidates":[]}"#.to_string()).await;
    let result = oracle(base_url).decide(&request()).await;
    assert!(matches!(result, Err(OracleError::ResponseInvalid(_))));
}

#[tokio::test]
async fn test_missing_decision_field_is_response_invalid() {
    let (base_url, _) = serve_once(
        "200 OK",
        candidate(r#"{"nextQuestion":"Q2?","isProbe":false,"reasoning":"ok"}"#),
    )
    .await;

    match oracle(base_url).decide(&request()).await {
        Err(OracleError::ResponseInvalid(msg)) => assert!(msg.contains("topicExhausted")),
        other => panic!("expected ResponseInvalid, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_server_is_timeout() {
    let base_url = serve_silence().await;
    let oracle = GeminiOracle::new(
        GeminiConfig::new("test-key")
            .with_base_url(base_url)
            .with_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    let result = oracle.decide(&request()).await;
    assert!(matches!(result, Err(OracleError::Timeout(_))));
}

#[tokio::test]
async fn test_extraction_success() {
    let (base_url, _) = serve_once(
        "200 OK",
        candidate(r#"[{"text":"How are you?","predefinedProbes":["Why?"]},{"text":"What next?","predefinedProbes":[]}]"#),
    )
    .await;

    let outlines = oracle(base_url)
        .extract(&ExtractionSource::text("1. How are you?\n  - Why?\n2. What next?"))
        .await
        .unwrap();
    assert_eq!(
        outlines,
        vec![
            QuestionOutline::new("How are you?").with_probe("Why?"),
            QuestionOutline::new("What next?"),
        ]
    );
}

#[tokio::test]
async fn test_extraction_entry_without_text_fails() {
    let (base_url, _) = serve_once(
        "200 OK",
        candidate(r#"[{"text":"Q1","predefinedProbes":[]},{"question":"Q2?","predefinedProbes":["Why?"]}]"#),
    )
    .await;

    let result = oracle(base_url)
        .extract(&ExtractionSource::text("1. Q1\n2. Q2?"))
        .await;
    assert!(matches!(result, Err(OracleError::ExtractionFailed(_))));
}

#[tokio::test]
async fn test_extraction_http_failure_is_extraction_failed() {
    let (base_url, _) = serve_once("500 Internal Server Error", "boom".to_string()).await;
    let result = oracle(base_url)
        .extract(&ExtractionSource::text("1. Q1?"))
        .await;
    assert!(matches!(result, Err(OracleError::ExtractionFailed(_))));
}
