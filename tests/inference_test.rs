//! HTTP client tests against a local single-shot server.
//!
//! Each test spins up a `tiny_http` server on an ephemeral port, captures
//! the one request the client sends, and replies with a canned response.

use signsight::config::{EndpointConfig, HeaderPair};
use signsight::errors::PipelineError;
use signsight::inference::{HttpInferenceClient, InferenceBackend};
use signsight::types::{CaptureMode, EncodedImage};
use std::io::Read;
use std::sync::mpsc;
use std::thread;

struct CapturedRequest {
    method: String,
    url: String,
    content_type: String,
    bypass_header: Option<String>,
    body: Vec<u8>,
}

/// Serve exactly one request, reply with `status`/`body` as JSON, and hand
/// the captured request back to the test.
fn serve_once(status: u16, reply: &'static str) -> (String, mpsc::Receiver<CapturedRequest>) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("bind test server");
    let base_url = format!(
        "http://{}",
        server.server_addr().to_ip().expect("tcp listener")
    );
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let mut request = server.recv().expect("one request");

        let header = |name: &'static str| {
            request
                .headers()
                .iter()
                .find(|h| h.field.equiv(name))
                .map(|h| h.value.as_str().to_string())
        };
        let content_type = header("content-type").unwrap_or_default();
        let bypass_header = header("ngrok-skip-browser-warning");

        let mut body = Vec::new();
        request
            .as_reader()
            .read_to_end(&mut body)
            .expect("read request body");

        let captured = CapturedRequest {
            method: request.method().as_str().to_string(),
            url: request.url().to_string(),
            content_type,
            bypass_header,
            body,
        };

        let response = tiny_http::Response::from_string(reply)
            .with_status_code(status)
            .with_header(
                tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                    .expect("header"),
            );
        request.respond(response).expect("respond");
        tx.send(captured).expect("deliver captured request");
    });

    (base_url, rx)
}

fn endpoints(base_url: String) -> EndpointConfig {
    EndpointConfig {
        base_url,
        letters_path: "/analyze".to_string(),
        words_path: "/analyze_word".to_string(),
        extra_headers: vec![HeaderPair::new("ngrok-skip-browser-warning", "true")],
    }
}

fn sample_image() -> EncodedImage {
    EncodedImage::jpeg(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
}

#[test]
fn test_letters_request_shape_and_label_truncation() {
    let (base_url, rx) = serve_once(200, r#"{"label":"hello","confidence":0.93}"#);
    let client = HttpInferenceClient::new(endpoints(base_url));

    let result = client
        .analyze(&sample_image(), CaptureMode::Letters)
        .expect("analyze should succeed");

    // Letter mode reduces the label to its first character, uppercased.
    assert_eq!(result.label, "H");
    assert!((result.confidence - 0.93).abs() < 1e-6);

    let captured = rx.recv().expect("server saw the request");
    assert_eq!(captured.method, "POST");
    assert_eq!(captured.url, "/analyze");
    assert!(captured
        .content_type
        .starts_with("multipart/form-data; boundary="));
    assert_eq!(captured.bypass_header.as_deref(), Some("true"));

    let body = String::from_utf8_lossy(&captured.body);
    assert!(body.contains("name=\"image\""));
    assert!(body.contains("filename=\"capture.jpg\""));
    assert!(body.contains("Content-Type: image/jpeg"));
}

#[test]
fn test_words_mode_keeps_full_label() {
    let (base_url, rx) = serve_once(200, r#"{"label":"thank you","confidence":0.71}"#);
    let client = HttpInferenceClient::new(endpoints(base_url));

    let result = client
        .analyze(&sample_image(), CaptureMode::Words)
        .expect("analyze should succeed");

    assert_eq!(result.label, "thank you");

    let captured = rx.recv().expect("server saw the request");
    assert_eq!(captured.url, "/analyze_word");
}

#[test]
fn test_empty_label_is_empty_result_not_error() {
    let (base_url, _rx) = serve_once(200, r#"{"label":"","confidence":0.0}"#);
    let client = HttpInferenceClient::new(endpoints(base_url));

    let result = client
        .analyze(&sample_image(), CaptureMode::Letters)
        .expect("empty detections are valid");
    assert!(result.is_empty());
}

#[test]
fn test_missing_label_field_is_empty_result() {
    let (base_url, _rx) = serve_once(200, r#"{}"#);
    let client = HttpInferenceClient::new(endpoints(base_url));

    let result = client
        .analyze(&sample_image(), CaptureMode::Words)
        .expect("missing label is valid");
    assert!(result.is_empty());
}

#[test]
fn test_server_error_carries_status_and_body() {
    let (base_url, _rx) = serve_once(500, r#"{"detail":"model crashed"}"#);
    let client = HttpInferenceClient::new(endpoints(base_url));

    let err = client
        .analyze(&sample_image(), CaptureMode::Letters)
        .expect_err("500 must be an error");

    match err {
        PipelineError::Server { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("model crashed"));
        }
        other => panic!("expected Server error, got {:?}", other),
    }
}

#[test]
fn test_unparseable_success_body_is_server_error() {
    let (base_url, _rx) = serve_once(200, "not json at all");
    let client = HttpInferenceClient::new(endpoints(base_url));

    let err = client
        .analyze(&sample_image(), CaptureMode::Letters)
        .expect_err("garbage body must be an error");
    assert!(err.is_server());
}

#[test]
fn test_unreachable_host_is_network_error() {
    // Bind then drop a listener so the port is known-closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let client = HttpInferenceClient::new(endpoints(format!("http://{}", addr)));
    let err = client
        .analyze(&sample_image(), CaptureMode::Letters)
        .expect_err("closed port must fail");
    assert!(err.is_network());
}
