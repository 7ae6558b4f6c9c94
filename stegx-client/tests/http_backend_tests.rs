//! HttpBackend wire tests
//!
//! Spins up an axum multipart server on an ephemeral port that records every
//! field it receives and answers each route the way the stego service does.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{multipart::Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use stegx_client::{
    DecodeRequest, EmbedOptions, EmbedResult, EncodeRequest, HttpBackend, OperationState,
    Orchestrator, StegoBackend, StegoError,
};
use stegx_common::config::ClientConfig;
use stegx_common::{CarrierFile, ProgressReporter, SecretFile, SecretPayload};

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];

#[derive(Debug, Clone)]
struct ReceivedField {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    value: Vec<u8>,
}

impl ReceivedField {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

#[derive(Debug, Clone)]
struct ReceivedRequest {
    path: String,
    fields: Vec<ReceivedField>,
}

impl ReceivedRequest {
    fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    fn get(&self, name: &str) -> &ReceivedField {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("field {} missing in {:?}", name, self.names()))
    }
}

type Received = Arc<Mutex<Vec<ReceivedRequest>>>;

async fn stego_route(
    State(received): State<Received>,
    Path((kind, direction)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Response {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or("").to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let value = field.bytes().await.unwrap().to_vec();
        fields.push(ReceivedField {
            name,
            filename,
            content_type,
            value,
        });
    }

    let host_text = fields
        .iter()
        .find(|f| f.name == "host_text")
        .map(|f| f.text())
        .unwrap_or_default();

    received.lock().unwrap().push(ReceivedRequest {
        path: format!("/api/{}/{}", kind, direction),
        fields,
    });

    match (kind.as_str(), direction.as_str()) {
        ("image", "embed") => (
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"stego.png\""),
            ],
            PNG_BYTES.to_vec(),
        )
            .into_response(),
        ("image", "extract") => Json(json!({
            "message": "see attached",
            "file": {"data": "QUI=", "filename": "ab.txt", "content_type": "text/plain"}
        }))
        .into_response(),
        ("audio", "embed") => (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Not enough capacity in carrier audio"})),
        )
            .into_response(),
        ("text", "embed") => Json(json!({"watermarked": format!("{}\u{200b}", host_text)}))
            .into_response(),
        ("text", "extract") => Json(json!({})).into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
    }
}

async fn spawn_server() -> (String, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/api/:kind/:direction", post(stego_route))
        .with_state(received.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), received)
}

fn orchestrator(endpoint: &str) -> Orchestrator<HttpBackend> {
    let config = ClientConfig {
        endpoint: endpoint.to_string(),
        timeout_secs: 5,
        ..Default::default()
    };
    Orchestrator::new(HttpBackend::new(&config).unwrap())
}

fn png_carrier() -> CarrierFile {
    CarrierFile::new(PNG_BYTES.to_vec(), "image/png", "cat.png")
}

#[tokio::test]
async fn test_image_embed_wire_format() {
    let (endpoint, received) = spawn_server().await;
    let orchestrator = orchestrator(&endpoint);
    let payload = SecretPayload::MessageAndFile {
        message: "meet at noon".to_string(),
        file: SecretFile::new(b"%PDF-1.4".to_vec(), "plans.pdf").with_content_type("application/pdf"),
    };

    let result = orchestrator
        .embed(
            EncodeRequest::new(png_carrier(), payload).with_encryption(false),
            &ProgressReporter::silent(),
        )
        .await
        .into_result()
        .unwrap();

    match result {
        EmbedResult::Carrier(carrier) => {
            assert_eq!(carrier.bytes, PNG_BYTES.to_vec());
            assert_eq!(carrier.filename, "stego.png");
            assert_eq!(carrier.content_type.as_deref(), Some("image/png"));
        }
        other => panic!("unexpected: {:?}", other),
    }

    let received = received.lock().unwrap();
    let request = &received[0];
    assert_eq!(request.path, "/api/image/embed");
    assert_eq!(
        request.names(),
        vec!["carrier", "message", "secret_file", "password", "encrypt"]
    );

    let carrier = request.get("carrier");
    assert_eq!(carrier.filename.as_deref(), Some("cat.png"));
    assert_eq!(carrier.content_type.as_deref(), Some("image/png"));
    assert_eq!(carrier.value, PNG_BYTES.to_vec());

    let message = request.get("message");
    assert_eq!(message.filename.as_deref(), Some("message.txt"));
    assert_eq!(message.text(), "meet at noon");

    let secret = request.get("secret_file");
    assert_eq!(secret.filename.as_deref(), Some("plans.pdf"));
    assert_eq!(secret.content_type.as_deref(), Some("application/pdf"));

    assert_eq!(request.get("password").text(), "");
    assert_eq!(request.get("encrypt").text(), "false");
}

#[tokio::test]
async fn test_invalid_secret_content_type_fails_before_dispatch() {
    let (endpoint, received) = spawn_server().await;
    let orchestrator = orchestrator(&endpoint);
    let payload = SecretPayload::File(
        SecretFile::new(b"doc".to_vec(), "doc.bin").with_content_type("not a mime type"),
    );

    let report = orchestrator
        .embed(
            EncodeRequest::new(png_carrier(), payload).with_encryption(false),
            &ProgressReporter::silent(),
        )
        .await;

    assert_eq!(
        report.operation.history(),
        &[OperationState::Idle, OperationState::Failed]
    );
    assert!(!report.operation.reached_network());
    assert!(matches!(
        report.outcome,
        Err(StegoError::PreconditionViolation(_))
    ));
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_image_extract_decodes_message_and_file() {
    let (endpoint, received) = spawn_server().await;
    let orchestrator = orchestrator(&endpoint);

    let decoded = orchestrator
        .extract(
            DecodeRequest::new(png_carrier()).with_password("hunter2"),
            &ProgressReporter::silent(),
        )
        .await
        .into_result()
        .unwrap();

    assert_eq!(decoded.message.as_deref(), Some("see attached"));
    let file = decoded.file.unwrap();
    assert_eq!(file.bytes, b"AB".to_vec());
    assert_eq!(file.filename, "ab.txt");

    let received = received.lock().unwrap();
    assert_eq!(received[0].names(), vec!["carrier", "password", "encrypt"]);
    assert_eq!(received[0].get("password").text(), "hunter2");
    assert_eq!(received[0].get("encrypt").text(), "true");
}

#[tokio::test]
async fn test_audio_embed_sends_ecc_and_surfaces_detail() {
    let (endpoint, received) = spawn_server().await;
    let orchestrator = orchestrator(&endpoint);
    let carrier = CarrierFile::new(vec![0u8; 64], "audio/wav", "tone.wav");

    let report = orchestrator
        .embed(
            EncodeRequest::new(carrier, SecretPayload::Message("hi".into()))
                .with_password("pw")
                .with_options(EmbedOptions {
                    ecc: false,
                    container: None,
                }),
            &ProgressReporter::silent(),
        )
        .await;

    match report.outcome {
        Err(StegoError::BackendError {
            status, message, ..
        }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Not enough capacity in carrier audio");
        }
        other => panic!("unexpected: {:?}", other),
    }

    let received = received.lock().unwrap();
    assert_eq!(
        received[0].names(),
        vec!["carrier", "message", "password", "encrypt", "ecc"]
    );
    assert_eq!(received[0].get("ecc").text(), "false");
}

#[tokio::test]
async fn test_video_embed_plain_text_error() {
    let (endpoint, received) = spawn_server().await;
    let orchestrator = orchestrator(&endpoint);
    let carrier = CarrierFile::new(vec![0u8; 32], "video/mp4", "clip.mp4");

    let err = orchestrator
        .embed(
            EncodeRequest::new(carrier, SecretPayload::Message("hi".into())).with_encryption(false),
            &ProgressReporter::silent(),
        )
        .await
        .into_result()
        .unwrap_err();
    assert_eq!(err.to_string(), "boom");

    let received = received.lock().unwrap();
    assert_eq!(received[0].get("container").text(), "mp4");
    assert_eq!(received[0].get("ecc").text(), "true");
}

#[tokio::test]
async fn test_text_routes() {
    let (endpoint, received) = spawn_server().await;
    let orchestrator = orchestrator(&endpoint);

    let result = orchestrator
        .embed(
            EncodeRequest::new(
                CarrierFile::text("The quick brown fox"),
                SecretPayload::Message("hidden".into()),
            )
            .with_encryption(false),
            &ProgressReporter::silent(),
        )
        .await
        .into_result()
        .unwrap();
    assert_eq!(
        result,
        EmbedResult::Watermarked("The quick brown fox\u{200b}".to_string())
    );

    let decoded = orchestrator
        .extract(
            DecodeRequest::new(CarrierFile::text("The quick brown fox\u{200b}"))
                .with_encryption(false),
            &ProgressReporter::silent(),
        )
        .await
        .into_result()
        .unwrap();
    assert!(decoded.is_empty());

    let received = received.lock().unwrap();
    assert_eq!(
        received[0].names(),
        vec!["host_text", "message", "password", "encrypt"]
    );
    assert_eq!(received[0].get("message").filename, None);
    assert_eq!(received[0].get("message").text(), "hidden");
    assert_eq!(
        received[1].names(),
        vec!["watermarked_text", "password", "encrypt"]
    );
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    let backend = HttpBackend::new(&ClientConfig {
        endpoint: "http://127.0.0.1:1".to_string(),
        timeout_secs: 5,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(backend.endpoint(), "http://127.0.0.1:1");
    let orchestrator = Orchestrator::new(backend);

    let (progress, rx) = ProgressReporter::watch();
    let report = orchestrator
        .extract(
            DecodeRequest::new(png_carrier()).with_encryption(false),
            &progress,
        )
        .await;

    match &report.outcome {
        Err(StegoError::TransportUnreachable {
            endpoint, action, ..
        }) => {
            assert_eq!(endpoint, "http://127.0.0.1:1");
            assert_eq!(action, "image extract");
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert!(report.operation.reached_network());
    assert!(*rx.borrow() < 1.0);
}
