#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;

use reelpin::{
    ArtifactKind, CompositionDescriptor, FrameManifest, PinningConfig, PinningPublisher,
    ReelError, ReelResult, VideoStitcher, Workspace,
};

/// In-process stand-in for the pinning service.
#[derive(Default)]
pub struct PinStub {
    pub reject: Option<ArtifactKind>,
    pub uploads: Mutex<Vec<String>>,
    pub counter: AtomicUsize,
}

async fn pin(
    State(stub): State<Arc<PinStub>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    if headers.get("pinata_api_key").is_none() || headers.get("pinata_secret_api_key").is_none()
    {
        return (StatusCode::UNAUTHORIZED, "missing credentials".to_string());
    }
    let body = String::from_utf8_lossy(&body);
    let kind = if body.contains("filename=\"out.png\"") {
        ArtifactKind::Image
    } else {
        ArtifactKind::Video
    };
    if stub.reject == Some(kind) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{{\"error\":\"{kind} rejected\"}}"),
        );
    }
    let n = stub.counter.fetch_add(1, Ordering::SeqCst);
    let id = format!("Qm{kind}{n}");
    stub.uploads.lock().unwrap().push(id.clone());
    (StatusCode::OK, format!("{{\"IpfsHash\":\"{id}\"}}"))
}

/// Serve `stub` on an ephemeral port; returns its base URL.
pub async fn start_pin_stub(stub: Arc<PinStub>) -> String {
    let app = Router::new().route("/pin", post(pin)).with_state(stub);
    serve(app).await
}

/// In-process stand-in for a path-style S3 bucket, keyed by request path.
#[derive(Default)]
pub struct S3Stub {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl S3Stub {
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

async fn object(
    State(stub): State<Arc<S3Stub>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let key = uri.path().to_string();
    if method == Method::PUT {
        stub.objects.lock().unwrap().insert(key, body.to_vec());
        return (StatusCode::OK, [(header::ETAG, "\"stub\"")]).into_response();
    }
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }
    match stub.objects.lock().unwrap().get(&key).cloned() {
        Some(_) if method == Method::HEAD => StatusCode::OK.into_response(),
        Some(bytes) => (StatusCode::OK, bytes).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            "<Error><Code>NoSuchKey</Code></Error>",
        )
            .into_response(),
    }
}

/// Serve `stub` on an ephemeral port; returns its base URL.
pub async fn start_s3_stub(stub: Arc<S3Stub>) -> String {
    serve(Router::new().fallback(object).with_state(stub)).await
}

/// Serve `app` on an ephemeral port; returns its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub const GATEWAY: &str = "https://gateway.test/ipfs/";

pub fn publisher(pin_base: &str) -> PinningPublisher {
    let mut cfg = PinningConfig::new("test-key", "test-secret");
    cfg.endpoint = format!("{pin_base}/pin");
    cfg.gateway = GATEWAY.to_string();
    PinningPublisher::new(cfg).unwrap()
}

/// Writes a placeholder video instead of encoding, optionally after a delay.
pub struct FakeStitcher {
    pub delay: Option<std::time::Duration>,
}

impl VideoStitcher for FakeStitcher {
    fn stitch(
        &self,
        manifest: &FrameManifest,
        _comp: &CompositionDescriptor,
        workspace: &Workspace,
    ) -> ReelResult<PathBuf> {
        if let Some(d) = self.delay {
            std::thread::sleep(d);
        }
        let out = workspace.video_path();
        std::fs::write(&out, format!("{} frames", manifest.frames.len()))
            .map_err(|e| ReelError::stitch_failed(e.to_string()))?;
        Ok(out)
    }
}

pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
