use super::*;
use crate::request::RenderRequest;

fn fp() -> Fingerprint {
    RenderRequest::from_pairs([("text", "HELLO"), ("font", "anton")]).fingerprint()
}

#[test]
fn object_keys_are_prefixed_entry_names() {
    let f = fp();
    assert_eq!(
        object_key("reelpin/", &f, ArtifactKind::Video),
        format!("reelpin/{}.mp4", f.as_str())
    );
    assert_eq!(
        object_key("", &f, ArtifactKind::Image),
        format!("{}.png", f.as_str())
    );
}

#[test]
fn not_found_detection() {
    assert!(is_not_found("Got HTTP 404 with content ''"));
    assert!(is_not_found("<Code>NoSuchKey</Code>"));
    assert!(!is_not_found("Got HTTP 403 with content 'AccessDenied'"));
    assert!(is_success(200) && is_success(206));
    assert!(!is_success(404));
}

// Requires an S3-compatible server, e.g.:
// docker run -p 9000:9000 -e MINIO_ROOT_USER=reelpin -e MINIO_ROOT_PASSWORD=reelpin123 minio/minio server /data
#[tokio::test]
#[ignore]
async fn round_trip_against_minio() {
    let scratch = tempfile::tempdir().unwrap();
    let cache = RemoteCache::new(&RemoteCacheConfig {
        bucket: "reelpin-test".to_string(),
        region: "us-east-1".to_string(),
        endpoint: Some("http://localhost:9000".to_string()),
        prefix: "test/".to_string(),
        materialize_dir: scratch.path().join("materialized"),
    })
    .unwrap();

    let src = scratch.path().join("out.png");
    std::fs::write(&src, b"png-bytes").unwrap();
    let f = fp();

    cache
        .put(&f, &Artifact::new(&src, ArtifactKind::Image))
        .await
        .unwrap();
    assert!(cache.has(&f, ArtifactKind::Image).await.unwrap());
    let hit = cache.get(&f, ArtifactKind::Image).await.unwrap().hit().unwrap();
    assert_eq!(std::fs::read(hit.path()).unwrap(), b"png-bytes");
}
