//! End-to-end runs through the public API with the real `image` backend.

use postframe::access::LocalDirAccess;
use postframe::config::Config;
use postframe::imaging::{FrameSize, RustBackend};
use postframe::invariants::{self, InvariantViolation};
use postframe::process;
use postframe::ratio::{AspectRatio, PostKind};
use postframe::session::{CancelToken, PostSession, SessionError};
use postframe::stage::Stage;
use postframe::types::{AssetId, SourceAsset};
use postframe::upload::{self, MediaUploader, UploadBatch, UploadError, UploadReceipt};
use postframe::uri;
use std::cell::RefCell;
use std::path::Path;
use tempfile::TempDir;

fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_fn(width, height, |x, _| {
        let v = (x * 255 / width) as u8;
        image::Rgb([v, 128, 255 - v])
    });
    img.save(path).unwrap();
}

fn photo(dir: &Path, id: &str, width: u32, height: u32) -> SourceAsset {
    let path = dir.join(format!("{id}.jpg"));
    write_jpeg(&path, width, height);
    SourceAsset::image(id, path.display().to_string())
}

fn start(tmp: &TempDir) -> PostSession {
    let media = tmp.path().join("library");
    std::fs::create_dir_all(&media).unwrap();
    let settings = Config::default().session_settings(PostKind::Photo, tmp.path());
    PostSession::begin(&LocalDirAccess::new(media), settings).unwrap()
}

#[derive(Default)]
struct CollectingUploader {
    batches: RefCell<Vec<UploadBatch>>,
}

impl MediaUploader for CollectingUploader {
    fn upload(&self, batch: &UploadBatch) -> Result<UploadReceipt, UploadError> {
        self.batches.borrow_mut().push(batch.clone());
        Ok(UploadReceipt {
            remote_uris: batch
                .media
                .iter()
                .map(|m| format!("https://store.example.com/{}.jpg", m.id))
                .collect(),
        })
    }
}

#[test]
fn select_adjust_finalize_upload() {
    let tmp = TempDir::new().unwrap();
    let library = tmp.path().join("library");
    let mut session = start(&tmp);
    let backend = RustBackend::new();

    session.select(photo(&library, "wide", 400, 200)).unwrap();
    session.select(photo(&library, "tall", 150, 300)).unwrap();
    assert_eq!(session.locked_ratio(), Some(AspectRatio::Portrait));

    let wide = AssetId::new("wide");
    let entry = session.open_for_adjust(&backend, &wide).unwrap();
    assert_eq!((entry.image.width, entry.image.height), (400, 200));
    session.pinch(&wide, 2.0).unwrap();
    session.pan(&wide, -40.0, 0.0).unwrap();

    let media = session
        .finalize_all(&backend, &CancelToken::new())
        .unwrap();
    assert_eq!(session.stage(), Stage::Ready);
    assert_eq!(media.len(), 2);

    for item in &media {
        let path = uri::local_path(&item.final_uri).unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), (1080, 1350));
        let source = session.selection().get(&item.id).unwrap();
        assert!(!uri::aliases(&source.uri, &item.final_uri));
    }
    assert_ne!(media[0].final_uri, media[1].final_uri);

    let uploader = CollectingUploader::default();
    let receipt = upload::submit(&uploader, "traveler-7", &mut session).unwrap();
    assert_eq!(receipt.remote_uris.len(), 2);
    assert_eq!(uploader.batches.borrow()[0].media, media);
    assert_eq!(session.stage(), Stage::Submitted);
}

#[test]
fn unreadable_source_stops_the_run_with_a_clean_prefix() {
    let tmp = TempDir::new().unwrap();
    let library = tmp.path().join("library");
    let mut session = start(&tmp);

    session.select(photo(&library, "good", 120, 120)).unwrap();
    let broken = library.join("broken.jpg");
    std::fs::write(&broken, b"not a jpeg at all").unwrap();
    session
        .select(SourceAsset::image("broken", broken.display().to_string()))
        .unwrap();
    session.select(photo(&library, "after", 120, 120)).unwrap();

    let err = session
        .finalize_all(&RustBackend::new(), &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, SessionError::Finalize(_)));
    assert_eq!(session.stage(), Stage::Selecting);
    assert!(session.finalized(&AssetId::new("good")).is_some());
    assert!(session.finalized(&AssetId::new("after")).is_none());

    let violation = session.check_navigation().unwrap_err();
    assert!(matches!(violation, InvariantViolation::NotFinalized { .. }));
}

#[test]
fn batch_request_to_checked_manifest() {
    let tmp = TempDir::new().unwrap();
    let library = tmp.path().join("library");
    std::fs::create_dir_all(&library).unwrap();
    write_jpeg(&library.join("a.jpg"), 320, 180);
    write_jpeg(&library.join("b.jpg"), 180, 320);

    let request_path = library.join("request.json");
    std::fs::write(
        &request_path,
        format!(
            r#"{{
                "ratio": "1:1",
                "assets": [
                    {{"id": "a", "uri": "file://{a}"}},
                    {{"id": "b", "uri": "{b}", "crop": {{"zoom": 3.0, "offset_x": 0.0, "offset_y": 50.0}}}}
                ]
            }}"#,
            a = library.join("a.jpg").display(),
            b = library.join("b.jpg").display(),
        ),
    )
    .unwrap();

    let request = process::load_request(&request_path).unwrap();
    let settings = Config::default().session_settings(request.kind, tmp.path());
    let manifest = process::process(
        &LocalDirAccess::new(&library),
        &request,
        settings,
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(manifest.ratio, AspectRatio::Square);
    assert_eq!(manifest.frame, FrameSize::new(390.0, 390.0));
    for item in &manifest.media {
        let path = uri::local_path(&item.final_uri).unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), (1080, 1080));
    }

    let manifest_path = tmp.path().join("manifest.json");
    process::write_manifest(&manifest_path, &manifest).unwrap();
    let loaded = process::load_manifest(&manifest_path).unwrap();
    assert!(process::check_manifest(&loaded, Some("traveler-7")).is_ok());
    assert!(
        invariants::check_navigation(&loaded.sources, &loaded.media, Some(AspectRatio::Portrait))
            .is_err()
    );
}

#[test]
fn missing_library_blocks_the_session() {
    let tmp = TempDir::new().unwrap();
    let settings = Config::default().session_settings(PostKind::Reel, tmp.path());
    let err = PostSession::begin(&LocalDirAccess::new(tmp.path().join("nope")), settings)
        .unwrap_err();
    assert!(matches!(err, SessionError::Access(_)));
}
