//! 手書きレイヤーの保存・復元テスト
//!
//! モードごとに独立したアップロード結果と、保存済みメディアからの復元を検証

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use damage_intake::annotation::raster::is_blank;
use damage_intake::annotation::{AnnotationCanvas, BrushSize, Point, Snapshot, Surface, Tool, ToolState};
use damage_intake::common::{DamageMode, MediaType};
use damage_intake::error::{IntakeError, Result};
use damage_intake::persistence::{hydrate_drawings, save_drawings, LocalMediaStore};
use damage_intake::services::{MediaEntry, MediaUploadService, RecordId, RecordMediaList};
use std::sync::Mutex;
use tempfile::tempdir;

/// 指定した種別だけ失敗するアップローダー
#[derive(Default)]
struct RecordingUploader {
    fail_on: Option<MediaType>,
    calls: Mutex<Vec<(RecordId, MediaType, Vec<u8>)>>,
}

impl RecordingUploader {
    fn failing(media_type: MediaType) -> Self {
        Self {
            fail_on: Some(media_type),
            ..Default::default()
        }
    }

    fn uploaded_types(&self) -> Vec<MediaType> {
        let mut types: Vec<MediaType> = self.calls.lock().unwrap().iter().map(|c| c.1.clone()).collect();
        types.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        types
    }
}

#[async_trait]
impl MediaUploadService for RecordingUploader {
    async fn upload(&self, record_id: RecordId, media_type: &MediaType, payload: Vec<u8>) -> Result<()> {
        if self.fail_on.as_ref() == Some(media_type) {
            return Err(IntakeError::Upload {
                media_type: media_type.clone(),
                message: "503 Service Unavailable".into(),
            });
        }
        self.calls.lock().unwrap().push((record_id, media_type.clone(), payload));
        Ok(())
    }
}

/// 固定の一覧とペイロードを返すメディア一覧
struct FixedMedia {
    entries: Vec<MediaEntry>,
    payloads: Vec<(String, Vec<u8>)>,
}

#[async_trait]
impl RecordMediaList for FixedMedia {
    async fn list(&self, _record_id: RecordId) -> Result<Vec<MediaEntry>> {
        Ok(self.entries.clone())
    }

    async fn fetch(&self, entry: &MediaEntry) -> Result<Vec<u8>> {
        self.payloads
            .iter()
            .find(|(r, _)| *r == entry.payload_ref)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| IntakeError::MediaNotFound(entry.payload_ref.clone()))
    }
}

struct UnavailableMedia;

#[async_trait]
impl RecordMediaList for UnavailableMedia {
    async fn list(&self, _record_id: RecordId) -> Result<Vec<MediaEntry>> {
        Err(IntakeError::MediaList("connection refused".into()))
    }

    async fn fetch(&self, entry: &MediaEntry) -> Result<Vec<u8>> {
        Err(IntakeError::MediaNotFound(entry.payload_ref.clone()))
    }
}

fn new_canvas() -> AnnotationCanvas {
    AnnotationCanvas::new(
        Surface::new(80.0, 40.0, 1.0),
        ToolState::new(BrushSize::default()),
    )
}

fn draw(canvas: &mut AnnotationCanvas, mode: DamageMode, from: (f32, f32), to: (f32, f32)) {
    canvas.tools_mut().enable(Tool::Draw);
    canvas.begin_stroke(mode, Point::new(from.0, from.1)).unwrap();
    canvas.continue_stroke(Point::new(to.0, to.1));
    canvas.end_stroke().unwrap();
}

fn painted_canvas() -> AnnotationCanvas {
    let mut canvas = new_canvas();
    draw(&mut canvas, DamageMode::Incident, (5.0, 5.0), (70.0, 5.0));
    draw(&mut canvas, DamageMode::Preexisting, (5.0, 30.0), (40.0, 35.0));
    canvas
}

fn entry(media_type: MediaType, payload_ref: &str, offset_secs: i64) -> MediaEntry {
    MediaEntry {
        media_type,
        payload_ref: payload_ref.into(),
        timestamp: Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap() + Duration::seconds(offset_secs),
    }
}

/// 両モードを保存して別のキャンバスに復元
#[tokio::test]
async fn test_save_and_hydrate_both_modes() {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = LocalMediaStore::new(dir.path());
    let mut canvas = painted_canvas();

    let report = save_drawings(&mut canvas, 42, &store).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.uploaded(), vec![DamageMode::Incident, DamageMode::Preexisting]);
    assert!(canvas.dirty_modes().is_empty());

    let mut restored = new_canvas();
    let hydrated = hydrate_drawings(&mut restored, 42, &store).await.unwrap();
    assert_eq!(hydrated.len(), 2);

    for mode in DamageMode::ALL {
        assert!(!restored.is_dirty(mode));
        assert_eq!(restored.layer(mode).raster(), canvas.layer(mode).raster());
    }
}

/// 片方のアップロードだけ失敗した場合
#[tokio::test]
async fn test_partial_failure_keeps_failed_mode_dirty() {
    let mut canvas = painted_canvas();
    let uploader = RecordingUploader::failing(MediaType::DrawingPreexisting);

    let report = save_drawings(&mut canvas, 7, &uploader).await.unwrap();
    assert!(!report.is_complete());
    assert_eq!(report.uploaded(), vec![DamageMode::Incident]);
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, DamageMode::Preexisting);
    assert!(matches!(failures[0].1, IntakeError::Upload { .. }));

    assert!(!canvas.is_dirty(DamageMode::Incident));
    assert!(canvas.is_dirty(DamageMode::Preexisting));

    // 再試行では未保存のモードだけ送る
    let retry = RecordingUploader::default();
    let report = save_drawings(&mut canvas, 7, &retry).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(retry.uploaded_types(), vec![MediaType::DrawingPreexisting]);
    assert!(canvas.dirty_modes().is_empty());
}

/// 変更がなければ何も送らない
#[tokio::test]
async fn test_nothing_dirty_uploads_nothing() {
    let mut canvas = new_canvas();
    let uploader = RecordingUploader::default();
    let report = save_drawings(&mut canvas, 1, &uploader).await.unwrap();
    assert!(report.outcomes.is_empty());
    assert!(uploader.uploaded_types().is_empty());
}

/// 描画中のストロークは保存前に確定される
#[tokio::test]
async fn test_save_commits_open_stroke() {
    let mut canvas = new_canvas();
    canvas.tools_mut().enable(Tool::Draw);
    canvas.begin_stroke(DamageMode::Incident, Point::new(10.0, 10.0)).unwrap();
    canvas.continue_stroke(Point::new(20.0, 10.0));

    let uploader = RecordingUploader::default();
    save_drawings(&mut canvas, 3, &uploader).await.unwrap();
    assert!(!canvas.is_stroking());
    assert_eq!(uploader.uploaded_types(), vec![MediaType::DrawingIncident]);
}

/// 消去したレイヤーは透明PNGとして保存され、復元すると空になる
#[tokio::test]
async fn test_cleared_layer_uploads_placeholder() {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = LocalMediaStore::new(dir.path());
    let mut canvas = painted_canvas();
    save_drawings(&mut canvas, 9, &store).await.unwrap();

    canvas.clear_all(DamageMode::Incident).unwrap();
    let uploader = RecordingUploader::default();
    save_drawings(&mut canvas, 9, &uploader).await.unwrap();
    let calls = uploader.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    let placeholder = Snapshot::from_png(calls[0].2.clone()).unwrap().decode().unwrap();
    assert_eq!(placeholder.dimensions(), (1, 1));

    canvas.clear_all(DamageMode::Incident).unwrap();
    save_drawings(&mut canvas, 9, &store).await.unwrap();
    assert_eq!(store.list(9).await.unwrap().len(), 2);

    let mut restored = new_canvas();
    hydrate_drawings(&mut restored, 9, &store).await.unwrap();
    let incident = restored.layer(DamageMode::Incident).raster();
    assert_eq!(incident.dimensions(), (80, 40));
    assert!(is_blank(incident));
    assert!(!is_blank(restored.layer(DamageMode::Preexisting).raster()));
}

/// 種別ごとに最新のものを復元し、読めないペイロードはスキップ
#[tokio::test]
async fn test_hydrate_latest_and_skip_unreadable() {
    let source = painted_canvas();
    let incident_png = source.layer(DamageMode::Incident).snapshot().unwrap().as_bytes().to_vec();

    let media = FixedMedia {
        entries: vec![
            entry(MediaType::DrawingIncident, "old", 0),
            entry(MediaType::DrawingIncident, "new", 60),
            entry(MediaType::DrawingPreexisting, "broken", 30),
            entry(MediaType::from("photo"), "photo", 90),
        ],
        payloads: vec![
            ("old".into(), b"stale".to_vec()),
            ("new".into(), incident_png),
            ("broken".into(), b"not a png".to_vec()),
        ],
    };

    let mut canvas = new_canvas();
    let hydrated = hydrate_drawings(&mut canvas, 5, &media).await.unwrap();
    assert_eq!(hydrated, vec![DamageMode::Incident]);
    assert_eq!(
        canvas.layer(DamageMode::Incident).raster(),
        source.layer(DamageMode::Incident).raster()
    );
    assert!(canvas.layer(DamageMode::Preexisting).snapshot().is_none());
    assert!(canvas.dirty_modes().is_empty());
}

/// 一覧の取得に失敗した場合はエラー
#[tokio::test]
async fn test_hydrate_list_failure() {
    let mut canvas = new_canvas();
    let result = hydrate_drawings(&mut canvas, 5, &UnavailableMedia).await;
    assert!(matches!(result, Err(IntakeError::MediaList(_))));
}

/// 2モードの並行アップロードでインデックスのエントリが失われない
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mode_uploads_keep_both_entries() {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = LocalMediaStore::new(dir.path());

    for record_id in 0..30 {
        let mut canvas = painted_canvas();
        let report = save_drawings(&mut canvas, record_id, &store).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(store.list(record_id).await.unwrap().len(), 2, "record {}", record_id);

        let mut restored = new_canvas();
        let hydrated = hydrate_drawings(&mut restored, record_id, &store).await.unwrap();
        assert_eq!(hydrated, vec![DamageMode::Incident, DamageMode::Preexisting]);
    }
}

/// Data URLで受け取った手書きを保存すると、そのまま復元できる
#[tokio::test]
async fn test_data_url_import_hydrates() {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = LocalMediaStore::new(dir.path());
    let source = painted_canvas();
    let url = source.layer(DamageMode::Preexisting).snapshot().unwrap().to_data_url();

    let imported = Snapshot::from_data_url(&url).unwrap();
    store
        .upload(11, &MediaType::DrawingPreexisting, imported.into_bytes())
        .await
        .unwrap();

    let mut restored = new_canvas();
    let hydrated = hydrate_drawings(&mut restored, 11, &store).await.unwrap();
    assert_eq!(hydrated, vec![DamageMode::Preexisting]);
    assert_eq!(
        restored.layer(DamageMode::Preexisting).raster(),
        source.layer(DamageMode::Preexisting).raster()
    );
}
