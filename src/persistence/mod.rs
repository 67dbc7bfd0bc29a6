//! 手書きレイヤーの保存・復元
//!
//! - 保存: dirty なモードごとにPNGを作成し、2モード分を並行アップロード
//! - 結果はモードごとに独立して扱う（片方だけ成功することがある）
//! - 復元: レコードのメディア一覧から種別ごとに最新の手書きを読み込む

pub mod store;

pub use store::LocalMediaStore;

use crate::annotation::{snapshot, AnnotationCanvas, Snapshot};
use crate::error::{IntakeError, Result};
use crate::services::{MediaEntry, MediaUploadService, RecordId, RecordMediaList};
use damage_intake_common::{DamageMode, MediaType};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// 1モード分のアップロード結果
#[derive(Debug)]
pub struct ModeOutcome {
    pub mode: DamageMode,
    pub media_type: MediaType,
    pub result: Result<()>,
}

/// 保存結果（アップロードしたモードのみ）
#[derive(Debug, Default)]
pub struct SaveReport {
    pub outcomes: Vec<ModeOutcome>,
}

impl SaveReport {
    /// すべて成功したか（アップロード対象がなければ `true`）
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn uploaded(&self) -> Vec<DamageMode> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.mode)
            .collect()
    }

    pub fn failures(&self) -> Vec<(DamageMode, &IntakeError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.mode, e)))
            .collect()
    }

    /// 失敗があれば最初のエラーを返す
    pub fn into_result(self) -> Result<Vec<DamageMode>> {
        let mut uploaded = Vec::new();
        for outcome in self.outcomes {
            outcome.result?;
            uploaded.push(outcome.mode);
        }
        Ok(uploaded)
    }
}

/// アップロードするペイロード
///
/// 空のレイヤーは透明PNGで「消去」を記録する。
pub fn drawing_payload(canvas: &AnnotationCanvas, mode: DamageMode) -> Result<Vec<u8>> {
    match canvas.layer(mode).snapshot() {
        Some(saved) => Ok(saved.as_bytes().to_vec()),
        None => Ok(snapshot::transparent_placeholder()?.into_bytes()),
    }
}

/// dirty な手書きレイヤーを保存する
///
/// 成功したモードだけ dirty を解除する。失敗したモードは dirty のまま残り、
/// 再度呼び出すとそのモードだけ再送される。
pub async fn save_drawings(
    canvas: &mut AnnotationCanvas,
    record_id: RecordId,
    uploader: &dyn MediaUploadService,
) -> Result<SaveReport> {
    canvas.end_stroke()?;

    let mut payloads: BTreeMap<DamageMode, Vec<u8>> = BTreeMap::new();
    for mode in canvas.dirty_modes() {
        payloads.insert(mode, drawing_payload(canvas, mode)?);
    }
    if payloads.is_empty() {
        return Ok(SaveReport::default());
    }

    let (incident, preexisting) = tokio::join!(
        upload_mode(uploader, record_id, DamageMode::Incident, payloads.remove(&DamageMode::Incident)),
        upload_mode(uploader, record_id, DamageMode::Preexisting, payloads.remove(&DamageMode::Preexisting)),
    );

    let mut report = SaveReport::default();
    for outcome in [incident, preexisting].into_iter().flatten() {
        match &outcome.result {
            Ok(()) => {
                canvas.mark_persisted(outcome.mode);
                info!(record_id, mode = %outcome.mode, "drawing uploaded");
            }
            Err(e) => warn!(record_id, mode = %outcome.mode, error = %e, "drawing upload failed"),
        }
        report.outcomes.push(outcome);
    }
    Ok(report)
}

async fn upload_mode(
    uploader: &dyn MediaUploadService,
    record_id: RecordId,
    mode: DamageMode,
    payload: Option<Vec<u8>>,
) -> Option<ModeOutcome> {
    let payload = payload?;
    let media_type = mode.drawing_media_type();
    let result = uploader.upload(record_id, &media_type, payload).await;
    Some(ModeOutcome {
        mode,
        media_type,
        result,
    })
}

/// 種別ごとに最新の手書きエントリを選ぶ
///
/// タイムスタンプが同じなら一覧で後にあるものを採用する。
pub fn latest_drawings(entries: &[MediaEntry]) -> BTreeMap<DamageMode, &MediaEntry> {
    let mut latest: BTreeMap<DamageMode, &MediaEntry> = BTreeMap::new();
    for entry in entries {
        let mode = match entry.media_type.drawing_mode() {
            Some(mode) => mode,
            None => continue,
        };
        let newer = latest
            .get(&mode)
            .map_or(true, |current| entry.timestamp >= current.timestamp);
        if newer {
            latest.insert(mode, entry);
        }
    }
    latest
}

/// 保存済みの手書きをキャンバスに復元する
///
/// 一覧の取得に失敗した場合はエラー。個々のペイロードの取得・デコード失敗は
/// ログに残してスキップする。
///
/// # Returns
/// 復元したモード
pub async fn hydrate_drawings(
    canvas: &mut AnnotationCanvas,
    record_id: RecordId,
    media: &dyn RecordMediaList,
) -> Result<Vec<DamageMode>> {
    let entries = media.list(record_id).await?;
    let mut hydrated = Vec::new();

    for (mode, entry) in latest_drawings(&entries) {
        let restored = match media.fetch(entry).await {
            Ok(bytes) => Snapshot::from_png(bytes).and_then(|s| canvas.hydrate(mode, s)),
            Err(e) => Err(e),
        };
        match restored {
            Ok(()) => hydrated.push(mode),
            Err(e) => warn!(
                record_id,
                mode = %mode,
                payload = %entry.payload_ref,
                error = %e,
                "skipping unreadable drawing"
            ),
        }
    }

    Ok(hydrated)
}
