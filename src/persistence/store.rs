//! ローカルディレクトリのメディアストア
//!
//! `<root>/<record_id>/` にペイロードを保存し、同じ場所の
//! `media-index.json` でエントリを管理する。
//! 手書きレイヤーは1レコード1種別1件（アップロード時に古いものを置き換える）。

use crate::error::{IntakeError, Result};
use crate::services::{MediaEntry, MediaUploadService, RecordId, RecordMediaList};
use async_trait::async_trait;
use chrono::Utc;
use damage_intake_common::{MediaType, ZoneSelection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const INDEX_FILE_NAME: &str = "media-index.json";
const ZONES_FILE_NAME: &str = "zones.json";

/// インデックスファイルの構造
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MediaIndex {
    entries: Vec<MediaEntry>,
}

/// インデックスの読み込みから書き込みまでは `lock` で直列化する。
/// クローンは同じロックを共有する。
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_dir(&self, record_id: RecordId) -> PathBuf {
        self.root.join(record_id.to_string())
    }

    async fn load_index(&self, record_id: RecordId) -> Result<MediaIndex> {
        let path = self.record_dir(record_id).join(INDEX_FILE_NAME);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(MediaIndex::default());
        }
        let content = tokio::fs::read_to_string(&path).await?;
        serde_json::from_str(&content)
            .map_err(|e| IntakeError::MediaList(format!("{}: {}", path.display(), e)))
    }

    async fn save_index(&self, record_id: RecordId, index: &MediaIndex) -> Result<()> {
        let path = self.record_dir(record_id).join(INDEX_FILE_NAME);
        write_replacing(&path, serde_json::to_string_pretty(index)?).await
    }

    /// 保存済みのゾーン選択（未保存なら空）
    pub async fn load_zones(&self, record_id: RecordId) -> Result<ZoneSelection> {
        let path = self.record_dir(record_id).join(ZONES_FILE_NAME);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(ZoneSelection::new());
        }
        let content = tokio::fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn save_zones(&self, record_id: RecordId, zones: &ZoneSelection) -> Result<()> {
        let dir = self.record_dir(record_id);
        tokio::fs::create_dir_all(&dir).await?;
        let _guard = self.lock.lock().await;
        write_replacing(&dir.join(ZONES_FILE_NAME), serde_json::to_string_pretty(zones)?).await
    }

    /// ペイロード参照からファイルパスを解決（ルート外は拒否）
    fn resolve(&self, payload_ref: &str) -> Result<PathBuf> {
        let relative = Path::new(payload_ref);
        let escapes = relative.components().any(|c| {
            !matches!(c, std::path::Component::Normal(_))
        });
        if escapes || payload_ref.is_empty() {
            return Err(IntakeError::MediaNotFound(payload_ref.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

/// 一時ファイルに書いてから置き換える（読み手が書きかけのJSONを見ない）
async fn write_replacing(path: &Path, content: String) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// 手書きレイヤーは1件のみ保持する
fn is_single_asset(media_type: &MediaType) -> bool {
    media_type.drawing_mode().is_some()
        || matches!(media_type, MediaType::Other(s) if s == "video" || s == "signature")
}

/// 内容ハッシュからファイル名を作る
pub fn payload_file_name(media_type: &MediaType, payload: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(payload));
    format!("{}_{}.png", media_type, &digest[..16])
}

#[async_trait]
impl MediaUploadService for LocalMediaStore {
    async fn upload(&self, record_id: RecordId, media_type: &MediaType, payload: Vec<u8>) -> Result<()> {
        let dir = self.record_dir(record_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| IntakeError::Upload {
                media_type: media_type.clone(),
                message: e.to_string(),
            })?;

        let file_name = payload_file_name(media_type, &payload);
        tokio::fs::write(dir.join(&file_name), &payload)
            .await
            .map_err(|e| IntakeError::Upload {
                media_type: media_type.clone(),
                message: e.to_string(),
            })?;

        let payload_ref = format!("{}/{}", record_id, file_name);
        let _guard = self.lock.lock().await;
        let mut index = self.load_index(record_id).await?;

        if is_single_asset(media_type) {
            let (replaced, kept): (Vec<_>, Vec<_>) = index
                .entries
                .into_iter()
                .partition(|e| &e.media_type == media_type);
            index.entries = kept;
            for old in replaced.iter().filter(|e| e.payload_ref != payload_ref) {
                if let Ok(path) = self.resolve(&old.payload_ref) {
                    if let Err(e) = tokio::fs::remove_file(&path).await {
                        warn!(path = %path.display(), error = %e, "failed to remove replaced media");
                    }
                }
            }
        }

        index.entries.push(MediaEntry {
            media_type: media_type.clone(),
            payload_ref,
            timestamp: Utc::now(),
        });
        self.save_index(record_id, &index).await?;

        debug!(record_id, media_type = %media_type, bytes = payload.len(), "media stored");
        Ok(())
    }
}

#[async_trait]
impl RecordMediaList for LocalMediaStore {
    async fn list(&self, record_id: RecordId) -> Result<Vec<MediaEntry>> {
        Ok(self.load_index(record_id).await?.entries)
    }

    async fn fetch(&self, entry: &MediaEntry) -> Result<Vec<u8>> {
        let path = self.resolve(&entry.payload_ref)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(IntakeError::MediaNotFound(entry.payload_ref.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
