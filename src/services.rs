//! 外部サービスのインターフェース
//!
//! 部品カタログ・車両図面・メディアサービスを抽象化する。
//! ファイルベースの実装（CLI・テスト用）も提供する。

use crate::error::{IntakeError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use damage_intake_common::{normalize_part_id, CatalogEntry, MediaType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 受付レコードID
pub type RecordId = i64;

/// 保存済みメディア1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub media_type: MediaType,
    /// ペイロードの参照（パスやURLなど、サービス依存）
    pub payload_ref: String,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait CatalogPartsProvider: Send + Sync {
    async fn list(&self) -> Result<Vec<CatalogEntry>>;

    /// オペレーターが追加した部品を登録する
    async fn create(&self, name: &str) -> Result<CatalogEntry>;
}

#[async_trait]
pub trait DiagramResource: Send + Sync {
    /// SVGマークアップを読み込む
    async fn load(&self) -> Result<String>;
}

#[async_trait]
pub trait MediaUploadService: Send + Sync {
    async fn upload(&self, record_id: RecordId, media_type: &MediaType, payload: Vec<u8>) -> Result<()>;
}

#[async_trait]
pub trait RecordMediaList: Send + Sync {
    async fn list(&self, record_id: RecordId) -> Result<Vec<MediaEntry>>;

    /// エントリが参照するペイロードを取得する
    async fn fetch(&self, entry: &MediaEntry) -> Result<Vec<u8>>;
}

/// JSONファイルの部品カタログ
///
/// `[{"id": 1, "name": "FACIA DELANTERA"}, ...]`（`nb_parte` も可）
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    path: PathBuf,
}

impl JsonCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Vec<CatalogEntry>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Err(IntakeError::FileNotFound(self.path.display().to_string()));
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        serde_json::from_str(&content)
            .map_err(|e| IntakeError::Catalog(format!("{}: {}", self.path.display(), e)))
    }
}

#[async_trait]
impl CatalogPartsProvider for JsonCatalog {
    async fn list(&self) -> Result<Vec<CatalogEntry>> {
        self.read_entries().await
    }

    async fn create(&self, name: &str) -> Result<CatalogEntry> {
        let normalized = normalize_part_id(name);
        if normalized.is_empty() {
            return Err(damage_intake_common::Error::EmptyPartName(name.to_string()).into());
        }

        let mut entries = if tokio::fs::try_exists(&self.path).await? {
            self.read_entries().await?
        } else {
            Vec::new()
        };

        if let Some(existing) = entries.iter().find(|e| normalize_part_id(&e.name) == normalized) {
            return Ok(existing.clone());
        }

        let entry = CatalogEntry {
            id: entries.iter().map(|e| e.id).max().unwrap_or(0) + 1,
            name: normalized,
        };
        entries.push(entry.clone());

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(&entries)?).await?;
        Ok(entry)
    }
}

/// SVGファイルの車両図面
#[derive(Debug, Clone)]
pub struct SvgFile {
    path: PathBuf,
}

impl SvgFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DiagramResource for SvgFile {
    async fn load(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(markup) => Ok(markup),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(IntakeError::FileNotFound(self.path.display().to_string()))
            }
            Err(e) => Err(IntakeError::Diagram(format!("{}: {}", self.path.display(), e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_json_catalog_list_and_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partes.json");
        std::fs::write(&path, r#"[{"id": 1, "nb_parte": "FACIA_DELANTERA"}, {"id": 4, "name": "COFRE"}]"#).unwrap();

        let catalog = JsonCatalog::new(&path);
        assert_eq!(catalog.list().await.unwrap().len(), 2);

        let created = catalog.create("  salpicadera  derecha ").await.unwrap();
        assert_eq!(created, CatalogEntry { id: 5, name: "SALPICADERA_DERECHA".into() });

        // 既存の部品はそのまま返す
        let again = catalog.create("cofre").await.unwrap();
        assert_eq!(again.id, 4);
        assert_eq!(catalog.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_json_catalog_rejects_empty_name() {
        let dir = tempdir().unwrap();
        let catalog = JsonCatalog::new(dir.path().join("partes.json"));
        let err = catalog.create(" ¿? ").await.unwrap_err();
        assert!(matches!(err, IntakeError::Common(_)));
    }

    #[tokio::test]
    async fn test_missing_files() {
        let dir = tempdir().unwrap();
        let catalog = JsonCatalog::new(dir.path().join("none.json"));
        assert!(matches!(catalog.list().await, Err(IntakeError::FileNotFound(_))));

        let svg = SvgFile::new(dir.path().join("none.svg"));
        assert!(matches!(svg.load().await, Err(IntakeError::FileNotFound(_))));
    }
}
