use damage_intake_common::MediaType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("図面の読み込みに失敗: {0}")]
    Diagram(String),

    #[error("カタログエラー: {0}")]
    Catalog(String),

    #[error("画像エンコードエラー: {0}")]
    ImageEncode(String),

    #[error("画像デコードエラー: {0}")]
    ImageDecode(String),

    #[error("Data URLが不正: {0}")]
    InvalidDataUrl(String),

    #[error("アップロード失敗 ({media_type}): {message}")]
    Upload { media_type: MediaType, message: String },

    #[error("メディア一覧の取得に失敗: {0}")]
    MediaList(String),

    #[error("メディアが見つかりません: {0}")]
    MediaNotFound(String),

    #[error("引数が不正: {0}")]
    InvalidArgument(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] damage_intake_common::Error),
}

impl IntakeError {
    /// 再試行で解決しうるエラーか
    pub fn is_retryable(&self) -> bool {
        matches!(self, IntakeError::Upload { .. } | IntakeError::MediaList(_) | IntakeError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, IntakeError>;
