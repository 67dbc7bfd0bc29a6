//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown zone: {0}")]
    UnknownZone(String),

    #[error("Part name is empty after normalization: {0:?}")]
    EmptyPartName(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
