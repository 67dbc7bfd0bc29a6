//! damage-intake: 車両受付時の損傷記録エンジン
//!
//! 照合・ゾーン選択などの純粋ロジックは `damage_intake_common` にあり、
//! このクレートは手書きレイヤー・永続化・外部サービス連携を扱う。

pub mod annotation;
pub mod cli;
pub mod config;
pub mod error;
pub mod persistence;
pub mod services;
pub mod session;

pub use damage_intake_common as common;
pub use error::{IntakeError, Result};
pub use session::{AutoSeed, InspectionSession};
