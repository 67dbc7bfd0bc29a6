//! Damage Intake Common Library
//!
//! 受付検査の損傷照合・ゾーン選択の共通ロジック（I/Oなし）

pub mod types;
pub mod error;
pub mod text;
pub mod matcher;
pub mod diagram;
pub mod zones;

pub use types::{CatalogEntry, CatalogPart, DamageMode, MatchResult, MediaType};
pub use error::{Error, Result};
pub use text::{normalize, normalize_part_id, pretty_part_name, tokenize};
pub use matcher::{match_parts, CatalogIndex, IndexedPart};
pub use diagram::{Diagram, ZoneHighlight, ZONE_CONTAINER_ID};
pub use zones::ZoneSelection;
