use crate::annotation::{Point, Tool};
use clap::{Parser, Subcommand};
use damage_intake_common::DamageMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "damage-intake")]
#[command(about = "受付検査の損傷記録ツール（部品照合・ゾーン選択・手書き）", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 部品カタログJSON（設定より優先）
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// 車両図面SVG（設定より優先）
    #[arg(long, global = true)]
    pub diagram: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 損傷の説明文をカタログ部品に照合
    Match {
        /// 説明文（手入力またはOCR結果）
        #[arg(required = true)]
        description: String,
    },

    /// ゾーン選択を編集して保存
    Zones {
        /// 受付レコードID
        #[arg(required = true)]
        record_id: i64,

        /// 説明文（事故損傷ゾーンを自動選択）
        #[arg(short, long)]
        description: Option<String>,

        /// 対象モード (siniestro/preexistente)
        #[arg(short, long, default_value = "siniestro")]
        mode: DamageMode,

        /// 選択を反転するゾーンID（複数指定可）
        #[arg(short, long)]
        toggle: Vec<String>,

        /// 対象モードの選択をすべて解除
        #[arg(long)]
        clear: bool,
    },

    /// 選択ゾーンを塗ったSVGを出力
    Render {
        /// 受付レコードID
        #[arg(required = true)]
        record_id: i64,

        /// 表示モード (siniestro/preexistente)
        #[arg(short, long, default_value = "siniestro")]
        mode: DamageMode,

        /// 出力SVGファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 手書きストロークを追加して保存
    Draw {
        /// 受付レコードID
        #[arg(required = true)]
        record_id: i64,

        /// 対象モード (siniestro/preexistente)
        #[arg(short, long, default_value = "siniestro")]
        mode: DamageMode,

        /// ツール (draw/erase)
        #[arg(short, long, default_value = "draw")]
        tool: Tool,

        /// 表示座標の列 "x,y x,y ..."（1ストローク）
        #[arg(short, long, required = true)]
        points: String,
    },

    /// 1モード分の手書きを消去して保存
    Clear {
        /// 受付レコードID
        #[arg(required = true)]
        record_id: i64,

        /// 対象モード (siniestro/preexistente)
        #[arg(short, long, default_value = "siniestro")]
        mode: DamageMode,
    },

    /// 保存済みのメディアと手書きの状態を表示
    Show {
        /// 受付レコードID
        #[arg(required = true)]
        record_id: i64,

        /// 手書きレイヤーをPNGで書き出すディレクトリ
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// 手書きレイヤーをData URLで出力
        #[arg(long)]
        data_url: bool,
    },

    /// Data URL（data:image/png;base64,...）の手書きを取り込んで保存
    Import {
        /// 受付レコードID
        #[arg(required = true)]
        record_id: i64,

        /// 対象モード (siniestro/preexistente)
        #[arg(short, long, default_value = "siniestro")]
        mode: DamageMode,

        /// Data URLを書いたテキストファイル
        #[arg(required = true)]
        file: PathBuf,
    },

    /// 部品カタログ
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },

    /// 設定を表示/編集
    Config {
        /// メディア保存先を設定
        #[arg(long)]
        set_media_root: Option<PathBuf>,

        /// 部品カタログJSONを設定
        #[arg(long)]
        set_catalog: Option<PathBuf>,

        /// 車両図面SVGを設定
        #[arg(long)]
        set_diagram: Option<PathBuf>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum CatalogAction {
    /// 部品一覧
    List,
    /// 部品を追加（IDは正規化される）
    Add {
        #[arg(required = true)]
        name: String,
    },
}

/// "x,y x,y ..." 形式の座標列を解析
pub fn parse_points(input: &str) -> Result<Vec<Point>, String> {
    let points = input
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| format!("座標の形式が不正です: {}", pair))?;
            let x: f32 = x.trim().parse().map_err(|_| format!("x座標が不正です: {}", pair))?;
            let y: f32 = y.trim().parse().map_err(|_| format!("y座標が不正です: {}", pair))?;
            Ok(Point::new(x, y))
        })
        .collect::<Result<Vec<_>, String>>()?;

    if points.is_empty() {
        return Err("座標が指定されていません".into());
    }
    Ok(points)
}
