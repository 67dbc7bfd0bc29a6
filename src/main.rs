use clap::Parser;
use damage_intake::annotation::{raster, Snapshot};
use damage_intake::cli::{self, CatalogAction, Cli, Commands};
use damage_intake::common::{normalize_part_id, pretty_part_name, CatalogIndex, DamageMode, Diagram, ZoneSelection};
use damage_intake::config::Config;
use damage_intake::error::IntakeError;
use damage_intake::persistence::{self, LocalMediaStore, SaveReport};
use damage_intake::services::{
    CatalogPartsProvider, JsonCatalog, MediaUploadService, RecordId, RecordMediaList, SvgFile,
};
use damage_intake::session::{self, InspectionSession};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    init_tracing(&config, cli.verbose);

    let catalog_path = cli.catalog.clone().or_else(|| config.catalog_path.clone());
    let diagram_path = cli.diagram.clone().or_else(|| config.diagram_path.clone());
    let store = LocalMediaStore::new(&config.media_root);

    match cli.command {
        Commands::Match { description } => {
            let catalog = load_catalog(catalog_path.as_ref()).await;
            let matched = catalog.match_description(&description);

            if matched.is_empty() {
                println!("一致する部品はありません");
            } else {
                println!("一致した部品: {}件", matched.len());
                for name in &matched {
                    let zone_id = normalize_part_id(name);
                    println!("  {} ({}) - {}", name, zone_id, pretty_part_name(&zone_id));
                }
            }
        }

        Commands::Zones { record_id, description, mode, toggle, clear } => {
            let mut session = open_session(&config, &store, record_id, catalog_path.as_ref(), diagram_path.as_ref()).await?;

            if let Some(text) = description {
                let seeded = session.provide_description(&text);
                if !seeded.is_empty() {
                    println!("✔ 自動選択: {}", seeded.join(", "));
                }
            }
            if clear {
                session.clear_zones(mode);
            }
            for zone_id in &toggle {
                match session.toggle_zone(mode, zone_id) {
                    Ok(true) => println!("+ {}", zone_id),
                    Ok(false) => println!("- {}", zone_id),
                    Err(e) => println!("✗ {}", e),
                }
            }

            store.save_zones(record_id, session.zones()).await?;
            print_zones(&session);
        }

        Commands::Render { record_id, mode, output } => {
            let diagram = load_diagram(diagram_path.as_ref()).await;
            let zones = store.load_zones(record_id).await?;
            let svg = zones.render_svg(&diagram, mode);

            match output {
                Some(path) => {
                    std::fs::write(&path, svg)?;
                    println!("✔ SVGを保存: {}", path.display());
                }
                None => println!("{}", svg),
            }
        }

        Commands::Draw { record_id, mode, tool, points } => {
            let points = cli::parse_points(&points).map_err(IntakeError::InvalidArgument)?;
            let mut session = open_session(&config, &store, record_id, catalog_path.as_ref(), diagram_path.as_ref()).await?;

            let canvas = session.canvas_mut();
            canvas.tools_mut().enable(tool);
            canvas.begin_stroke(mode, points[0])?;
            for point in &points[1..] {
                canvas.continue_stroke(*point);
            }
            canvas.end_stroke()?;

            let report = session.save(&store).await?;
            print_report(&report);
            report.into_result()?;
        }

        Commands::Clear { record_id, mode } => {
            let mut session = open_session(&config, &store, record_id, catalog_path.as_ref(), diagram_path.as_ref()).await?;
            session.canvas_mut().clear_all(mode)?;

            let report = session.save(&store).await?;
            print_report(&report);
            report.into_result()?;
        }

        Commands::Show { record_id, export, data_url } => {
            let entries = store.list(record_id).await?;
            println!("レコード {}: メディア{}件", record_id, entries.len());
            for entry in &entries {
                println!(
                    "  {} {} ({})",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.media_type,
                    entry.payload_ref
                );
            }

            let mut canvas = config.new_canvas();
            persistence::hydrate_drawings(&mut canvas, record_id, &store).await?;
            let zones = store.load_zones(record_id).await?;

            for mode in DamageMode::ALL {
                let layer = canvas.layer(mode);
                println!(
                    "[{}] ゾーン{}件 / 手書き{}px",
                    mode,
                    zones.zones(mode).len(),
                    raster::painted_pixels(layer.raster())
                );

                if let (Some(dir), Some(snapshot)) = (&export, layer.snapshot()) {
                    std::fs::create_dir_all(dir)?;
                    let path = dir.join(format!("{}_{}.png", record_id, mode.drawing_media_type()));
                    std::fs::write(&path, snapshot.as_bytes())?;
                    println!("  ✔ 書き出し: {}", path.display());
                }

                if let (true, Some(snapshot)) = (data_url, layer.snapshot()) {
                    println!("  {}", snapshot.to_data_url());
                }
            }
        }

        Commands::Import { record_id, mode, file } => {
            let text = std::fs::read_to_string(&file)?;
            let snapshot = Snapshot::from_data_url(text.trim())?;
            let image = snapshot.decode()?;
            store
                .upload(record_id, &mode.drawing_media_type(), snapshot.into_bytes())
                .await?;
            println!(
                "✔ 取り込み: [{}] {}x{} ({})",
                mode,
                image.width(),
                image.height(),
                file.display()
            );
        }

        Commands::Catalog { action } => {
            let path = catalog_path
                .ok_or_else(|| IntakeError::Config("部品カタログが設定されていません (--catalog)".into()))?;
            let provider = JsonCatalog::new(path);

            match action {
                CatalogAction::List => {
                    let entries = provider.list().await?;
                    println!("部品カタログ: {}件", entries.len());
                    for entry in entries {
                        println!("  {:>4} {}", entry.id, entry.name);
                    }
                }
                CatalogAction::Add { name } => {
                    let mut session = InspectionSession::open(
                        None,
                        Arc::new(session::load_catalog_index(&provider).await),
                        Arc::new(Diagram::unavailable()),
                        config.new_canvas(),
                    );
                    let entry = session.register_part(&provider, &name).await?;
                    println!("✔ 部品を登録: {} {}", entry.id, entry.name);
                }
            }
        }

        Commands::Config { set_media_root, set_catalog, set_diagram, show } => {
            let changed = set_media_root.is_some() || set_catalog.is_some() || set_diagram.is_some();
            if let Some(root) = set_media_root {
                config.media_root = root;
            }
            if let Some(path) = set_catalog {
                config.catalog_path = Some(path);
            }
            if let Some(path) = set_diagram {
                config.diagram_path = Some(path);
            }
            if changed {
                config.validate()?;
                config.save()?;
                println!("✔ 設定を保存しました: {}", Config::config_path()?.display());
            }

            if show || !changed {
                println!("設定:");
                println!("  メディア保存先: {}", config.media_root.display());
                println!("  部品カタログ: {}", display_optional(&config.catalog_path));
                println!("  車両図面: {}", display_optional(&config.diagram_path));
                println!(
                    "  キャンバス: {}x{} (x{})",
                    config.canvas_width, config.canvas_height, config.device_pixel_ratio
                );
                println!("  ブラシ: 描画{} / 消去{}", config.draw_brush_size, config.erase_brush_size);
                println!("  ログレベル: {}", config.log_level);
            }
        }
    }

    Ok(())
}

/// `RUST_LOG` があればそれを優先
fn init_tracing(config: &Config, verbose: bool) {
    let default_level = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_catalog(path: Option<&PathBuf>) -> CatalogIndex {
    match path {
        Some(path) => session::load_catalog_index(&JsonCatalog::new(path)).await,
        None => {
            tracing::warn!("catalog path not configured");
            CatalogIndex::default()
        }
    }
}

async fn load_diagram(path: Option<&PathBuf>) -> Diagram {
    match path {
        Some(path) => session::load_diagram(&SvgFile::new(path)).await,
        None => {
            tracing::warn!("diagram path not configured");
            Diagram::unavailable()
        }
    }
}

async fn open_session(
    config: &Config,
    store: &LocalMediaStore,
    record_id: RecordId,
    catalog_path: Option<&PathBuf>,
    diagram_path: Option<&PathBuf>,
) -> damage_intake::Result<InspectionSession> {
    let catalog = Arc::new(load_catalog(catalog_path).await);
    let diagram = Arc::new(load_diagram(diagram_path).await);
    let saved = store.load_zones(record_id).await?;
    let zones = ZoneSelection::from_saved(
        &diagram,
        saved.zones(DamageMode::Incident).iter().cloned(),
        saved.zones(DamageMode::Preexisting).iter().cloned(),
    );
    InspectionSession::open_existing(record_id, catalog, diagram, config.new_canvas(), zones, store).await
}

fn print_zones(session: &InspectionSession) {
    for mode in DamageMode::ALL {
        let zones = session.zones().zones(mode);
        println!("[{}] {}件", mode, zones.len());
        for zone_id in zones {
            println!("  {} - {}", zone_id, pretty_part_name(zone_id));
        }
    }
}

fn print_report(report: &SaveReport) {
    if report.outcomes.is_empty() {
        println!("保存する変更はありません");
        return;
    }
    for mode in report.uploaded() {
        println!("✔ {} を保存しました", mode.drawing_media_type());
    }
    for (mode, error) in report.failures() {
        println!("✗ {}: {}", mode.drawing_media_type(), error);
    }
}

fn display_optional(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "未設定".into())
}
