//! 編集セッションテスト
//!
//! ファイルベースのカタログ・図面・メディアストアを使い、
//! 自動選択から保存・再オープンまでの流れを検証

use damage_intake::annotation::{Point, Tool};
use damage_intake::common::{DamageMode, Diagram, ZoneSelection};
use damage_intake::config::Config;
use damage_intake::persistence::LocalMediaStore;
use damage_intake::services::{CatalogPartsProvider, JsonCatalog, SvgFile};
use damage_intake::session::{load_catalog_index, load_diagram, InspectionSession};
use damage_intake::AutoSeed;
use std::sync::Arc;
use tempfile::tempdir;

const DIAGRAM: &str = r##"<?xml version="1.0"?>
<svg id="svg1" xmlns="http://www.w3.org/2000/svg">
  <g id="layer1"><rect id="FONDO" width="10" height="10"/></g>
  <g id="ZONAS">
    <path id="FACIA_DELANTERA" d="M0 0h1v1z" fill="#ccc"/>
    <path id="FARO_DERECHO" d="M1 0h1v1z"/>
    <path id="COFRE" d="M2 0h1v1z"/>
  </g>
</svg>"##;

const CATALOG: &str = r#"[
  {"id": 1, "nb_parte": "FACIA DELANTERA"},
  {"id": 2, "nb_parte": "FARO DERECHO"},
  {"id": 3, "nb_parte": "COFRE"}
]"#;

fn test_config() -> Config {
    Config {
        canvas_width: 60,
        canvas_height: 30,
        ..Config::default()
    }
}

/// 読み込みから保存・再オープンまで
#[tokio::test]
async fn test_session_round_trip() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("partes.json"), CATALOG).unwrap();
    std::fs::write(dir.path().join("auto.svg"), DIAGRAM).unwrap();

    let catalog = Arc::new(load_catalog_index(&JsonCatalog::new(dir.path().join("partes.json"))).await);
    let diagram = Arc::new(load_diagram(&SvgFile::new(dir.path().join("auto.svg"))).await);
    assert_eq!(catalog.len(), 3);
    assert_eq!(diagram.zone_ids(), ["FACIA_DELANTERA", "FARO_DERECHO", "COFRE"]);

    let store = LocalMediaStore::new(dir.path().join("media"));
    let config = test_config();
    let mut session = InspectionSession::open(Some(11), catalog.clone(), diagram.clone(), config.new_canvas());

    let seeded = session.provide_description("FACIA DELANTERA dañada, checar FARO DERECHO");
    assert_eq!(seeded.len(), 2);
    session.toggle_zone(DamageMode::Preexisting, "COFRE").unwrap();

    session.canvas_mut().tools_mut().enable(Tool::Draw);
    session.canvas_mut().begin_stroke(DamageMode::Preexisting, Point::new(5.0, 5.0)).unwrap();
    session.canvas_mut().continue_stroke(Point::new(50.0, 20.0));

    let report = session.save(&store).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.uploaded(), vec![DamageMode::Preexisting]);
    store.save_zones(11, session.zones()).await.unwrap();

    let zones = store.load_zones(11).await.unwrap();
    let reopened = InspectionSession::open_existing(11, catalog, diagram, config.new_canvas(), zones, &store)
        .await
        .unwrap();

    assert_eq!(reopened.zones(), session.zones());
    assert!(reopened.canvas().dirty_modes().is_empty());
    assert_eq!(
        reopened.canvas().layer(DamageMode::Preexisting).raster(),
        session.canvas().layer(DamageMode::Preexisting).raster()
    );
}

/// 保存済みのゾーンがある場合は自動選択で上書きしない
#[tokio::test]
async fn test_reopened_session_keeps_saved_zones() {
    let diagram = Arc::new(Diagram::parse(DIAGRAM));
    let mut saved = ZoneSelection::new();
    saved.toggle_zone(&diagram, DamageMode::Incident, "COFRE").unwrap();

    let dir = tempdir().expect("Failed to create temp dir");
    let store = LocalMediaStore::new(dir.path());
    let catalog = Arc::new(damage_intake::common::CatalogIndex::build(&[
        damage_intake::common::CatalogPart::new("FARO DERECHO"),
    ]));

    let mut session = InspectionSession::open_existing(4, catalog, diagram, test_config().new_canvas(), saved, &store)
        .await
        .unwrap();
    assert!(session.provide_description("faro derecho").is_empty());
    assert_eq!(session.auto_seed(), AutoSeed::Done);
    assert!(session.zones().is_selected(DamageMode::Incident, "COFRE"));
    assert!(!session.zones().is_selected(DamageMode::Incident, "FARO_DERECHO"));
}

/// 図面が読めない場合は全IDを受け付け、ハイライトはなし
#[tokio::test]
async fn test_missing_diagram_degrades() {
    let dir = tempdir().expect("Failed to create temp dir");
    let diagram = load_diagram(&SvgFile::new(dir.path().join("missing.svg"))).await;
    assert!(diagram.zone_ids().is_empty());

    let catalog = Arc::new(load_catalog_index(&JsonCatalog::new(dir.path().join("missing.json"))).await);
    assert!(catalog.is_empty());

    let mut session = InspectionSession::open(None, catalog, Arc::new(diagram), test_config().new_canvas());
    assert!(session.toggle_zone(DamageMode::Incident, "CUALQUIERA").unwrap());
    assert!(session.highlights().is_empty());
    assert!(session.save(&LocalMediaStore::new(dir.path())).await.is_err());
}

/// 追加した部品はすぐに照合対象になる
#[tokio::test]
async fn test_register_part() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("partes.json");
    std::fs::write(&path, CATALOG).unwrap();
    let provider = JsonCatalog::new(&path);

    let catalog = Arc::new(load_catalog_index(&provider).await);
    let mut session = InspectionSession::open(None, catalog, Arc::new(Diagram::unavailable()), test_config().new_canvas());

    let entry = session.register_part(&provider, "Espejo lateral").await.unwrap();
    assert_eq!(entry.id, 4);
    assert_eq!(entry.name, "ESPEJO_LATERAL");
    assert_eq!(provider.list().await.unwrap().len(), 4);

    assert_eq!(session.catalog().len(), 4);
    assert!(session
        .provide_description("espejo lateral roto")
        .contains(&"ESPEJO_LATERAL".to_string()));
}
