use ffvi_core::core_api::{CoreError, Engine};
use ffvi_core::save::{Document, SaveError, SaveFormat};
use ffvi_core::state::{StatPair, StatPreset};

/// A populated save buffer built through the codec itself; the editor
/// ships no binary fixtures.
fn fixture_bytes(format: SaveFormat) -> Vec<u8> {
    let engine = Engine::new();
    let mut session = engine.new_session(format, 0).expect("blank session");
    {
        let graph = session.graph_mut();
        let terra = graph.character_mut(0).unwrap();
        terra.enabled = true;
        terra.name = "TERRA".to_string();
        terra.level = 12;
        terra.exp = 5_400;
        terra.hp = StatPair { current: 320, max: 380 };
        terra.mp = StatPair { current: 40, max: 56 };
        terra.equipment.weapon = 104;

        let locke = graph.character_mut(1).unwrap();
        locke.enabled = true;
        locke.apply_preset(StatPreset::Starter);

        graph.party.enabled = true;
        graph.party.members = [Some(0), Some(1), None, None];
        graph.gold = 7_777;
        graph.world.map_id = 1;
        graph.world.player.x = 84.0;
        graph.world.player.y = 34.0;
    }
    session.to_bytes(0).expect("serialize fixture")
}

#[test]
fn engine_auto_detects_snes_buffers() {
    let engine = Engine::new();
    let bytes = fixture_bytes(SaveFormat::Snes);
    let session = engine
        .open_bytes(bytes, 0, None)
        .expect("failed to open SNES buffer");
    assert_eq!(session.format(), SaveFormat::Snes);
    assert_eq!(session.graph().character(0).unwrap().name, "TERRA");
}

#[test]
fn engine_auto_detects_playstation_buffers() {
    let engine = Engine::new();
    let bytes = fixture_bytes(SaveFormat::Playstation);
    let session = engine
        .open_bytes(bytes, 0, None)
        .expect("failed to open PSX buffer");
    assert_eq!(session.format(), SaveFormat::Playstation);
    assert!(session.graph().party.enabled);
}

#[test]
fn engine_rejects_unrecognized_buffers() {
    let engine = Engine::new();
    let err = engine
        .open_bytes(vec![0u8; 123], 0, None)
        .expect_err("garbage should not open");
    assert!(matches!(err, CoreError::FormatDetectionFailed { .. }));
}

#[test]
fn wrong_hint_surfaces_a_format_error() {
    let engine = Engine::new();
    let bytes = fixture_bytes(SaveFormat::Snes);
    let err = engine
        .open_bytes(bytes, 0, Some(SaveFormat::Playstation))
        .expect_err("SNES bytes should not open as PSX");
    assert!(matches!(
        err,
        CoreError::Save(SaveError::BadMagic { .. }) | CoreError::Save(SaveError::TruncatedRecord { .. })
    ));
}

#[test]
fn load_save_round_trip_preserves_every_field() {
    for format in SaveFormat::ALL {
        let engine = Engine::new();
        let bytes = fixture_bytes(format);
        let session = engine
            .open_bytes(bytes.clone(), 0, Some(format))
            .expect("open fixture");

        let emitted = session.to_bytes(0).expect("re-emit");
        assert_eq!(emitted, bytes, "unmodified emit differs for {format:?}");

        let reopened = engine
            .open_bytes(emitted, 0, Some(format))
            .expect("reopen emitted bytes");
        assert_eq!(reopened.graph(), session.graph());
    }
}

#[test]
fn snes_slots_are_independent() {
    let engine = Engine::new();
    let mut session = engine.new_session(SaveFormat::Snes, 0).unwrap();
    session.graph_mut().gold = 42;
    let bytes = session.to_bytes(2).expect("save slot 2");

    // Slot 2 carries the data; slot 0 is still factory-blank.
    let doc = Document::new(bytes, SaveFormat::Snes).unwrap();
    assert_eq!(doc.load(2).unwrap().gold, 42);
    assert_eq!(doc.load(0).unwrap().gold, 0);
}

#[test]
fn undo_redo_walks_edit_history() {
    let engine = Engine::new();
    let mut session = engine.new_session(SaveFormat::Snes, 0).unwrap();

    session.checkpoint();
    session.graph_mut().gold = 1_000;
    session.checkpoint();
    session.graph_mut().gold = 2_000;

    assert_eq!(session.undo().unwrap().gold, 1_000);
    assert_eq!(session.undo().unwrap().gold, 0);
    assert!(matches!(
        session.undo(),
        Err(CoreError::Undo(ffvi_core::undo::UndoError::NothingToUndo))
    ));

    assert_eq!(session.redo().unwrap().gold, 1_000);
    assert_eq!(session.redo().unwrap().gold, 2_000);
    assert!(matches!(
        session.redo(),
        Err(CoreError::Undo(ffvi_core::undo::UndoError::NothingToRedo))
    ));
}

#[test]
fn auto_fix_is_undoable_and_idempotent() {
    let engine = Engine::new();
    let mut session = engine.new_session(SaveFormat::Snes, 0).unwrap();
    session.graph_mut().character_mut(0).unwrap().hp = StatPair { current: 9_999, max: 100 };

    let result = session.validate();
    assert!(!result.is_valid());

    let fixed = session.auto_fix();
    assert_eq!(fixed, 1);
    assert_eq!(session.graph().character(0).unwrap().hp.current, 100);
    assert_eq!(session.auto_fix(), 0);

    // Two undos: past the no-op fix's checkpoint, then the real one.
    session.undo().unwrap();
    session.undo().unwrap();
    assert_eq!(session.graph().character(0).unwrap().hp.current, 9_999);
}

#[test]
fn quick_state_round_trip() {
    let dir = tempfile::tempdir().expect("temp dir");
    let engine = Engine::new();
    let mut session = engine.new_session(SaveFormat::Playstation, 0).unwrap();
    session.graph_mut().gold = 31_337;
    session.graph_mut().character_mut(5).unwrap().level = 44;
    session.graph_mut().character_mut(5).unwrap().exp = 240_000;

    let saved = session.graph().clone();
    let path = session.quick_save(dir.path(), 1).expect("quick save");
    assert!(path.ends_with("quickstate1.json.gz"));

    session.graph_mut().gold = 0;
    session.quick_load(dir.path(), 1).expect("quick load");
    assert_eq!(session.graph(), &saved);

    // The pre-load state sits one undo back.
    assert_eq!(session.undo().unwrap().gold, 0);
}

#[test]
fn character_art_attaches_from_rom() {
    let engine = Engine::new();
    let mut session = engine.new_session(SaveFormat::Snes, 0).unwrap();
    session.attach_rom(ffvi_core::rom::RomImage::from_bytes(vec![0u8; 0x28_0000]));
    session.load_character_art(0).expect("field sprite extracts");

    let terra = session.graph().character(0).unwrap();
    let sprite = terra.sprite.as_ref().expect("sprite attached");
    assert_eq!((sprite.width, sprite.height, sprite.frames), (16, 24, 3));
    assert!(sprite.palette.is_some());
}

#[test]
fn character_art_without_rom_is_a_typed_error() {
    let engine = Engine::new();
    let mut session = engine.new_session(SaveFormat::Snes, 0).unwrap();
    assert!(matches!(
        session.load_character_art(0),
        Err(CoreError::Rom(ffvi_core::rom::RomError::NotLoaded))
    ));
}

#[test]
fn quick_load_missing_slot_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let engine = Engine::new();
    let mut session = engine.new_session(SaveFormat::Snes, 0).unwrap();
    assert!(matches!(
        session.quick_load(dir.path(), 4),
        Err(CoreError::Io(_))
    ));
}
