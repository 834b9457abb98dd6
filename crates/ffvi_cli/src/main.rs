use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use ffvi_core::catalog;
use ffvi_core::core_api::{Engine, Session};
use ffvi_core::rom::RomImage;
use ffvi_core::save::SaveFormat;
use ffvi_core::sprite::AnimationData;
use ffvi_core::state::{StatPreset, StateGraph};
use ffvi_core::validate::Severity;
use serde_json::{Map as JsonMap, Value as JsonValue, json};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum PresetArg {
    Max,
    High,
    Starter,
}

impl From<PresetArg> for StatPreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Max => StatPreset::Max,
            PresetArg::High => StatPreset::High,
            PresetArg::Starter => StatPreset::Starter,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Save file to open; omit with --new to start from a blank buffer.
    #[arg(value_name = "SAVE")]
    path: Option<PathBuf>,

    /// Save layout tag (snes, psx); auto-detected when omitted.
    #[arg(long)]
    format: Option<String>,

    /// Save slot inside the buffer.
    #[arg(long, default_value_t = 0)]
    slot: usize,

    /// Start from a factory-blank buffer instead of reading a file.
    #[arg(long, requires = "format")]
    new: bool,

    // --- queries ---
    #[arg(long)]
    summary: bool,
    #[arg(long)]
    party: bool,
    #[arg(long)]
    world: bool,
    #[arg(long)]
    characters: bool,
    #[arg(long)]
    validate: bool,
    #[arg(long)]
    json: bool,

    // --- per-character edits ---
    /// Character name or roster id for the --set/--preset/--sprite flags.
    #[arg(long)]
    character: Option<String>,
    #[arg(long = "set-level")]
    set_level: Option<u8>,
    #[arg(long = "set-exp")]
    set_exp: Option<u32>,
    #[arg(long = "set-hp")]
    set_hp: Option<u16>,
    #[arg(long = "set-max-hp")]
    set_max_hp: Option<u16>,
    #[arg(long = "set-mp")]
    set_mp: Option<u16>,
    #[arg(long = "set-max-mp")]
    set_max_mp: Option<u16>,
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,
    #[arg(long)]
    heal: bool,
    #[arg(long = "best-equip")]
    best_equip: bool,
    #[arg(long = "basic-equip")]
    basic_equip: bool,
    #[arg(long)]
    magitek: bool,
    #[arg(long = "reset-stats")]
    reset_stats: bool,

    // --- graph-wide edits ---
    #[arg(long = "heal-all")]
    heal_all: bool,
    #[arg(long = "max-all")]
    max_all: bool,
    #[arg(long = "set-gold")]
    set_gold: Option<u32>,
    #[arg(long = "auto-fix")]
    auto_fix: bool,

    // --- ROM extraction ---
    /// Cartridge image for sprite/palette extraction.
    #[arg(long)]
    rom: Option<PathBuf>,
    #[arg(long, requires = "character", requires = "rom")]
    sprite: bool,
    #[arg(long = "battle-sprite", requires = "character", requires = "rom")]
    battle_sprite: bool,
    #[arg(long, requires = "character", requires = "rom")]
    palette: bool,

    /// Write the (possibly edited) buffer here.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Slot to write; defaults to --slot.
    #[arg(long = "out-slot")]
    out_slot: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(message) = run(&cli) {
        eprintln!("error: {message}");
        process::exit(2);
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let engine = Engine::new();
    let format = cli
        .format
        .as_deref()
        .map(SaveFormat::from_tag)
        .transpose()
        .map_err(|e| e.to_string())?;

    let mut session = if cli.new {
        let format = format.ok_or("--new requires --format")?;
        engine
            .new_session(format, cli.slot)
            .map_err(|e| e.to_string())?
    } else {
        let path = cli.path.as_ref().ok_or("no save file given (or use --new)")?;
        engine
            .open_path(path, cli.slot, format)
            .map_err(|e| e.to_string())?
    };

    if let Some(rom_path) = &cli.rom {
        let rom = RomImage::load(rom_path).map_err(|e| e.to_string())?;
        session.attach_rom(rom);
    }

    let edited = apply_edits(cli, &mut session)?;

    let mut output = JsonMap::new();

    if cli.summary || no_query_requested(cli) {
        render_summary(&session, cli.json, &mut output);
    }
    if cli.party {
        render_party(session.graph(), cli.json, &mut output);
    }
    if cli.characters {
        render_characters(session.graph(), cli.json, &mut output);
    }
    if cli.world {
        render_world(session.graph(), cli.json, &mut output);
    }
    if cli.validate {
        render_validation(&session, cli.json, &mut output);
    }
    if cli.sprite || cli.battle_sprite || cli.palette {
        render_rom_resources(cli, &session, &mut output)?;
    }

    if cli.json {
        let text = serde_json::to_string_pretty(&JsonValue::Object(output))
            .map_err(|e| e.to_string())?;
        println!("{text}");
    }

    if let Some(out) = &cli.out {
        let slot = cli.out_slot.unwrap_or(cli.slot);
        session.save_to_path(out, slot).map_err(|e| e.to_string())?;
        if !cli.json {
            println!("wrote {} (slot {slot})", out.display());
        }
    } else if edited {
        tracing::warn!("edits applied but no --out given; nothing written");
    }

    Ok(())
}

fn no_query_requested(cli: &Cli) -> bool {
    !(cli.summary
        || cli.party
        || cli.world
        || cli.characters
        || cli.validate
        || cli.sprite
        || cli.battle_sprite
        || cli.palette)
}

fn resolve_character(name_or_id: &str) -> Result<u8, String> {
    if let Ok(id) = name_or_id.parse::<u8>() {
        if catalog::character_name(id).is_some() {
            return Ok(id);
        }
        return Err(format!("character id {id} out of roster range"));
    }
    catalog::character_id_by_name(name_or_id)
        .ok_or_else(|| format!("unknown character {name_or_id:?}"))
}

fn apply_edits(cli: &Cli, session: &mut Session) -> Result<bool, String> {
    let has_character_edit = cli.set_level.is_some()
        || cli.set_exp.is_some()
        || cli.set_hp.is_some()
        || cli.set_max_hp.is_some()
        || cli.set_mp.is_some()
        || cli.set_max_mp.is_some()
        || cli.preset.is_some()
        || cli.heal
        || cli.best_equip
        || cli.basic_equip
        || cli.magitek
        || cli.reset_stats;
    let has_graph_edit = cli.heal_all || cli.max_all || cli.set_gold.is_some();

    if !(has_character_edit || has_graph_edit || cli.auto_fix) {
        return Ok(false);
    }

    if has_character_edit || has_graph_edit {
        session.checkpoint();
        let graph = session.graph_mut();

        if has_character_edit {
            let selector = cli
                .character
                .as_ref()
                .ok_or("per-character edits need --character")?;
            let id = resolve_character(selector)?;
            let character = graph
                .character_mut(id)
                .ok_or_else(|| format!("character {id} missing from this save"))?;

            if cli.reset_stats {
                character.reset_stats();
            }
            if let Some(preset) = cli.preset {
                character.apply_preset(preset.into());
            }
            if let Some(level) = cli.set_level {
                character.level = level;
            }
            if let Some(exp) = cli.set_exp {
                character.exp = exp;
            }
            if let Some(hp) = cli.set_hp {
                character.hp.current = hp;
            }
            if let Some(hp) = cli.set_max_hp {
                character.hp.max = hp;
            }
            if let Some(mp) = cli.set_mp {
                character.mp.current = mp;
            }
            if let Some(mp) = cli.set_max_mp {
                character.mp.max = mp;
            }
            if cli.best_equip {
                character.best_equipment();
            }
            if cli.basic_equip {
                character.basic_equipment();
            }
            if cli.magitek {
                character.equip_magitek();
            }
            if cli.heal {
                character.heal();
            }
        }

        if cli.max_all {
            graph.max_all();
        }
        if cli.heal_all {
            graph.heal_all();
        }
        if let Some(gold) = cli.set_gold {
            graph.gold = gold;
        }
    }

    if cli.auto_fix {
        let fixed = session.auto_fix();
        if !cli.json {
            println!("auto_fix={fixed}");
        }
    }

    Ok(true)
}

fn render_summary(session: &Session, json: bool, output: &mut JsonMap<String, JsonValue>) {
    let graph = session.graph();
    let enabled = graph.characters.iter().filter(|c| c.enabled).count();
    if json {
        output.insert(
            "summary".to_string(),
            json!({
                "format": session.format().tag(),
                "slot": session.slot(),
                "enabled_characters": enabled,
                "gold": graph.gold,
                "steps": graph.steps,
                "play_time_seconds": graph.play_time_seconds,
            }),
        );
    } else {
        println!("format={}", session.format().tag());
        println!("slot={}", session.slot());
        println!("enabled_characters={enabled}");
        println!("gold={}", graph.gold);
        println!("steps={}", graph.steps);
        println!("play_time_seconds={}", graph.play_time_seconds);
    }
}

fn render_party(graph: &StateGraph, json: bool, output: &mut JsonMap<String, JsonValue>) {
    let names: Vec<String> = graph
        .party_members()
        .iter()
        .map(|c| c.name.clone())
        .collect();
    if json {
        output.insert(
            "party".to_string(),
            json!({ "enabled": graph.party.enabled, "members": names }),
        );
    } else {
        println!("party_enabled={}", graph.party.enabled);
        println!("party={}", names.join(","));
    }
}

fn render_characters(graph: &StateGraph, json: bool, output: &mut JsonMap<String, JsonValue>) {
    if json {
        let list: Vec<JsonValue> = graph
            .characters
            .iter()
            .filter(|c| c.enabled)
            .map(|c| {
                let commands: Vec<&str> = c
                    .commands
                    .iter()
                    .map(|&id| catalog::COMMAND_NAMES.get(id as usize).copied().unwrap_or("?"))
                    .collect();
                let equipment: Vec<JsonValue> = c
                    .equipment
                    .slots()
                    .into_iter()
                    .map(|id| {
                        json!({
                            "id": id,
                            "name": catalog::item(id).map(|entry| entry.name),
                        })
                    })
                    .collect();
                json!({
                    "id": c.id,
                    "name": c.name,
                    "level": c.level,
                    "exp": c.exp,
                    "hp": { "current": c.hp.current, "max": c.hp.max },
                    "mp": { "current": c.mp.current, "max": c.mp.max },
                    "commands": commands,
                    "equipment": equipment,
                    "status": c.status.active_names(),
                })
            })
            .collect();
        output.insert("characters".to_string(), JsonValue::Array(list));
    } else {
        for c in graph.characters.iter().filter(|c| c.enabled) {
            println!(
                "{}: lvl={} exp={} hp={}/{} mp={}/{}",
                c.name, c.level, c.exp, c.hp.current, c.hp.max, c.mp.current, c.mp.max
            );
        }
    }
}

fn render_world(graph: &StateGraph, json: bool, output: &mut JsonMap<String, JsonValue>) {
    let world = &graph.world;
    let map = catalog::map_name(world.map_id).unwrap_or("(unknown)");
    if json {
        let transports: Vec<JsonValue> = world
            .transports
            .iter()
            .map(|t| {
                json!({
                    "name": t.kind.name(),
                    "enabled": t.enabled,
                    "map_id": t.map_id,
                    "x": t.x,
                    "y": t.y,
                })
            })
            .collect();
        output.insert(
            "world".to_string(),
            json!({
                "map_id": world.map_id,
                "map": map,
                "x": world.player.x,
                "y": world.player.y,
                "z": world.player.z,
                "area_id": world.gps.area_id,
                "transports": transports,
            }),
        );
    } else {
        println!("map={map} ({})", world.map_id);
        println!(
            "position={:.1},{:.1},{:.1}",
            world.player.x, world.player.y, world.player.z
        );
        for t in &world.transports {
            println!(
                "transport {}: enabled={} map={:?}",
                t.kind.name(),
                t.enabled,
                t.map_id
            );
        }
    }
}

fn render_validation(session: &Session, json: bool, output: &mut JsonMap<String, JsonValue>) {
    let result = session.validate();
    if json {
        output.insert(
            "validation".to_string(),
            serde_json::to_value(&result).unwrap_or(JsonValue::Null),
        );
    } else {
        println!("valid={}", result.is_valid());
        for issue in result.errors.iter().chain(&result.warnings) {
            let tag = match issue.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            println!("{tag}: {}", issue.message);
        }
    }
}

fn render_rom_resources(
    cli: &Cli,
    session: &Session,
    output: &mut JsonMap<String, JsonValue>,
) -> Result<(), String> {
    let selector = cli.character.as_ref().expect("clap enforces --character");
    let id = resolve_character(selector)?;
    let extractor = session.rom().ok_or("no ROM attached")?;

    if cli.sprite || cli.battle_sprite {
        let sprite = if cli.sprite {
            extractor.extract_field_sprite(id)
        } else {
            extractor.extract_battle_sprite(id)
        }
        .map_err(|e| e.to_string())?;
        let animation = AnimationData::from_sprite(&sprite);

        if cli.json {
            output.insert(
                "sprite".to_string(),
                json!({
                    "id": sprite.id,
                    "width": sprite.width,
                    "height": sprite.height,
                    "frames": sprite.frames,
                    "bytes": sprite.data.len(),
                    "crc32": sprite.provenance.crc32,
                    "animation_ms": animation.total_duration_ms,
                }),
            );
        } else {
            println!(
                "sprite {} {}x{} frames={} bytes={} crc32={:08x}",
                sprite.id,
                sprite.width,
                sprite.height,
                sprite.frames,
                sprite.data.len(),
                sprite.provenance.crc32
            );
        }
    }

    if cli.palette {
        let palette = extractor
            .extract_character_palette(id)
            .map_err(|e| e.to_string())?;
        if cli.json {
            let colors: Vec<String> = palette
                .colors
                .iter()
                .map(|c| {
                    let (r, g, b) = c.to_rgb888();
                    format!("#{r:02X}{g:02X}{b:02X}")
                })
                .collect();
            output.insert("palette".to_string(), json!(colors));
        } else {
            for (index, color) in palette.colors.iter().enumerate() {
                let (r, g, b) = color.to_rgb888();
                println!("color{index:02}=#{r:02X}{g:02X}{b:02X}");
            }
        }
    }

    Ok(())
}
