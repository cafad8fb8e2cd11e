/// Walkthrough: scripted play of both bundled stages.
///
/// Stage 1: wake the three altars, open the chest, take the key, unlock the
/// vault and leave. The transition scene follows. Stage 2: wake both
/// shrines and reach the exit for the congratulations screen.
///
/// Run with: cargo run --example walkthrough

use altar_engine::core::dialogue::DialogueSequencer;
use altar_engine::core::flow::TransitionScene;
use altar_engine::core::scores::{format_best, format_time, MemoryStore};
use altar_engine::core::sequence::SequenceSlot;
use altar_engine::core::stage::{Stage, StageError};
use altar_engine::schema::altar::AltarId;
use altar_engine::schema::config::{EngineSettings, TransitionConfig};
use altar_engine::schema::effect::Effect;
use std::path::Path;

const FRAME: f32 = 1.0 / 30.0;

fn main() -> Result<(), StageError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== Stage 1 ===\n");
    let mut stage = Stage::builder()
        .config_file("stage_data/stage1.ron")
        .settings_file("stage_data/settings.ron")
        .with_store(MemoryStore::new())
        .build()?;
    report(&mut stage);

    stage.set_sign_nearby("welcome_sign", true)?;
    stage.read_sign("welcome_sign")?;
    settle(&mut stage);

    stage.approach_door("sealed_door")?;
    settle(&mut stage);

    for altar in 1..=3 {
        stage.trigger_enter(AltarId(altar), "Player")?;
        settle(&mut stage);
        stage.trigger_exit(AltarId(altar), "Player")?;
        report(&mut stage);
    }

    stage.set_chest_nearby("ancient_chest", true)?;
    stage.open_chest("ancient_chest")?;
    run_for(&mut stage, 1.2);
    stage.confirm_key();
    settle(&mut stage);

    stage.set_key_door_nearby("vault_door", true)?;
    stage.interact_key_door("vault_door")?;
    settle(&mut stage);

    if let Some(completion) = stage.complete()? {
        println!(
            "  stage 1 time {} (best {})",
            format_time(completion.time, true),
            format_best(completion.best, true)
        );
    }
    let next = run_until_load(&mut stage);
    stage.end_session();

    println!("\n=== {} ===\n", next.as_deref().unwrap_or("?"));
    let settings = EngineSettings::load_from_ron(Path::new("stage_data/settings.ron"))?;
    let transition = TransitionConfig::load_from_ron(Path::new("stage_data/transition.ron"))?;
    let mut dialogue = DialogueSequencer::new(&settings);
    let mut slot = SequenceSlot::new();
    let mut out = Vec::new();
    let mut scene =
        TransitionScene::start(&transition, &settings, &mut slot, &mut dialogue, &mut out);
    println!("  [dialogue] {}", dialogue.visible_text());
    while !scene.is_finished() {
        scene.tick(FRAME, &mut dialogue, &mut out);
    }
    print_effects(&out);

    println!("\n=== Stage 2 ===\n");
    let mut stage = Stage::builder()
        .config_file("stage_data/stage2.ron")
        .settings_file("stage_data/settings.ron")
        .build()?;
    report(&mut stage);

    stage.trigger_enter(AltarId(1), "Player")?;
    settle(&mut stage);
    println!("  exit door: {}", stage.door_status("exit_door")?);
    stage.trigger_enter(AltarId(2), "Crate")?;
    settle(&mut stage);
    println!("  exit door: {}", stage.door_status("exit_door")?);

    if let Some(completion) = stage.complete()? {
        println!(
            "  stage 2 time {} (best {})",
            format_time(completion.time, false),
            format_best(completion.best, false)
        );
    }
    report(&mut stage);
    println!("  player frozen: {}", stage.is_player_frozen());

    Ok(())
}

/// Run frames until the dialogue box can be closed, then close it.
fn settle(stage: &mut Stage) {
    report(stage);
    let mut guard = 0;
    while stage.dialogue().is_showing() && guard < 1000 {
        stage.tick(FRAME);
        if stage.dialogue().can_dismiss() {
            println!("  [dialogue] {}", stage.dialogue().message());
            stage.dismiss_dialogue();
        }
        guard += 1;
    }
    report(stage);
}

fn run_for(stage: &mut Stage, seconds: f32) {
    let mut elapsed = 0.0;
    while elapsed < seconds {
        stage.tick(FRAME);
        elapsed += FRAME;
    }
    report(stage);
}

fn run_until_load(stage: &mut Stage) -> Option<String> {
    for _ in 0..300 {
        stage.tick(FRAME);
        let effects = stage.drain_effects();
        print_effects(&effects);
        if let Some(scene) = effects.iter().find_map(|e| match e {
            Effect::LoadScene(scene) => Some(scene.clone()),
            _ => None,
        }) {
            return Some(scene);
        }
    }
    None
}

fn report(stage: &mut Stage) {
    print_effects(&stage.drain_effects());
}

fn print_effects(effects: &[Effect]) {
    for effect in effects {
        println!("  -> {:?}", effect);
    }
}
