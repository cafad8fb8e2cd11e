/// Playtest: interactive shell for walking through stages without a game.
///
/// Usage: playtest --stage <path> [--stage <path> ...] [--settings <path>]
///                 [--transition <path>] [--scores <path>]
///
/// Commands:
///   enter <id> [who]    something steps onto an altar
///   exit <id> [who]     something steps off an altar
///   awaken <id>         force an altar awake
///   talk <id>           replay an altar's awaken dialogue if unspent
///   approach <door>     walk up to an altar-sealed door
///   near <prop>         walk into range of a chest, key door or sign
///   away <prop>         walk out of range
///   open <chest>        open a revealed chest
///   key                 take the key from the chest overlay
///   use <door>          try the key on a locked door
///   read <sign>         read a sign
///   dismiss             close the dialogue box
///   tick <secs>         advance time
///   pause | resume | restart | menu
///   complete            reach the stage exit
///   status <door>       show a door's requirement
///   despawn <prop>      remove a prop's altar listeners
///   state               summary of the current stage
///   help | quit

use altar_engine::core::dialogue::DialogueSequencer;
use altar_engine::core::flow::{TransitionScene, MAIN_MENU_SCENE};
use altar_engine::core::scores::{format_best, format_time, RonFileStore};
use altar_engine::core::sequence::SequenceSlot;
use altar_engine::core::stage::{Stage, StageError};
use altar_engine::schema::altar::AltarId;
use altar_engine::schema::config::{EngineSettings, StageConfig, TransitionConfig};
use altar_engine::schema::effect::Effect;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

const TRANSITION_SCENE: &str = "TransitionScene";

/// Interactive stage playtest shell
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Stage files, in play order. The first one is loaded at start.
    #[arg(long = "stage", value_name = "PATH", required = true)]
    stages: Vec<PathBuf>,

    /// Engine settings file.
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Transition scene file.
    #[arg(long, value_name = "PATH")]
    transition: Option<PathBuf>,

    /// Persist best times to this RON file instead of memory.
    #[arg(long, value_name = "PATH")]
    scores: Option<PathBuf>,
}

struct Session {
    cli: Cli,
    configs: Vec<StageConfig>,
    settings: EngineSettings,
    transition: TransitionConfig,
}

impl Session {
    fn load(cli: Cli) -> Result<Self, StageError> {
        let settings = match &cli.settings {
            Some(path) => EngineSettings::load_from_ron(path)?,
            None => EngineSettings::default(),
        };
        let transition = match &cli.transition {
            Some(path) => TransitionConfig::load_from_ron(path)?,
            None => TransitionConfig::default(),
        };
        let configs = cli
            .stages
            .iter()
            .map(|path| StageConfig::load_from_ron(path))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            cli,
            configs,
            settings,
            transition,
        })
    }

    fn start(&self, scene: &str) -> Result<Option<Stage>, StageError> {
        let Some(config) = self.configs.iter().find(|c| c.name == scene) else {
            return Ok(None);
        };
        let builder = Stage::builder()
            .with_config(config.clone())
            .with_settings(self.settings.clone());
        let stage = match &self.cli.scores {
            Some(path) => builder.with_store(RonFileStore::open(path)?).build()?,
            None => builder.build()?,
        };
        println!("--- {} ---", stage.name());
        Ok(Some(stage))
    }

    /// Play the transition scene to its end and return the scene it loads.
    fn run_transition(&self) -> String {
        let mut dialogue = DialogueSequencer::new(&self.settings);
        let mut slot = SequenceSlot::new();
        let mut out = Vec::new();
        let mut scene = TransitionScene::start(
            &self.transition,
            &self.settings,
            &mut slot,
            &mut dialogue,
            &mut out,
        );
        println!("  [transition] {}", dialogue.visible_text());
        while !scene.is_finished() {
            scene.tick(0.5, &mut dialogue, &mut out);
        }
        print_effects(&out);
        scene.next_scene().to_string()
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let session = match Session::load(cli) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let first = session.configs[0].name.clone();
    let mut stage = match session.start(&first) {
        Ok(Some(stage)) => stage,
        Ok(None) => {
            eprintln!("ERROR: no stage named '{}'", first);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };
    print_effects(&stage.drain_effects());
    println!("Type 'help' for commands.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{}> ", stage.name());
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(cmd) = parts.first() else {
            continue;
        };

        match cmd.to_lowercase().as_str() {
            "quit" | "exit" | "q" if parts.len() == 1 => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            _ => {
                if let Err(e) = run_command(&mut stage, &parts) {
                    println!("  error: {}", e);
                }
            }
        }

        let effects = stage.drain_effects();
        print_effects(&effects);
        print_dialogue(&stage);

        let Some(scene) = effects.iter().rev().find_map(|e| match e {
            Effect::LoadScene(scene) => Some(scene.clone()),
            _ => None,
        }) else {
            continue;
        };
        stage.end_session();

        let scene = if scene == TRANSITION_SCENE {
            session.run_transition()
        } else {
            scene
        };
        if scene == MAIN_MENU_SCENE {
            println!("Back at the main menu. Goodbye.");
            break;
        }
        match session.start(&scene) {
            Ok(Some(next)) => {
                stage = next;
                print_effects(&stage.drain_effects());
            }
            Ok(None) => {
                println!("No stage named '{}' was loaded. Goodbye.", scene);
                break;
            }
            Err(e) => {
                eprintln!("ERROR: {}", e);
                break;
            }
        }
    }
}

fn run_command(stage: &mut Stage, parts: &[&str]) -> Result<(), StageError> {
    let arg = |i: usize| parts.get(i).copied().unwrap_or("");
    let altar = || AltarId(arg(1).parse().unwrap_or(0));
    let who = || parts.get(2).copied().unwrap_or("Player");

    match parts[0].to_lowercase().as_str() {
        "enter" => {
            stage.trigger_enter(altar(), who())?;
        }
        "exit" => {
            stage.trigger_exit(altar(), who())?;
        }
        "awaken" => {
            stage.force_awaken(altar())?;
        }
        "approach" => {
            if !stage.approach_door(arg(1))? {
                println!("  (cooling down)");
            }
        }
        "near" | "away" => set_nearby(stage, arg(1), parts[0].eq_ignore_ascii_case("near"))?,
        "open" => {
            if !stage.open_chest(arg(1))? {
                println!("  the chest does not open");
            }
        }
        "key" => {
            if !stage.confirm_key() {
                println!("  no key to take");
            }
        }
        "use" => {
            stage.interact_key_door(arg(1))?;
        }
        "read" => {
            if stage.read_sign(arg(1))?.is_none() {
                println!("  the sign is blank");
            }
        }
        "talk" => {
            if stage.trigger_altar_dialogue(altar())?.is_none() {
                println!("  the altar is silent");
            }
        }
        "dismiss" => {
            stage.dismiss_dialogue();
        }
        "tick" => stage.tick(arg(1).parse().unwrap_or(0.1)),
        "pause" => stage.pause(),
        "resume" => stage.resume(),
        "restart" => stage.restart(),
        "menu" => stage.main_menu(),
        "complete" => match stage.complete()? {
            Some(completion) => println!(
                "  finished in {} (best {})",
                format_time(completion.time, true),
                format_best(completion.best, true)
            ),
            None => println!("  already complete"),
        },
        "status" => println!("  {}", stage.door_status(arg(1))?),
        "despawn" => {
            stage.despawn(arg(1))?;
        }
        "state" => print_state(stage),
        other => println!("  unknown command '{}'. Type 'help'.", other),
    }
    Ok(())
}

fn set_nearby(stage: &mut Stage, prop: &str, nearby: bool) -> Result<(), StageError> {
    let config = stage.config();
    if config.chests.iter().any(|c| c.name == prop) {
        stage.set_chest_nearby(prop, nearby)
    } else if config.key_doors.iter().any(|d| d.name == prop) {
        stage.set_key_door_nearby(prop, nearby)
    } else {
        stage.set_sign_nearby(prop, nearby)
    }
}

fn print_state(stage: &Stage) {
    let config = stage.config();
    println!("  {}", stage.clock().label(config.timer.show_milliseconds));
    println!(
        "  best: {}",
        format_best(stage.scores().best(stage.name()), config.timer.show_milliseconds)
    );
    for altar in &config.altars {
        println!(
            "  altar {} '{}': {} ({} on it)",
            altar.id,
            altar.name,
            if stage.is_altar_awakened(altar.id) {
                "awakened"
            } else {
                "dormant"
            },
            stage.altar_occupants(altar.id).unwrap_or(0)
        );
    }
    for door in &config.altar_doors {
        let open = stage.is_door_open(&door.name).unwrap_or(false);
        println!("  door '{}': {}", door.name, if open { "open" } else { "closed" });
    }
    for chest in &config.chests {
        let visible = stage.is_chest_visible(&chest.name).unwrap_or(false);
        let open = stage.is_chest_open(&chest.name).unwrap_or(false);
        println!("  chest '{}': visible={} open={}", chest.name, visible, open);
    }
    println!(
        "  key={} awaiting_key={} frozen={} paused={}",
        stage.has_key(),
        stage.is_awaiting_key(),
        stage.is_player_frozen(),
        stage.is_paused()
    );
}

fn print_effects(effects: &[Effect]) {
    for effect in effects {
        println!("  -> {:?}", effect);
    }
}

fn print_dialogue(stage: &Stage) {
    let dialogue = stage.dialogue();
    if dialogue.is_showing() {
        let marker = if dialogue.is_typing() { "..." } else { "" };
        println!("  [dialogue] {}{}", dialogue.visible_text(), marker);
    }
}

fn print_help() {
    println!("Commands:");
    println!("  enter <id> [who] / exit <id> [who] / awaken <id> / talk <id>");
    println!("  approach <door> / status <door>");
    println!("  near <prop> / away <prop>");
    println!("  open <chest> / key / use <door> / read <sign>");
    println!("  dismiss / tick <secs>");
    println!("  pause / resume / restart / menu / complete");
    println!("  despawn <prop> / state / help / quit");
}
