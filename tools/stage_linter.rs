/// Stage Linter: validates stage files and fuzzes their gating.
///
/// Usage: stage_linter <path> [--seed <n>] [--steps <n>]
///
/// `<path>` is a stage file or a directory searched for `.ron` stage files.
/// Every stage that loads is then played with random altar traffic, and
/// each prop is checked against its requirement after every step.

use altar_engine::core::stage::Stage;
use altar_engine::schema::config::{EngineSettings, StageConfig, TransitionConfig};
use altar_engine::schema::gate::GateMode;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::process;

/// Validate stage files and fuzz their altar gating
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Stage file or directory of stage files.
    path: PathBuf,

    /// Seed for the random play-through.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Random steps per stage. Zero skips the fuzz pass.
    #[arg(long, default_value_t = 500)]
    steps: usize,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut files = Vec::new();
    if cli.path.is_file() {
        files.push(cli.path.clone());
    } else if cli.path.is_dir() {
        collect_ron_files(&cli.path, &mut files);
        files.sort();
    } else {
        eprintln!("ERROR: Path '{}' does not exist", cli.path.display());
        process::exit(1);
    }

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut stages = Vec::new();

    for file in &files {
        match StageConfig::load_from_ron(file) {
            Ok(config) => {
                println!("  Loaded: {} ({})", file.display(), config.name);
                warnings.extend(lint_stage(&config));
                stages.push(config);
            }
            // Settings and transition files share the directory
            Err(e) if is_auxiliary(file) => {
                log::debug!("skipping {}: {}", file.display(), e);
            }
            Err(e) => errors.push(format!("{}: {}", file.display(), e)),
        }
    }

    if cli.steps > 0 {
        for config in &stages {
            errors.extend(fuzz_stage(config, cli.seed, cli.steps));
        }
    }

    println!("\n=== Stage Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} stages, {} errors, {} warnings",
        stages.len(),
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn collect_ron_files(dir: &Path, files: &mut Vec<PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_ron_files(&path, files);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                files.push(path);
            }
        }
    }
}

/// A file that parses as a transition or settings file rather than a stage.
fn is_auxiliary(path: &Path) -> bool {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return false;
    };
    !contents.contains("name:")
        && (TransitionConfig::parse_ron(&contents).is_ok()
            || EngineSettings::parse_ron(&contents).is_ok())
}

/// Legal but suspicious configuration.
fn lint_stage(config: &StageConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.altars.is_empty() {
        warnings.push(format!("{}: stage has no altars", config.name));
    }

    for door in &config.altar_doors {
        if door.required_altars.is_empty() {
            warnings.push(format!(
                "{}: door '{}' has no required altars and never opens",
                config.name, door.name
            ));
        }
        if door.mode == GateMode::Any && door.required_altars.len() == 1 {
            warnings.push(format!(
                "{}: door '{}' uses Any with a single altar",
                config.name, door.name
            ));
        }
    }

    let chain = config.chain_altar_count();
    for chest in &config.chests {
        if chest.altars_required > chain {
            warnings.push(format!(
                "{}: chest '{}' needs {} chain altars but only {} exist",
                config.name, chest.name, chest.altars_required, chain
            ));
        }
    }

    for altar in &config.altars {
        if !altar.lock_to_fixed_dialogue
            && altar.show_dialogue_on_awaken
            && altar.messages.len() < chain
        {
            warnings.push(format!(
                "{}: altar '{}' has {} chain messages for {} chain altars",
                config.name,
                altar.name,
                altar.messages.len(),
                chain
            ));
        }
    }

    warnings
}

/// Random altar traffic with a consistency check after every step.
fn fuzz_stage(config: &StageConfig, seed: u64, steps: usize) -> Vec<String> {
    let mut errors = Vec::new();
    let mut stage = match Stage::builder().with_config(config.clone()).build() {
        Ok(stage) => stage,
        Err(e) => return vec![format!("{}: {}", config.name, e)],
    };
    if config.altars.is_empty() {
        return errors;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let occupants = ["Player", "Crate"];

    for step in 0..steps {
        let altar = config.altars[rng.gen_range(0..config.altars.len())].id;
        let who = occupants[rng.gen_range(0..occupants.len())];
        let result = match rng.gen_range(0..5) {
            0 | 1 => stage.trigger_enter(altar, who).map(|_| ()),
            2 => stage.trigger_exit(altar, who).map(|_| ()),
            3 => {
                stage.dismiss_dialogue();
                Ok(())
            }
            _ => {
                stage.tick(rng.gen_range(0.0..0.3));
                Ok(())
            }
        };
        if let Err(e) = result {
            errors.push(format!("{} step {}: {}", config.name, step, e));
            break;
        }

        if let Some(problem) = check_consistency(config, &stage) {
            errors.push(format!(
                "{} step {} (seed {}): {}",
                config.name, step, seed, problem
            ));
            break;
        }
    }
    stage.end_session();
    errors
}

fn check_consistency(config: &StageConfig, stage: &Stage) -> Option<String> {
    let registry = stage.registry();
    if registry.awakened_chain_count() > registry.total_awakened_count() {
        return Some(format!(
            "chain count {} exceeds total {}",
            registry.awakened_chain_count(),
            registry.total_awakened_count()
        ));
    }

    for door in &config.altar_doors {
        let expected = door.requirement().is_satisfied(registry);
        if stage.is_door_open(&door.name).ok()? != expected {
            return Some(format!(
                "door '{}' is {} but its requirement says {}",
                door.name,
                open_label(!expected),
                open_label(expected)
            ));
        }
    }

    for chest in &config.chests {
        let expected = registry.awakened_chain_count() >= chest.altars_required;
        if stage.is_chest_visible(&chest.name).ok()? != expected {
            return Some(format!(
                "chest '{}' visibility disagrees with chain count {}",
                chest.name,
                registry.awakened_chain_count()
            ));
        }
    }

    for pillar in &config.pillars {
        let expected = registry.is_awakened(pillar.altar);
        if stage.is_pillar_glowing(&pillar.name).ok()? != expected {
            return Some(format!(
                "pillar '{}' glow disagrees with altar {}",
                pillar.name,
                pillar.altar
            ));
        }
    }

    None
}

fn open_label(open: bool) -> &'static str {
    if open {
        "open"
    } else {
        "closed"
    }
}
