/// Registry property tests: seeded random command sequences.

use altar_engine::core::gate::{GateCondition, GateEvaluator, GateTransition};
use altar_engine::core::registry::{listener_fn, AltarRegistry, Reactions};
use altar_engine::core::stage::Stage;
use altar_engine::schema::altar::{AltarEvent, AltarId};
use altar_engine::schema::config::StageConfig;
use altar_engine::schema::gate::GateRequirement;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

const ALTARS: u32 = 6;

/// Altars 0..3 count toward the chain, 3..6 do not.
fn counts_in_chain(id: u32) -> bool {
    id < 3
}

#[test]
fn chain_count_never_exceeds_total() {
    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut registry = AltarRegistry::new();
        let mut model: BTreeSet<u32> = BTreeSet::new();

        for _ in 0..200 {
            let id = rng.gen_range(0..ALTARS);
            let awaken = rng.gen_bool(0.6);
            let dispatch = if awaken {
                registry.awaken(AltarId(id), counts_in_chain(id))
            } else {
                registry.deactivate(AltarId(id), counts_in_chain(id))
            };

            // An event fires exactly when the flag flips
            let changed = if awaken {
                model.insert(id)
            } else {
                model.remove(&id)
            };
            assert_eq!(dispatch.events.len(), usize::from(changed), "seed {seed}");

            let chain = model.iter().filter(|id| counts_in_chain(**id)).count();
            assert_eq!(registry.awakened_chain_count(), chain, "seed {seed}");
            assert_eq!(registry.total_awakened_count(), model.len(), "seed {seed}");
            assert!(registry.awakened_chain_count() <= registry.total_awakened_count());
        }
    }
}

#[test]
fn gates_agree_with_requirement_after_every_event() {
    for seed in 0..10u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut registry = AltarRegistry::new();
        let all = Rc::new(RefCell::new(GateEvaluator::new(
            "all",
            GateCondition::Altars(GateRequirement::all(&[0, 1, 2])),
        )));
        let any = Rc::new(RefCell::new(GateEvaluator::new(
            "any",
            GateCondition::Altars(GateRequirement::any(&[3, 4])),
        )));
        let transitions = Rc::new(RefCell::new(Vec::new()));

        for gate in [Rc::clone(&all), Rc::clone(&any)] {
            let log = Rc::clone(&transitions);
            registry.subscribe(listener_fn(move |_event, altars, _out: &mut Reactions| {
                let mut gate = gate.borrow_mut();
                if let Some(transition) = gate.recompute(altars) {
                    log.borrow_mut().push((gate.name().to_string(), transition));
                }
            }));
        }

        for _ in 0..150 {
            let id = rng.gen_range(0..ALTARS);
            if rng.gen_bool(0.5) {
                registry.awaken(AltarId(id), true);
            } else {
                registry.deactivate(AltarId(id), true);
            }
            let all_open = (0..3).all(|i| registry.is_awakened(AltarId(i)));
            let any_open = (3..5).any(|i| registry.is_awakened(AltarId(i)));
            assert_eq!(all.borrow().is_open(), all_open, "seed {seed}");
            assert_eq!(any.borrow().is_open(), any_open, "seed {seed}");
        }

        // Transitions alternate per gate, starting with Opened
        for name in ["all", "any"] {
            let sequence: Vec<GateTransition> = transitions
                .borrow()
                .iter()
                .filter(|(gate, _)| gate == name)
                .map(|(_, t)| *t)
                .collect();
            for (i, transition) in sequence.iter().enumerate() {
                let expected = if i % 2 == 0 {
                    GateTransition::Opened
                } else {
                    GateTransition::Closed
                };
                assert_eq!(*transition, expected, "seed {seed} gate {name}");
            }
        }
    }
}

#[test]
fn awakening_twice_notifies_once() {
    let mut registry = AltarRegistry::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    registry.subscribe(listener_fn(move |event: AltarEvent, _altars, _out: &mut Reactions| {
        log.borrow_mut().push(event);
    }));

    registry.awaken(AltarId(1), true);
    registry.awaken(AltarId(1), true);
    registry.deactivate(AltarId(1), true);
    registry.deactivate(AltarId(1), true);

    assert_eq!(
        *seen.borrow(),
        vec![AltarEvent::Awakened(AltarId(1)), AltarEvent::Deactivated(AltarId(1))]
    );
}

#[test]
fn random_stage_play_keeps_props_consistent() {
    let config = StageConfig::parse_ron(
        r#"(
            name: "Fuzz",
            altars: [
                (name: "a1", id: 1, stay_awakened_once: false),
                (name: "a2", id: 2, stay_awakened_once: false),
                (name: "a3", id: 3, stay_awakened_once: false),
            ],
            altar_doors: [
                (name: "both", required_altars: [1, 2]),
                (name: "either", required_altars: [2, 3], mode: Any),
            ],
            chests: [(name: "chest", altars_required: 2)],
            pillars: [(name: "p3", altar: 3)],
        )"#,
    )
    .unwrap();

    for seed in 0..10u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut stage = Stage::builder().with_config(config.clone()).build().unwrap();

        for _ in 0..120 {
            let id = AltarId(rng.gen_range(1..=3));
            match rng.gen_range(0..4) {
                0 | 1 => {
                    stage.trigger_enter(id, "Player").unwrap();
                }
                2 => {
                    stage.trigger_exit(id, "Player").unwrap();
                }
                _ => stage.tick(rng.gen_range(0.0..0.5)),
            }
            if rng.gen_bool(0.3) {
                stage.dismiss_dialogue();
            }

            let awake = |i: u32| stage.is_altar_awakened(AltarId(i));
            assert_eq!(stage.is_door_open("both").unwrap(), awake(1) && awake(2));
            assert_eq!(stage.is_door_open("either").unwrap(), awake(2) || awake(3));
            assert_eq!(
                stage.is_chest_visible("chest").unwrap(),
                stage.registry().awakened_chain_count() >= 2
            );
            assert_eq!(stage.is_pillar_glowing("p3").unwrap(), awake(3));
            assert!(stage.dialogue().is_showing() || stage.dialogue().message().is_empty());
        }
    }
}
