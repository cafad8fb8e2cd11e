/// Altar registry: per-session altar state and the observer list that
/// broadcasts awaken/deactivate events to gated props.
///
/// Delivery is synchronous and in registration order. Listeners see the
/// already-updated state and may ask for follow-up commands, which run
/// breadth-first once the current event has reached every subscriber.

use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::schema::altar::{AltarEvent, AltarId, AltarQuery, AltarState};
use crate::schema::effect::Effect;

/// Hard cap on follow-up command depth within one root call.
pub const MAX_CHAIN_DEPTH: usize = 16;

/// A mutation request, either from the caller or from a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltarCommand {
    Awaken { id: AltarId, counts_in_chain: bool },
    Deactivate { id: AltarId, counts_in_chain: bool },
}

impl AltarCommand {
    pub fn altar(&self) -> AltarId {
        match self {
            Self::Awaken { id, .. } | Self::Deactivate { id, .. } => *id,
        }
    }
}

/// Plain altar state table. Listeners get a shared borrow of this.
#[derive(Debug, Clone, Default)]
pub struct AltarStates {
    altars: FxHashMap<AltarId, AltarState>,
}

impl AltarStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AltarId) -> Option<AltarState> {
        self.altars.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.altars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.altars.is_empty()
    }

    /// Known altar ids, sorted.
    pub fn ids(&self) -> Vec<AltarId> {
        let mut ids: Vec<AltarId> = self.altars.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn total_awakened_count(&self) -> usize {
        self.altars.values().filter(|s| s.awakened).count()
    }

    /// True only when at least one altar is known and all of them are awake.
    pub fn all_awakened(&self) -> bool {
        !self.altars.is_empty() && self.altars.values().all(|s| s.awakened)
    }

    /// Apply a command. The chain flag is always written; an event is
    /// returned only when the awakened flag actually changed.
    fn apply(&mut self, command: AltarCommand) -> Option<AltarEvent> {
        let (id, awaken, counts_in_chain) = match command {
            AltarCommand::Awaken {
                id,
                counts_in_chain,
            } => (id, true, counts_in_chain),
            AltarCommand::Deactivate {
                id,
                counts_in_chain,
            } => (id, false, counts_in_chain),
        };

        let state = self.altars.entry(id).or_default();
        state.counts_in_chain = counts_in_chain;
        if state.awakened == awaken {
            return None;
        }
        state.awakened = awaken;
        Some(if awaken {
            AltarEvent::Awakened(id)
        } else {
            AltarEvent::Deactivated(id)
        })
    }
}

impl AltarQuery for AltarStates {
    fn is_awakened(&self, id: AltarId) -> bool {
        self.altars.get(&id).is_some_and(|s| s.awakened)
    }

    fn awakened_chain_count(&self) -> usize {
        self.altars
            .values()
            .filter(|s| s.awakened && s.counts_in_chain)
            .count()
    }
}

/// What a listener hands back: effects for the presentation layer and
/// follow-up registry commands.
#[derive(Debug, Default)]
pub struct Reactions {
    effects: Vec<Effect>,
    commands: Vec<AltarCommand>,
}

impl Reactions {
    pub fn push(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn extend(&mut self, effects: impl IntoIterator<Item = Effect>) {
        self.effects.extend(effects);
    }

    pub fn dialogue(&mut self, message: impl Into<String>) {
        self.effects.push(Effect::ShowDialogue(message.into()));
    }

    pub fn awaken(&mut self, id: AltarId, counts_in_chain: bool) {
        self.commands.push(AltarCommand::Awaken {
            id,
            counts_in_chain,
        });
    }

    pub fn deactivate(&mut self, id: AltarId, counts_in_chain: bool) {
        self.commands.push(AltarCommand::Deactivate {
            id,
            counts_in_chain,
        });
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn commands(&self) -> &[AltarCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.commands.is_empty()
    }
}

/// Something that reacts to altar events.
pub trait AltarListener {
    fn on_altar_event(&mut self, event: AltarEvent, altars: &AltarStates, out: &mut Reactions);
}

/// Shared props are subscribed as `Rc<RefCell<_>>` so the stage can
/// still drive them directly between events.
impl<T: AltarListener + ?Sized> AltarListener for Rc<RefCell<T>> {
    fn on_altar_event(&mut self, event: AltarEvent, altars: &AltarStates, out: &mut Reactions) {
        self.borrow_mut().on_altar_event(event, altars, out);
    }
}

/// Adapter that turns a closure into a listener.
pub struct FnListener<F>(F);

impl<F> AltarListener for FnListener<F>
where
    F: FnMut(AltarEvent, &AltarStates, &mut Reactions),
{
    fn on_altar_event(&mut self, event: AltarEvent, altars: &AltarStates, out: &mut Reactions) {
        (self.0)(event, altars, out);
    }
}

pub fn listener_fn<F>(f: F) -> FnListener<F>
where
    F: FnMut(AltarEvent, &AltarStates, &mut Reactions),
{
    FnListener(f)
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    listener: Box<dyn AltarListener>,
}

/// The outcome of one root awaken/deactivate call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispatch {
    /// Events in emission order, including those caused by follow-up commands.
    pub events: Vec<AltarEvent>,
    pub effects: Vec<Effect>,
    /// Follow-up commands that were refused.
    pub rejected: Vec<AltarCommand>,
}

impl Dispatch {
    /// No altar changed state.
    pub fn is_quiet(&self) -> bool {
        self.events.is_empty()
    }
}

/// Owns altar state for one session and notifies subscribers of changes.
#[derive(Default)]
pub struct AltarRegistry {
    states: AltarStates,
    subscribers: Vec<Subscriber>,
    next_subscription: u64,
}

impl AltarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states(&self) -> &AltarStates {
        &self.states
    }

    pub fn subscribe(&mut self, listener: impl AltarListener + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push(Subscriber {
            id,
            listener: Box::new(listener),
        });
        debug!("subscribed altar listener {:?}", id);
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn awaken(&mut self, id: AltarId, counts_in_chain: bool) -> Dispatch {
        self.run(AltarCommand::Awaken {
            id,
            counts_in_chain,
        })
    }

    pub fn deactivate(&mut self, id: AltarId, counts_in_chain: bool) -> Dispatch {
        self.run(AltarCommand::Deactivate {
            id,
            counts_in_chain,
        })
    }

    pub fn is_awakened(&self, id: AltarId) -> bool {
        self.states.is_awakened(id)
    }

    pub fn awakened_chain_count(&self) -> usize {
        self.states.awakened_chain_count()
    }

    pub fn total_awakened_count(&self) -> usize {
        self.states.total_awakened_count()
    }

    pub fn all_awakened(&self) -> bool {
        self.states.all_awakened()
    }

    /// Forget every altar. Emits nothing; subscribers stay registered.
    pub fn reset(&mut self) {
        info!("altar registry reset ({} altars)", self.states.len());
        self.states = AltarStates::new();
    }

    /// Drop every subscriber.
    pub fn clear_subscribers(&mut self) {
        self.subscribers.clear();
    }

    fn run(&mut self, root: AltarCommand) -> Dispatch {
        let mut dispatch = Dispatch::default();
        let mut touched: FxHashSet<AltarId> = FxHashSet::default();
        let mut queue = VecDeque::from([(root, 0usize)]);

        while let Some((command, depth)) = queue.pop_front() {
            let id = command.altar();
            if depth > 0 && touched.contains(&id) {
                warn!(
                    "rejected {:?}: altar {} already changed in this chain",
                    command, id
                );
                dispatch.rejected.push(command);
                continue;
            }
            if depth > MAX_CHAIN_DEPTH {
                warn!("rejected {:?}: chain deeper than {}", command, MAX_CHAIN_DEPTH);
                dispatch.rejected.push(command);
                continue;
            }
            touched.insert(id);

            let Some(event) = self.states.apply(command) else {
                continue;
            };
            match event {
                AltarEvent::Awakened(id) => info!(
                    "altar {} awakened (chain {}, total {})",
                    id,
                    self.states.awakened_chain_count(),
                    self.states.total_awakened_count()
                ),
                AltarEvent::Deactivated(id) => info!("altar {} deactivated", id),
            }
            dispatch.events.push(event);

            let mut reactions = Reactions::default();
            for subscriber in &mut self.subscribers {
                subscriber
                    .listener
                    .on_altar_event(event, &self.states, &mut reactions);
            }
            dispatch.effects.extend(reactions.effects);
            for follow_up in reactions.commands {
                queue.push_back((follow_up, depth + 1));
            }
        }

        dispatch
    }
}

impl AltarQuery for AltarRegistry {
    fn is_awakened(&self, id: AltarId) -> bool {
        self.states.is_awakened(id)
    }

    fn awakened_chain_count(&self) -> usize {
        self.states.awakened_chain_count()
    }
}
