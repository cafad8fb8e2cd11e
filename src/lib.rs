//! Altar Engine: gating and scene flow for a top-down adventure game.
//!
//! Altars are awakened by whatever stands on them. Doors, chests and
//! pillars listen to the altar registry and open, appear or glow when
//! their requirement holds. A single dialogue box, a stage clock with
//! persisted best times, and scene transitions tie a stage together.
//!
//! The engine draws nothing and plays nothing: every mutation returns
//! or queues `Effect`s for the host to present.

pub mod core;
pub mod props;
pub mod schema;
