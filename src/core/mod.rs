pub mod clock;
pub mod dialogue;
pub mod flow;
pub mod gate;
pub mod registry;
pub mod scores;
pub mod sequence;
pub mod stage;
