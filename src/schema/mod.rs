pub mod altar;
pub mod config;
pub mod effect;
pub mod gate;
