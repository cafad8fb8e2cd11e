pub mod altar;
pub mod chest;
pub mod door;
pub mod pillar;
pub mod sign;
