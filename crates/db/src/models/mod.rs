pub mod delivery;
pub mod face;
pub mod media;
pub mod owner;
