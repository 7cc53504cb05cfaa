pub mod asset;
pub mod clock;
pub mod series;
pub mod snapshot;
