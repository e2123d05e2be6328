pub mod pairing;
pub mod phase;
pub mod rating;
pub mod scoring;

pub use pairing::{select_pair, PairOutcome};
pub use phase::Command;
