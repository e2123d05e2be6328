pub mod general;
pub mod host;

pub use general::{help, ping};
pub use host::{
    activate, conclude, deactivate, hibernate, prompt, results, signup, standings, status, vote,
};
