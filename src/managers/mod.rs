pub mod entry_manager;
pub mod locks;
pub mod season_manager;
pub mod voting_manager;

pub use entry_manager::{create_shared_entry_manager, SharedEntryManager};
pub use locks::{create_shared_season_locks, SharedSeasonLocks};
pub use season_manager::{create_shared_season_manager, SharedSeasonManager, TransitionOutcome};
pub use voting_manager::{create_shared_voting_manager, BallotOutcome, SharedVotingManager};
