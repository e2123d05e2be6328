//! Ballot pair selection for a single voter.
//!
//! The voter's first option is drawn from the responses they have compared the
//! fewest times, the second from responses never yet compared against the
//! first. A voter is never shown the same unordered pair twice in a round, and
//! with `m` eligible responses the voter is exhausted after `m * (m - 1) / 2`
//! votes.

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::models::Vote;

/// Result of asking for the next pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    /// Response ids in presentation order ("Option 1", "Option 2")
    Pair(u64, u64),
    /// Fewer than two responses the voter may judge
    InsufficientResponses,
    /// Every pairing available to this voter has been voted on
    Exhausted,
}

/// Choose the next pair among `eligible` given the voter's `votes` this round.
///
/// `eligible` must already exclude the voter's own response.
pub fn select_pair<R: Rng + ?Sized>(eligible: &[u64], votes: &[Vote], rng: &mut R) -> PairOutcome {
    if eligible.len() < 2 {
        return PairOutcome::InsufficientResponses;
    }

    let seen: Vec<usize> = eligible
        .iter()
        .map(|&id| votes.iter().filter(|v| v.touches(id)).count())
        .collect();
    let lowest = seen.iter().copied().min().unwrap_or(0);
    let pool: Vec<u64> = eligible
        .iter()
        .zip(seen.iter())
        .filter(|&(_, &count)| count == lowest)
        .map(|(&id, _)| id)
        .collect();

    let Some(&first) = pool.choose(rng) else {
        return PairOutcome::Exhausted;
    };

    let candidates: Vec<u64> = eligible
        .iter()
        .copied()
        .filter(|&id| id != first && !votes.iter().any(|v| v.covers(id, first)))
        .collect();

    let Some(&second) = candidates.choose(rng) else {
        return PairOutcome::Exhausted;
    };

    if rng.random_bool(0.5) {
        PairOutcome::Pair(second, first)
    } else {
        PairOutcome::Pair(first, second)
    }
}

/// Number of votes after which a voter with `eligible` responses is exhausted
pub fn max_votes(eligible: usize) -> usize {
    eligible * eligible.saturating_sub(1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude::UserId;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn cast(votes: &mut Vec<Vote>, preferred: u64, rejected: u64) {
        let id = votes.len() as u64 + 1;
        votes.push(Vote {
            id,
            season_id: 1,
            user_id: UserId::new(99),
            round: 1,
            preferred_id: preferred,
            rejected_id: rejected,
        });
    }

    #[test]
    fn test_insufficient_responses() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_pair(&[], &[], &mut rng), PairOutcome::InsufficientResponses);
        assert_eq!(select_pair(&[4], &[], &mut rng), PairOutcome::InsufficientResponses);
    }

    #[test]
    fn test_never_repeats_and_exhausts() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let eligible: Vec<u64> = (1..=6).collect();
            let mut votes = Vec::new();
            let mut pairs = HashSet::new();

            loop {
                match select_pair(&eligible, &votes, &mut rng) {
                    PairOutcome::Pair(a, b) => {
                        assert_ne!(a, b);
                        let key = (a.min(b), a.max(b));
                        assert!(pairs.insert(key), "pair {:?} offered twice", key);
                        cast(&mut votes, a, b);
                    }
                    PairOutcome::Exhausted => break,
                    PairOutcome::InsufficientResponses => panic!("six responses are enough"),
                }
                assert!(votes.len() <= max_votes(eligible.len()));
            }

            assert_eq!(votes.len(), max_votes(eligible.len()));
            assert_eq!(votes.len(), 15);
        }
    }

    #[test]
    fn test_two_responses_give_exactly_one_pair() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut votes = Vec::new();
        let PairOutcome::Pair(a, b) = select_pair(&[7, 8], &votes, &mut rng) else {
            panic!("expected a pair");
        };
        cast(&mut votes, a, b);
        assert_eq!(select_pair(&[7, 8], &votes, &mut rng), PairOutcome::Exhausted);
    }

    #[test]
    fn test_least_seen_response_is_offered() {
        let eligible = [1, 2, 3, 4];
        let mut votes = Vec::new();
        cast(&mut votes, 1, 2);
        cast(&mut votes, 1, 3);
        cast(&mut votes, 2, 3);

        // Response 4 is the only one never seen, so it must be in every offered pair
        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            match select_pair(&eligible, &votes, &mut rng) {
                PairOutcome::Pair(a, b) => assert!(a == 4 || b == 4),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_presentation_order_is_flipped() {
        let mut first_positions = HashSet::new();
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            if let PairOutcome::Pair(a, _) = select_pair(&[1, 2], &[], &mut rng) {
                first_positions.insert(a);
            }
        }
        assert_eq!(first_positions.len(), 2);
    }

    #[test]
    fn test_max_votes() {
        assert_eq!(max_votes(0), 0);
        assert_eq!(max_votes(1), 0);
        assert_eq!(max_votes(2), 1);
        assert_eq!(max_votes(5), 10);
    }
}
