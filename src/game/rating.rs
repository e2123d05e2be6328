//! Pairwise rating of responses from recorded votes.
//!
//! Each voter's influence on a response is divided by the number of times that
//! voter compared it, so a voter who saw one response many times does not
//! dominate its rating. All deltas are computed against the ratings as they
//! stood before the round was concluded and then summed, which makes the
//! result independent of vote order.

use std::collections::HashMap;

use poise::serenity_prelude::UserId;

use crate::error::{BotError, Result};
use crate::models::{Response, Vote};

/// Probability-like weight of an upset: small when the preferred response was already far ahead
pub fn expected_score(preferred: f64, rejected: f64) -> f64 {
    let diff = preferred - rejected;
    1.0 / (1.0 + 10f64.powf(diff / 400.0))
}

/// Apply every vote of a round to the round's responses.
///
/// Returns the number of votes applied. Votes naming a response outside
/// `responses` are a store invariant violation.
pub fn apply_votes(responses: &mut [Response], votes: &[Vote], k_factor: f64) -> Result<usize> {
    if votes.is_empty() {
        return Ok(0);
    }

    let snapshot: HashMap<u64, f64> = responses.iter().map(|r| (r.id, r.rating)).collect();
    for vote in votes {
        for id in [vote.preferred_id, vote.rejected_id] {
            if !snapshot.contains_key(&id) {
                return Err(BotError::Invariant {
                    message: format!("vote {} names unknown response {}", vote.id, id),
                });
            }
        }
    }

    let mut by_voter: HashMap<UserId, Vec<&Vote>> = HashMap::new();
    for vote in votes {
        by_voter.entry(vote.user_id).or_default().push(vote);
    }

    let mut deltas: HashMap<u64, f64> = HashMap::new();
    let mut upvotes: HashMap<u64, u32> = HashMap::new();
    let mut downvotes: HashMap<u64, u32> = HashMap::new();

    for voter_votes in by_voter.values() {
        let mut appearances: HashMap<u64, u32> = HashMap::new();
        for vote in voter_votes {
            *appearances.entry(vote.preferred_id).or_default() += 1;
            *appearances.entry(vote.rejected_id).or_default() += 1;
        }

        for vote in voter_votes {
            let w1 = 1.0 / appearances[&vote.preferred_id] as f64;
            let w2 = 1.0 / appearances[&vote.rejected_id] as f64;
            let expected = expected_score(snapshot[&vote.preferred_id], snapshot[&vote.rejected_id]);

            *deltas.entry(vote.preferred_id).or_default() += k_factor * expected * w1;
            *deltas.entry(vote.rejected_id).or_default() -= k_factor * expected * w2;
            *upvotes.entry(vote.preferred_id).or_default() += 1;
            *downvotes.entry(vote.rejected_id).or_default() += 1;
        }
    }

    for response in responses.iter_mut() {
        if let Some(delta) = deltas.get(&response.id) {
            response.rating += delta;
        }
        response.upvotes += upvotes.get(&response.id).copied().unwrap_or(0);
        response.downvotes += downvotes.get(&response.id).copied().unwrap_or(0);
    }

    Ok(votes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn response(id: u64, user: u64) -> Response {
        let mut r = Response::new(id, 1, UserId::new(user), 1, 1000.0);
        r.content = Some(format!("response {}", id));
        r
    }

    fn vote(id: u64, voter: u64, preferred: u64, rejected: u64) -> Vote {
        Vote {
            id,
            season_id: 1,
            user_id: UserId::new(voter),
            round: 1,
            preferred_id: preferred,
            rejected_id: rejected,
        }
    }

    #[test]
    fn test_no_votes_is_noop() {
        let mut responses = vec![response(1, 1), response(2, 2)];
        let before = responses.clone();
        assert_eq!(apply_votes(&mut responses, &[], 50.0).unwrap(), 0);
        assert_eq!(responses, before);
    }

    #[test]
    fn test_single_vote_between_equals() {
        let mut responses = vec![response(1, 1), response(2, 2)];
        apply_votes(&mut responses, &[vote(1, 9, 1, 2)], 50.0).unwrap();

        assert!((responses[0].rating - 1025.0).abs() < 1e-9);
        assert!((responses[1].rating - 975.0).abs() < 1e-9);
        assert_eq!(responses[0].upvotes, 1);
        assert_eq!(responses[1].downvotes, 1);
        assert_eq!(responses[0].downvotes, 0);
    }

    #[test]
    fn test_weights_discount_repeated_appearances() {
        // Voter 9 saw response 1 twice, so each of its comparisons moves it half as far
        let mut responses = vec![response(1, 1), response(2, 2), response(3, 3)];
        let votes = vec![vote(1, 9, 1, 2), vote(2, 9, 1, 3)];
        apply_votes(&mut responses, &votes, 50.0).unwrap();

        assert!((responses[0].rating - 1025.0).abs() < 1e-9);
        assert!((responses[1].rating - 975.0).abs() < 1e-9);
        assert!((responses[2].rating - 975.0).abs() < 1e-9);
        assert_eq!(responses[0].upvotes, 2);
    }

    #[test]
    fn test_order_independent() {
        let base: Vec<Response> = (1..=6).map(|i| response(i, i)).collect();
        let mut votes = Vec::new();
        let mut next_id = 1;
        for voter in 10..14 {
            for a in 1..=6u64 {
                for b in (a + 1)..=6u64 {
                    if (a + b + voter) % 3 == 0 {
                        continue;
                    }
                    let (p, r) = if (a * voter + b) % 2 == 0 { (a, b) } else { (b, a) };
                    votes.push(vote(next_id, voter, p, r));
                    next_id += 1;
                }
            }
        }

        let mut reference = base.clone();
        apply_votes(&mut reference, &votes, 50.0).unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            votes.shuffle(&mut rng);
            let mut shuffled = base.clone();
            apply_votes(&mut shuffled, &votes, 50.0).unwrap();
            for (a, b) in reference.iter().zip(shuffled.iter()) {
                assert!((a.rating - b.rating).abs() < 1e-9);
                assert_eq!(a.upvotes, b.upvotes);
                assert_eq!(a.downvotes, b.downvotes);
            }
        }
    }

    #[test]
    fn test_unknown_response_is_invariant_violation() {
        let mut responses = vec![response(1, 1), response(2, 2)];
        let before = responses.clone();
        let err = apply_votes(&mut responses, &[vote(1, 9, 1, 42)], 50.0).unwrap_err();
        assert!(matches!(err, BotError::Invariant { .. }));
        assert_eq!(responses, before);
    }

    #[test]
    fn test_expected_score_favours_underdog() {
        assert!((expected_score(1000.0, 1000.0) - 0.5).abs() < 1e-12);
        assert!(expected_score(1200.0, 1000.0) < 0.5);
        assert!(expected_score(1000.0, 1200.0) > 0.5);
    }
}
