//! Round score bands.

use std::collections::HashMap;

use poise::serenity_prelude::UserId;

use crate::models::{Participant, Response};

/// Assign each response a round score from its rating rank.
///
/// Responses are ranked ascending by rating and cut into `quantile` bands of
/// `count / quantile` responses; the lowest band scores `base`. When there are
/// fewer responses than bands, every response scores `base`.
pub fn quantize(responses: &mut [Response], quantile: usize, base: i64) {
    if responses.is_empty() {
        return;
    }

    let mut order: Vec<usize> = (0..responses.len()).collect();
    order.sort_by(|&a, &b| {
        responses[a]
            .rating
            .total_cmp(&responses[b].rating)
            .then(responses[a].id.cmp(&responses[b].id))
    });

    let step = if quantile == 0 { 0 } else { responses.len() / quantile };
    for (rank, &index) in order.iter().enumerate() {
        let band = if step > 0 { (rank / step) as i64 } else { 0 };
        responses[index].score = Some(base + band);
    }
}

/// Add round scores to the authors' cumulative scores.
///
/// Round 0 is sign-up only and never scores. Returns the number of
/// participants whose score changed.
pub fn accumulate(participants: &mut [Participant], responses: &[Response], round: u32) -> usize {
    if round == 0 {
        return 0;
    }

    let round_scores: HashMap<UserId, i64> = responses
        .iter()
        .filter_map(|r| r.score.map(|s| (r.user_id, s)))
        .collect();

    let mut updated = 0;
    for participant in participants.iter_mut() {
        if let Some(score) = round_scores.get(&participant.user_id) {
            participant.score += score;
            updated += 1;
        }
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rated(id: u64, rating: f64) -> Response {
        let mut r = Response::new(id, 1, UserId::new(id), 1, rating);
        r.content = Some(format!("response {}", id));
        r
    }

    #[test]
    fn test_twelve_responses_six_bands() {
        // Ratings deliberately not in id order
        let mut responses: Vec<Response> = (1..=12)
            .map(|i| rated(i, 1000.0 + ((i * 7) % 12) as f64 * 10.0))
            .collect();
        quantize(&mut responses, 6, 1);

        let mut by_rating = responses.clone();
        by_rating.sort_by(|a, b| a.rating.total_cmp(&b.rating));
        let scores: Vec<i64> = by_rating.iter().map(|r| r.score.unwrap()).collect();
        assert_eq!(scores, vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6]);
    }

    #[test]
    fn test_final_round_bands() {
        let mut responses: Vec<Response> = (1..=6).map(|i| rated(i, 1000.0 + i as f64)).collect();
        quantize(&mut responses, 3, 0);
        let scores: Vec<i64> = responses.iter().map(|r| r.score.unwrap()).collect();
        assert_eq!(scores, vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_fewer_responses_than_bands() {
        let mut responses = vec![rated(1, 1010.0), rated(2, 990.0), rated(3, 1000.0)];
        quantize(&mut responses, 6, 1);
        assert!(responses.iter().all(|r| r.score == Some(1)));
    }

    #[test]
    fn test_empty_round_is_noop() {
        let mut responses: Vec<Response> = Vec::new();
        quantize(&mut responses, 6, 1);
        assert!(responses.is_empty());
    }

    #[test]
    fn test_round_zero_never_accumulates() {
        let mut responses = vec![rated(1, 1010.0), rated(2, 990.0)];
        quantize(&mut responses, 1, 5);
        let mut participants = vec![
            Participant::new(1, 1, UserId::new(1)),
            Participant::new(2, 1, UserId::new(2)),
        ];

        assert_eq!(accumulate(&mut participants, &responses, 0), 0);
        assert!(participants.iter().all(|p| p.score == 0));

        assert_eq!(accumulate(&mut participants, &responses, 1), 2);
        assert!(participants.iter().all(|p| p.score == 5));
    }

    #[test]
    fn test_non_submitters_keep_their_score() {
        let mut responses = vec![rated(1, 1000.0)];
        quantize(&mut responses, 6, 1);
        let mut participants = vec![
            Participant::new(1, 1, UserId::new(1)),
            Participant::new(2, 1, UserId::new(2)),
        ];
        participants[1].score = 4;

        accumulate(&mut participants, &responses, 2);
        assert_eq!(participants[0].score, 1);
        assert_eq!(participants[1].score, 4);
    }
}
