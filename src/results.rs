//! Ranked result listings for a concluded round.

use poise::serenity_prelude::UserId;
use std::collections::HashMap;

use crate::error::{BotError, Result};
use crate::models::{Participant, Response};

/// Shown when an author's name cannot be resolved
pub const UNKNOWN_AUTHOR: &str = "???";

/// One ranked line of a results page
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntry {
    pub rank: usize,
    pub content: String,
    pub word_count: usize,
    pub rating: f64,
    pub upvotes: u32,
    pub downvotes: u32,
    pub author: String,

    /// None while the round is unscored, e.g. sign-up responses
    pub round_score: Option<i64>,
    pub total_score: i64,
}

impl ResultEntry {
    pub fn title(&self) -> String {
        format!(
            "{}. {} ({} words)",
            self.rank, self.content, self.word_count
        )
    }

    pub fn body(&self) -> String {
        let points = match self.round_score {
            Some(score) => format!("{} points", score),
            None => "unscored".to_string(),
        };
        format!(
            "{} ELO ({}/{}) - by **{}**, {} ({} total)",
            self.rating.round() as i64,
            self.upvotes,
            self.downvotes,
            self.author,
            points,
            self.total_score
        )
    }
}

/// Rank a round's responses, highest rating first.
///
/// `names` maps authors to display names; every response author must have a
/// participant row, anything else is a store invariant violation.
pub fn build_entries(
    responses: &[Response],
    participants: &[Participant],
    names: &HashMap<UserId, String>,
) -> Result<Vec<ResultEntry>> {
    let mut ranked: Vec<&Response> = responses.iter().filter(|r| r.is_submitted()).collect();
    ranked.sort_by(|a, b| b.rating.total_cmp(&a.rating).then(a.id.cmp(&b.id)));

    ranked
        .into_iter()
        .enumerate()
        .map(|(index, response)| {
            let author = author_of(response, participants)?;
            let name = author
                .moniker
                .clone()
                .or_else(|| names.get(&response.user_id).cloned())
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

            Ok(ResultEntry {
                rank: index + 1,
                content: response.content.clone().unwrap_or_default(),
                word_count: response.word_count(),
                rating: response.rating,
                upvotes: response.upvotes,
                downvotes: response.downvotes,
                author: name,
                round_score: response.score,
                total_score: author.score,
            })
        })
        .collect()
}

fn author_of<'a>(response: &Response, participants: &'a [Participant]) -> Result<&'a Participant> {
    let mut matches = participants
        .iter()
        .filter(|p| p.user_id == response.user_id && p.season_id == response.season_id);
    match (matches.next(), matches.next()) {
        (Some(participant), None) => Ok(participant),
        (None, _) => Err(BotError::Invariant {
            message: format!(
                "response {} has no participant for user {}",
                response.id, response.user_id
            ),
        }),
        (Some(_), Some(_)) => Err(BotError::Invariant {
            message: format!(
                "user {} has several participant rows in season {}",
                response.user_id, response.season_id
            ),
        }),
    }
}

/// Split ranked entries into pages of `page_size`
pub fn paginate(entries: Vec<ResultEntry>, page_size: usize) -> Vec<Vec<ResultEntry>> {
    let page_size = page_size.max(1);
    let mut pages = Vec::new();
    let mut iter = entries.into_iter().peekable();
    while iter.peek().is_some() {
        pages.push(iter.by_ref().take(page_size).collect());
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: u64, user: u64, rating: f64, score: i64) -> Response {
        let mut r = Response::new(id, 1, UserId::new(user), 1, rating);
        r.content = Some(format!("entry number {}", id));
        r.score = Some(score);
        r
    }

    fn participant(user: u64, moniker: Option<&str>, score: i64) -> Participant {
        let mut p = Participant::new(user + 100, 1, UserId::new(user));
        p.moniker = moniker.map(String::from);
        p.score = score;
        p
    }

    #[test]
    fn test_entries_ranked_by_rating() {
        let responses = vec![scored(1, 1, 990.4, 1), scored(2, 2, 1010.6, 2), scored(3, 3, 1000.0, 1)];
        let participants = vec![
            participant(1, Some("Quill"), 3),
            participant(2, None, 4),
            participant(3, None, 1),
        ];
        let mut names = HashMap::new();
        names.insert(UserId::new(2), "Second".to_string());

        let entries = build_entries(&responses, &participants, &names).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].author, "Second");
        assert_eq!(entries[0].body(), "1011 ELO (0/0) - by **Second**, 2 points (4 total)");
        assert_eq!(entries[1].author, UNKNOWN_AUTHOR);
        assert_eq!(entries[2].author, "Quill");
        assert_eq!(entries[2].title(), "3. entry number 1 (3 words)");
    }

    #[test]
    fn test_unscored_entry_is_not_shown_as_zero() {
        let mut unscored = scored(1, 1, 1000.0, 0);
        unscored.score = None;
        let responses = vec![unscored, scored(2, 2, 999.0, 0)];
        let participants = vec![participant(1, Some("Quill"), 0), participant(2, Some("Ink"), 0)];

        let entries = build_entries(&responses, &participants, &HashMap::new()).unwrap();
        assert_eq!(entries[0].round_score, None);
        assert_eq!(entries[0].body(), "1000 ELO (0/0) - by **Quill**, unscored (0 total)");
        assert_eq!(entries[1].round_score, Some(0));
        assert_eq!(entries[1].body(), "999 ELO (0/0) - by **Ink**, 0 points (0 total)");
    }

    #[test]
    fn test_missing_participant_is_invariant_violation() {
        let responses = vec![scored(1, 1, 1000.0, 1)];
        let err = build_entries(&responses, &[], &HashMap::new()).unwrap_err();
        assert!(matches!(err, BotError::Invariant { .. }));
    }

    #[test]
    fn test_pages_of_three() {
        let responses: Vec<Response> = (1..=7).map(|i| scored(i, i, 1000.0 + i as f64, 1)).collect();
        let participants: Vec<Participant> = (1..=7).map(|i| participant(i, None, 1)).collect();
        let entries = build_entries(&responses, &participants, &HashMap::new()).unwrap();

        let pages = paginate(entries, 3);
        let sizes: Vec<usize> = pages.iter().map(|p| p.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(pages[2][0].rank, 7);
        assert!(paginate(Vec::new(), 3).is_empty());
    }
}
