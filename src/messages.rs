// src/messages.rs

use crate::models::{Participant, Season, SeasonPhase};

pub fn signups_open_message(prompt: &str) -> String {
    format!("Sign-ups are open! Prompt:\n# {}", prompt)
}

pub fn round_open_message(round: u32, prompt: &str) -> String {
    format!("Round {} Prompt:\n# {}", round, prompt)
}

pub fn voting_open_message(round: u32) -> String {
    format!("Round {} voting is open!", round)
}

pub fn voting_closed_message(round: u32) -> String {
    format!("Round {} voting is now closed.", round)
}

pub fn season_over_message(rounds: u32) -> String {
    format!(
        "After {} rounds, this season is over! Prompt submission open between seasons:",
        rounds
    )
}

pub fn activated_message() -> String {
    "✅ Game activated! Use `/signup` to open sign-ups for the first season.".to_string()
}

pub fn deactivated_message() -> String {
    "Game deactivated in this channel. The current season has been removed.".to_string()
}

pub fn results_heading(round: u32) -> String {
    if round == 0 {
        "Sign-up responses".to_string()
    } else {
        format!("Round {} results", round)
    }
}

/// Blind ballot: both options by content only, plus the voter's progress
pub fn ballot_message(recorded_votes: usize, first: &str, second: &str) -> String {
    format!(
        "Which response do you prefer?{}\n**Option 1** - `{}`\n**Option 2** - `{}`",
        vote_chip(recorded_votes),
        first,
        second
    )
}

pub fn exhausted_message(recorded_votes: usize) -> String {
    format!(
        "You have voted on every pairing available to you!{}\nThank you for voting.",
        vote_chip(recorded_votes)
    )
}

pub fn insufficient_responses_message() -> String {
    "There are not enough responses to vote on yet.".to_string()
}

fn vote_chip(recorded_votes: usize) -> String {
    if recorded_votes == 0 {
        String::new()
    } else {
        format!(
            " [{} recorded vote{}]",
            recorded_votes,
            if recorded_votes == 1 { "" } else { "s" }
        )
    }
}

pub fn response_recorded_message(author: &str, content: &str) -> String {
    format!("Response recorded! ```{}: \"{}\"```", author, content)
}

pub fn view_response_message(author: &str, content: &str) -> String {
    format!("Your current response: ```{}: \"{}\"```", author, content)
}

pub fn prompt_received_message(content: &str) -> String {
    format!("Thank you! ```Prompt submitted: \"{}\"```", content)
}

pub fn feedback_received_message(content: &str) -> String {
    format!("Thank you! ```Feedback submitted: \"{}\"```", content)
}

pub fn prompt_relay_message(user: &str, content: &str) -> String {
    format!("💡 Prompt suggestion from **{}**: {}", user, content)
}

pub fn feedback_relay_message(user: &str, content: &str) -> String {
    format!("📝 Feedback from **{}**: {}", user, content)
}

pub fn confirm_reset_moniker_message() -> String {
    "Reset your moniker? Results will show your display name instead.".to_string()
}

pub fn confirm_withdraw_message() -> String {
    "Remove yourself from this season? Your sign-up response will be deleted.".to_string()
}

pub fn confirm_delete_response_message() -> String {
    "Delete your response for this round?".to_string()
}

/// Phase line for `/status`
pub fn status_message(season: &Season, participants: usize, submitted: usize) -> String {
    match season.phase {
        SeasonPhase::Hibernating => format!(
            "💤 **HIBERNATING** after {} round(s). Prompt suggestions are open.",
            season.round
        ),
        SeasonPhase::Registering => format!(
            "📝 **REGISTERING**: {} participant(s) signed up.",
            participants
        ),
        SeasonPhase::Responding => format!(
            "✍️ **RESPONDING** in round {}: {}/{} response(s) submitted.",
            season.round, submitted, participants
        ),
        SeasonPhase::Voting => format!(
            "🗳️ **VOTING** in round {}: {} response(s) on the ballot.",
            season.round, submitted
        ),
        SeasonPhase::Idle => format!(
            "⏸️ **IDLE** after round {}. Use `/prompt` for the next round or `/hibernate` to end the season.",
            season.round
        ),
    }
}

/// Cumulative leaderboard body for `/standings`
pub fn standings_message(ranked: &[(Participant, String)]) -> String {
    if ranked.is_empty() {
        return "Nobody has signed up this season yet.".to_string();
    }
    ranked
        .iter()
        .enumerate()
        .map(|(i, (participant, name))| {
            format!("{}. **{}**: {} points", i + 1, name, participant.score)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ballot_chip() {
        assert_eq!(
            ballot_message(0, "a", "b"),
            "Which response do you prefer?\n**Option 1** - `a`\n**Option 2** - `b`"
        );
        assert!(ballot_message(1, "a", "b").contains("[1 recorded vote]"));
        assert!(ballot_message(4, "a", "b").contains("[4 recorded votes]"));
    }

    #[test]
    fn test_results_heading() {
        assert_eq!(results_heading(0), "Sign-up responses");
        assert_eq!(results_heading(3), "Round 3 results");
    }
}
