//! Season phase transitions.
//!
//! The table here is the single authority on which host command is legal in
//! which phase. Rejections carry a phase-specific message for the host.

use crate::error::{BotError, Result};
use crate::models::SeasonPhase;

/// Host command that advances a season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    OpenSignups,
    OpenRound,
    OpenVoting,
    Conclude,
    Hibernate,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::OpenSignups,
        Command::OpenRound,
        Command::OpenVoting,
        Command::Conclude,
        Command::Hibernate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Command::OpenSignups => "signup",
            Command::OpenRound => "prompt",
            Command::OpenVoting => "vote",
            Command::Conclude => "conclude",
            Command::Hibernate => "hibernate",
        }
    }

    /// Phases from which the command is accepted
    pub fn allowed_from(&self) -> &'static [SeasonPhase] {
        match self {
            Command::OpenSignups => &[SeasonPhase::Hibernating],
            Command::OpenRound => &[SeasonPhase::Registering, SeasonPhase::Idle],
            Command::OpenVoting => &[SeasonPhase::Responding],
            Command::Conclude => &[SeasonPhase::Voting],
            Command::Hibernate => &[SeasonPhase::Idle],
        }
    }

    pub fn target(&self) -> SeasonPhase {
        match self {
            Command::OpenSignups => SeasonPhase::Registering,
            Command::OpenRound => SeasonPhase::Responding,
            Command::OpenVoting => SeasonPhase::Voting,
            Command::Conclude => SeasonPhase::Idle,
            Command::Hibernate => SeasonPhase::Hibernating,
        }
    }
}

/// Validate `command` against `current`, returning the phase to move to
pub fn plan(current: SeasonPhase, command: Command) -> Result<SeasonPhase> {
    if command.allowed_from().contains(&current) {
        return Ok(command.target());
    }

    Err(BotError::InvalidTransition {
        current,
        command: command.name(),
        message: rejection_message(current, command).to_string(),
    })
}

fn rejection_message(current: SeasonPhase, command: Command) -> &'static str {
    use SeasonPhase::*;

    match (command, current) {
        (Command::OpenSignups, Registering) => "🚫 Sign-ups are already open!",
        (Command::OpenSignups, _) => "🚫 Cannot open sign-ups in the middle of a season.",

        (Command::OpenRound, Responding) => "🚫 A round is already active! Cannot post a new prompt.",
        (Command::OpenRound, Voting) => {
            "🚫 Voting is open! Please `/conclude` voting before posting a new prompt."
        }
        (Command::OpenRound, _) => "🚫 No season running. To start a new season, use `/signup`.",

        (Command::OpenVoting, Voting) => "🚫 Voting is already open!",
        (Command::OpenVoting, Registering) => {
            "🚫 Sign-ups are active! Post a prompt with `/prompt` before voting."
        }
        (Command::OpenVoting, _) => "🚫 No active round! Cannot commence voting.",

        (Command::Conclude, Registering) => {
            "🚫 Sign-ups are active! Cannot conclude a round until after voting."
        }
        (Command::Conclude, Responding) => {
            "🚫 A round is active! Cannot conclude a round until after voting."
        }
        (Command::Conclude, Idle) => "🚫 Nothing to conclude? Use `/prompt` to start a round.",
        (Command::Conclude, _) => "🚫 Nothing to conclude? Use `/signup` to start a season.",

        (Command::Hibernate, Hibernating) => "🚫 Already hibernating!",
        (Command::Hibernate, _) => "🚫 A round is active! Cannot hibernate until the round is over.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHASES: [SeasonPhase; 5] = [
        SeasonPhase::Hibernating,
        SeasonPhase::Registering,
        SeasonPhase::Responding,
        SeasonPhase::Voting,
        SeasonPhase::Idle,
    ];

    #[test]
    fn test_transition_table() {
        assert_eq!(
            plan(SeasonPhase::Hibernating, Command::OpenSignups).unwrap(),
            SeasonPhase::Registering
        );
        assert_eq!(
            plan(SeasonPhase::Registering, Command::OpenRound).unwrap(),
            SeasonPhase::Responding
        );
        assert_eq!(
            plan(SeasonPhase::Idle, Command::OpenRound).unwrap(),
            SeasonPhase::Responding
        );
        assert_eq!(
            plan(SeasonPhase::Responding, Command::OpenVoting).unwrap(),
            SeasonPhase::Voting
        );
        assert_eq!(
            plan(SeasonPhase::Voting, Command::Conclude).unwrap(),
            SeasonPhase::Idle
        );
        assert_eq!(
            plan(SeasonPhase::Idle, Command::Hibernate).unwrap(),
            SeasonPhase::Hibernating
        );
    }

    #[test]
    fn test_every_illegal_pair_is_rejected_with_current_phase() {
        for command in Command::ALL {
            for phase in PHASES {
                if command.allowed_from().contains(&phase) {
                    continue;
                }
                match plan(phase, command) {
                    Err(BotError::InvalidTransition { current, message, .. }) => {
                        assert_eq!(current, phase);
                        assert!(message.starts_with("🚫"));
                    }
                    other => panic!("{:?} from {:?} gave {:?}", command, phase, other),
                }
            }
        }
    }

    #[test]
    fn test_hibernate_only_from_idle() {
        for phase in PHASES {
            assert_eq!(
                plan(phase, Command::Hibernate).is_ok(),
                phase == SeasonPhase::Idle
            );
        }
    }
}
