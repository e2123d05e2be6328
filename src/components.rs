//! Buttons, modals and their custom ids.
//!
//! Every interactive element encodes the season (and round, where it matters)
//! it was created for. Handlers reload that season from the store on each
//! click, so nothing here survives a restart and nothing needs to.

use poise::serenity_prelude::{
    ButtonStyle, CreateActionRow, CreateButton, CreateInputText, CreateModal, InputTextStyle,
};

use crate::config::LimitsConfig;
use crate::models::{Season, SeasonPhase};

/// Follow-up that needs a yes/no confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmKind {
    ResetMoniker,
    Withdraw,
    DeleteResponse,
}

impl ConfirmKind {
    fn key(&self) -> &'static str {
        match self {
            ConfirmKind::ResetMoniker => "moniker",
            ConfirmKind::Withdraw => "withdraw",
            ConfirmKind::DeleteResponse => "delete",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "moniker" => Some(ConfirmKind::ResetMoniker),
            "withdraw" => Some(ConfirmKind::Withdraw),
            "delete" => Some(ConfirmKind::DeleteResponse),
            _ => None,
        }
    }
}

/// What a button or modal submission asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SignUp { season: u64 },
    ViewSignUp { season: u64 },
    ResetMoniker { season: u64 },
    Withdraw { season: u64 },
    Respond { season: u64, round: u32 },
    ViewResponse { season: u64, round: u32 },
    DeleteResponse { season: u64, round: u32 },
    StartVoting { season: u64, round: u32 },
    Pick { season: u64, round: u32, preferred: u64, rejected: u64 },
    SuggestPrompt { season: u64 },
    Feedback { season: u64 },
    Confirm { kind: ConfirmKind, season: u64, round: u32, accepted: bool },
    SignUpModal { season: u64 },
    ResponseModal { season: u64, round: u32 },
    PromptModal { season: u64 },
    FeedbackModal { season: u64 },
}

impl Action {
    pub fn custom_id(&self) -> String {
        match *self {
            Action::SignUp { season } => format!("signup:register:{}", season),
            Action::ViewSignUp { season } => format!("signup:view:{}", season),
            Action::ResetMoniker { season } => format!("signup:moniker:{}", season),
            Action::Withdraw { season } => format!("signup:withdraw:{}", season),
            Action::Respond { season, round } => format!("prompt:respond:{}:{}", season, round),
            Action::ViewResponse { season, round } => format!("prompt:view:{}:{}", season, round),
            Action::DeleteResponse { season, round } => {
                format!("prompt:delete:{}:{}", season, round)
            }
            Action::StartVoting { season, round } => format!("voting:vote:{}:{}", season, round),
            Action::Pick {
                season,
                round,
                preferred,
                rejected,
            } => format!("vote:pick:{}:{}:{}:{}", season, round, preferred, rejected),
            Action::SuggestPrompt { season } => format!("hibernation:prompt:{}", season),
            Action::Feedback { season } => format!("hibernation:feedback:{}", season),
            Action::Confirm {
                kind,
                season,
                round,
                accepted,
            } => format!(
                "confirm:{}:{}:{}:{}",
                kind.key(),
                season,
                round,
                if accepted { "yes" } else { "no" }
            ),
            Action::SignUpModal { season } => format!("modal:signup:{}", season),
            Action::ResponseModal { season, round } => format!("modal:respond:{}:{}", season, round),
            Action::PromptModal { season } => format!("modal:prompt:{}", season),
            Action::FeedbackModal { season } => format!("modal:feedback:{}", season),
        }
    }

    /// Parse a custom id; ids from other bots or older layouts yield `None`
    pub fn parse(custom_id: &str) -> Option<Self> {
        let parts: Vec<&str> = custom_id.split(':').collect();
        let num = |i: usize| parts.get(i).and_then(|p| p.parse::<u64>().ok());
        let round = |i: usize| parts.get(i).and_then(|p| p.parse::<u32>().ok());

        let action = match (parts.first().copied()?, parts.get(1).copied()?) {
            ("signup", "register") => Action::SignUp { season: num(2)? },
            ("signup", "view") => Action::ViewSignUp { season: num(2)? },
            ("signup", "moniker") => Action::ResetMoniker { season: num(2)? },
            ("signup", "withdraw") => Action::Withdraw { season: num(2)? },
            ("prompt", "respond") => Action::Respond {
                season: num(2)?,
                round: round(3)?,
            },
            ("prompt", "view") => Action::ViewResponse {
                season: num(2)?,
                round: round(3)?,
            },
            ("prompt", "delete") => Action::DeleteResponse {
                season: num(2)?,
                round: round(3)?,
            },
            ("voting", "vote") => Action::StartVoting {
                season: num(2)?,
                round: round(3)?,
            },
            ("vote", "pick") => Action::Pick {
                season: num(2)?,
                round: round(3)?,
                preferred: num(4)?,
                rejected: num(5)?,
            },
            ("hibernation", "prompt") => Action::SuggestPrompt { season: num(2)? },
            ("hibernation", "feedback") => Action::Feedback { season: num(2)? },
            ("confirm", kind) => Action::Confirm {
                kind: ConfirmKind::from_key(kind)?,
                season: num(2)?,
                round: round(3)?,
                accepted: match parts.get(4).copied()? {
                    "yes" => true,
                    "no" => false,
                    _ => return None,
                },
            },
            ("modal", "signup") => Action::SignUpModal { season: num(2)? },
            ("modal", "respond") => Action::ResponseModal {
                season: num(2)?,
                round: round(3)?,
            },
            ("modal", "prompt") => Action::PromptModal { season: num(2)? },
            ("modal", "feedback") => Action::FeedbackModal { season: num(2)? },
            _ => return None,
        };
        Some(action)
    }
}

fn button(action: Action, label: &str, style: ButtonStyle, disabled: bool) -> CreateButton {
    CreateButton::new(action.custom_id())
        .label(label)
        .style(style)
        .disabled(disabled)
}

/// Buttons carried by the announcement of the season's current phase
pub fn announcement_components(season: &Season, disabled: bool) -> Vec<CreateActionRow> {
    let id = season.id;
    let round = season.round;

    match season.phase {
        SeasonPhase::Registering => vec![
            CreateActionRow::Buttons(vec![
                button(Action::SignUp { season: id }, "Sign up here.", ButtonStyle::Success, disabled),
                button(Action::ViewSignUp { season: id }, "View your response.", ButtonStyle::Secondary, disabled),
            ]),
            CreateActionRow::Buttons(vec![
                button(Action::ResetMoniker { season: id }, "Reset moniker.", ButtonStyle::Danger, disabled),
                button(Action::Withdraw { season: id }, "Remove me from this season!", ButtonStyle::Danger, disabled),
            ]),
        ],
        SeasonPhase::Responding => vec![CreateActionRow::Buttons(vec![
            button(Action::Respond { season: id, round }, "Submit your response here!", ButtonStyle::Success, disabled),
            button(Action::ViewResponse { season: id, round }, "View your response.", ButtonStyle::Secondary, disabled),
            button(Action::DeleteResponse { season: id, round }, "Delete your response.", ButtonStyle::Danger, disabled),
        ])],
        SeasonPhase::Voting => vec![CreateActionRow::Buttons(vec![button(
            Action::StartVoting { season: id, round },
            "Vote here!",
            ButtonStyle::Success,
            disabled,
        )])],
        SeasonPhase::Hibernating => vec![CreateActionRow::Buttons(vec![
            button(Action::SuggestPrompt { season: id }, "Submit your own prompts!", ButtonStyle::Success, disabled),
            button(Action::Feedback { season: id }, "Give us feedback!", ButtonStyle::Primary, disabled),
        ])],
        SeasonPhase::Idle => Vec::new(),
    }
}

/// "Option 1" / "Option 2" buttons of a blind ballot
pub fn ballot_components(season: u64, round: u32, first: u64, second: u64) -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![
        button(
            Action::Pick { season, round, preferred: first, rejected: second },
            "Option 1",
            ButtonStyle::Primary,
            false,
        ),
        button(
            Action::Pick { season, round, preferred: second, rejected: first },
            "Option 2",
            ButtonStyle::Primary,
            false,
        ),
    ])]
}

pub fn confirmation_components(kind: ConfirmKind, season: u64, round: u32) -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![
        button(
            Action::Confirm { kind, season, round, accepted: true },
            "Yes!",
            ButtonStyle::Success,
            false,
        ),
        button(
            Action::Confirm { kind, season, round, accepted: false },
            "No.",
            ButtonStyle::Danger,
            false,
        ),
    ])]
}

/// Sign-up modal; an existing response makes the response field optional
pub fn signup_modal(
    season: u64,
    limits: &LimitsConfig,
    moniker: Option<&str>,
    response: Option<&str>,
) -> CreateModal {
    let moniker_input = CreateInputText::new(InputTextStyle::Short, "Moniker", "moniker")
        .placeholder(moniker.unwrap_or("Optional moniker to submit your responses under."))
        .required(false)
        .max_length(limits.moniker_max_len as u16);

    let response_input = CreateInputText::new(InputTextStyle::Paragraph, "Response", "response")
        .placeholder(placeholder(response.unwrap_or("Write your 10-word response here!")))
        .required(response.is_none())
        .max_length(limits.response_max_len as u16);

    CreateModal::new(Action::SignUpModal { season }.custom_id(), "Sign Up").components(vec![
        CreateActionRow::InputText(moniker_input),
        CreateActionRow::InputText(response_input),
    ])
}

pub fn response_modal(season: u64, round: u32, limits: &LimitsConfig, existing: Option<&str>) -> CreateModal {
    let input = CreateInputText::new(InputTextStyle::Paragraph, "Response", "response")
        .placeholder(placeholder(existing.unwrap_or("Write your 10-word response here!")))
        .required(true)
        .max_length(limits.response_max_len as u16);

    CreateModal::new(Action::ResponseModal { season, round }.custom_id(), "Submit a Response")
        .components(vec![CreateActionRow::InputText(input)])
}

pub fn prompt_modal(season: u64, limits: &LimitsConfig) -> CreateModal {
    let input = CreateInputText::new(InputTextStyle::Paragraph, "Prompt", "prompt")
        .placeholder("Write your prompt here!")
        .required(true)
        .max_length(limits.prompt_max_len as u16);

    CreateModal::new(Action::PromptModal { season }.custom_id(), "Suggesting a Prompt")
        .components(vec![CreateActionRow::InputText(input)])
}

pub fn feedback_modal(season: u64) -> CreateModal {
    let input = CreateInputText::new(InputTextStyle::Paragraph, "Feedback", "feedback")
        .placeholder("Write your feedback here!")
        .required(true);

    CreateModal::new(Action::FeedbackModal { season }.custom_id(), "Feedback")
        .components(vec![CreateActionRow::InputText(input)])
}

/// Discord caps placeholders at 100 characters
fn placeholder(text: &str) -> String {
    text.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_ids_parse_back() {
        let actions = [
            Action::SignUp { season: 4 },
            Action::Respond { season: 4, round: 2 },
            Action::Pick { season: 4, round: 2, preferred: 17, rejected: 9 },
            Action::Confirm {
                kind: ConfirmKind::Withdraw,
                season: 4,
                round: 0,
                accepted: false,
            },
            Action::FeedbackModal { season: 12 },
        ];
        for action in actions {
            assert_eq!(Action::parse(&action.custom_id()), Some(action));
        }
    }

    #[test]
    fn test_foreign_ids_are_ignored() {
        assert_eq!(Action::parse("config_global"), None);
        assert_eq!(Action::parse("vote:pick:1:2:x:4"), None);
        assert_eq!(Action::parse("confirm:explode:1:0:yes"), None);
        assert_eq!(Action::parse(""), None);
    }

    #[test]
    fn test_idle_announcement_has_no_buttons() {
        let mut season = Season::new(
            3,
            poise::serenity_prelude::GuildId::new(1),
            poise::serenity_prelude::ChannelId::new(2),
            SeasonPhase::Idle,
        );
        assert!(announcement_components(&season, false).is_empty());

        season.phase = SeasonPhase::Registering;
        assert_eq!(announcement_components(&season, true).len(), 2);
    }
}
