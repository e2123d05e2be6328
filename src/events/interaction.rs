use poise::serenity_prelude::{
    self as serenity, ActionRowComponent, ComponentInteraction, CreateActionRow,
    CreateInteractionResponse, CreateInteractionResponseMessage, CreateModal, ModalInteraction,
};
use tracing::{debug, error};

use crate::components::{
    ballot_components, confirmation_components, feedback_modal, prompt_modal, response_modal,
    signup_modal, Action, ConfirmKind,
};
use crate::error::{BotError, Result};
use crate::managers::BallotOutcome;
use crate::messages::*;
use crate::models::{Actor, SeasonPhase};
use crate::{Data, Error};

/// How to answer a button click or modal submission
enum Reply {
    /// New ephemeral message
    Message {
        content: String,
        components: Vec<CreateActionRow>,
    },
    /// Replace the message the button sits on
    Update {
        content: String,
        components: Vec<CreateActionRow>,
    },
    Modal(CreateModal),
}

impl Reply {
    fn text(content: String) -> Self {
        Reply::Message {
            content,
            components: Vec::new(),
        }
    }

    fn into_response(self) -> CreateInteractionResponse {
        match self {
            Reply::Message {
                content,
                components,
            } => CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .components(components)
                    .ephemeral(true),
            ),
            Reply::Update {
                content,
                components,
            } => CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .components(components),
            ),
            Reply::Modal(modal) => CreateInteractionResponse::Modal(modal),
        }
    }
}

/// Handle button clicks and modal submissions of game messages
pub async fn handle_interaction(
    ctx: &serenity::Context,
    interaction: &serenity::Interaction,
    data: &Data,
) -> std::result::Result<(), Error> {
    match interaction {
        serenity::Interaction::Component(component) => handle_component(ctx, component, data).await,
        serenity::Interaction::Modal(modal) => handle_modal(ctx, modal, data).await,
        _ => Ok(()),
    }
}

async fn handle_component(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
    data: &Data,
) -> std::result::Result<(), Error> {
    let Some(action) = Action::parse(&component.data.custom_id) else {
        debug!("Ignoring unknown component '{}'", component.data.custom_id);
        return Ok(());
    };
    let Some(guild_id) = component.guild_id else {
        return Ok(());
    };
    let actor = Actor {
        guild_id,
        channel_id: component.channel_id,
        user_id: component.user.id,
        user_name: component.user.name.clone(),
    };

    let reply = settle(&actor, component_reply(action, &actor, data).await);
    component
        .create_response(&ctx.http, reply.into_response())
        .await?;
    Ok(())
}

async fn handle_modal(
    ctx: &serenity::Context,
    modal: &ModalInteraction,
    data: &Data,
) -> std::result::Result<(), Error> {
    let Some(action) = Action::parse(&modal.data.custom_id) else {
        debug!("Ignoring unknown modal '{}'", modal.data.custom_id);
        return Ok(());
    };
    let Some(guild_id) = modal.guild_id else {
        return Ok(());
    };
    let actor = Actor {
        guild_id,
        channel_id: modal.channel_id,
        user_id: modal.user.id,
        user_name: modal.user.name.clone(),
    };

    let reply = settle(&actor, modal_reply(action, &actor, modal, data).await);
    modal.create_response(&ctx.http, reply.into_response()).await?;
    Ok(())
}

/// Turn a failed action into a message for the user
fn settle(actor: &Actor, result: Result<Reply>) -> Reply {
    match result {
        Ok(reply) => reply,
        Err(e) if e.is_rejection() => {
            debug!("{} Rejected: {}", actor.chip(), e);
            Reply::text(e.to_string())
        }
        Err(e @ BotError::Invariant { .. }) => {
            error!("{} Data corruption: {}", actor.chip(), e);
            Reply::text("Something went wrong. The hosts have been notified in the logs.".to_string())
        }
        Err(e) => {
            error!("{} Interaction failed: {}", actor.chip(), e);
            Reply::text("Something went wrong, please try again.".to_string())
        }
    }
}

fn ballot_reply(outcome: BallotOutcome, update: bool) -> Reply {
    let (content, components) = match outcome {
        BallotOutcome::Ballot(ballot) => (
            ballot_message(ballot.recorded_votes, &ballot.first.1, &ballot.second.1),
            ballot_components(ballot.season_id, ballot.round, ballot.first.0, ballot.second.0),
        ),
        BallotOutcome::InsufficientResponses => (insufficient_responses_message(), Vec::new()),
        BallotOutcome::Exhausted { recorded_votes } => (exhausted_message(recorded_votes), Vec::new()),
    };
    if update {
        Reply::Update {
            content,
            components,
        }
    } else {
        Reply::Message {
            content,
            components,
        }
    }
}

fn confirm(content: String, kind: ConfirmKind, season: u64, round: u32) -> Reply {
    Reply::Message {
        content,
        components: confirmation_components(kind, season, round),
    }
}

async fn component_reply(action: Action, actor: &Actor, data: &Data) -> Result<Reply> {
    let limits = &data.config.limits;

    let reply = match action {
        Action::SignUp { season } => {
            let open = data
                .entries
                .open_season(season, SeasonPhase::Registering, None)
                .await?;
            let (participant, response) = data.entries.entry(season, open.round, actor.user_id).await?;
            Reply::Modal(signup_modal(
                season,
                limits,
                participant.as_ref().and_then(|p| p.moniker.as_deref()),
                response.as_ref().and_then(|r| r.content.as_deref()),
            ))
        }
        Action::ViewSignUp { season } => {
            let receipt = data.entries.view_response(actor, season, 0).await?;
            Reply::text(view_response_message(&receipt.author, &receipt.content))
        }
        Action::ResetMoniker { season } => confirm(
            confirm_reset_moniker_message(),
            ConfirmKind::ResetMoniker,
            season,
            0,
        ),
        Action::Withdraw { season } => {
            confirm(confirm_withdraw_message(), ConfirmKind::Withdraw, season, 0)
        }
        Action::Respond { season, round } => {
            data.entries
                .open_season(season, SeasonPhase::Responding, Some(round))
                .await?;
            let (participant, response) = data.entries.entry(season, round, actor.user_id).await?;
            if participant.is_none() {
                return Err(BotError::NotRegistered {
                    user_id: actor.user_id.to_string(),
                });
            }
            Reply::Modal(response_modal(
                season,
                round,
                limits,
                response.as_ref().and_then(|r| r.content.as_deref()),
            ))
        }
        Action::ViewResponse { season, round } => {
            let receipt = data.entries.view_response(actor, season, round).await?;
            Reply::text(view_response_message(&receipt.author, &receipt.content))
        }
        Action::DeleteResponse { season, round } => confirm(
            confirm_delete_response_message(),
            ConfirmKind::DeleteResponse,
            season,
            round,
        ),
        Action::StartVoting { season, round } => {
            let outcome = data.voting.request_ballot(actor, season, round).await?;
            ballot_reply(outcome, false)
        }
        Action::Pick {
            season,
            round,
            preferred,
            rejected,
        } => {
            let outcome = data
                .voting
                .cast_vote(actor, season, round, preferred, rejected)
                .await?;
            ballot_reply(outcome, true)
        }
        Action::SuggestPrompt { season } => {
            data.entries
                .open_season(season, SeasonPhase::Hibernating, None)
                .await?;
            Reply::Modal(prompt_modal(season, limits))
        }
        Action::Feedback { season } => {
            data.entries
                .open_season(season, SeasonPhase::Hibernating, None)
                .await?;
            Reply::Modal(feedback_modal(season))
        }
        Action::Confirm {
            kind,
            season,
            round,
            accepted,
        } => {
            let content = confirmed(kind, accepted, actor, season, round, data).await?;
            Reply::Update {
                content,
                components: Vec::new(),
            }
        }
        Action::SignUpModal { .. }
        | Action::ResponseModal { .. }
        | Action::PromptModal { .. }
        | Action::FeedbackModal { .. } => {
            return Err(BotError::InvalidInput {
                message: "This form has expired.".to_string(),
            })
        }
    };
    Ok(reply)
}

async fn confirmed(
    kind: ConfirmKind,
    accepted: bool,
    actor: &Actor,
    season: u64,
    round: u32,
    data: &Data,
) -> Result<String> {
    let content = match (kind, accepted) {
        (ConfirmKind::ResetMoniker, true) => {
            if data.entries.reset_moniker(actor, season).await? {
                "Moniker reset.".to_string()
            } else {
                format!(
                    "You have no moniker set! (Your responses will show up under `{}`.)",
                    actor.user_name
                )
            }
        }
        (ConfirmKind::ResetMoniker, false) => "Moniker preserved.".to_string(),
        (ConfirmKind::Withdraw, true) => {
            data.entries.withdraw(actor, season).await?;
            "You have been removed from this season.".to_string()
        }
        (ConfirmKind::Withdraw, false) => "Action cancelled.".to_string(),
        (ConfirmKind::DeleteResponse, true) => {
            data.entries.delete_response(actor, season, round).await?;
            "Response deleted.".to_string()
        }
        (ConfirmKind::DeleteResponse, false) => "Response preserved.".to_string(),
    };
    Ok(content)
}

async fn modal_reply(
    action: Action,
    actor: &Actor,
    modal: &ModalInteraction,
    data: &Data,
) -> Result<Reply> {
    let reply = match action {
        Action::SignUpModal { season } => {
            let moniker = modal_value(modal, "moniker");
            let response = modal_value(modal, "response");
            let receipt = data
                .entries
                .sign_up(actor, season, moniker.as_deref(), response.as_deref())
                .await?;
            Reply::text(response_recorded_message(&receipt.author, &receipt.content))
        }
        Action::ResponseModal { season, round } => {
            let text = modal_value(modal, "response").unwrap_or_default();
            let receipt = data
                .entries
                .submit_response(actor, season, round, &text)
                .await?;
            Reply::text(response_recorded_message(&receipt.author, &receipt.content))
        }
        Action::PromptModal { season } => {
            let text = modal_value(modal, "prompt").unwrap_or_default();
            let prompt = data.entries.suggest_prompt(actor, season, &text).await?;
            Reply::text(prompt_received_message(&prompt.content))
        }
        Action::FeedbackModal { season } => {
            let text = modal_value(modal, "feedback").unwrap_or_default();
            let feedback = data.entries.send_feedback(actor, season, &text).await?;
            Reply::text(feedback_received_message(&feedback))
        }
        _ => {
            debug!("{} Ignoring non-modal action in modal submission", actor.chip());
            return Err(BotError::InvalidInput {
                message: "This form has expired.".to_string(),
            });
        }
    };
    Ok(reply)
}

/// Text typed into the modal field `custom_id`
fn modal_value(modal: &ModalInteraction, custom_id: &str) -> Option<String> {
    modal
        .data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .find_map(|component| match component {
            ActionRowComponent::InputText(input) if input.custom_id == custom_id => {
                input.value.clone()
            }
            _ => None,
        })
}
