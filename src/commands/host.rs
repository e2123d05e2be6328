use poise::serenity_prelude as serenity;
use tracing::info;

use crate::error::BotError;
use crate::managers::TransitionOutcome;
use crate::messages::{
    activated_message, deactivated_message, results_heading, standings_message, status_message,
};
use crate::models::Actor;
use crate::notify::discord::render_page;
use crate::{Context, Error};

/// Who is running the command; game commands only work inside a guild
pub fn actor(ctx: Context<'_>) -> Result<Actor, Error> {
    let guild_id = ctx.guild_id().ok_or("This command can only be used in a guild")?;
    Ok(Actor {
        guild_id,
        channel_id: ctx.channel_id(),
        user_id: ctx.author().id,
        user_name: ctx.author().name.clone(),
    })
}

/// Reply ephemerally; rejections are shown to the user, failures go to `on_error`
async fn respond(ctx: Context<'_>, result: crate::error::Result<String>) -> Result<(), Error> {
    let content = match result {
        Ok(content) => content,
        Err(e) if e.is_rejection() => e.to_string(),
        Err(e) => return Err(e.into()),
    };
    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

fn transition_reply(outcome: TransitionOutcome) -> String {
    let mut reply = format!(
        "✅ {} -> {} (round {}).",
        outcome.previous, outcome.season.phase, outcome.season.round
    );
    if let Some(summary) = outcome.round {
        reply.push_str(&format!(
            "\nRound {} concluded: {} vote(s) over {} response(s).",
            outcome.season.round, summary.votes, summary.responses
        ));
    }
    if !outcome.announced {
        reply.push_str("\n⚠️ The announcement could not be posted. Its buttons will be missing until the next phase.");
    }
    reply
}

/// Enable the game in this channel
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_CHANNELS")]
pub async fn activate(
    ctx: Context<'_>,
    #[description = "Role pinged in the host thread"] host_role: Option<serenity::Role>,
) -> Result<(), Error> {
    let actor = actor(ctx)?;
    let result = ctx
        .data()
        .seasons
        .activate(&actor, host_role.map(|r| r.id))
        .await;
    respond(ctx, result.map(|_| activated_message())).await
}

/// Disable the game in this channel and delete its current season
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_CHANNELS")]
pub async fn deactivate(ctx: Context<'_>) -> Result<(), Error> {
    let actor = actor(ctx)?;
    let result = ctx.data().seasons.deactivate(&actor).await;
    respond(ctx, result.map(|_| deactivated_message())).await
}

/// Begin a season: open sign-ups with a prompt
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_MESSAGES")]
pub async fn signup(
    ctx: Context<'_>,
    #[description = "Sign-up prompt"] prompt: String,
) -> Result<(), Error> {
    let actor = actor(ctx)?;
    ctx.defer_ephemeral().await?;
    let result = ctx.data().seasons.open_signups(&actor, &prompt).await;
    respond(ctx, result.map(transition_reply)).await
}

/// Begin a round with a new prompt
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_MESSAGES")]
pub async fn prompt(
    ctx: Context<'_>,
    #[description = "Round prompt"] prompt: String,
) -> Result<(), Error> {
    let actor = actor(ctx)?;
    ctx.defer_ephemeral().await?;
    let result = ctx.data().seasons.open_round(&actor, &prompt).await;
    respond(ctx, result.map(transition_reply)).await
}

/// Close submissions and open voting
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_MESSAGES")]
pub async fn vote(ctx: Context<'_>) -> Result<(), Error> {
    let actor = actor(ctx)?;
    ctx.defer_ephemeral().await?;
    let result = ctx.data().seasons.open_voting(&actor).await;
    respond(ctx, result.map(transition_reply)).await
}

/// Close voting, score the round and post its results to the host thread
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_MESSAGES")]
pub async fn conclude(ctx: Context<'_>) -> Result<(), Error> {
    let actor = actor(ctx)?;
    ctx.defer_ephemeral().await?;
    let result = ctx.data().seasons.conclude(&actor).await;
    respond(ctx, result.map(transition_reply)).await
}

/// End the season and open prompt suggestions
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_MESSAGES")]
pub async fn hibernate(ctx: Context<'_>) -> Result<(), Error> {
    let actor = actor(ctx)?;
    ctx.defer_ephemeral().await?;
    let result = ctx.data().seasons.hibernate(&actor).await;
    respond(ctx, result.map(transition_reply)).await
}

/// Show the phase and round of this channel's season
#[poise::command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let result = ctx
        .data()
        .seasons
        .status(ctx.channel_id())
        .await
        .map(|s| status_message(&s.season, s.participants, s.submitted));
    respond(ctx, result).await
}

/// Post the ranked results of a concluded round in this channel
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_MESSAGES")]
pub async fn results(
    ctx: Context<'_>,
    #[description = "Round number (defaults to the latest concluded round)"] round: Option<u32>,
) -> Result<(), Error> {
    let actor = actor(ctx)?;
    ctx.defer().await?;

    let results = match ctx.data().seasons.round_results(ctx.channel_id(), round).await {
        Ok(results) => results,
        Err(e) => return respond(ctx, Err(e)).await,
    };
    if results.pages.is_empty() {
        ctx.say(format!("No responses were submitted in round {}.", results.round))
            .await?;
        return Ok(());
    }

    let heading = results_heading(results.round);
    for page in &results.pages {
        ctx.send(poise::CreateReply::default().embed(render_page(&heading, page)))
            .await?;
    }
    info!(
        "{} Posted round {} results ({} page(s)).",
        actor.chip(),
        results.round,
        results.pages.len()
    );
    Ok(())
}

/// Show cumulative scores for this season
#[poise::command(slash_command, guild_only)]
pub async fn standings(ctx: Context<'_>) -> Result<(), Error> {
    let result = ctx.data().seasons.standings(ctx.channel_id()).await;
    let embed = match result {
        Ok(ranked) => serenity::CreateEmbed::new()
            .title("Standings")
            .description(standings_message(&ranked))
            .color(0x3498db),
        Err(e) => return respond(ctx, Err::<String, BotError>(e)).await,
    };
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
