use poise::serenity_prelude as serenity;
use tracing::info;

use crate::{Context, Error};

/// Check if the bot is running
#[poise::command(prefix_command, slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    info!("Ping command called by {}", ctx.author().name);
    ctx.send(poise::CreateReply::default()
        .content("Pong! Bot is working!")
        .ephemeral(true))
        .await?;
    Ok(())
}

/// Show help information
#[poise::command(prefix_command, slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title("Bot Commands")
        .description("A season runs sign-ups, then rounds of prompt, responses and blind pairwise voting.")
        .field("/activate", "Enable the game in this channel (Host)", false)
        .field("/signup", "Open sign-ups for a new season with a prompt (Host)", false)
        .field("/prompt", "Start the next round with a prompt (Host)", false)
        .field("/vote", "Close submissions and open voting (Host)", false)
        .field("/conclude", "Close voting and score the round (Host)", false)
        .field("/hibernate", "End the season and collect prompt ideas (Host)", false)
        .field("/results", "Post a concluded round's results (Host)", false)
        .field("/status", "Show the current phase and round", false)
        .field("/standings", "Show everyone's total score", false)
        .color(0x3498db);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true)).await?;
    Ok(())
}
