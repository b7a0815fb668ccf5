use super::*;
use tracing::info;

/// Play a song from YouTube or a direct URL
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"] query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);
    run(ctx, CommandKind::Play { query }).await
}
