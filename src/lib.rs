//! Per-guild music queue bot.
//!
//! The queue core lives in [`commands::music::utils`]; the poise slash commands in
//! [`commands::music`] turn Discord interactions into [`CommandIntent`]s for it.
//!
//! [`CommandIntent`]: commands::music::utils::dispatcher::CommandIntent

use std::sync::Arc;

use serenity::all::{ActivityData, OnlineStatus};

pub mod commands;
pub mod config;

use commands::music::utils::dispatcher::CommandDispatcher;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// What the bot shows it is listening to
pub const PRESENCE_NAME: &str = "🎶 Cursed Brothers Music";

/// Presence set when the client connects: online and listening
pub fn presence() -> (ActivityData, OnlineStatus) {
    (ActivityData::listening(PRESENCE_NAME), OnlineStatus::Online)
}

/// User data, which is stored and accessible in all command invocations
pub struct Data {
    pub dispatcher: Arc<CommandDispatcher>,
}

#[poise::command(slash_command, category = "General")]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
pub async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

/// Framework-wide error hook. Command errors that escaped the music layer are
/// logged and answered with a short generic reply.
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                "Command '{}' failed unexpectedly: {}",
                ctx.command().qualified_name,
                error
            );
            let reply = commands::music::utils::embedded_messages::unexpected_error(&error);
            if let Err(e) = ctx.send(reply).await {
                tracing::error!("Failed to report command error: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}
