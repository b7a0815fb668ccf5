use std::sync::Arc;

use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use songbird::{SerenityInit, Songbird};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use jukebox::commands::music::audio_sources::YtDlpResolver;
use jukebox::commands::music::utils::{
    dispatcher::CommandDispatcher, music_manager::QueueRegistry, notifier::ChannelNotifier,
    songbird_player::SongbirdPlayer,
};
use jukebox::config::Config;
use jukebox::{Data, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jukebox=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = Config::from_env()?;
    info!(
        "Starting with yt-dlp at '{}' and a {} session timeout",
        config.ytdlp_path,
        humantime::format_duration(config.session_timeout)
    );

    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let mut commands = vec![jukebox::register(), jukebox::help()];
    commands.extend(jukebox::commands::music::commands());

    let songbird = Songbird::serenity();
    let voice = Arc::clone(&songbird);
    // songbird wants the yt-dlp program name for the life of the process.
    let program: &'static str = Box::leak(config.ytdlp_path.clone().into_boxed_str());
    let guild_id = config.guild_id.map(serenity::GuildId::new);
    let session_timeout = config.session_timeout;
    let ytdlp_path = config.ytdlp_path.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            on_error: |error| Box::pin(jukebox::on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                match guild_id {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id)
                            .await?;
                        info!("Registered commands in guild {}", guild_id);
                    }
                    None => {
                        poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                        info!("Registered commands globally");
                    }
                }

                let player = SongbirdPlayer::new(voice, reqwest::Client::new(), program);
                let notifier = ChannelNotifier::new(Arc::clone(&ctx.http));
                let registry = QueueRegistry::new(Arc::new(player), Arc::new(notifier), session_timeout);
                let resolver = YtDlpResolver::new(ytdlp_path);

                info!("{} is connected", ready.user.name);
                Ok(Data {
                    dispatcher: Arc::new(CommandDispatcher::new(registry, Arc::new(resolver))),
                })
            })
        })
        .build();

    let (activity, status) = jukebox::presence();
    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .activity(activity)
        .status(status)
        .framework(framework)
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down");
                shard_manager.shutdown_all().await;
            }
            Err(e) => warn!("Could not listen for ctrl-c: {}", e),
        }
    });

    client.start().await.map_err(Into::into)
}
