use std::sync::LazyLock;
use std::time::Duration;

use poise::CreateReply;
use regex::Regex;
use serenity::all::CreateEmbed;

use super::dispatcher::{Acknowledgement, CommandKind};
use super::music_manager::MusicError;
use super::notifier::{excerpt, QueueEvent};
use super::queue_manager::{PlaybackState, QueueSnapshot};
use super::format_duration;

/// Most tracks listed by `/queue` before the rest is summarised.
pub const QUEUE_DISPLAY_LIMIT: usize = 20;

const SUCCESS_COLOR: u32 = 0x00ff00;
const WARNING_COLOR: u32 = 0xffa500;
const ERROR_COLOR: u32 = 0xff0000;

static MARKDOWN_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([\\*_~`|>\[\]])").unwrap());

/// Escape Discord markdown so track titles render literally
pub fn escape_markdown(text: &str) -> String {
    MARKDOWN_CHARS.replace_all(text, r"\$1").into_owned()
}

/// Create an embed for a queue-wide announcement
pub fn queue_event(event: &QueueEvent) -> CreateEmbed {
    let embed = CreateEmbed::new().description(event.to_string());
    match event {
        QueueEvent::SongStarted { .. } => embed.title("🎵 Now Playing").color(SUCCESS_COLOR),
        QueueEvent::SongAdded { .. } => embed.title("🎵 Added to Queue").color(SUCCESS_COLOR),
        QueueEvent::Error { .. } => embed.title("⚠️ Playback Error").color(WARNING_COLOR),
    }
}

/// Render the `/queue` listing
pub fn queue_listing(snapshot: &QueueSnapshot) -> String {
    let mut listing = String::from("📜 **Current Queue:**");

    if snapshot.tracks.is_empty() {
        listing.push_str("\nNothing queued.");
        return listing;
    }

    for (index, track) in snapshot.tracks.iter().take(QUEUE_DISPLAY_LIMIT).enumerate() {
        let title = escape_markdown(track.title());
        let line = if index == 0 {
            let marker = if snapshot.state == PlaybackState::Paused { "⏸️" } else { "▶️" };
            format!("\n{} {} - {}", marker, title, track.formatted_duration())
        } else {
            format!("\n{}. {} - {}", index, title, track.formatted_duration())
        };
        listing.push_str(&line);
    }

    let hidden = snapshot.tracks.len().saturating_sub(QUEUE_DISPLAY_LIMIT);
    if hidden > 0 {
        listing.push_str(&format!("\n…and {} more", hidden));
    }

    let total: Duration = snapshot.tracks.iter().map(|track| track.duration()).sum();
    listing.push_str(&format!(
        "\n🔊 {}% · ⏱️ {}",
        snapshot.volume,
        format_duration(total)
    ));

    listing
}

/// Create the reply for a successful command
pub fn acknowledgement(ack: &Acknowledgement) -> CreateReply {
    let title = match ack {
        Acknowledgement::Started { .. } => "🎵 Now Playing",
        Acknowledgement::Queued { .. } => "🎵 Added to Queue",
        Acknowledgement::Skipped => "⏭️ Skipped",
        Acknowledgement::Stopped => "⏹️ Stopped",
        Acknowledgement::Queue(_) => "🎵 Music Queue",
        Acknowledgement::Paused => "⏸️ Paused",
        Acknowledgement::Resumed => "▶️ Resumed",
        Acknowledgement::Volume(_) => "🔊 Volume",
    };

    CreateReply::default().embed(
        CreateEmbed::new()
            .title(title)
            .description(ack.to_string())
            .color(SUCCESS_COLOR),
    )
}

/// The user-facing text for a failed command
pub fn user_message(kind: &CommandKind, err: &MusicError) -> String {
    match (kind, err) {
        (_, MusicError::NotInGuild) => "❌ This command only works in a server.".to_string(),
        (_, MusicError::NoVoiceChannel) => "❌ Please join a voice channel first.".to_string(),
        (CommandKind::Stop, MusicError::EmptyQueue) => {
            "❌ No music is currently playing.".to_string()
        }
        (CommandKind::Skip, MusicError::EmptyQueue) => "❌ There is no song to skip.".to_string(),
        (_, MusicError::EmptyQueue) => "❌ The queue is empty.".to_string(),
        (_, MusicError::InvalidVolume(_)) => "❌ Volume must be between 1 and 100.".to_string(),
        (_, MusicError::AlreadyPaused) => "❌ Music is already paused.".to_string(),
        (_, MusicError::NotPaused) => "❌ Music is not paused.".to_string(),
        (_, MusicError::InvalidTrack(reason)) => {
            format!("❌ Could not find that song: {}", excerpt(reason))
        }
        (_, MusicError::SessionError(reason)) => {
            format!("❌ Playback failed: {}", excerpt(reason))
        }
    }
}

/// Create the reply for a failed command
pub fn failure(kind: &CommandKind, err: &MusicError) -> CreateReply {
    let ephemeral = matches!(err, MusicError::NoVoiceChannel | MusicError::NotInGuild);

    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description(user_message(kind, err))
                .color(ERROR_COLOR),
        )
        .ephemeral(ephemeral)
}

/// Create the reply for an error the command did not anticipate
pub fn unexpected_error(err: &dyn std::fmt::Display) -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description(format!(
                    "❌ Something went wrong: {}",
                    excerpt(&err.to_string())
                ))
                .color(ERROR_COLOR),
        )
        .ephemeral(true)
}
