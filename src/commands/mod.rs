//! This module aggregates all the command modules for the bot.

/// Commands related to music playback and the per-guild queue.
pub mod music;
