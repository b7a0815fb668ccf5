use std::time::Duration;

use jukebox::commands::music::audio_sources::Track;
use jukebox::commands::music::utils::music_manager::MusicError;
use jukebox::commands::music::utils::notifier::QueueEvent;
use jukebox::commands::music::utils::queue_manager::{EnqueueOutcome, PlaybackState};

use crate::common::Harness;
use crate::common::fixtures::*;
use crate::common::mocks::Call;
use crate::{assert_eq, assert_matches, fixture, rstest, test_case};

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

async fn play(harness: &Harness, track: Track) -> Result<EnqueueOutcome, MusicError> {
    harness
        .registry
        .enqueue(guild(), text_channel(), voice_channel(), track)
        .await
}

#[rstest]
#[tokio::test]
async fn test_full_lifecycle(harness: Harness, song_a: Track, song_b: Track) {
    assert_eq!(play(&harness, song_a.clone()).await, Ok(EnqueueOutcome::Started));
    assert_eq!(harness.state(guild()).await, Some(PlaybackState::Playing));

    assert_eq!(
        play(&harness, song_b.clone()).await,
        Ok(EnqueueOutcome::Queued { position: 1 })
    );
    assert_eq!(harness.titles(guild()).await, vec!["Song A", "Song B"]);

    let skipped = harness.registry.skip(guild(), text_channel()).await.unwrap();
    assert_eq!(skipped.skipped, song_a);
    assert_eq!(skipped.now_playing, Some(song_b.clone()));
    assert_eq!(harness.titles(guild()).await, vec!["Song B"]);

    harness.registry.stop(guild(), text_channel()).await.unwrap();
    assert!(!harness.registry.contains(guild()));

    assert_eq!(
        harness.log.calls(),
        vec![
            Call::open("Song A", 100),
            Call::Notify(text_channel(), QueueEvent::song_started(&song_a)),
            Call::Notify(text_channel(), QueueEvent::song_added(&song_b)),
            Call::stop("Song A"),
            Call::open("Song B", 100),
            Call::Notify(text_channel(), QueueEvent::song_started(&song_b)),
            Call::stop("Song B"),
            Call::Release(guild()),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn test_enqueue_sequence_keeps_playing(harness: Harness) {
    for i in 0..5 {
        let track = Track::new(format!("Song {}", i), Duration::from_secs(60), "ref");
        let outcome = play(&harness, track).await.unwrap();
        if i == 0 {
            assert_eq!(outcome, EnqueueOutcome::Started);
        } else {
            assert_eq!(outcome, EnqueueOutcome::Queued { position: i });
        }
        assert_eq!(harness.state(guild()).await, Some(PlaybackState::Playing));
        assert_eq!(harness.titles(guild()).await.len(), i + 1);
    }
    assert_eq!(harness.player.open_count(), 1);
}

#[rstest]
#[tokio::test]
async fn test_enqueue_while_paused_stays_paused(harness: Harness, song_a: Track, song_b: Track) {
    play(&harness, song_a).await.unwrap();
    harness.registry.pause(guild(), text_channel()).await.unwrap();

    assert_eq!(
        play(&harness, song_b).await,
        Ok(EnqueueOutcome::Queued { position: 1 })
    );
    assert_eq!(harness.state(guild()).await, Some(PlaybackState::Paused));
}

#[rstest]
#[tokio::test]
async fn test_skip_last_track_goes_idle(harness: Harness, song_a: Track) {
    play(&harness, song_a).await.unwrap();
    harness.log.clear();

    let skipped = harness.registry.skip(guild(), text_channel()).await.unwrap();

    assert_eq!(skipped.now_playing, None);
    assert_eq!(harness.state(guild()).await, Some(PlaybackState::Idle));
    assert!(harness.titles(guild()).await.is_empty());
    // No announcement beyond the caller's own confirmation.
    assert_eq!(harness.log.calls(), vec![Call::stop("Song A")]);
}

#[rstest]
#[tokio::test]
async fn test_idle_queue_remembers_volume(harness: Harness, song_a: Track, song_b: Track) {
    play(&harness, song_a).await.unwrap();
    harness.registry.skip(guild(), text_channel()).await.unwrap();

    assert_eq!(
        harness.registry.set_volume(guild(), text_channel(), 40).await,
        Ok(40)
    );
    play(&harness, song_b).await.unwrap();

    assert_eq!(
        harness.log.session_calls().last(),
        Some(&Call::open("Song B", 40))
    );
}

#[rstest]
#[tokio::test]
async fn test_voice_channel_follows_whoever_starts_playback(
    harness: Harness,
    song_a: Track,
    song_b: Track,
    song_c: Track,
) {
    play(&harness, song_a).await.unwrap();
    assert_eq!(harness.player.last_request().voice_channel, Some(voice_channel()));

    // Queued from elsewhere while playing: the queue stays where it is.
    harness
        .registry
        .enqueue(guild(), text_channel(), other_voice_channel(), song_b)
        .await
        .unwrap();
    harness.registry.skip(guild(), text_channel()).await.unwrap();
    assert_eq!(harness.player.last_request().voice_channel, Some(voice_channel()));

    // Skipping the last track leaves an idle queue; the next play moves it.
    harness.registry.skip(guild(), text_channel()).await.unwrap();
    harness
        .registry
        .enqueue(guild(), text_channel(), other_voice_channel(), song_c)
        .await
        .unwrap();
    assert_eq!(
        harness.player.last_request().voice_channel,
        Some(other_voice_channel())
    );
}

#[rstest]
#[tokio::test]
async fn test_remove_drops_queue_in_any_state(harness: Harness, song_a: Track) {
    play(&harness, song_a).await.unwrap();
    assert!(harness.registry.contains(guild()));

    harness.registry.remove(guild());
    assert!(!harness.registry.contains(guild()));
    assert_eq!(
        harness.registry.skip(guild(), text_channel()).await,
        Err(MusicError::EmptyQueue)
    );

    // Removing an unknown guild is a no-op.
    harness.registry.remove(other_guild());
    assert!(harness.registry.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_stop_allocates_fresh_queue(harness: Harness, song_a: Track, song_b: Track) {
    play(&harness, song_a).await.unwrap();
    harness.registry.set_volume(guild(), text_channel(), 30).await.unwrap();
    harness.registry.stop(guild(), text_channel()).await.unwrap();
    assert!(!harness.registry.contains(guild()));

    assert_eq!(play(&harness, song_b).await, Ok(EnqueueOutcome::Started));
    assert_eq!(
        harness.log.session_calls().last(),
        Some(&Call::open("Song B", 100))
    );
}

#[rstest]
#[tokio::test]
async fn test_stop_when_idle_is_empty_queue(harness: Harness, song_a: Track) {
    assert_eq!(
        harness.registry.stop(guild(), text_channel()).await,
        Err(MusicError::EmptyQueue)
    );

    play(&harness, song_a).await.unwrap();
    harness.registry.skip(guild(), text_channel()).await.unwrap();

    assert_eq!(
        harness.registry.stop(guild(), text_channel()).await,
        Err(MusicError::EmptyQueue)
    );
    assert_eq!(harness.state(guild()).await, Some(PlaybackState::Idle));
}

#[rstest]
#[tokio::test]
async fn test_operations_on_fresh_guild(harness: Harness) {
    let registry = &harness.registry;
    assert_eq!(registry.skip(guild(), text_channel()).await, Err(MusicError::EmptyQueue));
    assert_eq!(registry.pause(guild(), text_channel()).await, Err(MusicError::EmptyQueue));
    assert_eq!(registry.resume(guild(), text_channel()).await, Err(MusicError::EmptyQueue));
    assert_eq!(
        registry.set_volume(guild(), text_channel(), 50).await,
        Err(MusicError::EmptyQueue)
    );
    assert_matches!(
        registry.snapshot(guild(), text_channel()).await,
        Err(MusicError::EmptyQueue)
    );
    assert!(registry.is_empty());
    assert!(harness.log.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_pause_resume_round_trip(harness: Harness, song_a: Track, song_b: Track) {
    play(&harness, song_a).await.unwrap();
    play(&harness, song_b).await.unwrap();
    harness.registry.set_volume(guild(), text_channel(), 70).await.unwrap();
    let before = harness.registry.snapshot(guild(), text_channel()).await.unwrap();

    harness.registry.pause(guild(), text_channel()).await.unwrap();
    assert_eq!(harness.state(guild()).await, Some(PlaybackState::Paused));
    assert_eq!(
        harness.registry.pause(guild(), text_channel()).await,
        Err(MusicError::AlreadyPaused)
    );

    harness.registry.resume(guild(), text_channel()).await.unwrap();
    assert_eq!(
        harness.registry.resume(guild(), text_channel()).await,
        Err(MusicError::NotPaused)
    );

    let after = harness.registry.snapshot(guild(), text_channel()).await.unwrap();
    assert_eq!(after, before);
    assert_eq!(after.state, PlaybackState::Playing);
}

#[test_case(0 ; "zero")]
#[test_case(101 ; "just above range")]
#[test_case(150 ; "far above range")]
#[test_case(-5 ; "negative")]
#[tokio::test]
async fn test_invalid_volume_never_touches_queue(percent: i64) {
    let harness = Harness::new();

    // Rejected even when no queue exists.
    assert_eq!(
        harness.registry.set_volume(guild(), text_channel(), percent).await,
        Err(MusicError::InvalidVolume(percent))
    );
    assert!(!harness.registry.contains(guild()));

    play(&harness, song_a()).await.unwrap();
    assert_eq!(
        harness.registry.set_volume(guild(), text_channel(), percent).await,
        Err(MusicError::InvalidVolume(percent))
    );
    let snapshot = harness.registry.snapshot(guild(), text_channel()).await.unwrap();
    assert_eq!(snapshot.volume, 100);
}

#[rstest]
#[tokio::test]
async fn test_volume_is_idempotent(harness: Harness, song_a: Track) {
    play(&harness, song_a).await.unwrap();

    for _ in 0..2 {
        assert_eq!(
            harness.registry.set_volume(guild(), text_channel(), 50).await,
            Ok(50)
        );
        let snapshot = harness.registry.snapshot(guild(), text_channel()).await.unwrap();
        assert_eq!(snapshot.volume, 50);
        assert_eq!(snapshot.state, PlaybackState::Playing);
    }

    assert_eq!(
        harness.log.session_calls(),
        vec![
            Call::open("Song A", 100),
            Call::SetVolume("Song A".to_string(), 50),
            Call::SetVolume("Song A".to_string(), 50),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn test_open_failure_on_fresh_guild(harness: Harness, song_a: Track) {
    harness.player.fail_next_open();

    assert_matches!(play(&harness, song_a).await, Err(MusicError::SessionError(_)));
    assert!(!harness.registry.contains(guild()));
    assert_matches!(
        harness.log.notifications().as_slice(),
        [QueueEvent::Error { .. }]
    );
}

#[rstest]
#[tokio::test]
async fn test_open_failure_during_skip_forces_idle(
    harness: Harness,
    song_a: Track,
    song_b: Track,
    song_c: Track,
) {
    play(&harness, song_a).await.unwrap();
    play(&harness, song_b).await.unwrap();
    play(&harness, song_c).await.unwrap();
    harness.log.clear();
    harness.player.fail_next_open();

    assert_matches!(
        harness.registry.skip(guild(), text_channel()).await,
        Err(MusicError::SessionError(_))
    );

    let snapshot = harness.registry.snapshot(guild(), text_channel()).await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Idle);
    assert!(snapshot.tracks.is_empty());
    assert_matches!(
        harness.log.notifications().as_slice(),
        [QueueEvent::Error { message }] if message.contains("voice gateway refused")
    );
}

#[rstest]
#[tokio::test]
async fn test_open_timeout_is_session_error(harness: Harness, song_a: Track) {
    harness.player.hang_next_open();

    assert_matches!(
        play(&harness, song_a).await,
        Err(MusicError::SessionError(message)) if message.contains("Timed out")
    );
    assert!(!harness.registry.contains(guild()));
}

#[rstest]
#[tokio::test]
async fn test_control_failure_forces_idle(harness: Harness, song_a: Track) {
    play(&harness, song_a).await.unwrap();
    harness.player.fail_controls();

    assert_matches!(
        harness.registry.pause(guild(), text_channel()).await,
        Err(MusicError::SessionError(_))
    );
    assert_eq!(harness.state(guild()).await, Some(PlaybackState::Idle));
    assert_eq!(harness.log.session_calls().last(), Some(&Call::stop("Song A")));
}

#[rstest]
#[tokio::test]
async fn test_notifier_failure_keeps_mutation(harness: Harness, song_a: Track, song_b: Track) {
    harness.notifier.fail_all();

    assert_eq!(play(&harness, song_a).await, Ok(EnqueueOutcome::Started));
    assert_eq!(
        play(&harness, song_b).await,
        Ok(EnqueueOutcome::Queued { position: 1 })
    );
    assert_eq!(harness.state(guild()).await, Some(PlaybackState::Playing));
    assert_eq!(harness.log.notifications().len(), 2);
}

#[rstest]
#[tokio::test]
async fn test_notifications_follow_latest_channel(harness: Harness, song_a: Track, song_b: Track) {
    let other_channel = serenity::all::ChannelId::new(42);
    play(&harness, song_a).await.unwrap();
    harness.registry.pause(guild(), other_channel).await.unwrap();
    harness.log.clear();

    play(&harness, song_b.clone()).await.unwrap();
    harness.registry.resume(guild(), other_channel).await.unwrap();
    harness.registry.skip(guild(), other_channel).await.unwrap();

    assert_eq!(
        harness.log.calls().last(),
        Some(&Call::Notify(other_channel, QueueEvent::song_started(&song_b)))
    );
}

#[rstest]
#[tokio::test]
async fn test_guilds_are_isolated(harness: Harness, song_a: Track, song_b: Track) {
    play(&harness, song_a).await.unwrap();
    harness
        .registry
        .enqueue(other_guild(), text_channel(), voice_channel(), song_b)
        .await
        .unwrap();

    harness.registry.stop(guild(), text_channel()).await.unwrap();

    assert!(!harness.registry.contains(guild()));
    assert_eq!(harness.state(other_guild()).await, Some(PlaybackState::Playing));
    assert_eq!(harness.titles(other_guild()).await, vec!["Song B"]);
}
