use std::time::Duration;

use jukebox::commands::music::audio_sources::{Track, YtDlpResolver};
use jukebox::commands::music::utils::format_duration;
use jukebox::commands::music::utils::music_manager::MusicError;

use crate::common::fixtures::SAMPLE_YTDLP_JSON;
use crate::{assert_eq, assert_matches, test_case};

#[test]
fn test_track_from_ytdlp_output() {
    let track = Track::from_ytdlp_json(SAMPLE_YTDLP_JSON).unwrap();

    assert_eq!(track.title(), "Song A");
    assert_eq!(track.duration(), Duration::from_secs(180));
    assert_eq!(track.source_ref(), "https://www.youtube.com/watch?v=aaaaaaaaaaa");
}

#[test_case("" ; "empty output")]
#[test_case("not json" ; "garbage")]
#[test_case(r#"{"title": "No link"}"# ; "missing url")]
fn test_bad_ytdlp_output(output: &str) {
    assert_matches!(Track::from_ytdlp_json(output), Err(MusicError::InvalidTrack(_)));
}

#[test_case(0, "0:00")]
#[test_case(59, "0:59")]
#[test_case(180, "3:00")]
#[test_case(3600, "1:00:00")]
#[test_case(3725, "1:02:05")]
fn test_format_duration(secs: u64, expected: &str) {
    assert_eq!(format_duration(Duration::from_secs(secs)), expected);
}

#[test_case("https://www.youtube.com/watch?v=aaaaaaaaaaa", "https://www.youtube.com/watch?v=aaaaaaaaaaa" ; "url")]
#[test_case("daft punk one more time", "ytsearch1:daft punk one more time" ; "search")]
fn test_resolver_target(query: &str, expected: &str) {
    assert_eq!(YtDlpResolver::target_for(query), expected);
}
