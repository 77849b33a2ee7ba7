//! Suspension recovery and autoplay integration tests

mod helpers;

use cadence_ap::host::ContextState;
use cadence_ap::sim::SimConfig;
use cadence_ap::{EngineError, Visibility};
use helpers::*;

fn autoplay_blocked() -> SimConfig {
    SimConfig {
        autoplay_blocked: true,
        ..SimConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_show_after_hide_restores_both_tracks() {
    let session = TestSession::narrating().await;

    session.audio.set_visibility(Visibility::Hidden);
    session.host.hide();
    settle().await;
    assert_eq!(session.host.context_state(), Some(ContextState::Suspended));
    assert!(!session.host.is_playing(MUSIC_A));
    assert!(!session.host.is_playing(VO_1));
    assert!(!session.status().is_playing);

    session.audio.set_visibility(Visibility::Visible);
    settle().await;

    assert_eq!(session.host.context_state(), Some(ContextState::Running));
    assert!(session.host.is_playing(MUSIC_A));
    assert!(session.host.is_playing(VO_1));
    assert!(session.status().is_playing);
    // Resumed, not restarted
    assert_eq!(session.host.media_created(VO_1), 1);
}

#[tokio::test(start_paused = true)]
async fn test_show_while_paused_restarts_nothing() {
    let session = TestSession::playing_music().await;

    session.audio.set_paused(true);
    session.audio.set_visibility(Visibility::Hidden);
    session.host.hide();
    settle().await;
    let plays_before = session.host.play_calls(MUSIC_A);

    session.audio.set_visibility(Visibility::Visible);
    wait(AFTER_DEBOUNCE).await;

    assert!(!session.host.is_playing(MUSIC_A));
    assert!(!session.status().is_playing);
    assert_eq!(session.host.play_calls(MUSIC_A), plays_before);
}

#[tokio::test(start_paused = true)]
async fn test_visible_recovers_without_hidden_signal() {
    let session = TestSession::playing_music().await;

    // Host suspended audio but the Hidden signal never arrived
    session.host.hide();
    settle().await;
    assert!(!session.host.is_playing(MUSIC_A));

    session.audio.set_visibility(Visibility::Visible);
    settle().await;

    assert_eq!(session.host.context_state(), Some(ContextState::Running));
    assert!(session.host.is_playing(MUSIC_A));
    assert!(session.host.resume_count() >= 1);
}

#[tokio::test(start_paused = true)]
async fn test_autoplay_rejection_then_manual_play() {
    let mut session = TestSession::with_host(autoplay_blocked()).await;
    session.host.preload(MUSIC_A);

    session.audio.set_music_url(MUSIC_A.to_string());
    session.audio.set_paused(false);
    settle().await;

    let status = session.status();
    assert_eq!(status.error, Some(EngineError::AutoplayBlocked));
    assert_eq!(
        status.error_message().as_deref(),
        Some("Audio playback blocked - click to enable audio")
    );
    assert!(!status.is_playing);
    assert!(!session.host.is_playing(MUSIC_A));

    // Raised once even though two starts were refused
    let blocked = session
        .drain_event_types()
        .into_iter()
        .filter(|t| t == "AutoplayBlocked")
        .count();
    assert_eq!(blocked, 1);

    session.audio.play();
    settle().await;

    let status = session.status();
    assert!(status.is_playing);
    assert!(status.error.is_none());
    assert!(session.host.is_playing(MUSIC_A));
    assert!(session.host.is_unlocked());
}

#[tokio::test(start_paused = true)]
async fn test_manual_play_while_paused_only_unlocks() {
    let session = TestSession::with_host(autoplay_blocked()).await;
    session.host.preload(MUSIC_A);
    session.audio.set_music_url(MUSIC_A.to_string());
    settle().await;
    assert_eq!(session.host.context_state(), Some(ContextState::Suspended));

    session.audio.play();
    settle().await;

    assert!(session.host.is_unlocked());
    assert_eq!(session.host.context_state(), Some(ContextState::Running));
    assert!(!session.host.is_playing(MUSIC_A));
    assert_eq!(session.host.play_calls(MUSIC_A), 0);

    // No further gesture needed once unlocked
    session.audio.set_paused(false);
    settle().await;
    assert!(session.host.is_playing(MUSIC_A));
    assert!(session.status().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_redundant_manual_play_never_overlaps() {
    let session = TestSession::with_host(autoplay_blocked()).await;
    session.host.preload(MUSIC_A);
    session.audio.set_music_url(MUSIC_A.to_string());
    session.audio.set_paused(false);
    settle().await;

    for _ in 0..3 {
        session.audio.play();
    }
    settle().await;
    session.audio.play();
    session.audio.play();
    settle().await;

    assert!(session.host.is_playing(MUSIC_A));
    assert_eq!(session.host.start_count(MUSIC_A), 1);
    for snapshot in session.host.playing_snapshots() {
        assert_eq!(snapshot.iter().filter(|u| *u == MUSIC_A).count(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_play_resolving_after_pause_is_undone() {
    let session = TestSession::start().await;
    session.host.preload(MUSIC_A);
    session.audio.set_music_url(MUSIC_A.to_string());
    settle().await;

    // Pause lands while the play() is still pending
    session.audio.set_paused(false);
    session.audio.set_paused(true);
    settle().await;

    assert!(!session.host.is_playing(MUSIC_A));
    assert!(!session.status().is_playing);
}

#[tokio::test(start_paused = true)]
async fn test_hidden_signal_alone_changes_nothing() {
    let session = TestSession::playing_music().await;

    session.audio.set_visibility(Visibility::Hidden);
    settle().await;

    assert!(session.host.is_playing(MUSIC_A));
    assert_eq!(session.host.context_state(), Some(ContextState::Running));
}
