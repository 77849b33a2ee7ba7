//! Session audio engine
//!
//! **Module Structure:**
//! - `core.rs`: Actor state, message loop, status publishing, media notices
//! - `coordinator.rs`: Pause/unpause, context resume, music playback, manual play
//! - `voiceover.rs`: Section-transition narration (play once, debounce, ducking)
//! - `recovery.rs`: Foreground/background transitions
//! - `handle.rs`: Public [`SessionAudio`] handle and its builder
//!
//! The actor exclusively owns every piece of mutable engine state. The handle
//! only sends messages and reads published snapshots.

mod coordinator;
mod core;
mod handle;
mod recovery;
mod voiceover;

pub use handle::{MusicEndedCallback, SessionAudio, SessionAudioBuilder};
