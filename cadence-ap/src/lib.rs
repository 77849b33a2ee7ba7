//! # Cadence Session Audio Engine (cadence-ap)
//!
//! Narrated, music-accompanied session playback: a background music track
//! plays continuously while short narrations duck it at section boundaries.
//!
//! **Purpose:** Manage two independently loaded media streams through one
//! audio graph, duck music smoothly under narration, play each section's
//! narration exactly once, and survive host suspension and autoplay
//! restrictions.
//!
//! **Architecture:** A single actor task owns all engine state and reacts to
//! inputs, host media notices and its own async completions, all delivered on
//! one channel. The host audio platform sits behind the traits in [`host`].
//!
//! ```text
//! SessionAudio ──msg──> EngineActor ──> AudioGraph ──> host::AudioContext
//!      ^                    │  ^
//!      └──status/events─────┘  └──media notices / play results / timers
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod playback;
pub mod scenario;
pub mod sim;
pub mod state;

pub use error::{EngineError, Error, Result};
pub use playback::{SessionAudio, SessionAudioBuilder};
pub use state::{EngineStatus, Visibility};
