//! Session audio engine and its components

pub mod ducking;
pub mod engine;
pub mod events;
pub mod generation;
pub mod graph;
pub mod track;

pub use engine::{SessionAudio, SessionAudioBuilder};
