//! Audio graph manager
//!
//! Owns the session's audio context and its two gain nodes:
//!
//! ```text
//! music media     ──> music gain     ──┐
//!                                      ├──> output
//! voiceover media ──> voiceover gain ──┘
//! ```
//!
//! **Lifecycle:** built once when the engine starts, torn down on shutdown.
//! Both [`AudioGraph::initialize`] and [`AudioGraph::teardown`] are idempotent.
//! The graph outlives every track loaded through it.

use crate::host::{AudioContext, AudioHost, ContextState, GainNode, HostError};
use cadence_common::events::TrackKind;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Voiceover gain is fixed; narration level is set at the source
const VOICEOVER_GAIN: f32 = 1.0;

struct GraphNodes {
    context: Arc<dyn AudioContext>,
    music_gain: Arc<dyn GainNode>,
    voiceover_gain: Arc<dyn GainNode>,
}

/// Session audio graph (one per session)
pub struct AudioGraph {
    host: Arc<dyn AudioHost>,
    nodes: Option<GraphNodes>,
}

impl AudioGraph {
    pub fn new(host: Arc<dyn AudioHost>) -> Self {
        Self { host, nodes: None }
    }

    /// Build the context and both gain nodes, and connect them to output
    ///
    /// No-op when already initialized. On failure nothing is retained; the
    /// caller reports the graph as unavailable.
    pub fn initialize(&mut self, music_volume: f32) -> Result<(), HostError> {
        if self.nodes.is_some() {
            debug!("Audio graph already initialized");
            return Ok(());
        }

        let context = self.host.create_context()?;
        let now = context.current_time();

        let music_gain = context.create_gain()?;
        music_gain.set_value_at_time(music_volume, now);
        music_gain.connect_to_output()?;

        let voiceover_gain = context.create_gain()?;
        voiceover_gain.set_value_at_time(VOICEOVER_GAIN, now);
        voiceover_gain.connect_to_output()?;

        info!(
            "Audio graph initialized (music gain {:.2}, context {:?})",
            music_volume,
            context.state()
        );

        self.nodes = Some(GraphNodes {
            context,
            music_gain,
            voiceover_gain,
        });
        Ok(())
    }

    /// Disconnect the gains and close the context
    ///
    /// No-op when not initialized.
    pub async fn teardown(&mut self) {
        let Some(nodes) = self.nodes.take() else {
            return;
        };

        nodes.music_gain.disconnect();
        nodes.voiceover_gain.disconnect();

        if let Err(e) = nodes.context.close().await {
            warn!("Closing audio context failed: {}", e);
        }
        info!("Audio graph torn down");
    }

    pub fn is_initialized(&self) -> bool {
        self.nodes.is_some()
    }

    pub fn context(&self) -> Option<&Arc<dyn AudioContext>> {
        self.nodes.as_ref().map(|n| &n.context)
    }

    /// Gain node a track of `kind` is routed through
    pub fn gain(&self, kind: TrackKind) -> Option<&Arc<dyn GainNode>> {
        self.nodes.as_ref().map(|n| match kind {
            TrackKind::Music => &n.music_gain,
            TrackKind::Voiceover => &n.voiceover_gain,
        })
    }

    pub fn state(&self) -> Option<ContextState> {
        self.context().map(|c| c.state())
    }

    /// Context clock, or 0.0 without a graph
    pub fn now(&self) -> f64 {
        self.context().map(|c| c.current_time()).unwrap_or(0.0)
    }
}
