//! Suspension recovery
//!
//! When the host goes to the background it may suspend the audio context and
//! pause media on its own. On return to the foreground the context is resumed
//! and, unless the user paused, any track that was stopped under us is
//! restarted (see `AfterResume::Wake`).

use super::core::EngineActor;
use crate::host::Activation;
use crate::playback::events::AfterResume;
use crate::state::Visibility;
use tracing::{debug, info};

impl EngineActor {
    pub(super) fn set_visibility(&mut self, visibility: Visibility) {
        let previous = self.visibility;
        self.visibility = visibility;

        match visibility {
            Visibility::Hidden => {
                if previous != Visibility::Hidden {
                    info!("Session hidden, host may suspend audio");
                }
            }
            Visibility::Visible => {
                // Always attempt recovery; the host may have suspended audio
                // without a Hidden signal reaching us
                let generation = self.playback_gen.advance();
                debug!(
                    "Session visible (was {:?}, context {:?}, paused: {})",
                    previous,
                    self.graph.state(),
                    self.paused
                );
                self.ensure_running(generation, AfterResume::Wake, Activation::Programmatic);
            }
        }
    }
}
