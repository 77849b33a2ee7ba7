//! Host trait implementations backed by the simulated platform state

use super::{new_gain, new_media, SimLogEntry, SimState};
use crate::host::{
    Activation, AudioContext, ContextState, GainNode, HostError, MediaEvent, MediaEventSink,
    MediaSource, PlayError, ReadyState,
};
use async_trait::async_trait;
use cadence_common::gain_ramp::ExponentialRamp;
use std::sync::Arc;

pub(crate) struct SimContext {
    state: Arc<SimState>,
    id: usize,
}

impl SimContext {
    pub(crate) fn new(state: Arc<SimState>, id: usize) -> Self {
        Self { state, id }
    }
}

#[async_trait]
impl AudioContext for SimContext {
    fn state(&self) -> ContextState {
        self.state.lock().contexts[self.id].state
    }

    fn current_time(&self) -> f64 {
        self.state.now()
    }

    fn create_gain(&self) -> Result<Arc<dyn GainNode>, HostError> {
        if self.state() == ContextState::Closed {
            return Err(HostError::ContextClosed);
        }
        Ok(Arc::new(new_gain(&self.state)))
    }

    fn create_media(
        &self,
        url: &str,
        sink: MediaEventSink,
    ) -> Result<Arc<dyn MediaSource>, HostError> {
        if self.state() == ContextState::Closed {
            return Err(HostError::ContextClosed);
        }
        Ok(Arc::new(new_media(&self.state, self.id, url, sink)))
    }

    async fn resume(&self, activation: Activation) -> Result<(), HostError> {
        tokio::task::yield_now().await;

        let mut inner = self.state.lock();
        if inner.contexts[self.id].state == ContextState::Closed {
            return Err(HostError::ContextClosed);
        }
        if activation == Activation::UserGesture {
            inner.unlocked = true;
        }
        if inner.autoplay_locked(&self.state.config) {
            return Err(HostError::NotAllowed);
        }

        inner.contexts[self.id].state = ContextState::Running;
        inner.resumes += 1;
        inner.log.push(SimLogEntry::ContextResumed);
        Ok(())
    }

    async fn close(&self) -> Result<(), HostError> {
        let mut inner = self.state.lock();
        if inner.contexts[self.id].state == ContextState::Closed {
            return Err(HostError::ContextClosed);
        }
        inner.contexts[self.id].state = ContextState::Closed;
        inner.log.push(SimLogEntry::ContextClosed);
        Ok(())
    }
}

pub(crate) struct SimGain {
    state: Arc<SimState>,
    id: usize,
}

impl SimGain {
    pub(crate) fn new(state: Arc<SimState>, id: usize) -> Self {
        Self { state, id }
    }
}

impl GainNode for SimGain {
    fn value(&self) -> f32 {
        let now = self.state.now();
        self.state.lock().gains[self.id].value_at(now)
    }

    fn set_value_at_time(&self, value: f32, time: f64) {
        let mut inner = self.state.lock();
        let gain = &mut inner.gains[self.id];
        gain.anchor_value = value;
        gain.anchor_time = time;
        gain.ramp = None;
    }

    fn cancel_scheduled_values(&self, time: f64) {
        let mut inner = self.state.lock();
        let gain = &mut inner.gains[self.id];
        let held = gain.value_at(time);
        gain.anchor_value = held;
        gain.anchor_time = time;
        gain.ramp = None;
    }

    fn exponential_ramp_to_value_at_time(&self, value: f32, time: f64) -> Result<(), HostError> {
        if !(value > 0.0) {
            return Err(HostError::InvalidRampTarget(value));
        }

        let mut inner = self.state.lock();
        let gain = &mut inner.gains[self.id];
        let ramp = ExponentialRamp::new(gain.anchor_value, value, gain.anchor_time, time);
        gain.history.push(ramp.clone());
        gain.ramp = Some(ramp);
        Ok(())
    }

    fn connect_to_output(&self) -> Result<(), HostError> {
        self.state.lock().gains[self.id].connected = true;
        Ok(())
    }

    fn disconnect(&self) {
        self.state.lock().gains[self.id].connected = false;
    }
}

pub(crate) struct SimMedia {
    state: Arc<SimState>,
    id: usize,
    url: String,
}

impl SimMedia {
    pub(crate) fn new(state: Arc<SimState>, id: usize, url: &str) -> Self {
        Self {
            state,
            id,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl MediaSource for SimMedia {
    fn url(&self) -> &str {
        &self.url
    }

    fn ready_state(&self) -> ReadyState {
        self.state.lock().media[self.id].ready
    }

    fn set_looping(&self, looping: bool) {
        self.state.lock().media[self.id].looping = looping;
    }

    fn connect(&self, _gain: &Arc<dyn GainNode>) -> Result<(), HostError> {
        let mut inner = self.state.lock();
        let media = &mut inner.media[self.id];
        if media.released {
            return Err(HostError::Media(format!("{} already released", self.url)));
        }
        media.connected = true;
        inner.log.push(SimLogEntry::MediaConnected(self.url.clone()));
        Ok(())
    }

    async fn play(&self, activation: Activation) -> Result<(), PlayError> {
        tokio::task::yield_now().await;

        let sink = {
            let mut inner = self.state.lock();
            if activation == Activation::UserGesture {
                inner.unlocked = true;
            }

            let context = inner.media[self.id].context;
            let context_state = inner.contexts[context].state;
            let locked = inner.autoplay_locked(&self.state.config);

            let media = &mut inner.media[self.id];
            if media.released {
                return Err(PlayError::Aborted);
            }
            if let Some(message) = &media.failed {
                return Err(PlayError::Failed(message.clone()));
            }
            media.play_calls += 1;
            inner.log.push(SimLogEntry::PlayRequested(self.url.clone()));

            if locked {
                inner.log.push(SimLogEntry::PlayRejected(self.url.clone()));
                return Err(PlayError::NotAllowed);
            }
            if context_state != ContextState::Running {
                inner.log.push(SimLogEntry::SilentPlay(self.url.clone()));
                return Ok(());
            }
            if inner.media[self.id].playing {
                return Ok(());
            }

            let media = &mut inner.media[self.id];
            let entry = if media.started && !media.ended {
                SimLogEntry::Resumed(self.url.clone())
            } else {
                SimLogEntry::Started(self.url.clone())
            };
            media.playing = true;
            media.started = true;
            media.ended = false;
            let sink = media.sink.clone();

            let snapshot = inner.playing_urls();
            inner.playing_snapshots.push(snapshot);
            inner.log.push(entry);
            sink
        };

        sink.emit(MediaEvent::Playing);
        Ok(())
    }

    fn pause(&self) {
        let sink = {
            let mut inner = self.state.lock();
            let media = &mut inner.media[self.id];
            if !media.playing {
                return;
            }
            media.playing = false;
            let sink = media.sink.clone();
            inner.log.push(SimLogEntry::Paused(self.url.clone()));
            sink
        };
        sink.emit(MediaEvent::Paused);
    }

    fn is_paused(&self) -> bool {
        !self.state.lock().media[self.id].playing
    }

    fn disconnect(&self) {
        let mut inner = self.state.lock();
        let media = &mut inner.media[self.id];
        if media.connected {
            media.connected = false;
            media.disconnects += 1;
            inner.log.push(SimLogEntry::Disconnected(self.url.clone()));
        }
    }

    fn release(&self) {
        let mut inner = self.state.lock();
        let media = &mut inner.media[self.id];
        if media.released {
            return;
        }
        media.released = true;
        media.playing = false;
        inner.log.push(SimLogEntry::Released(self.url.clone()));
    }
}
