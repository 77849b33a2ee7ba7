//! Generation counters for cancelable asynchronous work
//!
//! Every intent that completes asynchronously (a debounced voiceover start, a
//! context resume followed by play, a `play()` promise) captures the current
//! [`Generation`] when it is issued. When it completes, the engine compares
//! that generation with the counter; anything older is discarded.
//!
//! Cancellation is "forget", not "interrupt": the host operation still runs to
//! completion, its result is simply not acted on.

/// Opaque stamp of one intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Owned, monotonically increasing generation counter
#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: u64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate everything issued so far and return the new generation
    pub fn advance(&mut self) -> Generation {
        self.current += 1;
        Generation(self.current)
    }

    pub fn current(&self) -> Generation {
        Generation(self.current)
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation.0 == self.current
    }
}
