use std::path::Path;

use crate::core::{ClipRef, Result};

/// One playable stream as the controller sees it.
///
/// Implementations own whatever decoder or clock drives the stream. Times are
/// in seconds of media time.
pub trait PlayableMedia: Send {
    fn source(&self) -> &Path;

    /// Fails when the stream cannot start (decode error, missing file).
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    fn seek(&mut self, time: f64);

    fn current_time(&self) -> f64;

    fn set_rate(&mut self, rate: f64);

    fn rate(&self) -> f64;

    /// `None` until the stream's metadata is known.
    fn duration(&self) -> Option<f64>;

    /// Metadata has arrived and transport commands will take effect.
    fn is_ready(&self) -> bool {
        self.duration().is_some()
    }

    /// End-of-stream signal.
    fn has_ended(&self) -> bool {
        self.duration()
            .map_or(false, |duration| self.current_time() >= duration)
    }

    /// Drops decoder state and any handle on the source. Called exactly once,
    /// when the stream group lets go of the stream.
    fn release(&mut self);
}

/// Creates a fresh stream for a clip each time a batch is loaded.
pub trait MediaOpener {
    fn open(&mut self, clip: &ClipRef) -> Result<Box<dyn PlayableMedia>>;
}
