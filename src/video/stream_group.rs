use std::collections::BTreeMap;

use crate::core::{CameraAngle, ViewerError};
use crate::video::media::PlayableMedia;

/// A command that did not reach one stream.
#[derive(Debug)]
pub struct StreamFailure {
    pub angle: CameraAngle,
    pub error: ViewerError,
}

/// The bound streams of the active batch, driven as one.
///
/// Commands go to every bound stream; a failure on one stream is collected
/// and never stops the command from reaching the rest. The chosen rate is
/// group state and is applied to each stream as it is bound.
pub struct StreamGroup {
    streams: BTreeMap<CameraAngle, Box<dyn PlayableMedia>>,
    rate: f64,
}

impl StreamGroup {
    pub fn new(rate: f64) -> Self {
        Self {
            streams: BTreeMap::new(),
            rate,
        }
    }

    /// Takes ownership of `media`, releasing whatever was bound to `angle` before.
    pub fn bind(&mut self, angle: CameraAngle, mut media: Box<dyn PlayableMedia>) {
        media.set_rate(self.rate);
        if let Some(mut previous) = self.streams.insert(angle, media) {
            log::debug!("Releasing previous {} stream {}", angle, previous.source().display());
            previous.release();
        }
    }

    pub fn unbind(&mut self, angle: CameraAngle) -> bool {
        match self.streams.remove(&angle) {
            Some(mut media) => {
                media.release();
                true
            }
            None => false,
        }
    }

    pub fn unbind_all(&mut self) {
        if !self.streams.is_empty() {
            log::debug!("Releasing {} streams", self.streams.len());
        }
        for (_, mut media) in std::mem::take(&mut self.streams) {
            media.release();
        }
    }

    pub fn play_all(&mut self) -> Vec<StreamFailure> {
        let mut failures = Vec::new();
        for (angle, media) in self.streams.iter_mut() {
            media.set_rate(self.rate);
            if let Err(error) = media.play() {
                log::warn!("{} stream failed to play: {}", angle, error);
                failures.push(StreamFailure { angle: *angle, error });
            }
        }
        failures
    }

    pub fn pause_all(&mut self) {
        for media in self.streams.values_mut() {
            media.pause();
        }
    }

    pub fn seek_all(&mut self, time: f64) {
        for media in self.streams.values_mut() {
            media.seek(time);
        }
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
        for media in self.streams.values_mut() {
            media.set_rate(rate);
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn any_playing(&self) -> bool {
        self.streams.values().any(|media| !media.is_paused())
    }

    /// The stream that drives the shared play-head: front, else the first bound
    /// angle in display order.
    pub fn reference_angle(&self) -> Option<CameraAngle> {
        if self.streams.contains_key(&CameraAngle::Front) {
            return Some(CameraAngle::Front);
        }
        CameraAngle::LAYOUT
            .iter()
            .flatten()
            .copied()
            .find(|angle| self.streams.contains_key(angle))
    }

    pub fn reference(&self) -> Option<&dyn PlayableMedia> {
        self.reference_angle().and_then(|angle| self.get(angle))
    }

    pub fn get(&self, angle: CameraAngle) -> Option<&dyn PlayableMedia> {
        self.streams.get(&angle).map(|media| media.as_ref())
    }

    pub fn is_bound(&self, angle: CameraAngle) -> bool {
        self.streams.contains_key(&angle)
    }

    pub fn bound_angles(&self) -> impl Iterator<Item = CameraAngle> + '_ {
        self.streams.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

impl Drop for StreamGroup {
    fn drop(&mut self) {
        self.unbind_all();
    }
}
