use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::core::{CameraAngle, ClipRef, Result, ViewerError};
use crate::video::media::{MediaOpener, PlayableMedia};
use crate::video::worker::{JobSender, MediaJob};

/// Duration published by the background probe, `None` until it lands.
pub type DurationSlot = Arc<Mutex<Option<f64>>>;

/// A stream whose position follows the wall clock.
///
/// While playing, position = anchor position + elapsed × rate. Reaching the
/// probed duration pauses the stream there, the way a decoder stops at end
/// of file. Without a probed duration the position is unbounded.
#[derive(Debug)]
pub struct ClockedMedia {
    angle: CameraAngle,
    source: PathBuf,
    duration: DurationSlot,
    position: f64,
    started_at: Option<Instant>,
    rate: f64,
    released: bool,
}

impl ClockedMedia {
    pub fn new(angle: CameraAngle, source: PathBuf) -> Self {
        Self {
            angle,
            source,
            duration: Arc::new(Mutex::new(None)),
            position: 0.0,
            started_at: None,
            rate: 1.0,
            released: false,
        }
    }

    pub fn duration_slot(&self) -> DurationSlot {
        self.duration.clone()
    }

    fn known_duration(&self) -> Option<f64> {
        self.duration.lock().ok().and_then(|duration| *duration)
    }

    fn position_at(&self, now: Instant) -> f64 {
        let position = match self.started_at {
            Some(start) => self.position + now.saturating_duration_since(start).as_secs_f64() * self.rate,
            None => self.position,
        };
        match self.known_duration() {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn ended_at(&self, now: Instant) -> bool {
        self.known_duration()
            .map_or(false, |duration| self.position_at(now) >= duration)
    }

    fn play_at(&mut self, now: Instant) -> Result<()> {
        if self.released {
            return Err(ViewerError::Playback {
                angle: self.angle,
                reason: format!("{} was already released", self.source.display()),
            });
        }
        if self.ended_at(now) {
            self.position = 0.0;
        } else {
            self.position = self.position_at(now);
        }
        self.started_at = Some(now);
        Ok(())
    }

    fn pause_at(&mut self, now: Instant) {
        self.position = self.position_at(now);
        self.started_at = None;
    }

    fn seek_at(&mut self, now: Instant, time: f64) {
        let mut target = time.max(0.0);
        if let Some(duration) = self.known_duration() {
            target = target.min(duration);
        }
        self.position = target;
        if self.started_at.is_some() {
            self.started_at = Some(now);
        }
    }

    fn set_rate_at(&mut self, now: Instant, rate: f64) {
        self.position = self.position_at(now);
        if self.started_at.is_some() {
            self.started_at = Some(now);
        }
        self.rate = rate;
    }
}

impl PlayableMedia for ClockedMedia {
    fn source(&self) -> &Path {
        &self.source
    }

    fn play(&mut self) -> Result<()> {
        self.play_at(Instant::now())
    }

    fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    fn is_paused(&self) -> bool {
        self.started_at.is_none() || self.ended_at(Instant::now())
    }

    fn seek(&mut self, time: f64) {
        self.seek_at(Instant::now(), time);
    }

    fn current_time(&self) -> f64 {
        self.position_at(Instant::now())
    }

    fn set_rate(&mut self, rate: f64) {
        self.set_rate_at(Instant::now(), rate);
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn duration(&self) -> Option<f64> {
        self.known_duration()
    }

    fn release(&mut self) {
        self.pause_at(Instant::now());
        self.released = true;
        log::debug!("Released {:?}", self.source);
    }
}

/// Opens `ClockedMedia` for existing files and queues a duration probe for each.
pub struct ProbingOpener {
    jobs: JobSender,
}

impl ProbingOpener {
    pub fn new(jobs: JobSender) -> Self {
        Self { jobs }
    }
}

impl MediaOpener for ProbingOpener {
    fn open(&mut self, clip: &ClipRef) -> Result<Box<dyn PlayableMedia>> {
        if !clip.file.is_file() {
            return Err(ViewerError::ResourceBind {
                angle: clip.angle,
                path: clip.file.clone(),
                reason: "file not found".to_string(),
            });
        }

        let media = ClockedMedia::new(clip.angle, clip.file.clone());
        self.jobs.submit(MediaJob::Probe {
            key: clip.key.clone(),
            angle: clip.angle,
            path: clip.file.clone(),
            slot: media.duration_slot(),
        });
        Ok(Box::new(media))
    }
}
