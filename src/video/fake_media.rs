//! Scripted `PlayableMedia` for controller and stream group tests.
//!
//! A `FakeMedia` never advances on its own; tests move it through its
//! `FakeProbe`, which shares the stream's state after the stream has been
//! boxed and handed to a group.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::core::{CameraAngle, ClipRef, Result, ViewerError};
use crate::video::media::{MediaOpener, PlayableMedia};

#[derive(Debug)]
struct FakeState {
    angle: CameraAngle,
    paused: bool,
    position: f64,
    rate: f64,
    duration: Option<f64>,
    play_error: Option<String>,
    release_count: usize,
    play_count: usize,
}

pub struct FakeMedia {
    source: PathBuf,
    state: Arc<Mutex<FakeState>>,
}

#[derive(Clone)]
pub struct FakeProbe {
    state: Arc<Mutex<FakeState>>,
}

impl FakeMedia {
    fn with_duration(angle: CameraAngle, duration: Option<f64>) -> (Self, FakeProbe) {
        let state = Arc::new(Mutex::new(FakeState {
            angle,
            paused: true,
            position: 0.0,
            rate: 1.0,
            duration,
            play_error: None,
            release_count: 0,
            play_count: 0,
        }));
        let media = FakeMedia {
            source: PathBuf::from(format!("/fake/{}.mp4", angle)),
            state: state.clone(),
        };
        (media, FakeProbe { state })
    }

    /// Metadata known from the start.
    pub fn ready(angle: CameraAngle, duration: f64) -> (Self, FakeProbe) {
        Self::with_duration(angle, Some(duration))
    }

    /// Metadata arrives later through `FakeProbe::report_duration`.
    pub fn pending(angle: CameraAngle) -> (Self, FakeProbe) {
        Self::with_duration(angle, None)
    }
}

impl PlayableMedia for FakeMedia {
    fn source(&self) -> &Path {
        &self.source
    }

    fn play(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = state.play_error.take() {
            return Err(ViewerError::Playback {
                angle: state.angle,
                reason,
            });
        }
        state.paused = false;
        state.play_count += 1;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn seek(&mut self, time: f64) {
        self.state.lock().unwrap().position = time;
    }

    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    fn set_rate(&mut self, rate: f64) {
        self.state.lock().unwrap().rate = rate;
    }

    fn rate(&self) -> f64 {
        self.state.lock().unwrap().rate
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().unwrap().duration
    }

    fn release(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.release_count += 1;
        state.paused = true;
    }
}

impl FakeProbe {
    pub fn rate(&self) -> f64 {
        self.state.lock().unwrap().rate
    }

    pub fn paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    pub fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    pub fn play_count(&self) -> usize {
        self.state.lock().unwrap().play_count
    }

    pub fn released(&self) -> bool {
        self.release_count() > 0
    }

    pub fn release_count(&self) -> usize {
        self.state.lock().unwrap().release_count
    }

    pub fn set_position(&self, position: f64) {
        self.state.lock().unwrap().position = position;
    }

    /// Runs the stream to its end and stops it there, as a decoder does.
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap();
        state.position = state.duration.unwrap_or(state.position);
        state.paused = true;
    }

    pub fn report_duration(&self, duration: f64) {
        self.state.lock().unwrap().duration = Some(duration);
    }

    pub fn fail_next_play(&self, reason: &str) {
        self.state.lock().unwrap().play_error = Some(reason.to_string());
    }
}

/// How the next stream opened for an angle should behave.
#[derive(Debug, Clone)]
pub enum FakeBehavior {
    Ready(f64),
    Pending,
    FailOpen(String),
}

/// Opener that hands out `FakeMedia` and keeps a probe for every stream it opened.
#[derive(Clone, Default)]
pub struct FakeOpener {
    shared: Arc<Mutex<FakeOpenerState>>,
}

#[derive(Default)]
struct FakeOpenerState {
    scripted: HashMap<CameraAngle, VecDeque<FakeBehavior>>,
    default_duration: Option<f64>,
    opened: Vec<(ClipRef, FakeProbe)>,
}

impl FakeOpener {
    /// Every stream opens ready with `duration` unless scripted otherwise.
    pub fn with_duration(duration: f64) -> Self {
        let opener = Self::default();
        opener.shared.lock().unwrap().default_duration = Some(duration);
        opener
    }

    pub fn script(&self, angle: CameraAngle, behavior: FakeBehavior) {
        self.shared
            .lock()
            .unwrap()
            .scripted
            .entry(angle)
            .or_default()
            .push_back(behavior);
    }

    /// Probe of the most recent stream opened for `angle`.
    pub fn latest(&self, angle: CameraAngle) -> Option<FakeProbe> {
        self.shared
            .lock()
            .unwrap()
            .opened
            .iter()
            .rev()
            .find(|(clip, _)| clip.angle == angle)
            .map(|(_, probe)| probe.clone())
    }

    pub fn all_probes(&self) -> Vec<FakeProbe> {
        self.shared
            .lock()
            .unwrap()
            .opened
            .iter()
            .map(|(_, probe)| probe.clone())
            .collect()
    }

    pub fn opened_count(&self) -> usize {
        self.shared.lock().unwrap().opened.len()
    }
}

impl MediaOpener for FakeOpener {
    fn open(&mut self, clip: &ClipRef) -> Result<Box<dyn PlayableMedia>> {
        let mut shared = self.shared.lock().unwrap();
        let scripted = shared
            .scripted
            .get_mut(&clip.angle)
            .and_then(VecDeque::pop_front);
        let behavior = match (scripted, shared.default_duration) {
            (Some(behavior), _) => behavior,
            (None, Some(duration)) => FakeBehavior::Ready(duration),
            (None, None) => FakeBehavior::Pending,
        };

        let (media, probe) = match behavior {
            FakeBehavior::Ready(duration) => FakeMedia::ready(clip.angle, duration),
            FakeBehavior::Pending => FakeMedia::pending(clip.angle),
            FakeBehavior::FailOpen(reason) => {
                return Err(ViewerError::ResourceBind {
                    angle: clip.angle,
                    path: clip.file.clone(),
                    reason,
                })
            }
        };
        shared.opened.push((clip.clone(), probe));
        Ok(Box::new(media))
    }
}
