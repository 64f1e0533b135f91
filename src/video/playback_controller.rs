// =============================================================================
// PLAYBACK CONTROLLER - ONE TIMELINE OVER EVERY CAMERA OF A BATCH
// =============================================================================
//
// Ties the batch index to the stream group. All transport commands go through
// here so that every camera of the active batch is always driven together.
//
// STATES:
// - Empty:   nothing indexed
// - Loading: streams bound, waiting for each to report ready (bounded by the
//            settle timeout)
// - Ready:   streams positioned, rate applied, playing or paused
//
// The poll tick reads the reference stream (front, else the first bound
// camera) to move the shared play-head and to detect the end of a batch.
// Ticks and ready signals carry the batch key they were issued for and are
// dropped once that batch is no longer active or has been loaded again.
// The settle timeout runs from the first tick of a load.
//
// =============================================================================

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;

use crate::core::{
    BatchIndex, CameraAngle, IngestReport, PlaybackSettings, Result, TimestampKey, ViewerError,
};
use crate::video::media::MediaOpener;
use crate::video::stream_group::{StreamFailure, StreamGroup};
use crate::video::tick::{Tick, TickSchedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackPhase {
    Empty,
    Loading { key: TimestampKey, auto_play: bool },
    Ready { key: TimestampKey, playing: bool },
}

impl PlaybackPhase {
    pub fn key(&self) -> Option<&TimestampKey> {
        match self {
            PlaybackPhase::Empty => None,
            PlaybackPhase::Loading { key, .. } | PlaybackPhase::Ready { key, .. } => Some(key),
        }
    }

    pub fn display_text(&self) -> &str {
        match self {
            PlaybackPhase::Empty => "No clips loaded",
            PlaybackPhase::Loading { .. } => "Loading batch...",
            PlaybackPhase::Ready { playing: true, .. } => "Playing",
            PlaybackPhase::Ready { playing: false, .. } => "Paused",
        }
    }
}

/// Everything the presentation layer needs to draw the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub phase: PlaybackPhase,
    pub current_time: f64,
    pub duration: f64,
    pub is_playing: bool,
    pub playback_rate: f64,
}

impl PlaybackSession {
    fn new(placeholder_duration: f64, playback_rate: f64) -> Self {
        Self {
            phase: PlaybackPhase::Empty,
            current_time: 0.0,
            duration: placeholder_duration,
            is_playing: false,
            playback_rate,
        }
    }

    pub fn active_key(&self) -> Option<&TimestampKey> {
        self.phase.key()
    }
}

/// Notifications queued for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    IndexRebuilt { batches: usize },
    BatchLoading { key: TimestampKey },
    BatchReady { key: TimestampKey, playing: bool },
    TimeUpdate(f64),
    DurationChanged(f64),
    Advanced { from: TimestampKey, to: TimestampKey },
    EndOfIndex,
    StreamError { angle: CameraAngle, message: String },
}

pub struct PlaybackController {
    settings: PlaybackSettings,
    index: BatchIndex,
    group: StreamGroup,
    opener: Box<dyn MediaOpener>,
    session: PlaybackSession,
    schedule: TickSchedule,
    // Bound angles of the loading batch that have not reported ready yet
    pending: BTreeSet<CameraAngle>,
    // Set by the first tick of a load; the load completes no earlier
    settle_deadline: Option<Instant>,
    events: Vec<PlaybackEvent>,
}

impl PlaybackController {
    pub fn new(settings: PlaybackSettings, opener: Box<dyn MediaOpener>) -> Self {
        Self {
            index: BatchIndex::new(),
            group: StreamGroup::new(settings.initial_rate),
            opener,
            session: PlaybackSession::new(settings.placeholder_duration, settings.initial_rate),
            schedule: TickSchedule::new(settings.poll_interval),
            pending: BTreeSet::new(),
            settle_deadline: None,
            events: Vec::new(),
            settings,
        }
    }

    // =========================================================================
    // CONTROLS
    // =========================================================================

    /// Replaces the index with the given directory listing and starts playing
    /// the earliest batch. The chosen playback rate carries over.
    pub fn on_directory_ingested<I, N>(&mut self, files: I) -> IngestReport
    where
        I: IntoIterator<Item = (N, PathBuf)>,
        N: AsRef<str>,
    {
        self.group.unbind_all();
        self.schedule.cancel();
        self.pending.clear();

        let report = self.index.ingest(files);
        self.session = PlaybackSession::new(self.settings.placeholder_duration, self.session.playback_rate);
        self.events.push(PlaybackEvent::IndexRebuilt {
            batches: report.batches,
        });

        match self.index.first_key().cloned() {
            Some(first) => {
                if let Err(e) = self.load_batch(&first, true) {
                    log::error!("Failed to load first batch {}: {}", first, e);
                }
            }
            None => log::warn!("{}", ViewerError::EmptyUpload),
        }

        report
    }

    /// Swaps the bound streams for the clips of `key`.
    ///
    /// Transport commands are held back until every new stream reports ready
    /// or the settle timeout runs out, whichever comes first.
    pub fn load_batch(&mut self, key: &TimestampKey, auto_play: bool) -> Result<()> {
        let clips: Vec<_> = self.index.get(key)?.clips().cloned().collect();
        log::info!("Loading batch {} ({} cameras, auto_play: {})", key, clips.len(), auto_play);

        self.group.unbind_all();
        self.pending.clear();
        self.settle_deadline = None;
        self.session.current_time = 0.0;
        self.session.duration = self.settings.placeholder_duration;
        self.session.is_playing = auto_play;
        self.session.phase = PlaybackPhase::Loading {
            key: key.clone(),
            auto_play,
        };
        self.schedule.arm(key.clone());
        self.events.push(PlaybackEvent::BatchLoading { key: key.clone() });

        for clip in &clips {
            match self.opener.open(clip) {
                Ok(media) => {
                    let ready = media.is_ready();
                    self.group.bind(clip.angle, media);
                    if !ready {
                        self.pending.insert(clip.angle);
                    }
                }
                Err(e) => {
                    log::warn!("{}", e);
                    self.events.push(PlaybackEvent::StreamError {
                        angle: clip.angle,
                        message: e.to_string(),
                    });
                }
            }
        }

        if self.pending.is_empty() {
            self.finish_load();
        }
        Ok(())
    }

    pub fn select_batch(&mut self, key: &TimestampKey) -> Result<()> {
        self.load_batch(key, true)
    }

    pub fn toggle_play_pause(&mut self) {
        let phase = self.session.phase.clone();
        match phase {
            PlaybackPhase::Empty => {}
            PlaybackPhase::Loading { key, auto_play } => {
                log::debug!("Toggling pending auto-play for {} to {}", key, !auto_play);
                self.session.is_playing = !auto_play;
                self.session.phase = PlaybackPhase::Loading {
                    key,
                    auto_play: !auto_play,
                };
            }
            PlaybackPhase::Ready { key, playing } => {
                let currently_playing = if self.group.is_empty() {
                    playing
                } else {
                    self.group.any_playing()
                };

                if currently_playing {
                    log::info!("Pausing {} at {:.2}s", key, self.session.current_time);
                    self.group.pause_all();
                } else {
                    log::info!("Playing {} from {:.2}s", key, self.session.current_time);
                    self.group.set_rate(self.session.playback_rate);
                    let failures = self.group.play_all();
                    self.report_failures(failures);
                }

                self.session.is_playing = !currently_playing;
                self.session.phase = PlaybackPhase::Ready {
                    key,
                    playing: !currently_playing,
                };
            }
        }
    }

    pub fn set_rate(&mut self, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ViewerError::InvalidRate(rate));
        }
        log::info!("Playback rate set to {}x", rate);
        self.group.set_rate(rate);
        self.session.playback_rate = rate;
        Ok(())
    }

    /// Moves every stream to `time`, clamped to the batch duration. The
    /// play-head updates at once, without waiting for the streams.
    pub fn seek(&mut self, time: f64) {
        if time.is_nan() {
            return;
        }
        let clamped = time.clamp(0.0, self.session.duration.max(0.0));
        match self.session.phase {
            PlaybackPhase::Empty => return,
            // Applied as the start position once the load completes
            PlaybackPhase::Loading { .. } => {}
            PlaybackPhase::Ready { .. } => self.group.seek_all(clamped),
        }
        log::debug!("Seek to {:.2}s", clamped);
        self.session.current_time = clamped;
        self.events.push(PlaybackEvent::TimeUpdate(clamped));
    }

    /// Loads the neighbouring batch and plays it. Returns false at either end
    /// of the index, where nothing changes.
    pub fn advance(&mut self, direction: Direction) -> bool {
        let Some(current) = self.session.active_key().cloned() else {
            return false;
        };
        let target = match direction {
            Direction::Forward => self.index.next_key(&current),
            Direction::Backward => self.index.prev_key(&current),
        }
        .cloned();

        let Some(target) = target else {
            log::debug!("No batch {:?} from {}", direction, current);
            return false;
        };

        match self.load_batch(&target, true) {
            Ok(()) => {
                self.events.push(PlaybackEvent::Advanced {
                    from: current,
                    to: target,
                });
                true
            }
            Err(e) => {
                log::error!("Failed to advance to {}: {}", target, e);
                false
            }
        }
    }

    pub fn next_batch(&mut self) -> bool {
        self.advance(Direction::Forward)
    }

    pub fn prev_batch(&mut self) -> bool {
        self.advance(Direction::Backward)
    }

    // =========================================================================
    // RESOURCE CALLBACKS
    // =========================================================================

    pub fn on_resource_ready(&mut self, key: &TimestampKey, angle: CameraAngle) {
        if self.session.active_key() != Some(key) {
            log::debug!("Ignoring ready signal for superseded batch {} ({})", key, angle);
            return;
        }
        self.pending.remove(&angle);
        self.after_resource_settled();
    }

    /// Blanks the failed camera; the rest of the batch carries on.
    pub fn on_resource_failed(&mut self, key: &TimestampKey, angle: CameraAngle, reason: &str) {
        if self.session.active_key() != Some(key) {
            log::debug!("Ignoring failure for superseded batch {} ({})", key, angle);
            return;
        }
        if self.group.unbind(angle) {
            log::warn!("{} stream of {} failed: {}", angle, key, reason);
            self.events.push(PlaybackEvent::StreamError {
                angle,
                message: reason.to_string(),
            });
        }
        self.pending.remove(&angle);
        self.after_resource_settled();
    }

    fn after_resource_settled(&mut self) {
        match self.session.phase {
            PlaybackPhase::Loading { .. } if self.pending.is_empty() => self.finish_load(),
            PlaybackPhase::Ready { .. } => self.refresh_duration(),
            _ => {}
        }
    }

    // =========================================================================
    // POLLING
    // =========================================================================

    /// Runs the poll tick if one is due. Call as often as convenient.
    pub fn poll(&mut self, now: Instant) {
        if let Some(tick) = self.schedule.poll(now) {
            self.on_tick(&tick);
        }
    }

    /// Issues a tick for the active batch without consulting the interval.
    #[cfg(test)]
    pub fn next_tick(&mut self) -> Option<Tick> {
        self.schedule.fire()
    }

    pub fn on_tick(&mut self, tick: &Tick) {
        if !self.schedule.is_current(tick) || self.session.active_key() != Some(&tick.batch_key) {
            log::trace!("Dropping stale tick {} for {}", tick.seq, tick.batch_key);
            return;
        }

        match self.session.phase {
            PlaybackPhase::Empty => return,
            PlaybackPhase::Loading { .. } => {
                let deadline = *self
                    .settle_deadline
                    .get_or_insert(tick.at + self.settings.settle_timeout);
                let group = &self.group;
                self.pending
                    .retain(|angle| group.get(*angle).map_or(false, |media| !media.is_ready()));
                if self.pending.is_empty() || tick.at >= deadline {
                    self.finish_load();
                }
                return;
            }
            PlaybackPhase::Ready { .. } => {}
        }

        self.refresh_duration();

        let Some(reference) = self.group.reference() else {
            return;
        };
        let position = reference.current_time();
        let advancing = !reference.is_paused();
        let ended = reference.has_ended();
        let duration = reference.duration();

        if (advancing || ended) && position != self.session.current_time {
            self.session.current_time = position;
            self.events.push(PlaybackEvent::TimeUpdate(position));
        }

        if !self.session.is_playing {
            return;
        }

        let near_end = advancing
            && duration.map_or(false, |d| position >= d - self.settings.end_tolerance);
        if near_end || ended {
            self.on_batch_end();
        }
    }

    fn on_batch_end(&mut self) {
        if self.advance(Direction::Forward) {
            return;
        }
        if let Some(key) = self.session.active_key().cloned() {
            log::info!("Reached the end of the last batch {}", key);
            self.group.pause_all();
            self.session.is_playing = false;
            self.session.phase = PlaybackPhase::Ready {
                key,
                playing: false,
            };
            self.events.push(PlaybackEvent::EndOfIndex);
        }
    }

    fn finish_load(&mut self) {
        let PlaybackPhase::Loading { key, auto_play } = self.session.phase.clone() else {
            return;
        };

        if !self.pending.is_empty() {
            log::warn!(
                "Settle timeout for {}: starting without {:?}",
                key,
                self.pending
            );
            self.pending.clear();
        }

        self.group.seek_all(self.session.current_time);
        self.group.set_rate(self.session.playback_rate);
        if auto_play {
            let failures = self.group.play_all();
            self.report_failures(failures);
        } else {
            self.group.pause_all();
        }

        self.session.is_playing = auto_play;
        self.session.phase = PlaybackPhase::Ready {
            key: key.clone(),
            playing: auto_play,
        };
        self.refresh_duration();

        log::info!("Batch {} ready ({} cameras)", key, self.group.len());
        self.events.push(PlaybackEvent::BatchReady {
            key,
            playing: auto_play,
        });
    }

    fn refresh_duration(&mut self) {
        let reported = self.group.reference().and_then(|media| media.duration());
        if let Some(duration) = reported {
            if duration.is_finite() && duration > 0.0 && duration != self.session.duration {
                log::debug!("Batch duration is {:.2}s", duration);
                self.session.duration = duration;
                self.events.push(PlaybackEvent::DurationChanged(duration));
            }
        }
    }

    fn report_failures(&mut self, failures: Vec<StreamFailure>) {
        for failure in failures {
            self.events.push(PlaybackEvent::StreamError {
                angle: failure.angle,
                message: failure.error.to_string(),
            });
        }
    }

    // =========================================================================
    // STATE QUERIES
    // =========================================================================

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn index(&self) -> &BatchIndex {
        &self.index
    }

    pub fn streams(&self) -> &StreamGroup {
        &self.group
    }

    pub fn active_key(&self) -> Option<&TimestampKey> {
        self.session.active_key()
    }

    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn time_until_next_tick(&self, now: Instant) -> Option<std::time::Duration> {
        self.schedule.time_until_due(now)
    }
}
