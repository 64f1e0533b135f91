use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::sync::{mpsc, Semaphore};

use crate::core::{CameraAngle, TimestampKey};
use crate::video::clocked_media::DurationSlot;
use crate::video::thumbnail::{Thumbnail, THUMBNAIL_HEIGHT, THUMBNAIL_WIDTH};
use crate::video::tool_runner::{ToolError, ToolRunner};

/// Work handed to the background worker.
#[derive(Debug, Clone)]
pub enum MediaJob {
    /// Read the clip's duration and publish it into `slot`.
    Probe {
        key: TimestampKey,
        angle: CameraAngle,
        path: PathBuf,
        slot: DurationSlot,
    },
    /// Decode the batch poster frame.
    Thumbnail { key: TimestampKey, path: PathBuf },
}

/// Completion reports, drained by the UI thread once per frame.
#[derive(Debug, Clone)]
pub enum MediaNotice {
    Ready {
        key: TimestampKey,
        angle: CameraAngle,
    },
    /// The probe tool could not run; the stream stays bound with an unknown duration.
    Unprobed {
        key: TimestampKey,
        angle: CameraAngle,
        reason: String,
    },
    Failed {
        key: TimestampKey,
        angle: CameraAngle,
        reason: String,
    },
    Thumbnail {
        key: TimestampKey,
        result: Result<Thumbnail, String>,
    },
}

/// Cloneable submit side of a `MediaWorker`.
#[derive(Debug, Clone)]
pub struct JobSender {
    sender: mpsc::UnboundedSender<MediaJob>,
}

impl JobSender {
    pub fn submit(&self, job: MediaJob) {
        if let Err(e) = self.sender.send(job) {
            log::error!("Failed to send media job: {}", e);
        }
    }
}

/// Runs ffprobe/ffmpeg jobs off the UI thread.
///
/// Jobs are dispatched on a tokio runtime owned by a dedicated thread; each
/// tool invocation runs under `spawn_blocking` and at most `max_processes`
/// run at once.
pub struct MediaWorker {
    jobs: JobSender,
    notice_receiver: Arc<Mutex<mpsc::UnboundedReceiver<MediaNotice>>>,
}

impl MediaWorker {
    pub fn new(runner: ToolRunner, max_processes: usize) -> Self {
        let (job_tx, mut job_rx) = mpsc::unbounded_channel::<MediaJob>();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel::<MediaNotice>();
        let limit = Arc::new(Semaphore::new(max_processes.max(1)));

        thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    log::error!("Failed to create media worker runtime: {}", e);
                    return;
                }
            };

            rt.block_on(async {
                while let Some(job) = job_rx.recv().await {
                    let permit = match limit.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };
                    let runner = runner.clone();
                    let notice_tx = notice_tx.clone();

                    tokio::task::spawn_blocking(move || {
                        let notice = run_job(&runner, job);
                        drop(permit);
                        if let Err(e) = notice_tx.send(notice) {
                            log::error!("Failed to send media notice: {}", e);
                        }
                    });
                }
            });
        });

        Self {
            jobs: JobSender { sender: job_tx },
            notice_receiver: Arc::new(Mutex::new(notice_rx)),
        }
    }

    pub fn sender(&self) -> JobSender {
        self.jobs.clone()
    }

    pub fn submit(&self, job: MediaJob) {
        self.jobs.submit(job);
    }

    /// Completed notices (non-blocking).
    pub fn drain(&self) -> Vec<MediaNotice> {
        let mut notices = Vec::new();

        if let Ok(mut receiver) = self.notice_receiver.lock() {
            while let Ok(notice) = receiver.try_recv() {
                notices.push(notice);
            }
        }

        notices
    }
}

fn run_job(runner: &ToolRunner, job: MediaJob) -> MediaNotice {
    match job {
        MediaJob::Probe { key, angle, path, slot } => {
            log::debug!("Probing duration of {:?}", path);
            match runner.probe_duration(&path) {
                Ok(duration) => {
                    log::debug!("{:?}: {:.2}s", path, duration);
                    if let Ok(mut slot) = slot.lock() {
                        *slot = Some(duration);
                    }
                    MediaNotice::Ready { key, angle }
                }
                Err(e @ ToolError::Unavailable { .. }) => {
                    log::warn!("Cannot probe {:?}: {}", path, e);
                    MediaNotice::Unprobed { key, angle, reason: e.to_string() }
                }
                Err(e) => MediaNotice::Failed { key, angle, reason: e.to_string() },
            }
        }
        MediaJob::Thumbnail { key, path } => {
            log::debug!("Extracting thumbnail for {} from {:?}", key, path);
            let result = runner
                .extract_first_frame(&path, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT)
                .map_err(|e| e.to_string());
            MediaNotice::Thumbnail { key, result }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AppConfig;
    use std::time::{Duration, Instant};

    fn unavailable_tools() -> ToolRunner {
        let mut config = AppConfig::default();
        config.ffmpeg_path = Some(PathBuf::from("/nonexistent/dashcam-viewer/ffmpeg"));
        config.ffprobe_path = Some(PathBuf::from("/nonexistent/dashcam-viewer/ffprobe"));
        ToolRunner::new(&config)
    }

    fn wait_for_notices(worker: &MediaWorker, count: usize) -> Vec<MediaNotice> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut notices = Vec::new();
        while notices.len() < count && Instant::now() < deadline {
            notices.extend(worker.drain());
            thread::sleep(Duration::from_millis(10));
        }
        notices
    }

    #[test]
    fn test_missing_probe_tool_reports_unprobed() {
        let worker = MediaWorker::new(unavailable_tools(), 2);
        let key = TimestampKey::parse("2024-01-01_10-00-00").unwrap();
        let slot: DurationSlot = Arc::new(Mutex::new(None));

        worker.submit(MediaJob::Probe {
            key: key.clone(),
            angle: CameraAngle::Front,
            path: PathBuf::from("/nonexistent/clip.mp4"),
            slot: slot.clone(),
        });

        let notices = wait_for_notices(&worker, 1);
        assert_eq!(notices.len(), 1);
        match &notices[0] {
            MediaNotice::Unprobed { key: k, angle, .. } => {
                assert_eq!(k, &key);
                assert_eq!(*angle, CameraAngle::Front);
            }
            other => panic!("unexpected notice {:?}", other),
        }
        assert_eq!(*slot.lock().unwrap(), None);
    }

    #[test]
    fn test_thumbnail_failure_is_reported_per_batch() {
        let worker = MediaWorker::new(unavailable_tools(), 1);
        let first = TimestampKey::parse("2024-01-01_10-00-00").unwrap();
        let second = TimestampKey::parse("2024-01-01_10-01-00").unwrap();

        for key in [&first, &second] {
            worker.submit(MediaJob::Thumbnail {
                key: key.clone(),
                path: PathBuf::from("/nonexistent/clip.mp4"),
            });
        }

        let notices = wait_for_notices(&worker, 2);
        let mut keys: Vec<TimestampKey> = notices
            .into_iter()
            .map(|notice| match notice {
                MediaNotice::Thumbnail { key, result } => {
                    assert!(result.is_err());
                    key
                }
                other => panic!("unexpected notice {:?}", other),
            })
            .collect();
        keys.sort();
        assert_eq!(keys, vec![first, second]);
    }

    #[test]
    fn test_drain_is_empty_without_jobs() {
        let worker = MediaWorker::new(unavailable_tools(), 1);
        assert!(worker.drain().is_empty());
    }
}
