use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::clip::{parse_clip_name, CameraAngle, ClipRef, TimestampKey};
use crate::core::error::{Result, ViewerError};

/// File name the recorder writes alongside each event's clips.
pub const METADATA_FILE_NAME: &str = "event.json";

/// All clips recorded at one timestamp, at most one per camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    key: TimestampKey,
    clips: BTreeMap<CameraAngle, ClipRef>,
}

impl Batch {
    fn new(key: TimestampKey) -> Self {
        Self {
            key,
            clips: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &TimestampKey {
        &self.key
    }

    pub fn get(&self, angle: CameraAngle) -> Option<&ClipRef> {
        self.clips.get(&angle)
    }

    pub fn contains(&self, angle: CameraAngle) -> bool {
        self.clips.contains_key(&angle)
    }

    pub fn angles(&self) -> impl Iterator<Item = CameraAngle> + '_ {
        self.clips.keys().copied()
    }

    pub fn clips(&self) -> impl Iterator<Item = &ClipRef> {
        self.clips.values()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Poster source for the carousel: the front camera clip, when there is one.
    pub fn thumbnail_source(&self) -> Option<&ClipRef> {
        self.get(CameraAngle::Front)
    }

    /// Returns true when `clip` replaced an existing entry for its angle.
    ///
    /// Duplicates resolve to the lexically greatest file name, then the
    /// greatest full path, so the outcome never depends on listing order.
    fn insert(&mut self, clip: ClipRef) -> bool {
        match self.clips.get_mut(&clip.angle) {
            Some(existing) => {
                let incoming_wins = (clip.file_name(), &clip.file) > (existing.file_name(), &existing.file);
                log::debug!(
                    "Duplicate {} clip for {}: keeping {}",
                    clip.angle,
                    clip.key,
                    if incoming_wins { clip.file.display() } else { existing.file.display() }
                );
                if incoming_wins {
                    *existing = clip;
                }
                true
            }
            None => {
                self.clips.insert(clip.angle, clip);
                false
            }
        }
    }
}

/// Summary of one `ingest` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub clips: usize,
    pub batches: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub metadata_files: Vec<PathBuf>,
}

/// Clips grouped by recording event, in chronological order.
#[derive(Debug, Default)]
pub struct BatchIndex {
    batches: BTreeMap<TimestampKey, Batch>,
    order: Vec<TimestampKey>,
    metadata_files: Vec<PathBuf>,
}

impl BatchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the index from `(file name, file)` pairs in a single pass.
    ///
    /// Any previous contents are discarded. The result does not depend on the
    /// order of `files`.
    pub fn ingest<I, N>(&mut self, files: I) -> IngestReport
    where
        I: IntoIterator<Item = (N, PathBuf)>,
        N: AsRef<str>,
    {
        self.batches.clear();
        self.order.clear();
        self.metadata_files.clear();

        let mut report = IngestReport::default();

        for (name, file) in files {
            let name = name.as_ref();

            if name == METADATA_FILE_NAME {
                self.metadata_files.push(file);
                continue;
            }

            let Some((key, angle)) = parse_clip_name(name) else {
                log::debug!("Skipping non-clip file: {}", name);
                report.skipped += 1;
                continue;
            };

            let batch = self
                .batches
                .entry(key.clone())
                .or_insert_with(|| Batch::new(key.clone()));
            if batch.insert(ClipRef { key, angle, file }) {
                report.duplicates += 1;
            } else {
                report.clips += 1;
            }
        }

        self.order = self.batches.keys().cloned().collect();
        self.metadata_files.sort();

        report.batches = self.order.len();
        report.metadata_files = self.metadata_files.clone();

        log::info!(
            "Indexed {} clips into {} batches ({} skipped, {} duplicates)",
            report.clips,
            report.batches,
            report.skipped,
            report.duplicates
        );

        report
    }

    pub fn get(&self, key: &TimestampKey) -> Result<&Batch> {
        self.batches
            .get(key)
            .ok_or_else(|| ViewerError::NotFound(key.clone()))
    }

    pub fn keys(&self) -> &[TimestampKey] {
        &self.order
    }

    pub fn batches(&self) -> impl Iterator<Item = &Batch> {
        self.order.iter().filter_map(|key| self.batches.get(key))
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn position(&self, key: &TimestampKey) -> Option<usize> {
        self.order.binary_search(key).ok()
    }

    pub fn first_key(&self) -> Option<&TimestampKey> {
        self.order.first()
    }

    pub fn next_key(&self, key: &TimestampKey) -> Option<&TimestampKey> {
        self.position(key).and_then(|i| self.order.get(i + 1))
    }

    pub fn prev_key(&self, key: &TimestampKey) -> Option<&TimestampKey> {
        self.position(key)
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.order.get(i))
    }

    /// `event.json` files seen during the last ingest, sorted by path.
    pub fn metadata_files(&self) -> &[PathBuf] {
        &self.metadata_files
    }
}

/// Lists every regular file below `directory` as `(file name, path)` pairs for `BatchIndex::ingest`.
pub fn scan_directory(directory: &Path) -> anyhow::Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    let mut pending = vec![directory.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if dir == directory => {
                return Err(anyhow::anyhow!("Failed to read directory {}: {}", dir.display(), e));
            }
            Err(e) => {
                log::warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                continue;
            }
        };

        for entry in entries {
            visit_entry(&dir, entry, &mut files, &mut pending);
        }
    }

    log::debug!("Scanned {} files under {}", files.len(), directory.display());
    Ok(files)
}

/// Queues a subdirectory or records a file. Entries that cannot be read are skipped.
fn visit_entry(
    dir: &Path,
    entry: std::io::Result<std::fs::DirEntry>,
    files: &mut Vec<(String, PathBuf)>,
    pending: &mut Vec<PathBuf>,
) {
    let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
            log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
            return;
        }
    };
    let path = entry.path();
    let file_type = match entry.file_type() {
        Ok(file_type) => file_type,
        Err(e) => {
            log::warn!("Skipping {}: {}", path.display(), e);
            return;
        }
    };

    if file_type.is_dir() {
        pending.push(path);
    } else if file_type.is_file() {
        if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
            files.push((name.to_string(), path.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> (String, PathBuf) {
        (name.to_string(), PathBuf::from("/cam/event").join(name))
    }

    fn key(raw: &str) -> TimestampKey {
        TimestampKey::parse(raw).unwrap()
    }

    fn sample_files() -> Vec<(String, PathBuf)> {
        vec![
            file("2024-01-01_10-00-00-front.mp4"),
            file("2024-01-01_10-00-00-back.mp4"),
            file("2024-01-01_10-00-05-front.mp4"),
            file("notes.txt"),
            file("event.json"),
        ]
    }

    #[test]
    fn test_groups_scenario_files() {
        let mut index = BatchIndex::new();
        let report = index.ingest(sample_files());

        assert_eq!(
            index.keys(),
            &[key("2024-01-01_10-00-00"), key("2024-01-01_10-00-05")]
        );
        assert_eq!(report.clips, 3);
        assert_eq!(report.batches, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.metadata_files, vec![PathBuf::from("/cam/event/event.json")]);

        let first = index.get(&key("2024-01-01_10-00-00")).unwrap();
        assert_eq!(
            first.angles().collect::<Vec<_>>(),
            vec![CameraAngle::Front, CameraAngle::Back]
        );

        let second = index.get(&key("2024-01-01_10-00-05")).unwrap();
        assert_eq!(second.angles().collect::<Vec<_>>(), vec![CameraAngle::Front]);
        assert!(!second.contains(CameraAngle::Back));
    }

    #[test]
    fn test_ingest_is_order_independent() {
        let files = vec![
            file("2024-03-02_09-10-11-left_pillar.mp4"),
            file("2024-01-01_10-00-00-front.mp4"),
            file("2024-03-02_09-10-11-front.mp4"),
            file("2024-01-01_10-00-00-right_repeater.mp4"),
            file("2023-12-31_23-59-59-back.mp4"),
            file("2024-01-01_10-00-00-back.mp4"),
        ];

        let mut forward = BatchIndex::new();
        forward.ingest(files.clone());

        // Every rotation plus the full reversal.
        let mut permutations: Vec<Vec<(String, PathBuf)>> = (0..files.len())
            .map(|shift| {
                let mut rotated = files.clone();
                rotated.rotate_left(shift);
                rotated
            })
            .collect();
        permutations.push(files.iter().rev().cloned().collect());

        for permutation in permutations {
            let mut other = BatchIndex::new();
            other.ingest(permutation);
            assert_eq!(forward.keys(), other.keys());
            for (a, b) in forward.batches().zip(other.batches()) {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_keys_strictly_increasing() {
        let mut index = BatchIndex::new();
        index.ingest(vec![
            file("2024-05-01_00-00-00-front.mp4"),
            file("2023-05-01_00-00-00-front.mp4"),
            file("2024-04-30_23-59-59-front.mp4"),
            file("2024-05-01_00-00-00-back.mp4"),
        ]);

        let keys = index.keys();
        assert_eq!(keys.len(), 3);
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(keys
            .windows(2)
            .all(|pair| pair[0].to_datetime().unwrap() < pair[1].to_datetime().unwrap()));
    }

    #[test]
    fn test_navigation_stops_at_boundaries() {
        let mut index = BatchIndex::new();
        index.ingest(sample_files());

        let first = key("2024-01-01_10-00-00");
        let last = key("2024-01-01_10-00-05");

        assert_eq!(index.first_key(), Some(&first));
        assert_eq!(index.next_key(&first), Some(&last));
        assert_eq!(index.next_key(&last), None);
        assert_eq!(index.prev_key(&last), Some(&first));
        assert_eq!(index.prev_key(&first), None);
        assert_eq!(index.next_key(&key("2030-01-01_00-00-00")), None);
    }

    #[test]
    fn test_get_missing_key_is_not_found() {
        let index = BatchIndex::new();
        let missing = key("2024-01-01_10-00-00");
        match index.get(&missing) {
            Err(ViewerError::NotFound(k)) => assert_eq!(k, missing),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_ingest_replaces_previous_index() {
        let mut index = BatchIndex::new();
        index.ingest(sample_files());
        let report = index.ingest(vec![file("notes.txt")]);

        assert!(index.is_empty());
        assert_eq!(index.first_key(), None);
        assert!(index.metadata_files().is_empty());
        assert_eq!(report.batches, 0);
    }

    #[test]
    fn test_duplicate_angle_keeps_lexically_last_path() {
        let a = (
            "2024-01-01_10-00-00-front.mp4".to_string(),
            PathBuf::from("/a/2024-01-01_10-00-00-front.mp4"),
        );
        let b = (
            "2024-01-01_10-00-00-front.mp4".to_string(),
            PathBuf::from("/b/2024-01-01_10-00-00-front.mp4"),
        );

        for files in [vec![a.clone(), b.clone()], vec![b.clone(), a.clone()]] {
            let mut index = BatchIndex::new();
            let report = index.ingest(files);
            let batch = index.get(&key("2024-01-01_10-00-00")).unwrap();
            assert_eq!(batch.len(), 1);
            assert_eq!(batch.get(CameraAngle::Front).unwrap().file, b.1);
            assert_eq!(report.duplicates, 1);
        }
    }

    #[test]
    fn test_thumbnail_source_is_front_clip() {
        let mut index = BatchIndex::new();
        index.ingest(vec![
            file("2024-01-01_10-00-00-front.mp4"),
            file("2024-01-01_10-00-00-back.mp4"),
            file("2024-01-01_10-00-05-back.mp4"),
        ]);

        let thumb = index.get(&key("2024-01-01_10-00-00")).unwrap().thumbnail_source().unwrap();
        assert_eq!(thumb.angle, CameraAngle::Front);
        assert!(index.get(&key("2024-01-01_10-00-05")).unwrap().thumbnail_source().is_none());
    }

    #[test]
    fn test_scan_directory_walks_subfolders() {
        let root = std::env::temp_dir().join(format!("dashcam-viewer-scan-{}", std::process::id()));
        let nested = root.join("SavedClips").join("2024-01-01_10-00-00");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("2024-01-01_10-00-00-front.mp4"), b"").unwrap();
        std::fs::write(nested.join("event.json"), b"{}").unwrap();
        std::fs::write(root.join("readme.txt"), b"").unwrap();

        let files = scan_directory(&root).unwrap();
        let mut names: Vec<_> = files.iter().map(|(name, _)| name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["2024-01-01_10-00-00-front.mp4", "event.json", "readme.txt"]);

        let mut index = BatchIndex::new();
        let report = index.ingest(files);
        assert_eq!(report.batches, 1);
        assert_eq!(report.metadata_files.len(), 1);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_unreadable_entry_is_skipped() {
        let dir = PathBuf::from("/cam/event");
        let mut files = Vec::new();
        let mut pending = Vec::new();
        let broken = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");

        visit_entry(&dir, Err(broken), &mut files, &mut pending);

        assert!(files.is_empty());
        assert!(pending.is_empty());
    }

    #[test]
    fn test_scan_passes_over_dangling_links_and_empty_folders() {
        let root = std::env::temp_dir().join(format!("dashcam-viewer-scan-partial-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(root.join("RecentClips")).unwrap();
        std::fs::write(root.join("2024-01-01_10-00-00-front.mp4"), b"").unwrap();
        // Dangling links are neither files nor directories and are passed over.
        #[cfg(unix)]
        std::os::unix::fs::symlink(root.join("gone"), root.join("dangling")).unwrap();

        let files = scan_directory(&root).unwrap();
        let names: Vec<_> = files.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["2024-01-01_10-00-00-front.mp4"]);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_scan_missing_directory_fails() {
        let missing = std::env::temp_dir().join("dashcam-viewer-definitely-missing-dir");
        assert!(scan_directory(&missing).is_err());
    }
}
